pub mod history;

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::agent::{GenerationOverrides, Mode};
use crate::errors::{AppError, GatewayError};
use crate::models::{
    Attachment, ChatSnapshot, Delivery, Message, MessageId, MessageRole, Notice, NoticeLevel,
    SessionStatus, SessionView, StagedAttachmentView,
};

use self::history::History;

pub const SUPPORTED_MEDIA_TYPES: [&str; 3] = ["image/png", "image/jpeg", "image/gif"];

const APOLOGY: &str = "I apologize, but I encountered an error processing your request.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    pub max_draft_chars: usize,
    pub max_attachment_bytes: usize,
    pub max_attachments: usize,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_draft_chars: 8000,
            max_attachment_bytes: 4 * 1024 * 1024,
            max_attachments: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnKind {
    /// A submitted user message waiting for its assistant reply.
    Reply { user_message_id: MessageId },
    /// A rewrite of an existing user message.
    Improve { message_id: MessageId },
}

/// Everything needed to perform the gateway call for one outstanding turn.
/// The result must be handed back to the session that issued it.
#[derive(Debug, Clone)]
pub struct PendingTurn {
    pub seq: u64,
    pub kind: TurnKind,
    pub prompt: String,
    pub mode: Mode,
    pub overrides: GenerationOverrides,
    pub images: Vec<Attachment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Appended(MessageId),
    Improved(MessageId),
    /// The turn ended without changing the log (failed improve, vanished target).
    Unchanged,
    /// The turn no longer matches the outstanding one and was dropped.
    Stale,
}

/// State of one open chat widget. Every mutation goes through these methods.
#[derive(Debug)]
pub struct ChatSession {
    id: String,
    client_id: String,
    messages: Vec<Message>,
    saved: Vec<Message>,
    draft: String,
    staged: Vec<Attachment>,
    sent_attachments: HashMap<String, Attachment>,
    mode: Mode,
    overrides: GenerationOverrides,
    pending: Option<u64>,
    next_seq: u64,
    history: History<Vec<Message>>,
    notice: Option<Notice>,
    last_message_id: MessageId,
    limits: SessionLimits,
    last_active: Instant,
}

impl ChatSession {
    /// Opens a session on top of the client's persisted history.
    pub fn new(client_id: impl Into<String>, snapshot: ChatSnapshot, limits: SessionLimits) -> Self {
        let last_message_id = snapshot
            .messages
            .iter()
            .chain(snapshot.saved.iter())
            .map(|m| m.id)
            .max()
            .unwrap_or(0);

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            client_id: client_id.into(),
            messages: snapshot.messages,
            saved: snapshot.saved,
            draft: String::new(),
            staged: Vec::new(),
            sent_attachments: HashMap::new(),
            mode: Mode::default(),
            overrides: GenerationOverrides::default(),
            pending: None,
            next_seq: 1,
            history: History::default(),
            notice: None,
            last_message_id,
            limits,
            last_active: Instant::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Marks the session as in use by its widget.
    pub fn touch(&mut self) {
        self.last_active = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_active.elapsed()
    }

    pub fn status(&self) -> SessionStatus {
        if self.pending.is_some() {
            SessionStatus::Pending
        } else {
            SessionStatus::Idle
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn saved(&self) -> &[Message] {
        &self.saved
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn staged(&self) -> &[Attachment] {
        &self.staged
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn pinned(&self) -> Vec<MessageId> {
        self.messages
            .iter()
            .filter(|m| m.engagement.pinned)
            .map(|m| m.id)
            .collect()
    }

    /// Staged or already-sent attachment, for display.
    pub fn attachment(&self, id: &str) -> Option<&Attachment> {
        self.sent_attachments
            .get(id)
            .or_else(|| self.staged.iter().find(|a| a.id == id))
    }

    pub fn snapshot(&self) -> ChatSnapshot {
        ChatSnapshot { messages: self.messages.clone(), saved: self.saved.clone() }
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            id: self.id.clone(),
            client_id: self.client_id.clone(),
            status: self.status(),
            mode: self.mode,
            overrides: self.overrides,
            params: self.overrides.apply_to(self.mode.defaults()),
            draft: self.draft.clone(),
            staged: self.staged.iter().map(StagedAttachmentView::from).collect(),
            messages: self.messages.clone(),
            saved: self.saved.clone(),
            pinned: self.pinned(),
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
            notice: self.notice.clone(),
        }
    }

    // ── Staging ──────────────────────────────────────────────────────────────

    pub fn set_draft(&mut self, text: impl Into<String>) -> Result<(), AppError> {
        let text = text.into();
        self.check_length("draft", &text)?;
        self.draft = text;
        Ok(())
    }

    pub fn stage_attachment(
        &mut self,
        name: impl Into<String>,
        media_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Result<&Attachment, AppError> {
        let name = name.into();
        let media_type = media_type.into().to_lowercase();

        if !SUPPORTED_MEDIA_TYPES.contains(&media_type.as_str()) {
            return Err(AppError::UnsupportedAttachment { media_type });
        }
        if self.staged.len() >= self.limits.max_attachments {
            return Err(AppError::TooManyAttachments { max: self.limits.max_attachments });
        }
        if data.is_empty() {
            return Err(AppError::EmptyField { field_name: "data".to_string() });
        }
        if data.len() > self.limits.max_attachment_bytes {
            return Err(AppError::AttachmentTooLarge {
                name,
                max_bytes: self.limits.max_attachment_bytes,
                actual_bytes: data.len(),
            });
        }

        self.staged.push(Attachment::new(name, media_type, data));
        let staged = &self.staged[self.staged.len() - 1];
        debug!("Session {}: staged attachment {} ({} bytes)", self.id, staged.id, staged.data.len());
        Ok(staged)
    }

    pub fn unstage_attachment(&mut self, attachment_id: &str) -> Result<(), AppError> {
        let before = self.staged.len();
        self.staged.retain(|a| a.id != attachment_id);
        if self.staged.len() == before {
            return Err(AppError::AttachmentNotFound { id: attachment_id.to_string() });
        }
        Ok(())
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    pub fn set_overrides(&mut self, overrides: GenerationOverrides) -> Result<(), AppError> {
        overrides.validate()?;
        self.overrides = overrides;
        Ok(())
    }

    // ── Request cycle ────────────────────────────────────────────────────────

    /// Appends the user message built from the draft and staged attachments and
    /// enters `pending`. Rejected without any state change while a request is
    /// outstanding or when there is nothing to send.
    pub fn submit(&mut self) -> Result<PendingTurn, AppError> {
        if self.is_pending() {
            return Err(AppError::SessionBusy);
        }
        let prompt = self.draft.trim().to_string();
        if prompt.is_empty() && self.staged.is_empty() {
            return Err(AppError::EmptyDraft);
        }
        self.check_length("draft", &prompt)?;

        self.history.record(self.messages.clone());

        let images = std::mem::take(&mut self.staged);
        let refs = images.iter().map(Attachment::to_ref).collect();
        let id = self.next_message_id();
        self.messages.push(Message::user(id, prompt.clone(), refs));
        for image in &images {
            self.sent_attachments.insert(image.id.clone(), image.clone());
        }
        self.draft.clear();

        let turn = self.begin_turn(TurnKind::Reply { user_message_id: id }, prompt, self.mode, images);
        debug!("Session {}: submitted message {id} as turn {}", self.id, turn.seq);
        Ok(turn)
    }

    /// Submits `draft` in place of the staged text. A rejected submit leaves
    /// the staged draft untouched.
    pub fn submit_draft(&mut self, draft: Option<String>) -> Result<PendingTurn, AppError> {
        let Some(draft) = draft else {
            return self.submit();
        };
        if self.is_pending() {
            return Err(AppError::SessionBusy);
        }
        if draft.trim().is_empty() && self.staged.is_empty() {
            return Err(AppError::EmptyDraft);
        }
        self.check_length("draft", &draft)?;

        let previous = std::mem::replace(&mut self.draft, draft);
        match self.submit() {
            Ok(turn) => Ok(turn),
            Err(e) => {
                self.draft = previous;
                Err(e)
            }
        }
    }

    /// Starts a rewrite of a user message. Unknown and non-user ids yield
    /// `Ok(None)` and leave the session untouched.
    pub fn begin_improve(&mut self, message_id: MessageId) -> Result<Option<PendingTurn>, AppError> {
        let Some(content) = self
            .find_user_message(message_id)
            .map(|m| m.content.clone())
        else {
            return Ok(None);
        };
        if self.is_pending() {
            return Err(AppError::SessionBusy);
        }
        let turn = self.begin_turn(TurnKind::Improve { message_id }, content, Mode::Precise, Vec::new());
        debug!("Session {}: improving message {message_id} as turn {}", self.id, turn.seq);
        Ok(Some(turn))
    }

    /// Applies a successful gateway result to the turn that requested it.
    pub fn resolve(&mut self, turn: &PendingTurn, text: String) -> Applied {
        if !self.finish_turn(turn) {
            return Applied::Stale;
        }
        self.notice = None;

        match turn.kind {
            TurnKind::Reply { .. } => {
                let id = self.next_message_id();
                self.messages.push(Message::assistant(id, text, Delivery::Delivered));
                Applied::Appended(id)
            }
            TurnKind::Improve { message_id } => {
                if self.find_user_message(message_id).is_none() {
                    return Applied::Unchanged;
                }
                self.history.record(self.messages.clone());
                if let Some(message) = self.find_user_message_mut(message_id) {
                    message.content = text;
                    message.edited = true;
                }
                Applied::Improved(message_id)
            }
        }
    }

    /// Applies a gateway failure. A failed reply becomes an apology message;
    /// a failed improve leaves the log alone.
    pub fn fail(&mut self, turn: &PendingTurn, error: &GatewayError) -> Applied {
        if !self.finish_turn(turn) {
            return Applied::Stale;
        }
        if error.is_persistent() {
            self.notice = Some(Notice { level: NoticeLevel::Persistent, text: error.to_string() });
        } else if error.is_retryable() {
            self.notice = Some(Notice { level: NoticeLevel::Retryable, text: error.to_string() });
        }

        match turn.kind {
            TurnKind::Reply { .. } => {
                let id = self.next_message_id();
                let content = format!("{APOLOGY} {error}");
                self.messages.push(Message::assistant(id, content, Delivery::Failed));
                Applied::Appended(id)
            }
            TurnKind::Improve { .. } => Applied::Unchanged,
        }
    }

    // ── Log editing ──────────────────────────────────────────────────────────

    pub fn undo(&mut self) -> bool {
        let changed = !self.is_pending() && self.history.undo(&mut self.messages);
        if changed {
            self.sync_saved_flags();
        }
        changed
    }

    pub fn redo(&mut self) -> bool {
        let changed = !self.is_pending() && self.history.redo(&mut self.messages);
        if changed {
            self.sync_saved_flags();
        }
        changed
    }

    /// Replaces a user message's content. Returns false for unknown or non-user ids.
    pub fn edit_message(&mut self, message_id: MessageId, content: &str) -> Result<bool, AppError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::EmptyField { field_name: "content".to_string() });
        }
        self.check_length("content", content)?;
        if self.find_user_message(message_id).is_none() {
            return Ok(false);
        }
        if self.is_pending() {
            return Err(AppError::SessionBusy);
        }
        self.history.record(self.messages.clone());
        if let Some(message) = self.find_user_message_mut(message_id) {
            message.content = content.to_string();
            message.edited = true;
        }
        Ok(true)
    }

    /// Truncates the log. An outstanding turn is abandoned: its result will be
    /// dropped as stale when it arrives.
    pub fn clear(&mut self) -> bool {
        let abandoned = self.pending.take();
        if let Some(seq) = abandoned {
            warn!("Session {}: clear abandoned outstanding turn {seq}", self.id);
        }
        if self.messages.is_empty() {
            return abandoned.is_some();
        }
        self.history.record(std::mem::take(&mut self.messages));
        true
    }

    /// Tears the session down: staging is dropped and an outstanding turn is
    /// abandoned so its late result cannot touch the log.
    pub fn close(&mut self) {
        if let Some(seq) = self.pending.take() {
            debug!("Session {}: closed with turn {seq} outstanding", self.id);
        }
        self.staged.clear();
        self.draft.clear();
    }

    // ── Engagement ───────────────────────────────────────────────────────────

    pub fn toggle_like(&mut self, message_id: MessageId) -> Option<bool> {
        let message = self.messages.iter_mut().find(|m| m.id == message_id)?;
        message.engagement.liked = !message.engagement.liked;
        Some(message.engagement.liked)
    }

    pub fn toggle_pin(&mut self, message_id: MessageId) -> Option<bool> {
        let message = self.messages.iter_mut().find(|m| m.id == message_id)?;
        message.engagement.pinned = !message.engagement.pinned;
        Some(message.engagement.pinned)
    }

    /// Saving copies the message into the saved collection, which survives `clear`.
    pub fn toggle_save(&mut self, message_id: MessageId) -> Option<bool> {
        let was_saved = self.saved.iter().any(|m| m.id == message_id);
        let live = self.messages.iter_mut().find(|m| m.id == message_id);

        if was_saved {
            self.saved.retain(|m| m.id != message_id);
            if let Some(message) = live {
                message.engagement.saved = false;
            }
            return Some(false);
        }

        let message = live?;
        message.engagement.saved = true;
        self.saved.push(message.clone());
        Some(true)
    }

    pub fn clear_saved(&mut self) {
        self.saved.clear();
        for message in &mut self.messages {
            message.engagement.saved = false;
        }
    }

    // ── Internals ────────────────────────────────────────────────────────────

    fn begin_turn(
        &mut self,
        kind: TurnKind,
        prompt: String,
        mode: Mode,
        images: Vec<Attachment>,
    ) -> PendingTurn {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending = Some(seq);
        PendingTurn { seq, kind, prompt, mode, overrides: self.overrides, images }
    }

    fn finish_turn(&mut self, turn: &PendingTurn) -> bool {
        if self.pending != Some(turn.seq) {
            warn!("Session {}: dropping result of stale turn {}", self.id, turn.seq);
            return false;
        }
        self.pending = None;
        true
    }

    /// Snapshots carry the flags of their time; the saved collection is not
    /// part of them and stays authoritative.
    fn sync_saved_flags(&mut self) {
        for message in &mut self.messages {
            message.engagement.saved = self.saved.iter().any(|m| m.id == message.id);
        }
    }

    fn find_user_message(&self, message_id: MessageId) -> Option<&Message> {
        self.messages
            .iter()
            .find(|m| m.id == message_id && m.role == MessageRole::User)
    }

    fn find_user_message_mut(&mut self, message_id: MessageId) -> Option<&mut Message> {
        self.messages
            .iter_mut()
            .find(|m| m.id == message_id && m.role == MessageRole::User)
    }

    fn check_length(&self, field_name: &str, text: &str) -> Result<(), AppError> {
        let length = text.chars().count();
        if length > self.limits.max_draft_chars {
            return Err(AppError::FieldTooLong {
                field_name: field_name.to_string(),
                max_length: self.limits.max_draft_chars,
                actual_length: length,
            });
        }
        Ok(())
    }

    /// Creation-time based and strictly increasing within the session.
    fn next_message_id(&mut self) -> MessageId {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        let id = now.max(self.last_message_id + 1);
        self.last_message_id = id;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessageKind;

    fn session() -> ChatSession {
        ChatSession::new("client-1", ChatSnapshot::default(), SessionLimits::default())
    }

    fn submit_text(session: &mut ChatSession, text: &str) -> PendingTurn {
        session.set_draft(text).unwrap();
        session.submit().unwrap()
    }

    #[test]
    fn submit_appends_user_message_and_enters_pending() {
        let mut s = session();
        s.set_mode(Mode::Code);
        let turn = submit_text(&mut s, "Generate a React component");

        assert_eq!(s.status(), SessionStatus::Pending);
        assert_eq!(s.messages().len(), 1);
        let user = &s.messages()[0];
        assert_eq!(user.role, MessageRole::User);
        assert_eq!(user.content, "Generate a React component");
        assert_eq!(user.kind, MessageKind::Text);
        assert_eq!(s.draft(), "");
        assert_eq!(turn.mode, Mode::Code);
        assert_eq!(turn.prompt, "Generate a React component");
        assert_eq!(turn.kind, TurnKind::Reply { user_message_id: user.id });
    }

    #[test]
    fn second_submit_rejected_while_pending() {
        let mut s = session();
        submit_text(&mut s, "first");
        s.set_draft("second").unwrap();

        assert!(matches!(s.submit(), Err(AppError::SessionBusy)));
        assert_eq!(s.messages().len(), 1);
        assert_eq!(s.draft(), "second");
    }

    #[test]
    fn empty_draft_without_attachments_is_silently_rejected() {
        let mut s = session();
        s.set_draft("   ").unwrap();

        assert!(matches!(s.submit(), Err(AppError::EmptyDraft)));
        assert!(s.messages().is_empty());
        assert_eq!(s.status(), SessionStatus::Idle);
        assert!(!s.can_undo());
    }

    #[test]
    fn resolve_appends_exactly_one_assistant_after_its_user_message() {
        let mut s = session();
        let turn = submit_text(&mut s, "hello");

        let applied = s.resolve(&turn, "hi there".into());

        assert!(matches!(applied, Applied::Appended(_)));
        assert_eq!(s.status(), SessionStatus::Idle);
        assert_eq!(s.messages().len(), 2);
        assert_eq!(s.messages()[0].role, MessageRole::User);
        let reply = &s.messages()[1];
        assert_eq!(reply.role, MessageRole::Assistant);
        assert_eq!(reply.content, "hi there");
        assert_eq!(reply.delivery, Some(Delivery::Delivered));
        assert!(reply.id > s.messages()[0].id);
    }

    #[test]
    fn fail_appends_apology_with_error_text_and_returns_to_idle() {
        let mut s = session();
        let turn = submit_text(&mut s, "hello");

        s.fail(&turn, &GatewayError::RateLimit);

        assert_eq!(s.status(), SessionStatus::Idle);
        assert_eq!(s.messages().len(), 2);
        let reply = &s.messages()[1];
        assert_eq!(reply.role, MessageRole::Assistant);
        assert_eq!(reply.delivery, Some(Delivery::Failed));
        assert!(reply.content.contains("quota"));
        assert!(reply.content.contains(&GatewayError::RateLimit.to_string()));
        assert_eq!(s.notice().map(|n| n.level), Some(NoticeLevel::Retryable));
    }

    #[test]
    fn configuration_failure_raises_persistent_notice_cleared_by_success() {
        let mut s = session();
        let turn = submit_text(&mut s, "hello");
        s.fail(&turn, &GatewayError::Configuration { detail: "missing API key".into() });
        assert_eq!(s.notice().map(|n| n.level), Some(NoticeLevel::Persistent));

        let turn = submit_text(&mut s, "again");
        s.resolve(&turn, "ok".into());
        assert!(s.notice().is_none());
    }

    #[test]
    fn unknown_failure_has_no_notice() {
        let mut s = session();
        let turn = submit_text(&mut s, "hello");
        s.fail(&turn, &GatewayError::Unknown { message: "boom".into() });
        assert!(s.notice().is_none());
        assert!(s.messages()[1].content.contains("boom"));
    }

    #[test]
    fn undo_and_redo_round_trip_a_full_cycle() {
        let mut s = session();
        let turn = submit_text(&mut s, "first");
        s.resolve(&turn, "one".into());
        let before = s.messages().to_vec();

        let turn = submit_text(&mut s, "second");
        s.resolve(&turn, "two".into());
        let after = s.messages().to_vec();

        assert!(s.undo());
        assert_eq!(s.messages(), before.as_slice());
        assert!(s.redo());
        assert_eq!(s.messages(), after.as_slice());
    }

    #[test]
    fn undo_is_a_no_op_while_pending_or_empty() {
        let mut s = session();
        assert!(!s.undo());
        assert!(!s.redo());

        submit_text(&mut s, "hello");
        assert!(!s.undo());
        assert_eq!(s.messages().len(), 1);
    }

    #[test]
    fn new_submit_clears_redo() {
        let mut s = session();
        let turn = submit_text(&mut s, "a");
        s.resolve(&turn, "b".into());
        assert!(s.undo());
        assert!(s.can_redo());

        let turn = submit_text(&mut s, "c");
        s.resolve(&turn, "d".into());
        assert!(!s.can_redo());
    }

    #[test]
    fn attachments_make_an_image_message_and_leave_staging() {
        let mut s = session();
        let attachment_id = s
            .stage_attachment("cat.png", "image/png", vec![1, 2, 3])
            .unwrap()
            .id
            .clone();

        let turn = s.submit().unwrap();

        let user = &s.messages()[0];
        assert_eq!(user.kind, MessageKind::Image);
        assert_eq!(user.images[0].attachment_id, attachment_id);
        assert!(s.staged().is_empty());
        assert_eq!(turn.images.len(), 1);
        assert!(s.attachment(&attachment_id).is_some());
    }

    #[test]
    fn attachment_validation() {
        let limits = SessionLimits { max_attachment_bytes: 4, max_attachments: 1, ..Default::default() };
        let mut s = ChatSession::new("c", ChatSnapshot::default(), limits);

        assert!(matches!(
            s.stage_attachment("doc.pdf", "application/pdf", vec![1]),
            Err(AppError::UnsupportedAttachment { .. })
        ));
        assert!(matches!(
            s.stage_attachment("big.png", "image/png", vec![0; 5]),
            Err(AppError::AttachmentTooLarge { .. })
        ));
        s.stage_attachment("ok.png", "image/png", vec![0; 4]).unwrap();
        assert!(matches!(
            s.stage_attachment("two.png", "image/png", vec![0; 1]),
            Err(AppError::TooManyAttachments { max: 1 })
        ));

        let id = s.staged()[0].id.clone();
        s.unstage_attachment(&id).unwrap();
        assert!(s.staged().is_empty());
        assert!(s.unstage_attachment(&id).is_err());
    }

    #[test]
    fn oversized_draft_is_rejected_before_submit() {
        let limits = SessionLimits { max_draft_chars: 5, ..Default::default() };
        let mut s = ChatSession::new("c", ChatSnapshot::default(), limits);
        assert!(matches!(s.set_draft("too long"), Err(AppError::FieldTooLong { .. })));
    }

    #[test]
    fn improve_rewrites_user_message_in_place() {
        let mut s = session();
        let turn = submit_text(&mut s, "make thing work pls");
        s.resolve(&turn, "sure".into());
        let user_id = s.messages()[0].id;

        let turn = s.begin_improve(user_id).unwrap().unwrap();
        assert_eq!(turn.prompt, "make thing work pls");
        assert!(s.is_pending());

        assert_eq!(s.resolve(&turn, "Please fix the bug.".into()), Applied::Improved(user_id));
        assert_eq!(s.messages()[0].content, "Please fix the bug.");
        assert!(s.messages()[0].edited);
        assert_eq!(s.messages().len(), 2);

        assert!(s.undo());
        assert_eq!(s.messages()[0].content, "make thing work pls");
    }

    #[test]
    fn improve_on_unknown_or_assistant_message_is_a_no_op() {
        let mut s = session();
        let turn = submit_text(&mut s, "hello");
        s.resolve(&turn, "hi".into());
        let before = s.messages().to_vec();
        let assistant_id = s.messages()[1].id;

        assert!(s.begin_improve(assistant_id).unwrap().is_none());
        assert!(s.begin_improve(42).unwrap().is_none());
        assert_eq!(s.messages(), before.as_slice());
        assert_eq!(s.status(), SessionStatus::Idle);
    }

    #[test]
    fn failed_improve_leaves_log_unchanged() {
        let mut s = session();
        let turn = submit_text(&mut s, "hello");
        s.resolve(&turn, "hi".into());
        let before = s.messages().to_vec();

        let turn = s.begin_improve(before[0].id).unwrap().unwrap();
        assert_eq!(s.fail(&turn, &GatewayError::EmptyResponse), Applied::Unchanged);
        assert_eq!(s.messages(), before.as_slice());
        assert!(!s.is_pending());
    }

    #[test]
    fn clear_abandons_outstanding_turn() {
        let mut s = session();
        let turn = submit_text(&mut s, "hello");

        assert!(s.clear());
        assert!(s.messages().is_empty());
        assert_eq!(s.status(), SessionStatus::Idle);
        assert_eq!(s.resolve(&turn, "late".into()), Applied::Stale);
        assert!(s.messages().is_empty());

        assert!(s.undo());
        assert_eq!(s.messages().len(), 1);
    }

    #[test]
    fn late_result_after_close_is_ignored() {
        let mut s = session();
        let turn = submit_text(&mut s, "hello");
        s.close();

        assert_eq!(s.resolve(&turn, "late".into()), Applied::Stale);
        assert_eq!(s.fail(&turn, &GatewayError::RateLimit), Applied::Stale);
        assert_eq!(s.messages().len(), 1);
        assert!(s.notice().is_none());
    }

    #[test]
    fn edit_replaces_user_content() {
        let mut s = session();
        let turn = submit_text(&mut s, "helo");
        s.resolve(&turn, "hi".into());
        let id = s.messages()[0].id;

        assert!(s.edit_message(id, "hello").unwrap());
        assert_eq!(s.messages()[0].content, "hello");
        assert!(s.messages()[0].edited);
        assert!(!s.edit_message(s.messages()[1].id, "nope").unwrap());
        assert!(s.edit_message(id, "  ").is_err());
    }

    #[test]
    fn saved_messages_survive_clear() {
        let mut s = session();
        let turn = submit_text(&mut s, "keep me");
        s.resolve(&turn, "kept".into());
        let reply_id = s.messages()[1].id;

        assert_eq!(s.toggle_save(reply_id), Some(true));
        assert_eq!(s.toggle_pin(reply_id), Some(true));
        assert_eq!(s.toggle_like(reply_id), Some(true));
        assert_eq!(s.pinned(), vec![reply_id]);

        s.clear();
        assert_eq!(s.saved().len(), 1);
        assert!(s.pinned().is_empty());

        assert_eq!(s.toggle_save(reply_id), Some(false));
        assert!(s.saved().is_empty());
        assert_eq!(s.toggle_like(reply_id), None);
    }

    #[test]
    fn undo_after_clear_saved_keeps_flags_consistent() {
        let mut s = session();
        let turn = submit_text(&mut s, "first");
        s.resolve(&turn, "reply".into());
        let reply_id = s.messages()[1].id;
        s.toggle_save(reply_id);

        let turn = submit_text(&mut s, "second");
        s.resolve(&turn, "another".into());
        s.clear_saved();

        assert!(s.undo());
        assert_eq!(s.messages().len(), 2);
        assert!(s.saved().is_empty());
        assert!(s.messages().iter().all(|m| !m.engagement.saved));

        s.toggle_save(reply_id);
        assert!(s.redo());
        assert!(s.messages().iter().find(|m| m.id == reply_id).unwrap().engagement.saved);
    }

    #[test]
    fn rejected_submit_draft_keeps_staged_draft() {
        let mut s = session();
        s.set_draft("my careful draft").unwrap();

        assert!(matches!(s.submit_draft(Some("   ".into())), Err(AppError::EmptyDraft)));
        assert_eq!(s.draft(), "my careful draft");

        let turn = s.submit_draft(Some("go".into())).unwrap();
        assert_eq!(turn.prompt, "go");
        s.set_draft("next one").unwrap();

        assert!(matches!(s.submit_draft(Some("sneaky".into())), Err(AppError::SessionBusy)));
        assert_eq!(s.draft(), "next one");
        assert_eq!(s.messages().len(), 1);
    }

    #[test]
    fn restored_history_keeps_ids_increasing() {
        let mut first = session();
        let turn = submit_text(&mut first, "hello");
        first.resolve(&turn, "hi".into());
        let snapshot = first.snapshot();
        let last = snapshot.messages[1].id;

        let mut second = ChatSession::new("client-1", snapshot, SessionLimits::default());
        assert_eq!(second.messages().len(), 2);
        submit_text(&mut second, "again");
        assert!(second.messages()[2].id > last);
        assert_ne!(second.id(), first.id());
    }

    #[test]
    fn view_reflects_effective_params() {
        let mut s = session();
        s.set_mode(Mode::Creative);
        s.set_overrides(GenerationOverrides { top_k: Some(10), ..Default::default() }).unwrap();

        let view = s.view();
        assert_eq!(view.mode, Mode::Creative);
        assert_eq!(view.params.top_k, 10);
        assert_eq!(view.params.temperature, Mode::Creative.defaults().temperature);
        assert!(s
            .set_overrides(GenerationOverrides { top_p: Some(1.5), ..Default::default() })
            .is_err());
    }
}
