use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::agent::{Gateway, GenerationOverrides, Mode};
use crate::db::chat_history_repository::ChatHistoryRepository;
use crate::errors::AppError;
use crate::models::{AttachmentRequest, MessageId, ModeView, SessionView};
use crate::session::{Applied, ChatSession, PendingTurn, SessionLimits};

const MAX_CLIENT_ID_LENGTH: usize = 64;

type SharedSession = Arc<Mutex<ChatSession>>;

pub(crate) fn validate_client_id(client_id: &str) -> Result<(), AppError> {
    if client_id.is_empty() {
        return Err(AppError::EmptyField { field_name: "client_id".to_string() });
    }
    if client_id.len() > MAX_CLIENT_ID_LENGTH {
        return Err(AppError::FieldTooLong {
            field_name: "client_id".to_string(),
            max_length: MAX_CLIENT_ID_LENGTH,
            actual_length: client_id.len(),
        });
    }
    if !client_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(AppError::UnknownVariant {
            field_name: "client_id".to_string(),
            value: client_id.to_string(),
        });
    }
    Ok(())
}

pub fn modes() -> Vec<ModeView> {
    Mode::ALL
        .into_iter()
        .map(|mode| ModeView { mode, label: mode.label(), defaults: mode.defaults() })
        .collect()
}

/// Owns every open session and drives request cycles against the gateway.
/// The gateway call runs with the session lock released; its result is
/// matched back to the issuing turn, so late results for cleared or closed
/// sessions are dropped.
#[derive(Clone)]
pub struct ChatService {
    sessions: Arc<RwLock<HashMap<String, SharedSession>>>,
    history_repo: ChatHistoryRepository,
    gateway: Gateway,
    limits: SessionLimits,
}

impl ChatService {
    pub fn new(history_repo: ChatHistoryRepository, gateway: Gateway, limits: SessionLimits) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            history_repo,
            gateway,
            limits,
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────────────

    /// Mounts a widget session on top of the client's persisted history.
    pub async fn open_session(&self, client_id: &str) -> Result<SessionView, AppError> {
        validate_client_id(client_id)?;
        let snapshot = self.history_repo.load(client_id).await?;
        let session = ChatSession::new(client_id, snapshot, self.limits);
        let view = session.view();

        self.sessions
            .write()
            .await
            .insert(view.id.clone(), Arc::new(Mutex::new(session)));
        info!(
            "Opened session {} for client {client_id} with {} restored messages",
            view.id,
            view.messages.len()
        );
        Ok(view)
    }

    pub async fn close_session(&self, session_id: &str) -> Result<(), AppError> {
        let session = self
            .sessions
            .write()
            .await
            .remove(session_id)
            .ok_or_else(|| AppError::SessionNotFound { id: session_id.to_string() })?;
        session.lock().await.close();
        info!("Closed session {session_id}");
        Ok(())
    }

    /// Closes sessions whose widget has gone quiet for `max_idle`, covering
    /// tabs that vanished without closing. Sessions with a turn outstanding
    /// or currently in use are kept.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let idle: Vec<String> = sessions
            .iter()
            .filter_map(|(id, session)| {
                let s = session.try_lock().ok()?;
                (!s.is_pending() && s.idle_for() >= max_idle).then(|| id.clone())
            })
            .collect();

        for id in &idle {
            if let Some(session) = sessions.remove(id) {
                if let Ok(mut s) = session.try_lock() {
                    s.close();
                }
                debug!("Evicted idle session {id}");
            }
        }
        idle.len()
    }

    pub fn limits(&self) -> SessionLimits {
        self.limits
    }

    pub async fn view(&self, session_id: &str) -> Result<SessionView, AppError> {
        let session = self.session(session_id).await?;
        let mut s = session.lock().await;
        s.touch();
        Ok(s.view())
    }

    // ── Staging ──────────────────────────────────────────────────────────────

    pub async fn set_draft(&self, session_id: &str, text: String) -> Result<SessionView, AppError> {
        self.mutate(session_id, |s| s.set_draft(text).map(|_| false)).await
    }

    pub async fn stage_attachment(
        &self,
        session_id: &str,
        request: AttachmentRequest,
    ) -> Result<SessionView, AppError> {
        let data = STANDARD
            .decode(request.data.trim())
            .map_err(|_| AppError::InvalidAttachmentData { name: request.name.clone() })?;
        self.mutate(session_id, |s| {
            s.stage_attachment(request.name, request.media_type, data).map(|_| false)
        })
        .await
    }

    pub async fn unstage_attachment(
        &self,
        session_id: &str,
        attachment_id: &str,
    ) -> Result<SessionView, AppError> {
        self.mutate(session_id, |s| s.unstage_attachment(attachment_id).map(|_| false))
            .await
    }

    /// Media type and bytes of a staged or sent attachment.
    pub async fn attachment(
        &self,
        session_id: &str,
        attachment_id: &str,
    ) -> Result<(String, Vec<u8>), AppError> {
        let session = self.session(session_id).await?;
        let s = session.lock().await;
        s.attachment(attachment_id)
            .map(|a| (a.media_type.clone(), a.data.clone()))
            .ok_or_else(|| AppError::AttachmentNotFound { id: attachment_id.to_string() })
    }

    pub async fn set_mode(&self, session_id: &str, mode: &str) -> Result<SessionView, AppError> {
        let mode = Mode::try_from(mode)?;
        self.mutate(session_id, |s| {
            s.set_mode(mode);
            Ok(false)
        })
        .await
    }

    pub async fn set_overrides(
        &self,
        session_id: &str,
        overrides: GenerationOverrides,
    ) -> Result<SessionView, AppError> {
        self.mutate(session_id, |s| s.set_overrides(overrides).map(|_| false))
            .await
    }

    // ── Request cycle ────────────────────────────────────────────────────────

    /// Runs one submit → resolve/fail cycle. Gateway failures never escape:
    /// they end up as a failed assistant message in the returned view.
    pub async fn submit(
        &self,
        session_id: &str,
        draft: Option<String>,
    ) -> Result<SessionView, AppError> {
        let session = self.session(session_id).await?;

        let turn = {
            let mut s = session.lock().await;
            s.touch();
            let turn = s.submit_draft(draft)?;
            self.persist(&s).await;
            turn
        };

        let outcome = self
            .gateway
            .generate(&turn.prompt, turn.mode, &turn.overrides, &turn.images)
            .await;

        let mut s = session.lock().await;
        let applied = match &outcome {
            Ok(text) => s.resolve(&turn, text.clone()),
            Err(e) => s.fail(&turn, e),
        };
        self.after_turn(&s, &turn, applied).await?;
        Ok(s.view())
    }

    /// Rewrites a user message for clarity. Unknown or non-user ids return the
    /// unchanged view without calling the gateway.
    pub async fn improve_message(
        &self,
        session_id: &str,
        message_id: MessageId,
    ) -> Result<SessionView, AppError> {
        let session = self.session(session_id).await?;

        let turn = {
            let mut s = session.lock().await;
            s.touch();
            match s.begin_improve(message_id)? {
                Some(turn) => turn,
                None => {
                    debug!("Session {session_id}: nothing to improve for message {message_id}");
                    return Ok(s.view());
                }
            }
        };

        let outcome = self.gateway.improve(&turn.prompt).await;

        let mut s = session.lock().await;
        let applied = match &outcome {
            Ok(text) => s.resolve(&turn, text.clone()),
            Err(e) => s.fail(&turn, e),
        };
        self.after_turn(&s, &turn, applied).await?;
        match outcome {
            Err(e) if applied != Applied::Stale => Err(AppError::Gateway(e)),
            _ => Ok(s.view()),
        }
    }

    // ── Log editing and engagement ───────────────────────────────────────────

    pub async fn undo(&self, session_id: &str) -> Result<SessionView, AppError> {
        self.mutate(session_id, |s| Ok(s.undo())).await
    }

    pub async fn redo(&self, session_id: &str) -> Result<SessionView, AppError> {
        self.mutate(session_id, |s| Ok(s.redo())).await
    }

    pub async fn clear(&self, session_id: &str) -> Result<SessionView, AppError> {
        self.mutate(session_id, |s| Ok(s.clear())).await
    }

    pub async fn edit_message(
        &self,
        session_id: &str,
        message_id: MessageId,
        content: &str,
    ) -> Result<SessionView, AppError> {
        self.mutate(session_id, |s| s.edit_message(message_id, content)).await
    }

    pub async fn toggle_like(&self, session_id: &str, message_id: MessageId) -> Result<SessionView, AppError> {
        self.mutate(session_id, |s| Ok(s.toggle_like(message_id).is_some())).await
    }

    pub async fn toggle_pin(&self, session_id: &str, message_id: MessageId) -> Result<SessionView, AppError> {
        self.mutate(session_id, |s| Ok(s.toggle_pin(message_id).is_some())).await
    }

    pub async fn toggle_save(&self, session_id: &str, message_id: MessageId) -> Result<SessionView, AppError> {
        self.mutate(session_id, |s| Ok(s.toggle_save(message_id).is_some())).await
    }

    pub async fn clear_saved(&self, session_id: &str) -> Result<SessionView, AppError> {
        self.mutate(session_id, |s| {
            s.clear_saved();
            Ok(true)
        })
        .await
    }

    // ── Helpers ──────────────────────────────────────────────────────────────

    async fn session(&self, session_id: &str) -> Result<SharedSession, AppError> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| AppError::SessionNotFound { id: session_id.to_string() })
    }

    /// Applies `f` under the session lock; `true` means durable state changed.
    async fn mutate<F>(&self, session_id: &str, f: F) -> Result<SessionView, AppError>
    where
        F: FnOnce(&mut ChatSession) -> Result<bool, AppError>,
    {
        let session = self.session(session_id).await?;
        let mut s = session.lock().await;
        s.touch();
        if f(&mut s)? {
            self.persist(&s).await;
        }
        Ok(s.view())
    }

    async fn after_turn(
        &self,
        session: &ChatSession,
        turn: &PendingTurn,
        applied: Applied,
    ) -> Result<(), AppError> {
        match applied {
            Applied::Stale => {
                warn!(
                    "Session {}: result of turn {} arrived after the session moved on",
                    session.id(),
                    turn.seq
                );
                if self.is_open(session.id()).await {
                    Ok(())
                } else {
                    Err(AppError::SessionNotFound { id: session.id().to_string() })
                }
            }
            Applied::Unchanged => Ok(()),
            Applied::Appended(_) | Applied::Improved(_) => {
                self.persist(session).await;
                Ok(())
            }
        }
    }

    async fn is_open(&self, session_id: &str) -> bool {
        self.sessions.read().await.contains_key(session_id)
    }

    /// Storage failures are logged; the live session stays authoritative.
    async fn persist(&self, session: &ChatSession) {
        if let Err(e) = self
            .history_repo
            .save(session.client_id(), &session.snapshot())
            .await
        {
            error!("Failed to persist chat history for session {}: {e}", session.id());
        }
    }
}
