use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agent::{GenerationOverrides, GenerationParams, Mode};
use crate::errors::AppError;

pub type MessageId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
}

/// Terminal outcome of the turn an assistant message closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delivery {
    Delivered,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engagement {
    pub liked: bool,
    pub pinned: bool,
    pub saved: bool,
}

/// Reference to an image that was attached when the message was sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub attachment_id: String,
    pub name: String,
    pub media_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: MessageRole,
    pub content: String,
    pub kind: MessageKind,
    #[serde(default)]
    pub images: Vec<ImageRef>,
    #[serde(default)]
    pub engagement: Engagement,
    #[serde(default)]
    pub edited: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery: Option<Delivery>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn user(id: MessageId, content: String, images: Vec<ImageRef>) -> Self {
        let kind = if images.is_empty() { MessageKind::Text } else { MessageKind::Image };
        Self {
            id,
            role: MessageRole::User,
            content,
            kind,
            images,
            engagement: Engagement::default(),
            edited: false,
            delivery: None,
            created_at: Utc::now(),
        }
    }

    pub fn assistant(id: MessageId, content: String, delivery: Delivery) -> Self {
        Self {
            id,
            role: MessageRole::Assistant,
            content,
            kind: MessageKind::Text,
            images: Vec::new(),
            engagement: Engagement::default(),
            edited: false,
            delivery: Some(delivery),
            created_at: Utc::now(),
        }
    }
}

/// An image staged for the next submit. Bytes are already decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub id: String,
    pub name: String,
    pub media_type: String,
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn new(name: String, media_type: String, data: Vec<u8>) -> Self {
        Self { id: uuid::Uuid::new_v4().to_string(), name, media_type, data }
    }

    pub fn to_ref(&self) -> ImageRef {
        ImageRef {
            attachment_id: self.id.clone(),
            name: self.name.clone(),
            media_type: self.media_type.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Idle,
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    /// Stays until the deployment is fixed.
    Persistent,
    /// The user may resubmit right away.
    Retryable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

/// What survives a session: history and saved messages, keyed per client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatSnapshot {
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub saved: Vec<Message>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

impl TryFrom<&str> for Theme {
    type Error = AppError;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s.trim().to_lowercase().as_str() {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            other => Err(AppError::UnknownVariant {
                field_name: "theme".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Style variables the presentation root applies for a theme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThemeTokens {
    pub color_scheme: &'static str,
    pub background: &'static str,
    pub text: &'static str,
    pub text_secondary: &'static str,
}

// ── API payloads ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct OpenSessionRequest {
    pub client_id: String,
}

#[derive(Debug, Deserialize)]
pub struct DraftRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct AttachmentRequest {
    pub name: String,
    pub media_type: String,
    /// Base64, standard alphabet.
    pub data: String,
}

#[derive(Debug, Deserialize)]
pub struct ModeRequest {
    pub mode: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubmitRequest {
    #[serde(default)]
    pub draft: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EditRequest {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ThemeQuery {
    pub client_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SetThemeRequest {
    pub client_id: String,
    pub theme: String,
}

#[derive(Debug, Serialize)]
pub struct ThemeView {
    pub theme: Theme,
    pub tokens: ThemeTokens,
}

#[derive(Debug, Serialize)]
pub struct ModeView {
    pub mode: Mode,
    pub label: &'static str,
    pub defaults: GenerationParams,
}

#[derive(Debug, Clone, Serialize)]
pub struct StagedAttachmentView {
    pub id: String,
    pub name: String,
    pub media_type: String,
    pub size: usize,
}

impl From<&Attachment> for StagedAttachmentView {
    fn from(a: &Attachment) -> Self {
        Self {
            id: a.id.clone(),
            name: a.name.clone(),
            media_type: a.media_type.clone(),
            size: a.data.len(),
        }
    }
}

/// Read-only projection of a session for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub id: String,
    pub client_id: String,
    pub status: SessionStatus,
    pub mode: Mode,
    pub overrides: GenerationOverrides,
    pub params: GenerationParams,
    pub draft: String,
    pub staged: Vec<StagedAttachmentView>,
    pub messages: Vec<Message>,
    pub saved: Vec<Message>,
    pub pinned: Vec<MessageId>,
    pub can_undo: bool,
    pub can_redo: bool,
    pub notice: Option<Notice>,
}
