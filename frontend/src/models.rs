use serde::{Deserialize, Serialize};

/// Matches the backend `Message` model.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Message {
    pub id: u64,
    pub role: String,
    pub content: String,
    pub kind: String,
    #[serde(default)]
    pub images: Vec<ImageRef>,
    #[serde(default)]
    pub engagement: Engagement,
    #[serde(default)]
    pub edited: bool,
    #[serde(default)]
    pub delivery: Option<String>,
    pub created_at: String,
}

impl Message {
    pub fn is_user(&self) -> bool {
        self.role == "user"
    }

    pub fn failed(&self) -> bool {
        self.delivery.as_deref() == Some("failed")
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Engagement {
    pub liked: bool,
    pub pinned: bool,
    pub saved: bool,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ImageRef {
    pub attachment_id: String,
    pub name: String,
    pub media_type: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct StagedAttachment {
    pub id: String,
    pub name: String,
    pub media_type: String,
    pub size: usize,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct GenerationParams {
    pub temperature: f64,
    pub top_k: u32,
    pub top_p: f64,
    pub max_output_tokens: u32,
}

/// Settings panel values; `None` falls back to the mode default.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct GenerationOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Notice {
    pub level: String,
    pub text: String,
}

/// Matches the backend `SessionView` projection.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct SessionView {
    pub id: String,
    pub client_id: String,
    pub status: String,
    pub mode: String,
    pub overrides: GenerationOverrides,
    pub params: GenerationParams,
    pub draft: String,
    pub staged: Vec<StagedAttachment>,
    pub messages: Vec<Message>,
    pub saved: Vec<Message>,
    pub pinned: Vec<u64>,
    pub can_undo: bool,
    pub can_redo: bool,
    pub notice: Option<Notice>,
}

impl SessionView {
    pub fn is_pending(&self) -> bool {
        self.status == "pending"
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ModeInfo {
    pub mode: String,
    pub label: String,
    pub defaults: GenerationParams,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ThemeTokens {
    pub color_scheme: String,
    pub background: String,
    pub text: String,
    pub text_secondary: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ThemeView {
    pub theme: String,
    pub tokens: ThemeTokens,
}

#[derive(Clone, Debug, Serialize)]
pub struct ClientRequest<'a> {
    pub client_id: &'a str,
}

#[derive(Clone, Debug, Serialize)]
pub struct SubmitRequest {
    pub draft: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct ModeRequest<'a> {
    pub mode: &'a str,
}

#[derive(Clone, Debug, Serialize)]
pub struct AttachmentRequest<'a> {
    pub name: &'a str,
    pub media_type: &'a str,
    /// Base64, standard alphabet.
    pub data: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct EditRequest {
    pub content: String,
}

/// Error body returned by every failing backend route.
#[derive(Clone, Debug, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
