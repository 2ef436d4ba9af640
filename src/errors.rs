use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Failures of a single gateway call. The `Display` text of every variant is
/// written for the end user: it is embedded verbatim in apology messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("The AI service is not configured correctly ({detail}).")]
    Configuration { detail: String },

    #[error("The AI service quota has been exceeded. Please wait a moment and try again.")]
    RateLimit,

    #[error("The AI service returned an empty response.")]
    EmptyResponse,

    #[error("Failed to get AI response: {message}")]
    Unknown { message: String },

    #[error("Nothing to send: the prompt is empty and no images are attached.")]
    EmptyPrompt,
}

impl GatewayError {
    /// Configuration problems stay on screen until the server is reconfigured.
    pub fn is_persistent(&self) -> bool {
        matches!(self, GatewayError::Configuration { .. })
    }

    /// The user may resubmit straight away.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::RateLimit)
    }
}

/// Top-level application error.
/// All variants carry a human-readable message for display/logging.
#[derive(Debug, Error)]
pub enum AppError {
    // ── Storage errors ───────────────────────────────────────────────────────
    #[error("Database connection failed: {0}")]
    DatabaseConnectionFailed(#[source] sqlx::Error),

    #[error("Database query failed: {message}")]
    DatabaseQueryFailed {
        message: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Failed to (de)serialize {what}: {source}")]
    Serialization {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    // ── Gateway errors ───────────────────────────────────────────────────────
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    // ── Session errors ───────────────────────────────────────────────────────
    #[error("Session '{id}' not found")]
    SessionNotFound { id: String },

    #[error("Attachment '{id}' not found")]
    AttachmentNotFound { id: String },

    #[error("A request is already in progress")]
    SessionBusy,

    // ── Validation errors ────────────────────────────────────────────────────
    #[error("Type a message or attach an image first")]
    EmptyDraft,

    #[error("Field '{field_name}' cannot be empty")]
    EmptyField { field_name: String },

    #[error("Field '{field_name}' exceeds max length of {max_length} (actual: {actual_length})")]
    FieldTooLong { field_name: String, max_length: usize, actual_length: usize },

    #[error("Attachment '{name}' is {actual_bytes} bytes, the limit is {max_bytes}")]
    AttachmentTooLarge { name: String, max_bytes: usize, actual_bytes: usize },

    #[error("Unsupported attachment type '{media_type}' (expected PNG, JPEG or GIF)")]
    UnsupportedAttachment { media_type: String },

    #[error("At most {max} attachments can be staged")]
    TooManyAttachments { max: usize },

    #[error("Attachment '{name}' is not valid base64")]
    InvalidAttachmentData { name: String },

    #[error("Setting '{name}' is out of range: {reason}")]
    InvalidSetting { name: String, reason: String },

    #[error("Unknown value '{value}' for '{field_name}'")]
    UnknownVariant { field_name: String, value: String },

    /// Body refused by an extractor (too large, wrong content type, bad JSON).
    #[error("{message}")]
    RequestRejected { status: StatusCode, message: String },

    // ── System errors ────────────────────────────────────────────────────────
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn db_query(message: impl Into<String>, source: sqlx::Error) -> Self {
        AppError::DatabaseQueryFailed { message: message.into(), source }
    }

    pub fn serialization(what: impl Into<String>, source: serde_json::Error) -> Self {
        AppError::Serialization { what: what.into(), source }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AppError::SessionNotFound { .. } | AppError::AttachmentNotFound { .. }
        )
    }

    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AppError::EmptyDraft
                | AppError::EmptyField { .. }
                | AppError::FieldTooLong { .. }
                | AppError::AttachmentTooLarge { .. }
                | AppError::UnsupportedAttachment { .. }
                | AppError::TooManyAttachments { .. }
                | AppError::InvalidAttachmentData { .. }
                | AppError::InvalidSetting { .. }
                | AppError::UnknownVariant { .. }
        )
    }

    pub fn status(&self) -> StatusCode {
        match self {
            e if e.is_validation() => StatusCode::BAD_REQUEST,
            e if e.is_not_found() => StatusCode::NOT_FOUND,
            AppError::SessionBusy => StatusCode::CONFLICT,
            AppError::RequestRejected { status, .. } => *status,
            AppError::Gateway(GatewayError::RateLimit) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Gateway(GatewayError::Configuration { .. }) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Gateway(GatewayError::EmptyPrompt) => StatusCode::BAD_REQUEST,
            AppError::Gateway(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::RequestRejected { status: rejection.status(), message: rejection.body_text() }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.to_string() });
        (self.status(), Json(body)).into_response()
    }
}
