use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rig::completion::Prompt;
use rig::message::{ImageMediaType, Message as RigMessage, UserContent};
use rig::prelude::CompletionClient;
use rig::providers::gemini;
use rig::OneOrMany;
use tracing::{error, warn};

use super::{BackendFailure, GenerationBackend, GenerationRequest};
use crate::errors::AppError;
use crate::models::Attachment;

pub const DEFAULT_MODEL: &str = "gemini-pro";

fn media_type(mime: &str) -> Option<ImageMediaType> {
    match mime {
        "image/png" => Some(ImageMediaType::PNG),
        "image/jpeg" => Some(ImageMediaType::JPEG),
        "image/gif" => Some(ImageMediaType::GIF),
        _ => None,
    }
}

/// Builds the single user turn: the prompt text followed by inline images.
fn to_rig_message(prompt: &str, images: &[Attachment]) -> Result<RigMessage, BackendFailure> {
    let mut parts = Vec::with_capacity(images.len() + 1);
    if !prompt.trim().is_empty() {
        parts.push(UserContent::text(prompt));
    }
    for image in images {
        parts.push(UserContent::image_base64(
            STANDARD.encode(&image.data),
            media_type(&image.media_type),
            None,
        ));
    }
    let content = OneOrMany::many(parts)
        .map_err(|e| BackendFailure::Provider(format!("empty request: {e}")))?;
    Ok(RigMessage::User { content })
}

/// Backend that calls Google Gemini through the rig [`gemini::Client`].
/// A fresh agent is built per request so each call carries its own preamble
/// and sampling parameters.
#[derive(Clone)]
pub struct GeminiBackend {
    client: Option<gemini::Client>,
    model: String,
}

impl GeminiBackend {
    /// A missing key is not fatal at startup: every call then reports a
    /// configuration error that the UI shows as a persistent notice.
    pub fn new(api_key: Option<&str>, model: &str) -> Result<Self, AppError> {
        let client = match api_key.map(str::trim).filter(|k| !k.is_empty()) {
            Some(key) => Some(
                gemini::Client::builder()
                    .api_key(key)
                    .build()
                    .map_err(|e| AppError::Unexpected(format!("Failed to build Gemini client: {e}")))?,
            ),
            None => {
                warn!("GEMINI_API_KEY is not set; chat requests will fail until it is configured");
                None
            }
        };
        Ok(Self { client, model: model.to_string() })
    }
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    async fn generate(&self, request: GenerationRequest) -> Result<String, BackendFailure> {
        let client = self.client.as_ref().ok_or(BackendFailure::MissingCredential)?;

        let params = request.params;
        let agent = client
            .agent(self.model.as_str())
            .preamble(request.preamble)
            .temperature(params.temperature)
            .max_tokens(u64::from(params.max_output_tokens))
            .additional_params(serde_json::json!({
                "generationConfig": {
                    "topK": params.top_k,
                    "topP": params.top_p,
                }
            }))
            .build();

        let message = to_rig_message(&request.prompt, &request.images)?;

        agent.prompt(message).await.map_err(|e| {
            error!("Gemini inference failed with model {}: {e}", self.model);
            BackendFailure::Provider(e.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{GenerationOverrides, Mode};

    #[tokio::test]
    async fn missing_key_reports_missing_credential() {
        let backend = GeminiBackend::new(None, DEFAULT_MODEL).unwrap();
        let request = GenerationRequest {
            preamble: Mode::Chat.preamble(),
            prompt: "hello".into(),
            images: vec![],
            params: GenerationOverrides::default().apply_to(Mode::Chat.defaults()),
        };

        let failure = backend.generate(request).await.unwrap_err();
        assert_eq!(failure, BackendFailure::MissingCredential);
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let backend = GeminiBackend::new(Some("   "), DEFAULT_MODEL).unwrap();
        assert!(backend.client.is_none());
    }

    #[test]
    fn image_only_message_has_no_text_part() {
        let image = Attachment::new("a.gif".into(), "image/gif".into(), vec![1, 2, 3]);
        let message = to_rig_message("", &[image]).unwrap();
        match message {
            RigMessage::User { content, .. } => assert_eq!(content.len(), 1),
            _ => panic!("expected a user message"),
        }
    }

    #[test]
    fn known_media_types_map() {
        assert!(media_type("image/png").is_some());
        assert!(media_type("image/jpeg").is_some());
        assert!(media_type("application/pdf").is_none());
    }
}
