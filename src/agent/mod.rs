pub mod gemini;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::errors::{AppError, GatewayError};
use crate::models::Attachment;

pub use gemini::GeminiBackend;

const CODE_PREAMBLE: &str = "You are an expert programmer. \
                             Please provide code and explanations for the following request. \
                             Use fenced code blocks tagged with their language.";
const CHAT_PREAMBLE: &str = "You are Sarux AI, a friendly and helpful assistant. \
                             Answer conversationally and concisely. \
                             If you don't know something, say so.";
const CREATIVE_PREAMBLE: &str = "You are Sarux AI in creative mode. \
                                 Be imaginative and expressive, offer original ideas and vivid wording.";
const PRECISE_PREAMBLE: &str = "You are Sarux AI in precise mode. \
                                Answer exactly what was asked, tersely and factually, without embellishment.";
const BALANCED_PREAMBLE: &str = "You are Sarux AI. \
                                 Balance depth with brevity and use markdown where it helps readability.";
const EXPERT_PREAMBLE: &str = "You are a senior domain expert. \
                               Give thorough, well-structured answers, state assumptions and trade-offs.";

const IMPROVE_INSTRUCTION: &str = "Rewrite the following message so it is clearer and more precise \
                                   while keeping its meaning and language. \
                                   Reply with the rewritten message only.";

/// Response style preset. Each mode owns a preamble and default sampling parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Code,
    Chat,
    Creative,
    Precise,
    Balanced,
    Expert,
}

impl Mode {
    pub const ALL: [Mode; 6] = [
        Mode::Code,
        Mode::Chat,
        Mode::Creative,
        Mode::Precise,
        Mode::Balanced,
        Mode::Expert,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Code => "code",
            Mode::Chat => "chat",
            Mode::Creative => "creative",
            Mode::Precise => "precise",
            Mode::Balanced => "balanced",
            Mode::Expert => "expert",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Mode::Code => "Code",
            Mode::Chat => "Chat",
            Mode::Creative => "Creative",
            Mode::Precise => "Precise",
            Mode::Balanced => "Balanced",
            Mode::Expert => "Expert",
        }
    }

    pub fn preamble(&self) -> &'static str {
        match self {
            Mode::Code => CODE_PREAMBLE,
            Mode::Chat => CHAT_PREAMBLE,
            Mode::Creative => CREATIVE_PREAMBLE,
            Mode::Precise => PRECISE_PREAMBLE,
            Mode::Balanced => BALANCED_PREAMBLE,
            Mode::Expert => EXPERT_PREAMBLE,
        }
    }

    pub fn defaults(&self) -> GenerationParams {
        let (temperature, top_k, top_p, max_output_tokens) = match self {
            Mode::Code => (0.2, 40, 0.95, 2048),
            Mode::Chat => (0.7, 40, 0.95, 1024),
            Mode::Creative => (0.9, 64, 0.98, 2048),
            Mode::Precise => (0.1, 16, 0.80, 1024),
            Mode::Balanced => (0.5, 32, 0.90, 1536),
            Mode::Expert => (0.3, 40, 0.90, 4096),
        };
        GenerationParams { temperature, top_k, top_p, max_output_tokens }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Mode {
    type Error = AppError;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Mode::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AppError::UnknownVariant {
                field_name: "mode".to_string(),
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub temperature: f64,
    pub top_k: u32,
    pub top_p: f64,
    pub max_output_tokens: u32,
}

/// Partial parameters set from the settings panel; `None` keeps the mode default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationOverrides {
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub top_k: Option<u32>,
    #[serde(default)]
    pub top_p: Option<f64>,
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
}

pub const MAX_OUTPUT_TOKENS_LIMIT: u32 = 8192;

impl GenerationOverrides {
    pub fn validate(&self) -> Result<(), AppError> {
        let invalid = |name: &str, reason: &str| AppError::InvalidSetting {
            name: name.to_string(),
            reason: reason.to_string(),
        };
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(invalid("temperature", "must be between 0 and 2"));
            }
        }
        if let Some(p) = self.top_p {
            if !(0.0..=1.0).contains(&p) {
                return Err(invalid("top_p", "must be between 0 and 1"));
            }
        }
        if self.top_k == Some(0) {
            return Err(invalid("top_k", "must be at least 1"));
        }
        if let Some(m) = self.max_output_tokens {
            if m == 0 || m > MAX_OUTPUT_TOKENS_LIMIT {
                return Err(invalid("max_output_tokens", "must be between 1 and 8192"));
            }
        }
        Ok(())
    }

    pub fn apply_to(&self, defaults: GenerationParams) -> GenerationParams {
        GenerationParams {
            temperature: self.temperature.unwrap_or(defaults.temperature),
            top_k: self.top_k.unwrap_or(defaults.top_k),
            top_p: self.top_p.unwrap_or(defaults.top_p),
            max_output_tokens: self.max_output_tokens.unwrap_or(defaults.max_output_tokens),
        }
    }
}

/// Fully shaped request handed to a backend.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub preamble: &'static str,
    pub prompt: String,
    pub images: Vec<Attachment>,
    pub params: GenerationParams,
}

/// Raw failure reported by a backend before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendFailure {
    MissingCredential,
    Provider(String),
}

/// The one piece of code that knows how to reach the generation service.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<String, BackendFailure>;
}

/// Stateless front door to the generation service: shapes the request per
/// mode, performs exactly one backend call and classifies the outcome.
#[derive(Clone)]
pub struct Gateway {
    backend: Arc<dyn GenerationBackend>,
}

impl Gateway {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self { backend }
    }

    pub async fn generate(
        &self,
        prompt: &str,
        mode: Mode,
        overrides: &GenerationOverrides,
        images: &[Attachment],
    ) -> Result<String, GatewayError> {
        if prompt.trim().is_empty() && images.is_empty() {
            return Err(GatewayError::EmptyPrompt);
        }

        let request = GenerationRequest {
            preamble: mode.preamble(),
            prompt: prompt.to_string(),
            images: images.to_vec(),
            params: overrides.apply_to(mode.defaults()),
        };
        debug!(
            "Gateway call: mode={mode}, images={}, params={:?}",
            request.images.len(),
            request.params
        );

        match self.backend.generate(request).await {
            Ok(text) if text.trim().is_empty() => Err(GatewayError::EmptyResponse),
            Ok(text) => Ok(text),
            Err(failure) => {
                let err = classify(failure);
                error!("Gateway call failed in {mode} mode: {err}");
                Err(err)
            }
        }
    }

    /// Secondary call used to rewrite a user message for clarity.
    pub async fn improve(&self, content: &str) -> Result<String, GatewayError> {
        let prompt = format!("{IMPROVE_INSTRUCTION}\n\n{content}");
        let text = self
            .generate(&prompt, Mode::Precise, &GenerationOverrides::default(), &[])
            .await?;
        Ok(text.trim().to_string())
    }
}

fn classify(failure: BackendFailure) -> GatewayError {
    let message = match failure {
        BackendFailure::MissingCredential => {
            return GatewayError::Configuration { detail: "missing API key".to_string() };
        }
        BackendFailure::Provider(message) => message,
    };
    let lower = message.to_lowercase();

    if lower.contains("api key")
        || lower.contains("api_key")
        || lower.contains("permission_denied")
        || lower.contains("unauthenticated")
        || lower.contains("401")
        || lower.contains("403")
    {
        GatewayError::Configuration { detail: "invalid API key".to_string() }
    } else if lower.contains("quota")
        || lower.contains("resource_exhausted")
        || lower.contains("rate limit")
        || lower.contains("429")
    {
        GatewayError::RateLimit
    } else if lower.contains("empty response")
        || lower.contains("no content")
        || lower.contains("no candidates")
    {
        GatewayError::EmptyResponse
    } else {
        GatewayError::Unknown { message }
    }
}
