use std::time::Duration;

use crate::agent::gemini::DEFAULT_MODEL;
use crate::session::SessionLimits;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_SESSION_IDLE_SECS: u64 = 30 * 60;

/// Runtime configuration, read from the environment (a `.env` file is loaded
/// first when present). The Gemini credential only ever lives here.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub database_url: Option<String>,
    pub port: u16,
    pub cors_origin: Option<String>,
    pub limits: SessionLimits,
    /// Sessions untouched for this long are closed by the sweeper.
    pub session_idle_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = SessionLimits::default();

        Self {
            gemini_api_key: non_empty("GEMINI_API_KEY"),
            gemini_model: non_empty("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            database_url: non_empty("DATABASE_URL"),
            port: non_empty("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            cors_origin: non_empty("SARUX_CORS_ORIGIN"),
            limits: SessionLimits {
                max_attachment_bytes: non_empty("SARUX_MAX_ATTACHMENT_BYTES")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.max_attachment_bytes),
                ..defaults
            },
            session_idle_timeout: Duration::from_secs(
                non_empty("SARUX_SESSION_IDLE_SECS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_SESSION_IDLE_SECS),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config_from(&[]);
        assert_eq!(config.port, 8080);
        assert_eq!(config.gemini_model, DEFAULT_MODEL);
        assert!(config.gemini_api_key.is_none());
        assert!(config.database_url.is_none());
        assert_eq!(config.limits, SessionLimits::default());
        assert_eq!(config.session_idle_timeout, Duration::from_secs(1800));
    }

    #[test]
    fn values_are_read_and_blank_ones_ignored() {
        let config = config_from(&[
            ("GEMINI_API_KEY", "  "),
            ("GEMINI_MODEL", "gemini-1.5-flash"),
            ("PORT", "3000"),
            ("SARUX_MAX_ATTACHMENT_BYTES", "1024"),
            ("SARUX_SESSION_IDLE_SECS", "90"),
        ]);
        assert!(config.gemini_api_key.is_none());
        assert_eq!(config.gemini_model, "gemini-1.5-flash");
        assert_eq!(config.port, 3000);
        assert_eq!(config.limits.max_attachment_bytes, 1024);
        assert_eq!(config.session_idle_timeout, Duration::from_secs(90));
    }

    #[test]
    fn unparsable_port_falls_back() {
        assert_eq!(config_from(&[("PORT", "eighty")]).port, 8080);
    }
}
