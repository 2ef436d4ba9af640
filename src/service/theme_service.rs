use tracing::debug;

use crate::db::theme_repository::ThemeRepository;
use crate::errors::AppError;
use crate::models::{Theme, ThemeTokens, ThemeView};
use crate::service::chat_service::validate_client_id;

/// Theme → style variables, resolved once and applied at the render root.
pub fn tokens_for(theme: Theme) -> ThemeTokens {
    match theme {
        Theme::Dark => ThemeTokens {
            color_scheme: "dark",
            background: "10, 15, 45",
            text: "255, 255, 255",
            text_secondary: "209, 213, 219",
        },
        Theme::Light => ThemeTokens {
            color_scheme: "light",
            background: "255, 255, 255",
            text: "17, 24, 39",
            text_secondary: "107, 114, 128",
        },
    }
}

fn view(theme: Theme) -> ThemeView {
    ThemeView { theme, tokens: tokens_for(theme) }
}

/// Per-client dark/light choice with durable persistence. Clients that never
/// chose get the dark theme.
#[derive(Clone)]
pub struct ThemeStore {
    repo: ThemeRepository,
}

impl ThemeStore {
    pub fn new(repo: ThemeRepository) -> Self {
        Self { repo }
    }

    pub async fn get(&self, client_id: &str) -> Result<ThemeView, AppError> {
        validate_client_id(client_id)?;
        let theme = self.repo.find(client_id).await?.unwrap_or_default();
        Ok(view(theme))
    }

    pub async fn set(&self, client_id: &str, theme: Theme) -> Result<ThemeView, AppError> {
        validate_client_id(client_id)?;
        self.repo.save(client_id, theme).await?;
        debug!("Client {client_id} switched to the {} theme", theme.as_str());
        Ok(view(theme))
    }

    pub async fn toggle(&self, client_id: &str) -> Result<ThemeView, AppError> {
        validate_client_id(client_id)?;
        let current = self.repo.find(client_id).await?.unwrap_or_default();
        self.set(client_id, current.toggled()).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::db::kv_store::{KeyValueStore, MemoryKeyValueStore};

    fn store_with(kv: Arc<MemoryKeyValueStore>) -> ThemeStore {
        ThemeStore::new(ThemeRepository::new(kv))
    }

    #[tokio::test]
    async fn defaults_to_dark_and_toggles_persistently() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let store = store_with(kv.clone());

        assert_eq!(store.get("c1").await.unwrap().theme, Theme::Dark);

        let toggled = store.toggle("c1").await.unwrap();
        assert_eq!(toggled.theme, Theme::Light);
        assert_eq!(toggled.tokens, tokens_for(Theme::Light));

        // A fresh store over the same storage sees the persisted choice.
        let reopened = store_with(kv);
        assert_eq!(reopened.get("c1").await.unwrap().theme, Theme::Light);
        assert_eq!(reopened.get("c2").await.unwrap().theme, Theme::Dark);
    }

    #[tokio::test]
    async fn unreadable_value_falls_back_to_default() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        kv.put("theme:c1", "sepia").await.unwrap();
        assert_eq!(store_with(kv).get("c1").await.unwrap().theme, Theme::Dark);
    }

    #[tokio::test]
    async fn malformed_client_ids_write_nothing() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let store = store_with(kv.clone());

        let long = "x".repeat(65);
        for client_id in ["", "../etc", long.as_str()] {
            assert!(store.get(client_id).await.unwrap_err().is_validation());
            assert!(store.toggle(client_id).await.unwrap_err().is_validation());
            assert!(store.set(client_id, Theme::Light).await.unwrap_err().is_validation());
        }
        assert_eq!(kv.get("theme:").await.unwrap(), None);
    }

    #[test]
    fn tokens_differ_per_theme() {
        assert_eq!(tokens_for(Theme::Dark).color_scheme, "dark");
        assert_eq!(tokens_for(Theme::Light).text, "17, 24, 39");
    }
}
