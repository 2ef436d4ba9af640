use std::sync::Arc;

use tracing::warn;

use crate::db::kv_store::KeyValueStore;
use crate::errors::AppError;
use crate::models::Theme;

fn key(client_id: &str) -> String {
    format!("theme:{client_id}")
}

#[derive(Clone)]
pub struct ThemeRepository {
    store: Arc<dyn KeyValueStore>,
}

impl ThemeRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn find(&self, client_id: &str) -> Result<Option<Theme>, AppError> {
        let Some(raw) = self.store.get(&key(client_id)).await? else {
            return Ok(None);
        };
        match Theme::try_from(raw.as_str()) {
            Ok(theme) => Ok(Some(theme)),
            Err(e) => {
                warn!("Ignoring stored theme for client {client_id}: {e}");
                Ok(None)
            }
        }
    }

    pub async fn save(&self, client_id: &str, theme: Theme) -> Result<(), AppError> {
        self.store.put(&key(client_id), theme.as_str()).await
    }
}
