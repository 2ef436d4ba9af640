use std::sync::Arc;

use tracing::{error, warn};

use crate::db::kv_store::KeyValueStore;
use crate::errors::AppError;
use crate::models::ChatSnapshot;

fn key(client_id: &str) -> String {
    format!("chat:{client_id}")
}

/// Persisted message history and saved messages, one snapshot per client.
#[derive(Clone)]
pub struct ChatHistoryRepository {
    store: Arc<dyn KeyValueStore>,
}

impl ChatHistoryRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// A corrupt snapshot is discarded rather than blocking the widget.
    pub async fn load(&self, client_id: &str) -> Result<ChatSnapshot, AppError> {
        let Some(raw) = self.store.get(&key(client_id)).await? else {
            return Ok(ChatSnapshot::default());
        };
        match serde_json::from_str(&raw) {
            Ok(snapshot) => Ok(snapshot),
            Err(e) => {
                warn!("Discarding unreadable chat history for client {client_id}: {e}");
                Ok(ChatSnapshot::default())
            }
        }
    }

    pub async fn save(&self, client_id: &str, snapshot: &ChatSnapshot) -> Result<(), AppError> {
        let raw = serde_json::to_string(snapshot).map_err(|e| {
            error!("Failed to serialize chat history for client {client_id}: {e}");
            AppError::serialization("chat history", e)
        })?;
        self.store.put(&key(client_id), &raw).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::kv_store::MemoryKeyValueStore;
    use crate::models::{Delivery, Message};

    #[tokio::test]
    async fn snapshot_round_trips_per_client() {
        let store = Arc::new(MemoryKeyValueStore::new());
        let repo = ChatHistoryRepository::new(store);
        let snapshot = ChatSnapshot {
            messages: vec![
                Message::user(1, "hi".into(), vec![]),
                Message::assistant(2, "hello".into(), Delivery::Delivered),
            ],
            saved: vec![],
        };

        repo.save("alice", &snapshot).await.unwrap();

        assert_eq!(repo.load("alice").await.unwrap(), snapshot);
        assert_eq!(repo.load("bob").await.unwrap(), ChatSnapshot::default());
    }

    #[tokio::test]
    async fn corrupt_snapshot_loads_empty() {
        let store = Arc::new(MemoryKeyValueStore::new());
        store.put("chat:alice", "{not json").await.unwrap();
        let repo = ChatHistoryRepository::new(store);

        assert_eq!(repo.load("alice").await.unwrap(), ChatSnapshot::default());
    }
}
