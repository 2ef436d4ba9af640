pub mod api_routes;
pub mod theme_routes;

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::service::chat_service::ChatService;
use crate::service::theme_service::ThemeStore;

use self::api_routes::*;
use self::theme_routes::{get_theme_handler, set_theme_handler, toggle_theme_handler};

#[derive(Clone)]
pub struct AppState {
    pub chat: ChatService,
    pub theme: ThemeStore,
}

/// Room for the JSON envelope around the base64 payload.
const ATTACHMENT_ENVELOPE_BYTES: usize = 16 * 1024;

/// Largest request body that can carry an attachment of `max_bytes`.
fn attachment_body_limit(max_bytes: usize) -> usize {
    max_bytes.div_ceil(3) * 4 + ATTACHMENT_ENVELOPE_BYTES
}

pub fn router(state: AppState) -> Router {
    let attachment_limit = attachment_body_limit(state.chat.limits().max_attachment_bytes);

    Router::new()
        .route("/api/modes", get(list_modes_handler))
        // Session lifecycle
        .route("/api/sessions", post(open_session_handler))
        .route(
            "/api/sessions/{id}",
            get(get_session_handler).delete(close_session_handler),
        )
        // Staging and settings
        .route("/api/sessions/{id}/draft", put(set_draft_handler))
        .route(
            "/api/sessions/{id}/attachments",
            post(stage_attachment_handler).layer(DefaultBodyLimit::max(attachment_limit)),
        )
        .route(
            "/api/sessions/{id}/attachments/{attachment_id}",
            get(get_attachment_handler).delete(unstage_attachment_handler),
        )
        .route("/api/sessions/{id}/mode", put(set_mode_handler))
        .route("/api/sessions/{id}/settings", put(set_settings_handler))
        // Request cycle and log editing
        .route("/api/sessions/{id}/submit", post(submit_handler))
        .route("/api/sessions/{id}/undo", post(undo_handler))
        .route("/api/sessions/{id}/redo", post(redo_handler))
        .route("/api/sessions/{id}/clear", post(clear_handler))
        .route("/api/sessions/{id}/saved", delete(clear_saved_handler))
        .route("/api/sessions/{id}/messages/{message_id}", put(edit_message_handler))
        .route(
            "/api/sessions/{id}/messages/{message_id}/improve",
            post(improve_message_handler),
        )
        .route("/api/sessions/{id}/messages/{message_id}/like", post(like_handler))
        .route("/api/sessions/{id}/messages/{message_id}/pin", post(pin_handler))
        .route("/api/sessions/{id}/messages/{message_id}/save", post(save_handler))
        // Theme
        .route("/api/theme", get(get_theme_handler).put(set_theme_handler))
        .route("/api/theme/toggle", post(toggle_theme_handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use reqwest::StatusCode;
    use serde_json::{json, Value};

    use super::*;
    use crate::agent::testing::ScriptedBackend;
    use crate::agent::Gateway;
    use crate::db::chat_history_repository::ChatHistoryRepository;
    use crate::db::kv_store::MemoryKeyValueStore;
    use crate::db::theme_repository::ThemeRepository;
    use crate::session::SessionLimits;

    /// Serves the full router on an ephemeral port and returns its base URL.
    async fn serve(replies: Vec<&str>, limits: SessionLimits) -> String {
        let store = Arc::new(MemoryKeyValueStore::new());
        let backend = ScriptedBackend::new(replies.into_iter().map(|r| Ok(r.to_string())).collect());
        let chat = ChatService::new(
            ChatHistoryRepository::new(store.clone()),
            Gateway::new(backend),
            limits,
        );
        let theme = ThemeStore::new(ThemeRepository::new(store));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(AppState { chat, theme })).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn open_session(client: &reqwest::Client, base: &str) -> String {
        let resp = client
            .post(format!("{base}/api/sessions"))
            .json(&json!({ "client_id": "client-1" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let view: Value = resp.json().await.unwrap();
        view["id"].as_str().unwrap().to_string()
    }

    fn attachment(bytes: usize) -> Value {
        json!({
            "name": "shot.png",
            "media_type": "image/png",
            "data": STANDARD.encode(vec![7u8; bytes]),
        })
    }

    #[test]
    fn body_limit_covers_base64_overhead() {
        let max = 4 * 1024 * 1024;
        assert!(attachment_body_limit(max) > STANDARD.encode(vec![0u8; max]).len());
    }

    #[tokio::test]
    async fn open_submit_and_close_over_http() {
        let base = serve(vec!["Here is your component."], SessionLimits::default()).await;
        let client = reqwest::Client::new();
        let id = open_session(&client, &base).await;

        let resp = client
            .post(format!("{base}/api/sessions/{id}/submit"))
            .json(&json!({ "draft": "Generate a React component" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let view: Value = resp.json().await.unwrap();
        assert_eq!(view["status"], "idle");
        assert_eq!(view["messages"][0]["role"], "user");
        assert_eq!(view["messages"][1]["content"], "Here is your component.");

        let resp = client.delete(format!("{base}/api/sessions/{id}")).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let resp = client.get(format!("{base}/api/sessions/{id}")).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = resp.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().contains(&id));
    }

    #[tokio::test]
    async fn empty_submit_is_a_json_bad_request() {
        let base = serve(vec![], SessionLimits::default()).await;
        let client = reqwest::Client::new();
        let id = open_session(&client, &base).await;

        let resp = client
            .post(format!("{base}/api/sessions/{id}/submit"))
            .json(&json!({ "draft": "   " }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = resp.json().await.unwrap();
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn three_mib_image_is_staged() {
        let base = serve(vec![], SessionLimits::default()).await;
        let client = reqwest::Client::new();
        let id = open_session(&client, &base).await;

        let resp = client
            .post(format!("{base}/api/sessions/{id}/attachments"))
            .json(&attachment(3 * 1024 * 1024))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let view: Value = resp.json().await.unwrap();
        assert_eq!(view["staged"][0]["size"], 3 * 1024 * 1024);
    }

    #[tokio::test]
    async fn oversized_attachments_get_json_errors() {
        let limits = SessionLimits { max_attachment_bytes: 1024, ..SessionLimits::default() };
        let base = serve(vec![], limits).await;
        let client = reqwest::Client::new();
        let id = open_session(&client, &base).await;

        // Fits the body limit, refused by the session.
        let resp = client
            .post(format!("{base}/api/sessions/{id}/attachments"))
            .json(&attachment(2048))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = resp.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().contains("shot.png"));

        // Over the body limit itself.
        let resp = client
            .post(format!("{base}/api/sessions/{id}/attachments"))
            .json(&attachment(24 * 1024))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let body: Value = resp.json().await.unwrap();
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn theme_toggles_per_client() {
        let base = serve(vec![], SessionLimits::default()).await;
        let client = reqwest::Client::new();

        let get_theme = |client_id: &'static str| {
            client
                .get(format!("{base}/api/theme"))
                .query(&[("client_id", client_id)])
                .send()
        };

        let view: Value = get_theme("client-1").await.unwrap().json().await.unwrap();
        assert_eq!(view["theme"], "dark");

        let resp = client
            .post(format!("{base}/api/theme/toggle"))
            .json(&json!({ "client_id": "client-1" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let view: Value = resp.json().await.unwrap();
        assert_eq!(view["theme"], "light");
        assert_eq!(view["tokens"]["background"], "255, 255, 255");

        let view: Value = get_theme("client-1").await.unwrap().json().await.unwrap();
        assert_eq!(view["theme"], "light");
        let view: Value = get_theme("client-2").await.unwrap().json().await.unwrap();
        assert_eq!(view["theme"], "dark");

        let resp = get_theme("").await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
