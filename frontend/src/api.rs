use gloo_net::http::{Request, Response};
use serde::de::DeserializeOwned;

use crate::models::{
    AttachmentRequest, ClientRequest, EditRequest, ErrorBody, GenerationOverrides, ModeInfo, ModeRequest,
    SessionView, SubmitRequest, ThemeView,
};

/// Base URL of the backend API server.
const API_BASE: &str = "http://localhost:8080";

/// URL the browser can load a sent or staged image from.
pub fn attachment_url(session_id: &str, attachment_id: &str) -> String {
    format!("{API_BASE}/api/sessions/{session_id}/attachments/{attachment_id}")
}

/// Turns a response into `T`, surfacing the backend's `{ "error": … }` text on failure.
async fn read<T: DeserializeOwned>(resp: Response) -> Result<T, String> {
    if !resp.ok() {
        return Err(match resp.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => format!("Server error: {}", resp.status()),
        });
    }

    resp.json::<T>()
        .await
        .map_err(|e| format!("Parse error: {e}"))
}

async fn post_empty(url: String) -> Result<SessionView, String> {
    let resp = Request::post(&url)
        .send()
        .await
        .map_err(|e| format!("Network error: {e}"))?;
    read(resp).await
}

pub async fn fetch_modes() -> Result<Vec<ModeInfo>, String> {
    let resp = Request::get(&format!("{API_BASE}/api/modes"))
        .send()
        .await
        .map_err(|e| format!("Network error: {e}"))?;
    read(resp).await
}

/// Opens a chat session; restored history comes back in the view.
pub async fn open_session(client_id: &str) -> Result<SessionView, String> {
    let resp = Request::post(&format!("{API_BASE}/api/sessions"))
        .json(&ClientRequest { client_id })
        .map_err(|e| format!("Serialize error: {e}"))?
        .send()
        .await
        .map_err(|e| format!("Network error: {e}"))?;
    read(resp).await
}

pub async fn close_session(session_id: &str) -> Result<(), String> {
    let resp = Request::delete(&format!("{API_BASE}/api/sessions/{session_id}"))
        .send()
        .await
        .map_err(|e| format!("Network error: {e}"))?;

    if !resp.ok() {
        return Err(format!("Server error: {}", resp.status()));
    }
    Ok(())
}

/// Submits the draft and waits for the whole request cycle.
pub async fn submit(session_id: &str, draft: String) -> Result<SessionView, String> {
    let resp = Request::post(&format!("{API_BASE}/api/sessions/{session_id}/submit"))
        .json(&SubmitRequest { draft })
        .map_err(|e| format!("Serialize error: {e}"))?
        .send()
        .await
        .map_err(|e| format!("Network error: {e}"))?;
    read(resp).await
}

/// Stages an image for the next submit; `data` is base64.
pub async fn stage_attachment(
    session_id: &str,
    name: &str,
    media_type: &str,
    data: String,
) -> Result<SessionView, String> {
    let resp = Request::post(&format!("{API_BASE}/api/sessions/{session_id}/attachments"))
        .json(&AttachmentRequest { name, media_type, data })
        .map_err(|e| format!("Serialize error: {e}"))?
        .send()
        .await
        .map_err(|e| format!("Network error: {e}"))?;
    read(resp).await
}

pub async fn unstage_attachment(
    session_id: &str,
    attachment_id: &str,
) -> Result<SessionView, String> {
    let resp = Request::delete(&format!(
        "{API_BASE}/api/sessions/{session_id}/attachments/{attachment_id}"
    ))
    .send()
    .await
    .map_err(|e| format!("Network error: {e}"))?;
    read(resp).await
}

pub async fn set_mode(session_id: &str, mode: &str) -> Result<SessionView, String> {
    let resp = Request::put(&format!("{API_BASE}/api/sessions/{session_id}/mode"))
        .json(&ModeRequest { mode })
        .map_err(|e| format!("Serialize error: {e}"))?
        .send()
        .await
        .map_err(|e| format!("Network error: {e}"))?;
    read(resp).await
}

pub async fn set_settings(
    session_id: &str,
    overrides: &GenerationOverrides,
) -> Result<SessionView, String> {
    let resp = Request::put(&format!("{API_BASE}/api/sessions/{session_id}/settings"))
        .json(overrides)
        .map_err(|e| format!("Serialize error: {e}"))?
        .send()
        .await
        .map_err(|e| format!("Network error: {e}"))?;
    read(resp).await
}

/// `undo`, `redo` or `clear`.
pub async fn session_action(session_id: &str, action: &str) -> Result<SessionView, String> {
    post_empty(format!("{API_BASE}/api/sessions/{session_id}/{action}")).await
}

/// `improve`, `like`, `pin` or `save` on a single message.
pub async fn message_action(
    session_id: &str,
    message_id: u64,
    action: &str,
) -> Result<SessionView, String> {
    post_empty(format!(
        "{API_BASE}/api/sessions/{session_id}/messages/{message_id}/{action}"
    ))
    .await
}

pub async fn edit_message(
    session_id: &str,
    message_id: u64,
    content: String,
) -> Result<SessionView, String> {
    let resp = Request::put(&format!(
        "{API_BASE}/api/sessions/{session_id}/messages/{message_id}"
    ))
    .json(&EditRequest { content })
    .map_err(|e| format!("Serialize error: {e}"))?
    .send()
    .await
    .map_err(|e| format!("Network error: {e}"))?;
    read(resp).await
}

pub async fn clear_saved(session_id: &str) -> Result<SessionView, String> {
    let resp = Request::delete(&format!("{API_BASE}/api/sessions/{session_id}/saved"))
        .send()
        .await
        .map_err(|e| format!("Network error: {e}"))?;
    read(resp).await
}

pub async fn fetch_theme(client_id: &str) -> Result<ThemeView, String> {
    let resp = Request::get(&format!("{API_BASE}/api/theme"))
        .query([("client_id", client_id)])
        .send()
        .await
        .map_err(|e| format!("Network error: {e}"))?;
    read(resp).await
}

pub async fn toggle_theme(client_id: &str) -> Result<ThemeView, String> {
    let resp = Request::post(&format!("{API_BASE}/api/theme/toggle"))
        .json(&ClientRequest { client_id })
        .map_err(|e| format!("Serialize error: {e}"))?
        .send()
        .await
        .map_err(|e| format!("Network error: {e}"))?;
    read(resp).await
}
