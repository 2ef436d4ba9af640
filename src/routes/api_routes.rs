use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::agent::GenerationOverrides;
use crate::errors::AppError;
use crate::models::{
    AttachmentRequest, DraftRequest, EditRequest, MessageId, ModeRequest, ModeView,
    OpenSessionRequest, SessionView, SubmitRequest,
};
use crate::routes::AppState;
use crate::service::chat_service;

type ViewResult = Result<Json<SessionView>, AppError>;

/// GET `/api/modes`: response modes with their default sampling parameters
pub async fn list_modes_handler() -> Json<Vec<ModeView>> {
    Json(chat_service::modes())
}

/// POST `/api/sessions`: widget mounted: open a session with restored history
pub async fn open_session_handler(
    State(state): State<AppState>,
    Json(body): Json<OpenSessionRequest>,
) -> Result<(StatusCode, Json<SessionView>), AppError> {
    let view = state.chat.open_session(&body.client_id).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET `/api/sessions/{id}`
pub async fn get_session_handler(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> ViewResult {
    Ok(Json(state.chat.view(&id).await?))
}

/// DELETE `/api/sessions/{id}`: widget closed
pub async fn close_session_handler(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    state.chat.close_session(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT `/api/sessions/{id}/draft`
pub async fn set_draft_handler(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<DraftRequest>,
) -> ViewResult {
    Ok(Json(state.chat.set_draft(&id, body.text).await?))
}

/// POST `/api/sessions/{id}/attachments`: stage a base64 image
pub async fn stage_attachment_handler(
    Path(id): Path<String>,
    State(state): State<AppState>,
    body: Result<Json<AttachmentRequest>, JsonRejection>,
) -> ViewResult {
    let Json(body) = body?;
    Ok(Json(state.chat.stage_attachment(&id, body).await?))
}

/// DELETE `/api/sessions/{id}/attachments/{attachment_id}`
pub async fn unstage_attachment_handler(
    Path((id, attachment_id)): Path<(String, String)>,
    State(state): State<AppState>,
) -> ViewResult {
    Ok(Json(state.chat.unstage_attachment(&id, &attachment_id).await?))
}

/// GET `/api/sessions/{id}/attachments/{attachment_id}`: raw image bytes
pub async fn get_attachment_handler(
    Path((id, attachment_id)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let (media_type, bytes) = state.chat.attachment(&id, &attachment_id).await?;
    Ok(([(header::CONTENT_TYPE, media_type)], bytes).into_response())
}

/// PUT `/api/sessions/{id}/mode`
pub async fn set_mode_handler(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<ModeRequest>,
) -> ViewResult {
    Ok(Json(state.chat.set_mode(&id, &body.mode).await?))
}

/// PUT `/api/sessions/{id}/settings`: sampling overrides from the settings panel
pub async fn set_settings_handler(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<GenerationOverrides>,
) -> ViewResult {
    Ok(Json(state.chat.set_overrides(&id, body).await?))
}

/// POST `/api/sessions/{id}/submit`: one full request/response cycle
pub async fn submit_handler(
    Path(id): Path<String>,
    State(state): State<AppState>,
    body: Option<Json<SubmitRequest>>,
) -> ViewResult {
    let draft = body.and_then(|Json(b)| b.draft);
    Ok(Json(state.chat.submit(&id, draft).await?))
}

/// POST `/api/sessions/{id}/undo`
pub async fn undo_handler(Path(id): Path<String>, State(state): State<AppState>) -> ViewResult {
    Ok(Json(state.chat.undo(&id).await?))
}

/// POST `/api/sessions/{id}/redo`
pub async fn redo_handler(Path(id): Path<String>, State(state): State<AppState>) -> ViewResult {
    Ok(Json(state.chat.redo(&id).await?))
}

/// POST `/api/sessions/{id}/clear`
pub async fn clear_handler(Path(id): Path<String>, State(state): State<AppState>) -> ViewResult {
    Ok(Json(state.chat.clear(&id).await?))
}

/// DELETE `/api/sessions/{id}/saved`
pub async fn clear_saved_handler(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> ViewResult {
    Ok(Json(state.chat.clear_saved(&id).await?))
}

/// PUT `/api/sessions/{id}/messages/{message_id}`: manual edit of a user message
pub async fn edit_message_handler(
    Path((id, message_id)): Path<(String, MessageId)>,
    State(state): State<AppState>,
    Json(body): Json<EditRequest>,
) -> ViewResult {
    Ok(Json(state.chat.edit_message(&id, message_id, &body.content).await?))
}

/// POST `/api/sessions/{id}/messages/{message_id}/improve`
pub async fn improve_message_handler(
    Path((id, message_id)): Path<(String, MessageId)>,
    State(state): State<AppState>,
) -> ViewResult {
    Ok(Json(state.chat.improve_message(&id, message_id).await?))
}

/// POST `/api/sessions/{id}/messages/{message_id}/like`
pub async fn like_handler(
    Path((id, message_id)): Path<(String, MessageId)>,
    State(state): State<AppState>,
) -> ViewResult {
    Ok(Json(state.chat.toggle_like(&id, message_id).await?))
}

/// POST `/api/sessions/{id}/messages/{message_id}/pin`
pub async fn pin_handler(
    Path((id, message_id)): Path<(String, MessageId)>,
    State(state): State<AppState>,
) -> ViewResult {
    Ok(Json(state.chat.toggle_pin(&id, message_id).await?))
}

/// POST `/api/sessions/{id}/messages/{message_id}/save`
pub async fn save_handler(
    Path((id, message_id)): Path<(String, MessageId)>,
    State(state): State<AppState>,
) -> ViewResult {
    Ok(Json(state.chat.toggle_save(&id, message_id).await?))
}
