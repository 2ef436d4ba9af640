use axum::extract::{Query, State};
use axum::Json;

use crate::errors::AppError;
use crate::models::{SetThemeRequest, Theme, ThemeQuery, ThemeView};
use crate::routes::AppState;

/// GET `/api/theme?client_id=`: stored choice (dark when never set) and its tokens
pub async fn get_theme_handler(
    Query(query): Query<ThemeQuery>,
    State(state): State<AppState>,
) -> Result<Json<ThemeView>, AppError> {
    Ok(Json(state.theme.get(&query.client_id).await?))
}

/// PUT `/api/theme`
pub async fn set_theme_handler(
    State(state): State<AppState>,
    Json(body): Json<SetThemeRequest>,
) -> Result<Json<ThemeView>, AppError> {
    let theme = Theme::try_from(body.theme.as_str())?;
    Ok(Json(state.theme.set(&body.client_id, theme).await?))
}

/// POST `/api/theme/toggle`
pub async fn toggle_theme_handler(
    State(state): State<AppState>,
    Json(body): Json<ThemeQuery>,
) -> Result<Json<ThemeView>, AppError> {
    Ok(Json(state.theme.toggle(&body.client_id).await?))
}
