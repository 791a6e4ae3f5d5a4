use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use parley_types::api::Claims;

use crate::auth::AppState;
use crate::error_status;

pub async fn list_users(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let creds = state.credentials.clone();
    let users = tokio::task::spawn_blocking(move || creds.list())
        .await
        .map_err(|e| {
            tracing::error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| error_status(&e))?;

    Ok(Json(users))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let creds = state.credentials.clone();
    let user = tokio::task::spawn_blocking(move || creds.get(&username))
        .await
        .map_err(|e| {
            tracing::error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| error_status(&e))?;

    Ok(Json(user))
}
