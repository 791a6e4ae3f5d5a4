use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use parley_types::api::{Claims, SendMessageRequest};

use crate::auth::AppState;
use crate::error_status;

/// Message boxes are private: only the subject user may read their own
/// sent/received listings.
pub async fn messages_from(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    if claims.sub != username {
        return Err(StatusCode::FORBIDDEN);
    }

    let dir = state.directory.clone();
    let messages = tokio::task::spawn_blocking(move || dir.messages_from(&username))
        .await
        .map_err(|e| {
            tracing::error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| error_status(&e))?;

    Ok(Json(messages))
}

pub async fn messages_to(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    if claims.sub != username {
        return Err(StatusCode::FORBIDDEN);
    }

    let dir = state.directory.clone();
    let messages = tokio::task::spawn_blocking(move || dir.messages_to(&username))
        .await
        .map_err(|e| {
            tracing::error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| error_status(&e))?;

    Ok(Json(messages))
}

pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.body.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let dir = state.directory.clone();
    let posted = tokio::task::spawn_blocking(move || {
        dir.send(&claims.sub, &req.to_username, &req.body)
    })
    .await
    .map_err(|e| {
        tracing::error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(|e| error_status(&e))?;

    Ok((StatusCode::CREATED, Json(posted)))
}

/// A message is visible only to its two endpoints.
pub async fn get_message(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let dir = state.directory.clone();
    let record = tokio::task::spawn_blocking(move || dir.get(id))
        .await
        .map_err(|e| {
            tracing::error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| error_status(&e))?;

    if record.from_user.username != claims.sub && record.to_user.username != claims.sub {
        return Err(StatusCode::FORBIDDEN);
    }

    Ok(Json(record))
}

/// Only the recipient may stamp the read receipt; the directory enforces
/// ownership and the update itself in one call.
pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let dir = state.directory.clone();
    let read_at = tokio::task::spawn_blocking(move || dir.mark_read_as(id, &claims.sub))
        .await
        .map_err(|e| {
            tracing::error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| error_status(&e))?;

    Ok(Json(serde_json::json!({ "id": id, "read_at": read_at })))
}
