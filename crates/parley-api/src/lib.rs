pub mod auth;
pub mod messages;
pub mod middleware;
pub mod users;

use axum::http::StatusCode;
use parley_core::StoreError;
use tracing::error;

/// HTTP status mapping for the core's typed failures. The core itself never
/// sees a status code.
pub(crate) fn error_status(err: &StoreError) -> StatusCode {
    match err {
        StoreError::Conflict => StatusCode::CONFLICT,
        StoreError::Authentication => StatusCode::UNAUTHORIZED,
        StoreError::NotFound => StatusCode::NOT_FOUND,
        StoreError::Integrity => StatusCode::BAD_REQUEST,
        StoreError::Forbidden => StatusCode::FORBIDDEN,
        StoreError::Internal(e) => {
            error!("internal error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
