use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};

use parley_core::{AuthGate, CredentialStore, MessageDirectory, NewAccount, TokenIssuer};
use parley_types::api::{Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};

use crate::error_status;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub credentials: CredentialStore,
    pub directory: MessageDirectory,
    pub gate: AuthGate<JwtIssuer>,
    pub jwt_secret: String,
}

/// Signs 30-day JWTs for the auth gate.
pub struct JwtIssuer {
    secret: String,
}

impl JwtIssuer {
    pub fn new(secret: String) -> Self {
        Self { secret }
    }
}

impl TokenIssuer for JwtIssuer {
    fn issue(&self, username: &str) -> anyhow::Result<String> {
        let claims = Claims {
            sub: username.to_string(),
            exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?;

        Ok(token)
    }
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    // Validate input
    if req.username.len() < 3 || req.username.len() > 32 {
        return Err(StatusCode::BAD_REQUEST);
    }
    if req.password.len() < 8 {
        return Err(StatusCode::BAD_REQUEST);
    }

    // Hashing is deliberately slow; run it off the async runtime
    let gate_state = state.clone();
    let (user, token) = tokio::task::spawn_blocking(move || {
        gate_state.gate.register(NewAccount {
            username: req.username,
            password: req.password,
            first_name: req.first_name,
            last_name: req.last_name,
            phone: req.phone,
        })
    })
    .await
    .map_err(|e| {
        tracing::error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(|e| error_status(&e))?;

    Ok((StatusCode::CREATED, Json(RegisterResponse { user, token })))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let gate_state = state.clone();
    let token = tokio::task::spawn_blocking(move || gate_state.gate.login(&req.username, &req.password))
        .await
        .map_err(|e| {
            tracing::error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| error_status(&e))?;

    Ok(Json(LoginResponse { token }))
}
