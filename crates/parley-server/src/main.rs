use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use parley_api::auth::{self, AppState, AppStateInner, JwtIssuer};
use parley_api::messages;
use parley_api::middleware::require_auth;
use parley_api::users;
use parley_core::{AuthGate, CredentialStore, MessageDirectory};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parley=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("PARLEY_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("PARLEY_DB_PATH").unwrap_or_else(|_| "parley.db".into());
    let host = std::env::var("PARLEY_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("PARLEY_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let hash_cost = hash_cost_from_env()?;

    // Init database
    let db = Arc::new(parley_db::Database::open(&PathBuf::from(&db_path))?);

    // Shared state
    let credentials = CredentialStore::new(db.clone(), hash_cost);
    let directory = MessageDirectory::new(db);
    let gate = AuthGate::new(credentials.clone(), JwtIssuer::new(jwt_secret.clone()));

    let app_state: AppState = Arc::new(AppStateInner {
        credentials,
        directory,
        gate,
        jwt_secret,
    });

    // Routes
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .with_state(app_state.clone());

    let protected_routes = Router::new()
        .route("/users", get(users::list_users))
        .route("/users/{username}", get(users::get_user))
        .route("/users/{username}/messages/from", get(messages::messages_from))
        .route("/users/{username}/messages/to", get(messages::messages_to))
        .route("/messages", post(messages::send_message))
        .route("/messages/{id}", get(messages::get_message))
        .route("/messages/{id}/read", post(messages::mark_read))
        .layer(middleware::from_fn_with_state(app_state.clone(), require_auth))
        .with_state(app_state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Parley server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Argon2 work factor from the environment, defaulting to the crate's
/// recommended parameters.
fn hash_cost_from_env() -> anyhow::Result<argon2::Params> {
    let m_cost: u32 = std::env::var("PARLEY_HASH_M_COST")
        .unwrap_or_else(|_| argon2::Params::DEFAULT_M_COST.to_string())
        .parse()?;
    let t_cost: u32 = std::env::var("PARLEY_HASH_T_COST")
        .unwrap_or_else(|_| argon2::Params::DEFAULT_T_COST.to_string())
        .parse()?;
    let p_cost: u32 = std::env::var("PARLEY_HASH_P_COST")
        .unwrap_or_else(|_| argon2::Params::DEFAULT_P_COST.to_string())
        .parse()?;

    argon2::Params::new(m_cost, t_cost, p_cost, None)
        .map_err(|e| anyhow::anyhow!("invalid hash cost parameters: {}", e))
}
