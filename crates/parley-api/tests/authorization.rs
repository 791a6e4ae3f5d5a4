//! Route-level access rules: message boxes belong to their subject user, a
//! message is visible only to its two endpoints, and only the recipient can
//! stamp the read receipt.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    middleware,
    routing::{get, post},
};
use tower::ServiceExt;

use argon2::Params;
use parley_api::auth::{AppState, AppStateInner, JwtIssuer};
use parley_api::messages;
use parley_api::middleware::require_auth;
use parley_core::{AuthGate, CredentialStore, MessageDirectory, NewAccount, TokenIssuer};
use parley_db::Database;

const TEST_SECRET: &str = "test-secret";

fn test_state() -> AppState {
    let db = Arc::new(Database::open_in_memory().unwrap());
    // Minimum cost keeps hashing fast in tests
    let credentials = CredentialStore::new(db.clone(), Params::new(8, 1, 1, None).unwrap());
    let directory = MessageDirectory::new(db);
    let gate = AuthGate::new(credentials.clone(), JwtIssuer::new(TEST_SECRET.into()));

    Arc::new(AppStateInner {
        credentials,
        directory,
        gate,
        jwt_secret: TEST_SECRET.into(),
    })
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/users/{username}/messages/from", get(messages::messages_from))
        .route("/users/{username}/messages/to", get(messages::messages_to))
        .route("/messages/{id}", get(messages::get_message))
        .route("/messages/{id}/read", post(messages::mark_read))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state)
}

fn register(state: &AppState, username: &str, first: &str, last: &str) {
    state
        .credentials
        .register(NewAccount {
            username: username.into(),
            password: "hunter2hunter2".into(),
            first_name: first.into(),
            last_name: last.into(),
            phone: "555-0100".into(),
        })
        .unwrap();
}

fn token_for(username: &str) -> String {
    JwtIssuer::new(TEST_SECRET.into()).issue(username).unwrap()
}

fn get_as(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

fn post_as(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn message_boxes_are_private_to_their_subject() {
    let state = test_state();
    register(&state, "alice", "Alice", "Ames");
    register(&state, "bob", "Bob", "Burke");
    let app = router(state);

    let resp = app
        .clone()
        .oneshot(get_as("/users/bob/messages/from", &token_for("alice")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = app
        .clone()
        .oneshot(get_as("/users/bob/messages/to", &token_for("alice")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = app
        .oneshot(get_as("/users/bob/messages/from", &token_for("bob")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn message_is_visible_only_to_its_endpoints() {
    let state = test_state();
    register(&state, "alice", "Alice", "Ames");
    register(&state, "bob", "Bob", "Burke");
    register(&state, "carol", "Carol", "Cole");
    let posted = state.directory.send("alice", "bob", "hi").unwrap();
    let app = router(state);

    let uri = format!("/messages/{}", posted.id);

    let resp = app
        .clone()
        .oneshot(get_as(&uri, &token_for("carol")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = app
        .clone()
        .oneshot(get_as(&uri, &token_for("alice")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app.oneshot(get_as(&uri, &token_for("bob"))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn only_the_recipient_may_mark_read() {
    let state = test_state();
    register(&state, "alice", "Alice", "Ames");
    register(&state, "bob", "Bob", "Burke");
    let posted = state.directory.send("alice", "bob", "hi").unwrap();
    let app = router(state.clone());

    let uri = format!("/messages/{}/read", posted.id);

    let resp = app
        .clone()
        .oneshot(post_as(&uri, &token_for("alice")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert!(state.directory.get(posted.id).unwrap().read_at.is_none());

    let resp = app.oneshot(post_as(&uri, &token_for("bob"))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(state.directory.get(posted.id).unwrap().read_at.is_some());
}

#[tokio::test]
async fn missing_or_garbage_token_is_unauthorized() {
    let state = test_state();
    register(&state, "alice", "Alice", "Ames");
    let app = router(state);

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/users/alice/messages/from")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app
        .oneshot(get_as("/users/alice/messages/from", "not-a-jwt"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
