#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use benchyard_api::auth::jwt::{generate_token, JwtConfig};
use benchyard_api::config::ServerConfig;
use benchyard_api::router::build_app_router;
use benchyard_api::state::AppState;
use benchyard_core::roles::{ROLE_ADMIN, ROLE_PRIVILEGED};
use benchyard_github::{CommentNotifier, GitHubApi, GitHubConfig};
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

const TEST_JWT_SECRET: &str = "test-secret-that-is-long-enough-for-hmac";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
        },
    }
}

/// Build the application router with an unconfigured GitHub client.
pub fn build_test_app(pool: PgPool) -> Router {
    build_app(
        pool,
        GitHubConfig {
            token: None,
            api_url: "http://127.0.0.1:9".to_string(),
        },
    )
}

/// Build the application router with GitHub calls sent to `api_url`.
pub fn build_test_app_with_github(pool: PgPool, api_url: &str) -> Router {
    build_app(
        pool,
        GitHubConfig {
            token: Some("gh-test-token".to_string()),
            api_url: api_url.to_string(),
        },
    )
}

fn build_app(pool: PgPool, github: GitHubConfig) -> Router {
    let config = test_config();
    let notifier = Arc::new(CommentNotifier::new(pool.clone(), GitHubApi::new(github)));

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        notifier,
    };

    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

pub fn token_with_role(role: &str) -> String {
    generate_token("test-suite", role, 600, &test_config().jwt).unwrap()
}

pub fn privileged_token() -> String {
    token_with_role(ROLE_PRIVILEGED)
}

pub fn admin_token() -> String {
    token_with_role(ROLE_ADMIN)
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {token}"))
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}
