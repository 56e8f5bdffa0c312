//! Integration tests for the HTTP surface.
//!
//! Drives the full router over in-memory stores: registration, verification,
//! cookie-based login and rotation, logout, the access guard and health checks.

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt; // For `oneshot` method
use ua_server::api::{AppState, cookies::CookieSettings, create_router};
use user_auth::auth::{CredentialHasher, SessionConfig};
use user_auth::cache::{EphemeralStore, MemoryStore};
use user_auth::db::{MemoryRefreshTokenRepository, MemoryUserRepository};
use user_auth::mail::{Delivery, LogNotifier, MailResult, Notifier, UnconfiguredNotifier};
use user_auth::token::TokenCodec;
use user_auth::{RegistrationManager, SessionManager};

const JWT_SECRET: &str = "server-test-secret-key-of-sufficient-length";
const HASH_KEY: &str = "server-test-hash-key";
const PASSWORD: &str = "secret123";

/// Accepts nothing
struct RefusingNotifier;

#[async_trait]
impl Notifier for RefusingNotifier {
    async fn send_verification_email(
        &self,
        _to: &str,
        _token: &str,
        _display_name: Option<&str>,
    ) -> MailResult<Delivery> {
        Ok(Delivery {
            success: false,
            message_id: None,
        })
    }
}

fn test_config() -> SessionConfig {
    SessionConfig {
        refresh_short_ttl_secs: 600,
        ..SessionConfig::default()
    }
}

fn create_test_app_with(notifier: Arc<dyn Notifier>) -> Router {
    let users = Arc::new(MemoryUserRepository::new());
    let refresh_tokens = Arc::new(MemoryRefreshTokenRepository::new());
    let cache: Arc<dyn EphemeralStore> = Arc::new(MemoryStore::new());
    let codec = Arc::new(TokenCodec::new(JWT_SECRET, 3600).unwrap());
    let hasher = Arc::new(CredentialHasher::new(HASH_KEY).unwrap());
    let config = test_config();

    let registration = Arc::new(RegistrationManager::new(
        users.clone(),
        cache.clone(),
        notifier,
        codec.clone(),
        hasher.clone(),
        config,
    ));
    let sessions = Arc::new(SessionManager::new(
        users,
        refresh_tokens,
        cache.clone(),
        codec,
        hasher,
        config,
    ));

    create_router(AppState {
        registration,
        sessions,
        cache,
        database: None,
        cookies: CookieSettings::default(),
        app_name: "user_auth_test".to_string(),
    })
}

fn create_test_app() -> Router {
    create_test_app_with(Arc::new(LogNotifier::new()))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<String>, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let cookies = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, cookies, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_with_cookie(uri: &str, cookie: Option<String>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

/// `name=value` pair of the `Set-Cookie` header for `name`
fn cookie_pair(cookies: &[String], name: &str) -> Option<String> {
    cookies
        .iter()
        .find(|c| c.starts_with(&format!("{name}=")))
        .and_then(|c| c.split(';').next())
        .map(str::to_string)
}

fn cookie_max_age(cookies: &[String], name: &str) -> Option<u64> {
    cookies
        .iter()
        .find(|c| c.starts_with(&format!("{name}=")))?
        .split(';')
        .find_map(|attr| attr.trim().strip_prefix("Max-Age="))
        .and_then(|v| v.parse().ok())
}

async fn register_and_verify(app: &Router, email: &str) {
    let (status, _, body) = send(
        app,
        post_json(
            "/api/v1/auth/register",
            json!({ "email": email, "password": PASSWORD, "display_name": "Tester" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let token = body["active_token"].as_str().unwrap().to_string();
    let (status, _, _) = send(
        app,
        post_json("/api/v1/auth/verify-email", json!({ "active_token": token })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

/// Returns the `refresh_token=...` cookie pair
async fn login(app: &Router, email: &str, stay_login: bool) -> String {
    let (status, cookies, _) = send(
        app,
        post_json(
            "/api/v1/auth/login",
            json!({ "email": email, "password": PASSWORD, "stay_login": stay_login }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    cookie_pair(&cookies, "refresh_token").unwrap()
}

// ============================================================================
// Health Check Tests
// ============================================================================

#[tokio::test]
async fn test_health_check_endpoint() {
    let app = create_test_app();
    let (status, _, body) = send(&app, get_with_cookie("/health", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["app"], "user_auth_test");
    assert!(body["version"].is_string());
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_readiness_reports_checks() {
    let app = create_test_app();
    let (status, _, body) = send(&app, get_with_cookie("/health/ready", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["checks"]["cache"]["ok"], true);
    assert_eq!(body["checks"]["database"]["ok"], true);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = create_test_app();
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "req-42")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "req-42");
}

// ============================================================================
// Registration Tests
// ============================================================================

#[tokio::test]
async fn test_register_returns_receipt() {
    let app = create_test_app();
    let (status, cookies, body) = send(
        &app,
        post_json(
            "/api/v1/auth/register",
            json!({ "email": "alice@example.com", "password": PASSWORD }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["email"], "alice@example.com");
    assert_eq!(body["email_sent"], true);
    assert!(body["active_token"].as_str().is_some_and(|t| !t.is_empty()));
    assert!(cookies.is_empty());
}

#[tokio::test]
async fn test_register_validation_errors() {
    let app = create_test_app();

    let (status, _, body) = send(
        &app,
        post_json(
            "/api/v1/auth/register",
            json!({ "email": "not-an-email", "password": PASSWORD }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VAL_001");

    let (status, _, body) = send(
        &app,
        post_json(
            "/api/v1/auth/register",
            json!({ "email": "bob@example.com", "password": "12345" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VAL_002");
}

#[tokio::test]
async fn test_register_existing_email_conflicts() {
    let app = create_test_app();
    register_and_verify(&app, "carol@example.com").await;

    let (status, _, body) = send(
        &app,
        post_json(
            "/api/v1/auth/register",
            json!({ "email": "carol@example.com", "password": PASSWORD }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "AUTH_001");
}

#[tokio::test]
async fn test_register_delivery_failure_is_bad_gateway() {
    let app = create_test_app_with(Arc::new(RefusingNotifier));
    let (status, _, body) = send(
        &app,
        post_json(
            "/api/v1/auth/register",
            json!({ "email": "dave@example.com", "password": PASSWORD }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "AUTH_008");
}

#[tokio::test]
async fn test_register_without_smtp_fails() {
    let app = create_test_app_with(Arc::new(UnconfiguredNotifier));
    let (status, _, body) = send(
        &app,
        post_json(
            "/api/v1/auth/register",
            json!({ "email": "dora@example.com", "password": PASSWORD }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "AUTH_008");
    assert!(body.get("active_token").is_none());
}

#[tokio::test]
async fn test_verify_email_returns_user_without_hash() {
    let app = create_test_app();
    let (_, _, body) = send(
        &app,
        post_json(
            "/api/v1/auth/register",
            json!({ "email": "erin@example.com", "password": PASSWORD, "displayName": "Erin" }),
        ),
    )
    .await;
    let token = body["active_token"].as_str().unwrap().to_string();

    let (status, _, body) = send(
        &app,
        post_json("/api/v1/auth/verify-email", json!({ "active_token": token })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "erin@example.com");
    assert_eq!(body["user"]["display_name"], "Erin");
    assert!(body["user"].get("password_hash").is_none());

    // The pending entry is consumed
    let (status, _, body) = send(
        &app,
        post_json("/api/v1/auth/verify-email", json!({ "active_token": token })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "AUTH_006");
}

#[tokio::test]
async fn test_verify_email_requires_token() {
    let app = create_test_app();
    let (status, _, body) = send(&app, post_json("/api/v1/auth/verify-email", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VAL_003");
}

// ============================================================================
// Session Tests
// ============================================================================

#[tokio::test]
async fn test_login_sets_only_refresh_cookie() {
    let app = create_test_app();
    register_and_verify(&app, "frank@example.com").await;

    let (status, cookies, body) = send(
        &app,
        post_json(
            "/api/v1/auth/login",
            json!({ "email": "frank@example.com", "password": PASSWORD }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(cookies.len(), 1);
    assert!(cookies[0].contains("HttpOnly"));
    assert!(cookies[0].contains("SameSite=Lax"));
    assert_eq!(cookie_max_age(&cookies, "refresh_token"), Some(600));
    assert_eq!(body["expires_in"]["refresh_token"], 600);
    assert_eq!(body["stay_login"], false);
    assert!(body.get("refresh_token").is_none());
}

#[tokio::test]
async fn test_login_stay_logged_in_uses_long_lifetime() {
    let app = create_test_app();
    register_and_verify(&app, "gina@example.com").await;

    let (status, cookies, body) = send(
        &app,
        post_json(
            "/api/v1/auth/login",
            json!({ "email": "gina@example.com", "password": PASSWORD, "stay_login": true }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(cookie_max_age(&cookies, "refresh_token"), Some(30 * 24 * 60 * 60));
    assert_eq!(body["stay_login"], true);
}

#[tokio::test]
async fn test_login_wrong_password_is_unauthorized() {
    let app = create_test_app();
    register_and_verify(&app, "hank@example.com").await;

    let (status, cookies, body) = send(
        &app,
        post_json(
            "/api/v1/auth/login",
            json!({ "email": "hank@example.com", "password": "wrong-password" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "AUTH_002");
    assert!(cookies.is_empty());

    let (status, _, body) = send(
        &app,
        post_json(
            "/api/v1/auth/login",
            json!({ "email": "nobody@example.com", "password": PASSWORD }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "AUTH_002");
}

#[tokio::test]
async fn test_access_token_rotates_short_session() {
    let app = create_test_app();
    register_and_verify(&app, "ivy@example.com").await;
    let refresh = login(&app, "ivy@example.com", false).await;

    let (status, cookies, body) = send(
        &app,
        get_with_cookie("/api/v1/auth/access-token", Some(refresh.clone())),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(cookie_max_age(&cookies, "access_token"), Some(15 * 60));
    assert_eq!(cookie_max_age(&cookies, "refresh_token"), Some(600));
    assert!(body["expires_in"].get("refresh_cache").is_none());

    let rotated = cookie_pair(&cookies, "refresh_token").unwrap();
    assert_ne!(rotated, refresh);
    assert_eq!(
        rotated,
        format!("refresh_token={}", body["refresh_token"].as_str().unwrap())
    );

    // The superseded token is refused
    let (status, _, body) = send(
        &app,
        get_with_cookie("/api/v1/auth/access-token", Some(refresh)),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "AUTH_004");

    let (status, _, _) = send(
        &app,
        get_with_cookie("/api/v1/auth/access-token", Some(rotated)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_access_token_long_session_reports_cache_lifetime() {
    let app = create_test_app();
    register_and_verify(&app, "jack@example.com").await;
    let refresh = login(&app, "jack@example.com", true).await;

    let (status, cookies, body) = send(
        &app,
        get_with_cookie("/api/v1/auth/access-token", Some(refresh)),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["expires_in"]["refresh_cache"], 3600);
    assert_eq!(body["expires_in"]["refresh_token"], 30 * 24 * 60 * 60);
    assert_eq!(cookie_max_age(&cookies, "refresh_token"), Some(3600));
}

#[tokio::test]
async fn test_access_token_without_cookie_is_unauthorized() {
    let app = create_test_app();
    let (status, _, body) = send(&app, get_with_cookie("/api/v1/auth/access-token", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "AUTH_004");

    let (status, _, _) = send(
        &app,
        get_with_cookie(
            "/api/v1/auth/access-token",
            Some("refresh_token=garbage".to_string()),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_clears_cookies_and_ends_session() {
    let app = create_test_app();
    register_and_verify(&app, "kate@example.com").await;
    let refresh = login(&app, "kate@example.com", false).await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/logout")
        .header(header::COOKIE, refresh.clone())
        .body(Body::empty())
        .unwrap();
    let (status, cookies, _) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(cookie_max_age(&cookies, "access_token"), Some(0));
    assert_eq!(cookie_max_age(&cookies, "refresh_token"), Some(0));

    let (status, _, _) = send(
        &app,
        get_with_cookie("/api/v1/auth/access-token", Some(refresh)),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_without_session_succeeds() {
    let app = create_test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/logout")
        .body(Body::empty())
        .unwrap();
    let (status, cookies, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(cookies.len(), 2);
    assert!(body["message"].is_string());
}

// ============================================================================
// Access Guard Tests
// ============================================================================

#[tokio::test]
async fn test_me_requires_access_token() {
    let app = create_test_app();
    let (status, _, body) = send(&app, get_with_cookie("/api/v1/users/me", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "AUTH_005");
}

#[tokio::test]
async fn test_me_with_access_cookie_and_bearer() {
    let app = create_test_app();
    register_and_verify(&app, "liam@example.com").await;
    let refresh = login(&app, "liam@example.com", false).await;

    let (_, cookies, body) = send(
        &app,
        get_with_cookie("/api/v1/auth/access-token", Some(refresh)),
    )
    .await;
    let access_cookie = cookie_pair(&cookies, "access_token").unwrap();
    let access_token = body["access_token"].as_str().unwrap().to_string();

    let (status, _, body) = send(&app, get_with_cookie("/api/v1/users/me", Some(access_cookie))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "liam@example.com");
    assert_eq!(body["display_name"], "Tester");
    assert_eq!(body["provider"], "local");

    let request = Request::builder()
        .uri("/api/v1/users/me")
        .header(header::AUTHORIZATION, format!("Bearer {access_token}"))
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "liam@example.com");
}

#[tokio::test]
async fn test_me_rejects_refresh_token() {
    let app = create_test_app();
    register_and_verify(&app, "mona@example.com").await;
    let refresh = login(&app, "mona@example.com", false).await;
    let token = refresh.trim_start_matches("refresh_token=").to_string();

    let request = Request::builder()
        .uri("/api/v1/users/me")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "AUTH_004");
}
