//! HTTP API for the authentication service.
//!
//! # Modules
//!
//! - [`auth`]: Registration, email verification, login, token rotation, logout
//! - [`users`]: Profile of the authenticated user
//! - [`middleware`]: Access-token guard for protected endpoints
//! - [`cookies`]: Session cookie helpers
//! - [`request_id`]: Request correlation and HTTP metrics
//!
//! # Endpoints Overview
//!
//! ```text
//! GET  /health                        - Liveness (public)
//! GET  /health/ready                  - Readiness of cache and database (public)
//! POST /api/v1/auth/register          - Stage a registration (public)
//! POST /api/v1/auth/verify-email      - Commit a registration (public)
//! POST /api/v1/auth/login             - Login, sets refresh_token cookie (public)
//! GET  /api/v1/auth/access-token      - Rotate refresh token, issue access token (cookie)
//! POST /api/v1/auth/logout            - Clear session cookies (cookie)
//! GET  /api/v1/users/me               - Current user (access token required)
//! ```
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use ua_server::api::{AppState, create_router};
//! # async fn example(state: AppState) -> Result<(), Box<dyn std::error::Error>> {
//! let app = create_router(state);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively for development. In production, configure
//! appropriate origins, methods, and headers.

pub mod auth;
pub mod cookies;
pub mod error;
pub mod middleware;
pub mod request_id;
pub mod users;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use user_auth::cache::EphemeralStore;
use user_auth::db::Database;
use user_auth::{RegistrationManager, SessionManager};

use cookies::CookieSettings;

/// Application state shared across all HTTP handlers.
///
/// Cloned for each request; every field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub registration: Arc<RegistrationManager>,
    pub sessions: Arc<SessionManager>,
    /// Pinged by the readiness check
    pub cache: Arc<dyn EphemeralStore>,
    /// Pinged by the readiness check; `None` when running on in-memory repositories
    pub database: Option<Database>,
    pub cookies: CookieSettings,
    pub app_name: String,
}

/// Create the complete API router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    let root_routes = Router::new()
        .route("/health", get(health_check))
        .route("/health/ready", get(readiness_check));

    Router::new()
        .merge(root_routes)
        .nest("/api/v1", create_v1_router(state.clone()))
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn create_v1_router(state: AppState) -> Router<AppState> {
    // Session endpoints authenticate through the refresh_token cookie themselves
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/verify-email", post(auth::verify_email))
        .route("/auth/login", post(auth::login))
        .route("/auth/access-token", get(auth::access_token))
        .route("/auth/logout", post(auth::logout));

    let protected_routes = Router::new()
        .route("/users/me", get(users::me))
        .layer(axum::middleware::from_fn_with_state(
            state,
            middleware::access_guard,
        ));

    Router::new().merge(public_routes).merge(protected_routes)
}

/// Liveness check. Never touches the backing stores.
///
/// ```bash
/// curl http://localhost:3000/health
/// # {"status":"ok","app":"user_auth","version":"1.0.0","timestamp":"2026-10-17T10:30:00Z"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "app": state.app_name,
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Readiness check.
///
/// Returns `200 OK` when the cache and the database answer, `503 Service
/// Unavailable` otherwise.
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let started = Instant::now();
    let cache_result = state.cache.ping().await;
    let cache_latency = started.elapsed().as_millis() as u64;
    if let Err(e) = &cache_result {
        tracing::warn!(error = %e, "Cache readiness check failed");
    }
    let cache_ok = cache_result.is_ok();

    let db_check = match &state.database {
        Some(db) => {
            let started = Instant::now();
            let result = db.health_check().await;
            if let Err(e) = &result {
                tracing::warn!(error = %e, "Database readiness check failed");
            }
            json!({ "ok": result.is_ok(), "latency_ms": started.elapsed().as_millis() as u64 })
        }
        None => json!({ "ok": true, "latency_ms": 0, "backend": "memory" }),
    };
    let db_ok = db_check["ok"].as_bool().unwrap_or(false);

    let ready = cache_ok && db_ok;
    let status_code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(json!({
            "status": if ready { "ok" } else { "unavailable" },
            "checks": {
                "cache": { "ok": cache_ok, "latency_ms": cache_latency },
                "database": db_check,
            },
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
    )
}
