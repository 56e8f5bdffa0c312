//! Access-token guard for protected endpoints.
//!
//! The token is read from the `access_token` cookie, falling back to an
//! `Authorization: Bearer <token>` header. On success the verified
//! [`AccessClaims`] are inserted into request extensions.
//!
//! ```rust,no_run
//! use axum::extract::Extension;
//! use user_auth::token::AccessClaims;
//!
//! async fn protected_handler(Extension(claims): Extension<AccessClaims>) -> String {
//!     format!("Authenticated as user {}", claims.sub)
//! }
//! # let _ = protected_handler;
//! ```

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use user_auth::AuthError;

use super::{
    AppState,
    cookies::{ACCESS_COOKIE, read_cookie},
    error::ApiError,
};

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Reject requests without a valid access token.
///
/// - **Missing token**: `401` with `AUTH_005`
/// - **Invalid or non-access token**: `401` with `AUTH_004`
/// - **Expired token**: `401` with `AUTH_003`
pub async fn access_guard(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = read_cookie(request.headers(), ACCESS_COOKIE)
        .or_else(|| bearer_token(request.headers()))
        .ok_or(AuthError::Unauthorized)?;

    let claims = state.sessions.verify_access_token(&token)?;
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}
