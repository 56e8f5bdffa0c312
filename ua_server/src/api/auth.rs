//! Authentication API handlers.
//!
//! Refresh and access tokens are delivered as `HttpOnly` cookies; login never
//! puts a token in the response body.
//!
//! # Examples
//!
//! Register:
//! ```bash
//! curl -X POST http://localhost:3000/api/v1/auth/register \
//!   -H "Content-Type: application/json" \
//!   -d '{"email": "alice@example.com", "password": "secret123", "display_name": "Alice"}'
//! ```
//!
//! Login and rotate:
//! ```bash
//! curl -c jar -X POST http://localhost:3000/api/v1/auth/login \
//!   -H "Content-Type: application/json" \
//!   -d '{"email": "alice@example.com", "password": "secret123", "stay_login": true}'
//! curl -b jar -c jar http://localhost:3000/api/v1/auth/access-token
//! ```

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header::SET_COOKIE},
};
use serde::{Deserialize, Serialize};
use user_auth::AuthError;
use user_auth::auth::{LoginRequest, RegisterRequest, User};

use super::{
    AppState,
    cookies::{ACCESS_COOKIE, REFRESH_COOKIE, read_cookie},
    error::ApiError,
    request_id::RequestId,
};
use crate::{logging::log_security_event, metrics};

const MAX_FIELD_LEN: usize = 255;
const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Deserialize)]
pub struct RegisterPayload {
    pub email: String,
    pub password: String,
    #[serde(default, alias = "displayName")]
    pub display_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub email: String,
    pub active_token: String,
    pub email_sent: bool,
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailPayload {
    #[serde(default)]
    pub active_token: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyEmailResponse {
    pub message: String,
    pub user: User,
}

#[derive(Debug, Deserialize)]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub stay_login: bool,
}

#[derive(Debug, Serialize)]
pub struct LoginExpiry {
    pub refresh_token: u64,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub expires_in: LoginExpiry,
    pub stay_login: bool,
}

#[derive(Debug, Serialize)]
pub struct TokenExpiry {
    pub access_token: u64,
    pub refresh_token: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_cache: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct AccessTokenResponse {
    pub message: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: TokenExpiry,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    let valid = email.len() <= MAX_FIELD_LEN
        && email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty());
    if valid {
        Ok(())
    } else {
        Err(ApiError::validation("VAL_001", "Invalid email"))
    }
}

fn validate_password(password: &str) -> Result<(), ApiError> {
    let len = password.chars().count();
    if (MIN_PASSWORD_LEN..=MAX_FIELD_LEN).contains(&len) {
        Ok(())
    } else {
        Err(ApiError::validation(
            "VAL_002",
            format!("Password must be {MIN_PASSWORD_LEN} to {MAX_FIELD_LEN} characters"),
        ))
    }
}

fn validate_display_name(display_name: Option<&str>) -> Result<(), ApiError> {
    match display_name {
        Some(name) if name.chars().count() > MAX_FIELD_LEN => Err(ApiError::validation(
            "VAL_004",
            format!("Display name must be at most {MAX_FIELD_LEN} characters"),
        )),
        _ => Ok(()),
    }
}

fn append_cookie(headers: &mut HeaderMap, cookie: Option<HeaderValue>) {
    if let Some(value) = cookie {
        headers.append(SET_COOKIE, value);
    }
}

/// Stage a registration and send the verification email.
///
/// # Request Body
///
/// ```json
/// { "email": "alice@example.com", "password": "secret123", "display_name": "Alice" }
/// ```
///
/// # Response
///
/// `201 Created` with the email and the verification token.
///
/// # Errors
///
/// - `400 Bad Request`: Invalid email, password or display name
/// - `409 Conflict`: Email already in use
/// - `502 Bad Gateway`: Verification email could not be sent
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let email = payload.email.trim().to_string();
    validate_email(&email)?;
    validate_password(&payload.password)?;
    validate_display_name(payload.display_name.as_deref())?;

    let result = state
        .registration
        .register(RegisterRequest {
            email,
            password: payload.password,
            display_name: payload.display_name,
        })
        .await;

    match result {
        Ok(receipt) => {
            metrics::registrations_total("ok");
            Ok((
                StatusCode::CREATED,
                Json(RegisterResponse {
                    message: "Registration pending. Please check your email for verification."
                        .to_string(),
                    email: receipt.email,
                    active_token: receipt.verification_token,
                    email_sent: true,
                }),
            ))
        }
        Err(e) => {
            metrics::registrations_total(e.code());
            Err(e.into())
        }
    }
}

/// Commit a pending registration.
///
/// # Request Body
///
/// ```json
/// { "active_token": "eyJhbGciOiJIUzI1NiIs..." }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Link expired, unknown, or the account could not be created
pub async fn verify_email(
    State(state): State<AppState>,
    Json(payload): Json<VerifyEmailPayload>,
) -> Result<Json<VerifyEmailResponse>, ApiError> {
    if payload.active_token.trim().is_empty() {
        return Err(ApiError::validation("VAL_003", "active_token is required"));
    }

    let user = state.registration.verify_email(&payload.active_token).await?;
    Ok(Json(VerifyEmailResponse {
        message: "Email verified successfully".to_string(),
        user,
    }))
}

/// Authenticate and open a refresh session.
///
/// The refresh token is set as an `HttpOnly` cookie whose lifetime matches
/// the token; the body only reports that lifetime.
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid email or password
pub async fn login(
    State(state): State<AppState>,
    request_id: RequestId,
    Json(payload): Json<LoginPayload>,
) -> Result<(HeaderMap, Json<LoginResponse>), ApiError> {
    validate_email(payload.email.trim())?;
    validate_password(&payload.password)?;

    let result = state
        .sessions
        .login(LoginRequest {
            email: payload.email.trim().to_string(),
            password: payload.password,
            stay_login: payload.stay_login,
        })
        .await;

    let outcome = match result {
        Ok(outcome) => {
            metrics::login_attempts_total(true);
            outcome
        }
        Err(e) => {
            metrics::login_attempts_total(false);
            if matches!(e, AuthError::InvalidCredentials) {
                log_security_event(
                    "failed_login",
                    None,
                    Some(request_id.as_str()),
                    "Invalid email or password",
                );
            }
            return Err(e.into());
        }
    };

    let mut headers = HeaderMap::new();
    append_cookie(
        &mut headers,
        state
            .cookies
            .build(REFRESH_COOKIE, &outcome.refresh_token, outcome.refresh_ttl_secs),
    );

    Ok((
        headers,
        Json(LoginResponse {
            message: "Login successful".to_string(),
            expires_in: LoginExpiry {
                refresh_token: outcome.refresh_ttl_secs,
            },
            stay_login: outcome.stay_login,
        }),
    ))
}

/// Rotate the refresh token from the `refresh_token` cookie and issue an access token.
///
/// Both tokens are set as cookies and returned in the body. The refresh
/// cookie expires with the cached copy when one is reported.
///
/// # Errors
///
/// - `401 Unauthorized`: Missing, invalid, reused or expired refresh token
pub async fn access_token(
    State(state): State<AppState>,
    request_id: RequestId,
    headers: HeaderMap,
) -> Result<(HeaderMap, Json<AccessTokenResponse>), ApiError> {
    let refresh = read_cookie(&headers, REFRESH_COOKIE).ok_or(AuthError::InvalidToken)?;

    let tokens = match state.sessions.issue_access_token(&refresh).await {
        Ok(tokens) => tokens,
        Err(e) => {
            metrics::token_rotations_total("unknown", false);
            if matches!(e, AuthError::InvalidToken) {
                log_security_event(
                    "rejected_refresh_token",
                    None,
                    Some(request_id.as_str()),
                    "Refresh token rejected",
                );
            }
            return Err(e.into());
        }
    };

    let tier = if tokens.refresh_cache_ttl_secs.is_some() {
        "long"
    } else {
        "short"
    };
    metrics::token_rotations_total(tier, true);

    let mut response_headers = HeaderMap::new();
    append_cookie(
        &mut response_headers,
        state
            .cookies
            .build(ACCESS_COOKIE, &tokens.access_token, tokens.access_ttl_secs),
    );
    append_cookie(
        &mut response_headers,
        state.cookies.build(
            REFRESH_COOKIE,
            &tokens.refresh_token,
            tokens.refresh_cache_ttl_secs.unwrap_or(tokens.refresh_ttl_secs),
        ),
    );

    Ok((
        response_headers,
        Json(AccessTokenResponse {
            message: "Access token issued".to_string(),
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_in: TokenExpiry {
                access_token: tokens.access_ttl_secs,
                refresh_token: tokens.refresh_ttl_secs,
                refresh_cache: tokens.refresh_cache_ttl_secs,
            },
        }),
    ))
}

/// End the session behind the `refresh_token` cookie and clear both cookies.
///
/// Always succeeds, whatever the cookie holds.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> (HeaderMap, Json<MessageResponse>) {
    let refresh = read_cookie(&headers, REFRESH_COOKIE);
    state.sessions.logout(refresh.as_deref()).await;
    metrics::logouts_total();

    let mut response_headers = HeaderMap::new();
    append_cookie(&mut response_headers, state.cookies.clear(ACCESS_COOKIE));
    append_cookie(&mut response_headers, state.cookies.clear(REFRESH_COOKIE));

    (
        response_headers,
        Json(MessageResponse {
            message: "Logout successful".to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("alice@example.com").is_ok());
        assert!(validate_email("alice").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("alice@").is_err());
        assert!(validate_email("admin@localhost").is_ok());
        let long = format!("{}@example.com", "a".repeat(250));
        assert!(validate_email(&long).is_err());
    }

    #[test]
    fn test_validate_password_bounds() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
        assert!(validate_password(&"a".repeat(255)).is_ok());
        assert!(validate_password(&"a".repeat(256)).is_err());
    }

    #[test]
    fn test_validate_display_name() {
        assert!(validate_display_name(None).is_ok());
        assert!(validate_display_name(Some("Alice")).is_ok());
        let err = validate_display_name(Some(&"x".repeat(256))).unwrap_err();
        assert_eq!(err.code, "VAL_004");
    }
}
