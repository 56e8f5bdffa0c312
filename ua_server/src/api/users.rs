//! Profile endpoints behind the access guard.

use axum::{Extension, Json, extract::State};
use serde::Serialize;
use user_auth::auth::{AuthProvider, RoleType, UserId};
use user_auth::token::AccessClaims;

use super::{AppState, error::ApiError};

/// Public view of the authenticated user
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: UserId,
    pub email: String,
    pub display_name: Option<String>,
    pub role: Option<RoleType>,
    pub role_id: Option<i64>,
    pub provider: AuthProvider,
}

/// Get the profile of the user the access token was issued to.
///
/// # Errors
///
/// - `401 Unauthorized`: The user behind the token no longer exists
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessClaims>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user = state.sessions.current_user(&claims).await?;
    Ok(Json(ProfileResponse {
        id: user.id,
        email: user.email,
        display_name: user.display_name,
        role: user.role,
        role_id: user.role_id,
        provider: user.provider,
    }))
}
