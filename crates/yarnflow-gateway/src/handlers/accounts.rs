//! Registration, login and profile endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use yarnflow_auth::JwtValidator;
use yarnflow_desk::{OrderDesk, RegisterRequest, UpdateProfileRequest, UserProfile};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::GatewayState;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginBody {
    /// Login name.
    pub username: String,
    /// Plain-text password.
    pub password: String,
}

/// Response to a successful login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Bearer token for subsequent requests.
    pub token: String,
    /// When the token expires.
    pub expires_at: DateTime<Utc>,
    /// The logged-in account.
    pub user: UserProfile,
}

// =============================================================================
// Handlers
// =============================================================================

/// Register a new account.
///
/// Public. A bearer token is only needed to create admin accounts.
///
/// # Errors
///
/// Returns an error if validation fails or the username or email is taken.
pub async fn register<D, V>(
    State(state): State<Arc<GatewayState<D, V>>>,
    caller: Option<AuthUser>,
    Json(body): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError>
where
    D: OrderDesk + 'static,
    V: JwtValidator + 'static,
{
    let caller = caller.map(|c| c.actor());
    let profile = state.desk.register_user(caller.as_ref(), body).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// Exchange a username and password for a bearer token.
///
/// # Errors
///
/// Returns `ApiError::InvalidCredentials` on mismatch.
pub async fn login<D, V>(
    State(state): State<Arc<GatewayState<D, V>>>,
    Json(body): Json<LoginBody>,
) -> Result<impl IntoResponse, ApiError>
where
    D: OrderDesk + 'static,
    V: JwtValidator + 'static,
{
    let user = state.desk.authenticate(&body.username, &body.password).await?;
    let issued = state
        .token_issuer
        .issue(&user.user_id, &user.username, user.role.as_str())?;

    tracing::info!(user_id = %user.user_id, role = %user.role, "Issued token");

    Ok(Json(LoginResponse {
        token: issued.token,
        expires_at: issued.expires_at,
        user,
    }))
}

/// The caller's profile.
///
/// # Errors
///
/// Returns an error if the account is missing or deactivated.
pub async fn me<D, V>(
    State(state): State<Arc<GatewayState<D, V>>>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError>
where
    D: OrderDesk + 'static,
    V: JwtValidator + 'static,
{
    let profile = state.desk.get_user(&user.actor()).await?;
    Ok(Json(profile))
}

/// Update the caller's username, email or password.
///
/// # Errors
///
/// Returns an error if validation fails or a new value is taken.
pub async fn update_me<D, V>(
    State(state): State<Arc<GatewayState<D, V>>>,
    user: AuthUser,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError>
where
    D: OrderDesk + 'static,
    V: JwtValidator + 'static,
{
    let profile = state.desk.update_profile(&user.actor(), body).await?;
    Ok(Json(profile))
}
