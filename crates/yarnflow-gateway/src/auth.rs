//! Authentication extractor.
//!
//! This module provides the `AuthUser` extractor that validates bearer tokens
//! and extracts user identity from requests.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use yarnflow_auth::{JwtValidator, ValidatedClaims};
use yarnflow_core::UserId;
use yarnflow_desk::{Actor, OrderDesk, Role};

use crate::error::ApiError;
use crate::state::GatewayState;

/// An authenticated user extracted from a bearer token.
///
/// This extractor validates the `Authorization: Bearer <token>` header.
/// Role and username reflect the token at issue time; the desk re-reads the
/// account on every operation.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The user ID from the `sub` claim.
    pub user_id: UserId,
    /// Username at issue time.
    pub username: String,
    /// Role at issue time, if the token carried a known one.
    pub role: Option<Role>,
}

impl AuthUser {
    /// Create an `AuthUser` from validated claims.
    #[must_use]
    pub fn from_claims(claims: &ValidatedClaims) -> Self {
        Self {
            user_id: claims.user_id,
            username: claims.username.clone(),
            role: claims.role.parse().ok(),
        }
    }

    /// The caller as a desk actor.
    #[must_use]
    pub fn actor(&self) -> Actor {
        Actor::new(self.user_id, self.role.unwrap_or(Role::User))
    }
}

#[async_trait]
impl<D, V> FromRequestParts<Arc<GatewayState<D, V>>> for AuthUser
where
    D: OrderDesk + 'static,
    V: JwtValidator + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<GatewayState<D, V>>,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthorized)?;

        let claims = state.jwt_validator.validate(token).await?;

        Ok(Self::from_claims(&claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn claims(role: &str) -> ValidatedClaims {
        ValidatedClaims {
            user_id: UserId::generate(),
            username: "agent1".to_string(),
            role: role.to_string(),
            expires_at: Utc::now() + Duration::hours(1),
        }
    }

    #[test]
    fn auth_user_from_claims() {
        let claims = claims("agent");
        let user = AuthUser::from_claims(&claims);
        assert_eq!(user.user_id, claims.user_id);
        assert_eq!(user.username, "agent1");
        assert_eq!(user.role, Some(Role::Agent));
        assert_eq!(user.actor().role, Role::Agent);
    }

    #[test]
    fn unknown_role_falls_back_to_user() {
        let user = AuthUser::from_claims(&claims(""));
        assert_eq!(user.role, None);
        assert_eq!(user.actor().role, Role::User);
    }
}
