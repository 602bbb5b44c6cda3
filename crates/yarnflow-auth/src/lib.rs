//! Authentication for yarnflow.
//!
//! This crate provides:
//!
//! - Argon2 password hashing and verification
//! - HS256 bearer token issuing ([`TokenIssuer`]) and validation
//!   ([`HmacJwtValidator`])
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐  login   ┌──────────────────┐
//! │   Gateway        │─────────▶│   TokenIssuer    │
//! │   (HTTP)         │          └──────────────────┘
//! │                  │  bearer  ┌──────────────────┐
//! │                  │─────────▶│   JwtValidator   │
//! └──────────────────┘          │   (trait)        │
//!                               └────────┬─────────┘
//!                               ┌────────▼─────────┐
//!                               │ HmacJwtValidator │
//!                               └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use yarnflow_auth::{AuthConfig, HmacJwtValidator, JwtValidator, TokenIssuer};
//! use yarnflow_core::UserId;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AuthConfig::default();
//! let issuer = TokenIssuer::new(config.clone());
//! let validator = HmacJwtValidator::new(&config);
//!
//! let user_id = UserId::generate();
//! let issued = issuer.issue(&user_id, "admin", "admin")?;
//! let claims = validator.validate(&issued.token).await?;
//! assert_eq!(claims.user_id, user_id);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod jwt;
pub mod password;

pub use error::{AuthError, Result};
pub use jwt::{HmacJwtValidator, IssuedToken, JwtValidator, TokenIssuer, ValidatedClaims};
pub use password::{hash_password, verify_password};

#[cfg(any(test, feature = "test-utils"))]
pub use jwt::MockJwtValidator;

/// Configuration for token issuing and validation.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Value of the `iss` claim.
    pub issuer: String,
    /// HMAC signing secret.
    pub secret: String,
    /// Token lifetime, in seconds.
    pub token_ttl_seconds: u64,
}

impl AuthConfig {
    /// Secret used when none is configured. Only suitable for development.
    pub const DEV_SECRET: &'static str = "yarnflow-dev-secret";

    /// Returns true if the development secret is in use.
    #[must_use]
    pub fn uses_dev_secret(&self) -> bool {
        self.secret == Self::DEV_SECRET
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: "yarnflow".to_string(),
            secret: Self::DEV_SECRET.to_string(),
            token_ttl_seconds: 8 * 60 * 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = AuthConfig::default();
        assert_eq!(config.issuer, "yarnflow");
        assert_eq!(config.token_ttl_seconds, 28_800);
        assert!(config.uses_dev_secret());
    }

    #[test]
    fn auth_error_status_codes() {
        assert_eq!(AuthError::TokenExpired.http_status_code(), 401);
        assert_eq!(AuthError::InvalidSignature.http_status_code(), 401);
        assert_eq!(AuthError::InvalidCredentials.http_status_code(), 401);
        assert_eq!(AuthError::MalformedHash.http_status_code(), 500);
        assert_eq!(AuthError::Internal("x".into()).http_status_code(), 500);
    }
}
