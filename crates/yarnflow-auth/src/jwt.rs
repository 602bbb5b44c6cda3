//! Bearer token issuing and validation.
//!
//! Tokens are HS256 JWTs signed with a shared secret. The `sub` claim carries
//! the user id; role and username are informational, since callers re-read
//! the user record on every request.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use yarnflow_core::UserId;

use crate::error::{AuthError, Result};
use crate::AuthConfig;

/// Validated claims extracted from a token.
#[derive(Debug, Clone)]
pub struct ValidatedClaims {
    /// The user ID extracted from the `sub` claim.
    pub user_id: UserId,
    /// Username at issue time.
    pub username: String,
    /// Role name at issue time.
    pub role: String,
    /// When the token expires.
    pub expires_at: DateTime<Utc>,
}

/// A freshly issued token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// The encoded JWT.
    pub token: String,
    /// When the token expires.
    pub expires_at: DateTime<Utc>,
}

/// Trait for validating bearer tokens.
#[async_trait]
pub trait JwtValidator: Send + Sync {
    /// Validate a token and extract claims.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is invalid, expired, or cannot be validated.
    async fn validate(&self, token: &str) -> Result<ValidatedClaims>;
}

#[derive(Debug, Serialize, Deserialize)]
struct RawClaims {
    iss: String,
    sub: String,
    username: String,
    role: String,
    iat: i64,
    exp: i64,
}

/// Signs tokens for authenticated users.
#[derive(Clone)]
pub struct TokenIssuer {
    config: AuthConfig,
    key: EncodingKey,
}

impl TokenIssuer {
    /// Create an issuer from the shared configuration.
    #[must_use]
    pub fn new(config: AuthConfig) -> Self {
        let key = EncodingKey::from_secret(config.secret.as_bytes());
        Self { config, key }
    }

    /// Issue a token valid for the configured lifetime.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Internal` if encoding fails.
    pub fn issue(&self, user_id: &UserId, username: &str, role: &str) -> Result<IssuedToken> {
        self.issue_at(user_id, username, role, Utc::now())
    }

    fn issue_at(
        &self,
        user_id: &UserId,
        username: &str,
        role: &str,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken> {
        let ttl = i64::try_from(self.config.token_ttl_seconds).unwrap_or(i64::MAX);
        let expires_at = now + Duration::seconds(ttl);
        let claims = RawClaims {
            iss: self.config.issuer.clone(),
            sub: user_id.to_string(),
            username: username.to_string(),
            role: role.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.key)
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        tracing::debug!(%user_id, %expires_at, "issued token");
        Ok(IssuedToken { token, expires_at })
    }
}

/// Shared-secret validator for tokens from [`TokenIssuer`].
pub struct HmacJwtValidator {
    key: DecodingKey,
    validation: Validation,
}

impl HmacJwtValidator {
    /// Create a validator from the shared configuration.
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.validate_exp = true;
        Self {
            key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl JwtValidator for HmacJwtValidator {
    async fn validate(&self, token: &str) -> Result<ValidatedClaims> {
        let token_data = decode::<RawClaims>(token, &self.key, &self.validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                jsonwebtoken::errors::ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::InvalidToken(e.to_string()),
            }
        })?;

        let claims = token_data.claims;
        let user_id = UserId::from_str(&claims.sub).map_err(|_| AuthError::InvalidUserId)?;
        let expires_at = DateTime::from_timestamp(claims.exp, 0)
            .ok_or_else(|| AuthError::InvalidToken("invalid exp timestamp".to_string()))?;

        Ok(ValidatedClaims {
            user_id,
            username: claims.username,
            role: claims.role,
            expires_at,
        })
    }
}

/// A mock validator for testing.
///
/// This validator accepts any token in the format `test-token:<user_uuid>`.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Default)]
pub struct MockJwtValidator;

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl JwtValidator for MockJwtValidator {
    async fn validate(&self, token: &str) -> Result<ValidatedClaims> {
        let rest = token
            .strip_prefix("test-token:")
            .ok_or_else(|| AuthError::InvalidToken("expected test-token:<user>".to_string()))?;

        let user_id = UserId::from_str(rest).map_err(|_| AuthError::InvalidUserId)?;

        Ok(ValidatedClaims {
            user_id,
            username: String::new(),
            role: String::new(),
            expires_at: Utc::now() + Duration::hours(1),
        })
    }
}
