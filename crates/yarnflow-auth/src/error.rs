//! Authentication error types.

use thiserror::Error;

/// A result type using `AuthError`.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors that can occur during authentication.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The token has expired.
    #[error("token expired")]
    TokenExpired,

    /// The token signature is invalid.
    #[error("invalid signature")]
    InvalidSignature,

    /// The token issuer does not match the expected value.
    #[error("invalid issuer")]
    InvalidIssuer,

    /// The user ID in the token is malformed.
    #[error("invalid user ID format")]
    InvalidUserId,

    /// The token format is invalid.
    #[error("invalid token format: {0}")]
    InvalidToken(String),

    /// Username or password did not match.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// A stored password hash could not be parsed.
    #[error("malformed password hash")]
    MalformedHash,

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Returns the appropriate HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::TokenExpired
            | Self::InvalidSignature
            | Self::InvalidIssuer
            | Self::InvalidUserId
            | Self::InvalidToken(_)
            | Self::InvalidCredentials => 401,
            Self::MalformedHash | Self::Internal(_) => 500,
        }
    }
}
