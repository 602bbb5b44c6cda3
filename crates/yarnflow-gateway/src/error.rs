//! API error types and responses.
//!
//! This module defines the standard error format for all API responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use yarnflow_auth::AuthError;
use yarnflow_desk::DeskError;

/// API error type that implements `IntoResponse`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or invalid authentication token.
    #[error("unauthorized")]
    Unauthorized,

    /// Login failed.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// User does not have permission to perform this operation.
    #[error("permission denied: {0}")]
    Forbidden(String),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request conflicts with existing data.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The requested status move is not allowed.
    #[error("{0}")]
    InvalidTransition(String),

    /// Invalid request body or parameters.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

/// Error details.
#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl ApiError {
    /// Get the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) | Self::InvalidTransition(_) => StatusCode::CONFLICT,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code string for this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::InvalidCredentials => "invalid_credentials",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::InvalidTransition(_) => "invalid_transition",
            Self::BadRequest(_) => "bad_request",
            Self::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        let body = ErrorResponse {
            error: ErrorBody { code, message },
        };

        (status, Json(body)).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::TokenExpired
            | AuthError::InvalidSignature
            | AuthError::InvalidIssuer
            | AuthError::InvalidUserId
            | AuthError::InvalidToken(_) => Self::Unauthorized,
            AuthError::InvalidCredentials => Self::InvalidCredentials,
            AuthError::MalformedHash | AuthError::Internal(_) => {
                tracing::error!(error = %err, "Auth internal error");
                Self::Internal("authentication service error".to_string())
            }
        }
    }
}

impl From<DeskError> for ApiError {
    fn from(err: DeskError) -> Self {
        match err {
            DeskError::UserNotFound(id) => Self::NotFound(format!("user {id}")),
            DeskError::OrderNotFound(id) => Self::NotFound(format!("order {id}")),
            DeskError::ContractNotFound(id) => Self::NotFound(format!("contract {id}")),
            DeskError::Validation(msg) => Self::BadRequest(msg),
            DeskError::Forbidden(msg) => Self::Forbidden(msg),
            DeskError::Inactive(_) => Self::Forbidden("account is deactivated".to_string()),
            DeskError::InvalidCredentials => Self::InvalidCredentials,
            DeskError::Conflict(msg) => Self::Conflict(msg),
            DeskError::Auth(auth_err) => Self::from(auth_err),
            err @ DeskError::InvalidTransition { .. } => Self::InvalidTransition(err.to_string()),
            err => {
                tracing::error!(error = %err, "Order desk error");
                Self::Internal("unexpected server error".to_string())
            }
        }
    }
}
