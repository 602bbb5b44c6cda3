//! Error types for the order desk.
//!
//! This module defines all errors that can occur during account, order,
//! chat and contract operations.

use thiserror::Error;
use yarnflow_core::{ContractId, OrderId, UserId};
use yarnflow_store::{OrderStatus, Role, StoreError};

/// A result type using `DeskError`.
pub type Result<T> = std::result::Result<T, DeskError>;

/// Errors that can occur in order desk operations.
#[derive(Debug, Error)]
pub enum DeskError {
    /// The requested user was not found.
    #[error("user not found: {0}")]
    UserNotFound(UserId),

    /// The requested order was not found.
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// The requested contract was not found.
    #[error("contract not found: {0}")]
    ContractNotFound(ContractId),

    /// Input failed validation.
    #[error("{0}")]
    Validation(String),

    /// The acting user may not perform this operation.
    #[error("permission denied: {0}")]
    Forbidden(String),

    /// The acting account is deactivated.
    #[error("account {0} is deactivated")]
    Inactive(UserId),

    /// Username or password did not match.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// A unique value is already taken.
    #[error("{0}")]
    Conflict(String),

    /// The requested status move is not allowed for this role.
    #[error("{role} cannot move order {order_id} from {from} to {to}")]
    InvalidTransition {
        /// The order being moved.
        order_id: OrderId,
        /// Role of the acting user.
        role: Role,
        /// The current status.
        from: OrderStatus,
        /// The requested status.
        to: OrderStatus,
    },

    /// Storage layer error.
    #[error("storage error: {0}")]
    Store(#[source] StoreError),

    /// Authentication error.
    #[error("authentication error: {0}")]
    Auth(#[from] yarnflow_auth::AuthError),

    /// Contract file I/O failed.
    #[error("file error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV encoding failed.
    #[error("export error: {0}")]
    Export(#[from] csv::Error),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for DeskError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(reason) => Self::Conflict(reason),
            other => Self::Store(other),
        }
    }
}

impl DeskError {
    /// Returns the appropriate HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::UserNotFound(_) | Self::OrderNotFound(_) | Self::ContractNotFound(_) => 404,
            Self::Validation(_) => 400,
            Self::Forbidden(_) | Self::Inactive(_) => 403,
            Self::InvalidCredentials => 401,
            Self::Conflict(_) | Self::InvalidTransition { .. } => 409,
            Self::Auth(e) => e.http_status_code(),
            Self::Store(_) | Self::Io(_) | Self::Export(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns true if the message is safe to show to API clients.
    #[must_use]
    pub const fn is_user_facing(&self) -> bool {
        self.http_status_code() < 500
    }

    pub(crate) fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden(reason.into())
    }

    pub(crate) fn validation(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }
}
