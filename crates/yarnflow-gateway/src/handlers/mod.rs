//! HTTP request handlers.
//!
//! This module contains all the endpoint handlers for the gateway API.

use std::str::FromStr;

use crate::error::ApiError;

pub mod accounts;
pub mod admin;
pub mod chat;
pub mod contracts;
pub mod health;
pub mod orders;

/// Parse a path id, rejecting malformed values as a bad request.
pub(crate) fn parse_id<T: FromStr>(kind: &str, raw: &str) -> Result<T, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid {kind} id: {raw}")))
}
