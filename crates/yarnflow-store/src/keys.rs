//! Key encoding utilities for `RocksDB`.
//!
//! Composite keys are fixed-width concatenations so that prefix scans return
//! every entry for one parent. Timestamps are big-endian so that lexical
//! order equals chronological order.

use chrono::{DateTime, Utc};
use yarnflow_core::{AuditId, ContractId, MessageId, OrderId, OrderNumber, UserId};

const ID_LEN: usize = 16;
const TS_LEN: usize = 8;

/// Encode a primary key (the 16 id bytes).
#[must_use]
pub fn id_key(id: &impl AsRef<[u8]>) -> Vec<u8> {
    id.as_ref().to_vec()
}

/// Encode a lookup key for a case-insensitive unique string (username, email).
#[must_use]
pub fn lookup_key(value: &str) -> Vec<u8> {
    value.trim().to_lowercase().into_bytes()
}

/// Encode a role-user index key: `role || user_id`.
#[must_use]
pub fn role_user_key(role: u8, user_id: &UserId) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + ID_LEN);
    key.push(role);
    key.extend_from_slice(user_id.as_bytes());
    key
}

/// Encode an order number key.
#[must_use]
pub fn order_number_key(number: OrderNumber) -> Vec<u8> {
    number.value().to_be_bytes().to_vec()
}

/// Encode a status-order index key: `status || order_id`.
#[must_use]
pub fn status_order_key(status: u8, order_id: &OrderId) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + ID_LEN);
    key.push(status);
    key.extend_from_slice(order_id.as_bytes());
    key
}

/// Encode a one-byte prefix for role or status scans.
#[must_use]
pub fn byte_prefix(value: u8) -> Vec<u8> {
    vec![value]
}

/// Encode a creator-order index key: `user_id || order_id`.
#[must_use]
pub fn creator_order_key(user_id: &UserId, order_id: &OrderId) -> Vec<u8> {
    let mut key = Vec::with_capacity(2 * ID_LEN);
    key.extend_from_slice(user_id.as_bytes());
    key.extend_from_slice(order_id.as_bytes());
    key
}

/// Encode an order-message index key: `order_id || micros || message_id`.
#[must_use]
pub fn order_message_key(
    order_id: &OrderId,
    created_at: &DateTime<Utc>,
    message_id: &MessageId,
) -> Vec<u8> {
    let micros = u64::try_from(created_at.timestamp_micros()).unwrap_or(0);
    let mut key = Vec::with_capacity(2 * ID_LEN + TS_LEN);
    key.extend_from_slice(order_id.as_bytes());
    key.extend_from_slice(&micros.to_be_bytes());
    key.extend_from_slice(message_id.as_bytes());
    key
}

/// Encode an order-contract index key: `order_id || contract_id`.
#[must_use]
pub fn order_contract_key(order_id: &OrderId, contract_id: &ContractId) -> Vec<u8> {
    let mut key = Vec::with_capacity(2 * ID_LEN);
    key.extend_from_slice(order_id.as_bytes());
    key.extend_from_slice(contract_id.as_bytes());
    key
}

/// Encode an audit key: `micros || audit_id`.
#[must_use]
pub fn audit_key(created_at: &DateTime<Utc>, audit_id: &AuditId) -> Vec<u8> {
    let micros = u64::try_from(created_at.timestamp_micros()).unwrap_or(0);
    let mut key = Vec::with_capacity(TS_LEN + ID_LEN);
    key.extend_from_slice(&micros.to_be_bytes());
    key.extend_from_slice(audit_id.as_bytes());
    key
}

/// Encode a 16-byte parent prefix.
#[must_use]
pub fn id_prefix(id: &impl AsRef<[u8]>) -> Vec<u8> {
    id.as_ref().to_vec()
}

/// Read the 16 id bytes that end a composite key.
#[must_use]
pub fn trailing_id(key: &[u8]) -> Option<[u8; 16]> {
    let start = key.len().checked_sub(ID_LEN)?;
    key[start..].try_into().ok()
}

/// Read the 16 id bytes stored as a value.
#[must_use]
pub fn id_value(value: &[u8]) -> Option<[u8; 16]> {
    value.try_into().ok()
}
