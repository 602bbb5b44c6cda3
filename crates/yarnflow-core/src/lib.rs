//! Core types and utilities for yarnflow.
//!
//! This crate provides the foundational types used throughout the order desk:
//!
//! - **Identifiers**: Strongly-typed IDs for users, orders, messages, contracts and audit entries
//! - **Order numbers**: The human-facing `PO-NNNN` purchase order number
//! - **Parse errors**: [`IdError`] for malformed identifiers
//!
//! # Example
//!
//! ```
//! use yarnflow_core::{OrderId, OrderNumber, UserId};
//!
//! let user_id: UserId = "550e8400-e29b-41d4-a716-446655440000".parse().unwrap();
//! let order_id = OrderId::generate();
//!
//! let number: OrderNumber = "PO-1052".parse().unwrap();
//! assert_eq!(number.value(), 1052);
//! # let _ = (user_id, order_id);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod ids;

pub use ids::{AuditId, ContractId, IdError, MessageId, OrderId, OrderNumber, UserId};
