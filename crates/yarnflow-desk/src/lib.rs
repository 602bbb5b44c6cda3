//! Order desk for yarnflow.
//!
//! This crate provides the business logic of the order tracker: accounts,
//! the order pipeline, per-role visibility, order chat, contract files and
//! admin reporting. It sits between the HTTP gateway and the storage layer.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Gateway (HTTP)                         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     OrderDeskService                        │
//! │  ┌──────────┐ ┌────────────┐ ┌────────┐ ┌───────────────┐   │
//! │  │ Pipeline │ │ Visibility │ │  Chat  │ │   Contracts   │   │
//! │  │  Guard   │ │  Filters   │ │        │ │   + Reports   │   │
//! │  └──────────┘ └────────────┘ └────────┘ └───────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!               ┌──────────────┼──────────────┐
//!               ▼              ▼              ▼
//!        ┌──────────┐   ┌──────────┐   ┌──────────┐
//!        │  Store   │   │  Auth    │   │ Notifier │
//!        │ (RocksDB)│   │ (argon2) │   │  (log)   │
//!        └──────────┘   └──────────┘   └──────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use yarnflow_desk::{OrderDesk, OrderDeskService};
//! use yarnflow_store::RocksStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(RocksStore::open("/tmp/yarnflow")?);
//! let desk = OrderDeskService::with_defaults(store);
//!
//! desk.seed_default_users().await?;
//! let admin = desk.authenticate("admin", "admin123").await?;
//! println!("Logged in as {}", admin.username);
//! # Ok(())
//! # }
//! ```
//!
//! # Pipeline
//!
//! Orders move through five ordered stages plus a terminal side state:
//!
//! - `New Order` → `Under Booking` → `Booked` → `Received Contract` → `Archived`
//! - `Confirmed` is reached only through [`OrderDesk::confirm_order`]
//!
//! Admins may move between any stages; agents move one step at a time and
//! never archive; users never move orders. See the [`pipeline`] module.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod audit;
pub mod chat;
pub mod contracts;
pub mod error;
pub mod export;
pub mod notify;
pub mod pipeline;
pub mod reports;
pub mod seed;
pub mod service;
pub mod types;
pub mod visibility;

pub use error::{DeskError, Result};
pub use notify::{LogNotifier, NoopNotifier, Notifier, NotifyError};
pub use service::{OrderDesk, OrderDeskService};
pub use types::{
    Actor, AdminStats, ContractFile, CreateOrderRequest, Dashboard, DeskConfig, OrderDetail,
    OrderFields, OrderFilter, OrderTotals, PostMessageRequest, RegisterRequest, Report, ReportFilter, Revenue,
    StatusColumn, UpdateOrderRequest, UpdateProfileRequest, UserProfile,
};

#[cfg(any(test, feature = "test-utils"))]
pub use notify::RecordingNotifier;

// Re-export commonly used types from dependencies for convenience
pub use yarnflow_core::{ContractId, MessageId, OrderId, OrderNumber, UserId};
pub use yarnflow_store::{
    AuditEntry, ChatMessage, Contract, Order, OrderStatus, OrderType, Role, User,
};
