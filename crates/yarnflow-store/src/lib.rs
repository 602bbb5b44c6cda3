//! `RocksDB` storage layer for yarnflow.
//!
//! This crate provides persistent storage for users, orders, chat messages,
//! contracts and the audit log using `RocksDB` with column families for
//! efficient indexing.
//!
//! # Architecture
//!
//! ```text
//! users ──────────┬── users_by_username   (lowercase name -> user_id)
//!                 ├── users_by_email      (lowercase email -> user_id)
//!                 └── users_by_role       (role || user_id)
//! orders ─────────┬── orders_by_number    (u16 BE -> order_id)
//!                 ├── orders_by_status    (status || order_id)
//!                 └── orders_by_creator   (user_id || order_id)
//! messages ───────── messages_by_order    (order_id || micros || message_id)
//! contracts ──────── contracts_by_order   (order_id || contract_id)
//! audit_log                               (micros || audit_id)
//! ```
//!
//! Every mutation of a record and its index entries is a single `WriteBatch`.
//! [`Store::commit`] stages several records, typically a change and its audit
//! entry, into one batch so they land together or not at all. Commits are
//! serialized, so unique usernames, emails and order numbers are checked and
//! written without a window for a second writer.
//!
//! # Example
//!
//! ```no_run
//! use yarnflow_store::{Role, RocksStore, Store};
//!
//! let store = RocksStore::open("/tmp/yarnflow-db").unwrap();
//! let agents = store.list_users_by_role(Role::Agent).unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod rocks;
pub mod schema;
pub mod types;

pub use error::{Result, StoreError};
pub use rocks::RocksStore;
pub use types::{
    AuditEntry, ChatMessage, Contract, EntityType, Order, OrderStatus, OrderType, Role,
    UnknownVariant, User,
};

use yarnflow_core::{ContractId, OrderId, OrderNumber, UserId};

/// One record write staged by [`Store::commit`].
#[derive(Debug, Clone, Copy)]
pub enum WriteOp<'a> {
    /// Insert or update a user and its lookup indexes.
    PutUser(&'a User),
    /// Insert or update an order and its indexes.
    PutOrder(&'a Order),
    /// Insert a chat message. The order must exist.
    PutMessage(&'a ChatMessage),
    /// Insert or update a contract record. The order must exist.
    PutContract(&'a Contract),
    /// Append an audit entry.
    AppendAudit(&'a AuditEntry),
}

/// The storage trait defining all database operations.
///
/// Implementations keep primary records and their indexes consistent. Access
/// rules are not enforced here.
pub trait Store: Send + Sync {
    // =========================================================================
    // Batched Writes
    // =========================================================================

    /// Apply `ops` as one atomic write.
    ///
    /// Commits are serialized. Each op may touch a given record at most once.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if a user's username or email, or an
    /// order's number, already belongs to another record, and
    /// `StoreError::NotFound` if a message or contract names a missing
    /// order. Nothing is written when any op fails.
    fn commit(&self, ops: &[WriteOp<'_>]) -> Result<()>;

    // =========================================================================
    // User Operations
    // =========================================================================

    /// Insert or update a user record.
    ///
    /// This also maintains the username, email and role indexes, removing
    /// stale entries when any of them changed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if the username or email belongs to
    /// another user.
    fn put_user(&self, user: &User) -> Result<()> {
        self.commit(&[WriteOp::PutUser(user)])
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_user(&self, user_id: &UserId) -> Result<Option<User>>;

    /// Get a user by username (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Get a user by email (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// List every user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_users(&self) -> Result<Vec<User>>;

    /// List users with a given role.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_users_by_role(&self, role: Role) -> Result<Vec<User>>;

    /// Count users with a given role.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn count_users_by_role(&self, role: Role) -> Result<u32>;

    // =========================================================================
    // Order Operations
    // =========================================================================

    /// Insert or update an order record.
    ///
    /// This also maintains the number, status and creator indexes.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if the order number belongs to another
    /// order.
    fn put_order(&self, order: &Order) -> Result<()> {
        self.commit(&[WriteOp::PutOrder(order)])
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_order(&self, order_id: &OrderId) -> Result<Option<Order>>;

    /// Get an order by its `PO-NNNN` number.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_order_by_number(&self, number: OrderNumber) -> Result<Option<Order>>;

    /// List every order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_orders(&self) -> Result<Vec<Order>>;

    /// List orders with a given status.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_orders_by_status(&self, status: OrderStatus) -> Result<Vec<Order>>;

    /// List orders created by a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_orders_by_creator(&self, user_id: &UserId) -> Result<Vec<Order>>;

    /// Delete an order together with its chat messages and contract records,
    /// appending `audit` in the same batch.
    ///
    /// Returns the removed contracts so the caller can delete their files.
    /// Earlier audit entries are kept.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the order doesn't exist.
    fn delete_order(&self, order_id: &OrderId, audit: &AuditEntry) -> Result<Vec<Contract>>;

    // =========================================================================
    // Chat Operations
    // =========================================================================

    /// Insert a chat message.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the order doesn't exist.
    fn put_message(&self, message: &ChatMessage) -> Result<()> {
        self.commit(&[WriteOp::PutMessage(message)])
    }

    /// List the messages of an order, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_messages_by_order(&self, order_id: &OrderId) -> Result<Vec<ChatMessage>>;

    /// List the most recent messages across all orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_recent_messages(&self, limit: usize) -> Result<Vec<ChatMessage>>;

    // =========================================================================
    // Contract Operations
    // =========================================================================

    /// Insert or update a contract record.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the order doesn't exist.
    fn put_contract(&self, contract: &Contract) -> Result<()> {
        self.commit(&[WriteOp::PutContract(contract)])
    }

    /// Get a contract by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_contract(&self, contract_id: &ContractId) -> Result<Option<Contract>>;

    /// List the contracts of an order, oldest upload first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_contracts_by_order(&self, order_id: &OrderId) -> Result<Vec<Contract>>;

    // =========================================================================
    // Audit Operations
    // =========================================================================

    /// Append an audit entry. Entries are never updated or removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn append_audit(&self, entry: &AuditEntry) -> Result<()> {
        self.commit(&[WriteOp::AppendAudit(entry)])
    }

    /// List audit entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_audit(&self, limit: usize) -> Result<Vec<AuditEntry>>;
}
