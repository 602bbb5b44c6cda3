//! Database schema definitions and column families.
//!
//! Primary records are CBOR values keyed by their 16-byte id. Index families
//! store empty values; all information lives in the key.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Primary user records, keyed by `user_id`.
    pub const USERS: &str = "users";

    /// Index: lowercase username to `user_id`.
    pub const USERS_BY_USERNAME: &str = "users_by_username";

    /// Index: lowercase email to `user_id`.
    pub const USERS_BY_EMAIL: &str = "users_by_email";

    /// Index: users by role, keyed by `role || user_id`.
    pub const USERS_BY_ROLE: &str = "users_by_role";

    /// Primary order records, keyed by `order_id`.
    pub const ORDERS: &str = "orders";

    /// Index: order number (u16 BE) to `order_id`.
    pub const ORDERS_BY_NUMBER: &str = "orders_by_number";

    /// Index: orders by status, keyed by `status || order_id`.
    pub const ORDERS_BY_STATUS: &str = "orders_by_status";

    /// Index: orders by creator, keyed by `user_id || order_id`.
    pub const ORDERS_BY_CREATOR: &str = "orders_by_creator";

    /// Primary chat message records, keyed by `message_id`.
    pub const MESSAGES: &str = "messages";

    /// Index: messages by order, keyed by `order_id || micros || message_id`.
    pub const MESSAGES_BY_ORDER: &str = "messages_by_order";

    /// Primary contract records, keyed by `contract_id`.
    pub const CONTRACTS: &str = "contracts";

    /// Index: contracts by order, keyed by `order_id || contract_id`.
    pub const CONTRACTS_BY_ORDER: &str = "contracts_by_order";

    /// Audit entries, keyed by `micros || audit_id`.
    pub const AUDIT_LOG: &str = "audit_log";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::USERS,
        cf::USERS_BY_USERNAME,
        cf::USERS_BY_EMAIL,
        cf::USERS_BY_ROLE,
        cf::ORDERS,
        cf::ORDERS_BY_NUMBER,
        cf::ORDERS_BY_STATUS,
        cf::ORDERS_BY_CREATOR,
        cf::MESSAGES,
        cf::MESSAGES_BY_ORDER,
        cf::CONTRACTS,
        cf::CONTRACTS_BY_ORDER,
        cf::AUDIT_LOG,
    ]
}
