//! Request and response types for order desk operations.
//!
//! These types define the API contracts for accounts, orders, chat and
//! reporting.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use yarnflow_core::UserId;
use yarnflow_store::{ChatMessage, Order, OrderStatus, OrderType, Role, User};

/// The authenticated user performing an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    /// Acting user.
    pub user_id: UserId,
    /// Role of the acting user.
    pub role: Role,
}

impl Actor {
    /// Create an actor.
    #[must_use]
    pub const fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    /// Returns true if the actor is an admin.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Self::new(user.user_id, user.role)
    }
}

/// A user record without its password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// User identifier.
    pub user_id: UserId,
    /// Login name.
    pub username: String,
    /// Email address.
    pub email: String,
    /// Access role.
    pub role: Role,
    /// Whether the account may log in.
    pub is_active: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.user_id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

/// Request to register a new account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// Login name.
    pub username: String,
    /// Email address.
    pub email: String,
    /// Plain-text password.
    pub password: String,
    /// Requested role. Defaults to `user`.
    #[serde(default)]
    pub role: Option<Role>,
}

/// Self-service profile changes. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProfileRequest {
    /// New login name.
    #[serde(default)]
    pub username: Option<String>,
    /// New email address.
    #[serde(default)]
    pub email: Option<String>,
    /// New password.
    #[serde(default)]
    pub password: Option<String>,
}

/// Business fields of an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderFields {
    /// Buying customer.
    pub customer_name: String,
    /// Yarn specification.
    pub yarn_type: String,
    /// Quantity in kilograms.
    pub quantity_kg: f64,
    /// Production start date.
    pub startup_date: NaiveDate,
    /// Local or export.
    pub order_type: OrderType,
    /// Value in US dollars.
    pub amount_usd: f64,
}

/// Request to create an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    /// Business fields.
    #[serde(flatten)]
    pub fields: OrderFields,
    /// Agents to assign; first is primary. Ignored unless the creator is an admin.
    #[serde(default)]
    pub agent_ids: Vec<UserId>,
}

/// Request to edit an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateOrderRequest {
    /// Business fields.
    #[serde(flatten)]
    pub fields: OrderFields,
    /// New status. Admin only.
    #[serde(default)]
    pub status: Option<OrderStatus>,
    /// New assignment; first is primary. Admin only.
    #[serde(default)]
    pub agent_ids: Option<Vec<UserId>>,
}

/// Filters for order lists and the dashboard.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderFilter {
    /// Case-insensitive substring of order number, customer or yarn type.
    #[serde(default)]
    pub search: Option<String>,
    /// Exact status.
    #[serde(default)]
    pub status: Option<OrderStatus>,
    /// Primary agent. Only honoured for admins.
    #[serde(default)]
    pub agent: Option<UserId>,
    /// Exact order type.
    #[serde(default)]
    pub order_type: Option<OrderType>,
}

/// Filters for the admin report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportFilter {
    /// Earliest startup date, inclusive.
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// Latest startup date, inclusive.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Primary agent.
    #[serde(default)]
    pub agent: Option<UserId>,
    /// Case-insensitive customer substring.
    #[serde(default)]
    pub customer: Option<String>,
    /// Exact order type.
    #[serde(default)]
    pub order_type: Option<OrderType>,
}

/// Request to post a chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostMessageRequest {
    /// Message text.
    pub body: String,
    /// Agents to tag. Admin only.
    #[serde(default)]
    pub tagged_agents: Vec<UserId>,
}

/// An order with the stages the caller may move it to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetail {
    /// The order.
    #[serde(flatten)]
    pub order: Order,
    /// Legal move targets for the caller's role. Empty for users.
    pub valid_moves: Vec<OrderStatus>,
}

/// One status column of the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusColumn {
    /// Column status.
    pub status: OrderStatus,
    /// Orders in this status, newest first.
    pub orders: Vec<Order>,
}

/// Summary figures over a set of orders.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderTotals {
    /// Number of orders.
    pub total_orders: usize,
    /// Orders not archived.
    pub active_orders: usize,
    /// Sum of `amount_usd`.
    pub total_value: f64,
    /// Percentage of orders archived, 0-100.
    pub completion_rate: f64,
}

/// The role-filtered board view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dashboard {
    /// Five pipeline columns followed by Confirmed.
    pub columns: Vec<StatusColumn>,
    /// Figures over all visible, filtered orders.
    pub totals: OrderTotals,
    /// Order count per yarn type.
    pub yarn_types: BTreeMap<String, usize>,
}

/// Admin report over a filtered order set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Matching orders, newest first.
    pub orders: Vec<Order>,
    /// Order count per status label.
    pub by_status: BTreeMap<String, usize>,
    /// Order count per order type.
    pub by_type: BTreeMap<String, usize>,
    /// Number of matching orders.
    pub total_orders: usize,
    /// Sum of `amount_usd`.
    pub total_amount: f64,
}

/// Revenue split by order type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Revenue {
    /// All orders.
    pub total: f64,
    /// Local orders.
    pub local: f64,
    /// Export orders.
    pub export: f64,
}

/// System-wide statistics for admins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminStats {
    /// Number of orders.
    pub total_orders: usize,
    /// Number of accounts.
    pub total_users: usize,
    /// Account count per role.
    pub users_by_role: BTreeMap<String, u32>,
    /// Order count per status label.
    pub orders_by_status: BTreeMap<String, usize>,
    /// Primary-assigned order count per agent username.
    pub orders_by_agent: BTreeMap<String, usize>,
    /// Revenue figures.
    pub revenue: Revenue,
    /// Ten newest orders.
    pub recent_orders: Vec<Order>,
    /// Ten newest chat messages.
    pub recent_messages: Vec<ChatMessage>,
}

/// A downloaded contract file.
#[derive(Debug, Clone)]
pub struct ContractFile {
    /// Stored file name.
    pub filename: String,
    /// File contents.
    pub bytes: Vec<u8>,
}

/// Configuration for the order desk service.
#[derive(Debug, Clone)]
pub struct DeskConfig {
    /// Directory where contract files are written.
    pub upload_dir: PathBuf,
    /// Largest accepted contract file, in bytes.
    pub max_contract_bytes: usize,
    /// Minimum password length.
    pub min_password_len: usize,
    /// Attempts at drawing an unused order number before giving up.
    pub order_number_attempts: u32,
    /// Entries shown in "recent" lists.
    pub recent_limit: usize,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            max_contract_bytes: 16 * 1024 * 1024,
            min_password_len: 6,
            order_number_attempts: 50,
            recent_limit: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn desk_config_defaults() {
        let config = DeskConfig::default();
        assert_eq!(config.min_password_len, 6);
        assert_eq!(config.recent_limit, 10);
        assert_eq!(config.upload_dir, PathBuf::from("uploads"));
    }

    #[test]
    fn create_order_request_flattens_fields() {
        let json = r#"{
            "customer_name": "Acme",
            "yarn_type": "Cotton 30s",
            "quantity_kg": 500.0,
            "startup_date": "2025-02-01",
            "order_type": "Export",
            "amount_usd": 1250.5
        }"#;
        let req: CreateOrderRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.fields.customer_name, "Acme");
        assert_eq!(req.fields.order_type, OrderType::Export);
        assert!(req.agent_ids.is_empty());
    }

    #[test]
    fn order_filter_parses_status_label() {
        let filter: OrderFilter =
            serde_json::from_str(r#"{"status": "Under Booking"}"#).unwrap();
        assert_eq!(filter.status, Some(OrderStatus::UnderBooking));
        assert!(filter.search.is_none());
    }

    #[test]
    fn profile_hides_password_hash() {
        let user = User {
            user_id: UserId::generate(),
            username: "agent1".into(),
            email: "agent1@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            role: Role::Agent,
            is_active: true,
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&UserProfile::from(&user)).unwrap();
        assert!(!json.contains("argon2"));
        assert_eq!(Actor::from(&user).role, Role::Agent);
    }
}
