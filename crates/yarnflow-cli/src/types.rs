//! API request and response types for the gateway client.
//!
//! These types mirror the JSON exchanged with yarnflow-gateway. Identifiers
//! and status labels are kept as strings; the gateway validates them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Status labels in board order.
pub const STATUS_LABELS: [&str; 6] = [
    "New Order",
    "Under Booking",
    "Booked",
    "Received Contract",
    "Archived",
    "Confirmed",
];

/// Map loose user input (`under-booking`, `booked`) to a status label.
#[must_use]
pub fn status_label(input: &str) -> Option<&'static str> {
    let wanted: String = input
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect();
    STATUS_LABELS.into_iter().find(|label| {
        let normalized: String = label
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .map(|c| c.to_ascii_lowercase())
            .collect();
        normalized == wanted
    })
}

/// Map `local` / `export` to the wire label.
#[must_use]
pub fn order_type_label(input: &str) -> Option<&'static str> {
    match input.trim().to_ascii_lowercase().as_str() {
        "local" => Some("Local"),
        "export" => Some("Export"),
        _ => None,
    }
}

// =============================================================================
// Accounts
// =============================================================================

/// Account as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    /// User ID.
    pub user_id: String,
    /// Login name.
    pub username: String,
    /// Email address.
    pub email: String,
    /// `admin`, `agent` or `user`.
    pub role: String,
    /// Whether the account may log in.
    pub is_active: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Login request body.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    /// Login name.
    pub username: String,
    /// Plain-text password.
    pub password: String,
}

/// Response to a successful login.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    /// Bearer token.
    pub token: String,
    /// Token expiry.
    pub expires_at: DateTime<Utc>,
    /// The logged-in account.
    pub user: UserProfile,
}

// =============================================================================
// Orders
// =============================================================================

/// Order as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Order ID.
    pub order_id: String,
    /// Human-facing number, `PO-NNNN`.
    pub order_number: String,
    /// Buying customer.
    pub customer_name: String,
    /// Yarn specification.
    pub yarn_type: String,
    /// Quantity in kilograms.
    pub quantity_kg: f64,
    /// Production start date.
    pub startup_date: NaiveDate,
    /// `Local` or `Export`.
    pub order_type: String,
    /// Value in US dollars.
    pub amount_usd: f64,
    /// Status label.
    pub status: String,
    /// Creator's user ID.
    pub created_by: String,
    /// Primary agent, if assigned.
    #[serde(default)]
    pub primary_agent: Option<String>,
    /// Secondary agents.
    #[serde(default)]
    pub secondary_agents: Vec<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Statuses the caller may move the order to. Only sent for single orders.
    #[serde(default)]
    pub valid_moves: Vec<String>,
}

/// Response for order lists.
#[derive(Debug, Clone, Deserialize)]
pub struct ListOrdersResponse {
    /// Orders, newest first.
    pub orders: Vec<Order>,
}

/// Query parameters for order lists.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OrderQuery {
    /// Substring match on number, customer or yarn type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// Status label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Agent user ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    /// `Local` or `Export`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_type: Option<String>,
}

/// Request to create an order.
#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderRequest {
    /// Buying customer.
    pub customer_name: String,
    /// Yarn specification.
    pub yarn_type: String,
    /// Quantity in kilograms.
    pub quantity_kg: f64,
    /// Production start date.
    pub startup_date: NaiveDate,
    /// `Local` or `Export`.
    pub order_type: String,
    /// Value in US dollars.
    pub amount_usd: f64,
    /// Agents to assign, primary first. Admin only.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub agent_ids: Vec<String>,
}

/// Request to move an order.
#[derive(Debug, Clone, Serialize)]
pub struct MoveOrderRequest {
    /// Target status label.
    pub status: String,
}

/// Request to replace an order's agents.
#[derive(Debug, Clone, Serialize)]
pub struct AssignAgentsRequest {
    /// Agent IDs, primary first.
    pub agent_ids: Vec<String>,
}

/// Request to confirm an order.
#[derive(Debug, Clone, Serialize)]
pub struct ConfirmOrderRequest {
    /// The agent that keeps the order.
    pub agent_id: String,
}

// =============================================================================
// Chat
// =============================================================================

/// Chat message as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message ID.
    pub message_id: String,
    /// Order the thread belongs to.
    pub order_id: String,
    /// Sender's user ID.
    pub sender_id: String,
    /// Sender's role at send time.
    pub sender_role: String,
    /// Message text.
    pub body: String,
    /// Agents tagged by an admin.
    #[serde(default)]
    pub tagged_agents: Vec<String>,
    /// Send timestamp.
    pub created_at: DateTime<Utc>,
}

/// Response for a chat thread.
#[derive(Debug, Clone, Deserialize)]
pub struct ListMessagesResponse {
    /// Messages, oldest first.
    pub messages: Vec<ChatMessage>,
}

/// Request to post a chat message.
#[derive(Debug, Clone, Serialize)]
pub struct PostMessageRequest {
    /// Message text.
    pub body: String,
    /// Agents to tag. Admin only.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tagged_agents: Vec<String>,
}

// =============================================================================
// Errors
// =============================================================================

/// Error body returned by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    /// Error details.
    pub error: ApiErrorBody,
}

/// Error code and message.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    /// Machine-readable code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}
