//! Domain types stored in the database.
//!
//! These types represent the persisted state of users, orders, chat messages,
//! contracts and the audit trail.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use yarnflow_core::{AuditId, ContractId, MessageId, OrderId, OrderNumber, UserId};

/// Role of a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Role {
    /// Full access to every order, message and admin surface.
    Admin = 1,
    /// Staff member assignable to orders.
    Agent = 2,
    /// Customer who creates orders.
    User = 3,
}

impl Role {
    /// All roles, in index order.
    pub const ALL: [Self; 3] = [Self::Admin, Self::Agent, Self::User];

    /// Convert the role to its numeric representation.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Try to convert a numeric value to a `Role`.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Admin),
            2 => Some(Self::Agent),
            3 => Some(Self::User),
            _ => None,
        }
    }

    /// The lowercase wire name of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Agent => "agent",
            Self::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

/// Status of an order.
///
/// The first five variants form the ordered pipeline. `Confirmed` sits outside
/// the pipeline and is only reached through the confirmation action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum OrderStatus {
    /// Freshly submitted.
    #[serde(rename = "New Order")]
    NewOrder = 1,
    /// Agents are negotiating the booking.
    #[serde(rename = "Under Booking")]
    UnderBooking = 2,
    /// Booking agreed, waiting for the contract.
    #[serde(rename = "Booked")]
    Booked = 3,
    /// Signed contract is on file.
    #[serde(rename = "Received Contract")]
    ReceivedContract = 4,
    /// Closed out.
    #[serde(rename = "Archived")]
    Archived = 5,
    /// Confirmed and handed to a single agent.
    #[serde(rename = "Confirmed")]
    Confirmed = 6,
}

impl OrderStatus {
    /// Every status, pipeline first.
    pub const ALL: [Self; 6] = [
        Self::NewOrder,
        Self::UnderBooking,
        Self::Booked,
        Self::ReceivedContract,
        Self::Archived,
        Self::Confirmed,
    ];

    /// The five pipeline stages in order.
    #[must_use]
    pub const fn pipeline() -> [Self; 5] {
        [
            Self::NewOrder,
            Self::UnderBooking,
            Self::Booked,
            Self::ReceivedContract,
            Self::Archived,
        ]
    }

    /// Position in the pipeline (1-5), or `None` for `Confirmed`.
    #[must_use]
    pub const fn level(self) -> Option<u8> {
        match self {
            Self::Confirmed => None,
            other => Some(other as u8),
        }
    }

    /// Convert the status to its numeric representation.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Try to convert a numeric value to an `OrderStatus`.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::NewOrder),
            2 => Some(Self::UnderBooking),
            3 => Some(Self::Booked),
            4 => Some(Self::ReceivedContract),
            5 => Some(Self::Archived),
            6 => Some(Self::Confirmed),
            _ => None,
        }
    }

    /// Display label, identical to the serialized form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NewOrder => "New Order",
            Self::UnderBooking => "Under Booking",
            Self::Booked => "Booked",
            Self::ReceivedContract => "Received Contract",
            Self::Archived => "Archived",
            Self::Confirmed => "Confirmed",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

/// Whether an order is domestic or for export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderType {
    /// Domestic delivery.
    Local,
    /// International delivery.
    Export,
}

impl OrderType {
    /// Both order types.
    pub const ALL: [Self; 2] = [Self::Local, Self::Export];

    /// Display label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "Local",
            Self::Export => "Export",
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

/// Returned when parsing an enum label that matches no variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown value: {0}")]
pub struct UnknownVariant(pub String);

/// A user account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier for the user.
    pub user_id: UserId,
    /// Login name, unique (case-insensitive).
    pub username: String,
    /// Email address, unique (case-insensitive).
    pub email: String,
    /// Argon2 PHC string.
    pub password_hash: String,
    /// Access role.
    pub role: Role,
    /// Deactivated users cannot log in or act.
    pub is_active: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// A purchase order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Unique identifier for the order.
    pub order_id: OrderId,
    /// Human-facing order number.
    pub order_number: OrderNumber,
    /// Buying customer.
    pub customer_name: String,
    /// Yarn specification, free text.
    pub yarn_type: String,
    /// Ordered quantity in kilograms.
    pub quantity_kg: f64,
    /// Production start date.
    pub startup_date: NaiveDate,
    /// Local or export.
    pub order_type: OrderType,
    /// Order value in US dollars.
    pub amount_usd: f64,
    /// Current status.
    pub status: OrderStatus,
    /// User who submitted the order.
    pub created_by: UserId,
    /// The responsible agent.
    pub primary_agent: Option<UserId>,
    /// Additional assignees. Never contains `primary_agent` or duplicates.
    #[serde(default)]
    pub secondary_agents: Vec<UserId>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Returns true if `user_id` is the primary or a secondary assignee.
    #[must_use]
    pub fn is_assigned(&self, user_id: &UserId) -> bool {
        self.primary_agent.as_ref() == Some(user_id) || self.secondary_agents.contains(user_id)
    }

    /// Primary followed by secondaries.
    #[must_use]
    pub fn assignees(&self) -> Vec<UserId> {
        self.primary_agent
            .into_iter()
            .chain(self.secondary_agents.iter().copied())
            .collect()
    }
}

/// A chat message posted on an order thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Unique identifier for the message.
    pub message_id: MessageId,
    /// The order this message belongs to.
    pub order_id: OrderId,
    /// Author.
    pub sender_id: UserId,
    /// Author's role when the message was sent.
    pub sender_role: Role,
    /// Message text.
    pub body: String,
    /// Agents the message is addressed to. Empty means all agents.
    #[serde(default)]
    pub tagged_agents: Vec<UserId>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Metadata of a contract file attached to an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    /// Unique identifier for the contract.
    pub contract_id: ContractId,
    /// The order this contract belongs to.
    pub order_id: OrderId,
    /// Stored file name (`PO-NNNN_original.pdf`).
    pub filename: String,
    /// Location of the file on disk.
    pub stored_path: String,
    /// File size in bytes.
    pub size_bytes: u64,
    /// blake3 hex digest of the file contents.
    pub checksum: String,
    /// Uploader.
    pub uploaded_by: UserId,
    /// Upload timestamp.
    pub uploaded_at: DateTime<Utc>,
}

/// Kind of entity an audit entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// An order.
    Order,
    /// A user account.
    User,
    /// A contract file.
    Contract,
    /// A chat message.
    Chat,
}

/// An append-only audit record of a user action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Unique identifier for the entry.
    pub audit_id: AuditId,
    /// Acting user.
    pub user_id: UserId,
    /// Action name, e.g. `order_moved`.
    pub action: String,
    /// What kind of entity was acted upon.
    pub entity_type: EntityType,
    /// Identifier of the entity, as a string.
    pub entity_id: String,
    /// Free-form description.
    pub details: Option<String>,
    /// When the action happened.
    pub created_at: DateTime<Utc>,
}
