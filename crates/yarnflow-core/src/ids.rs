//! Core identifier types for yarnflow.
//!
//! Every persisted entity is keyed by a UUID v4 wrapped in its own newtype so
//! that a `UserId` can never be passed where an `OrderId` is expected. Orders
//! additionally carry a human-facing [`OrderNumber`] (`PO-1052`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Declares a UUID-backed identifier newtype with string serde, parsing and
/// byte access.
macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(uuid::Uuid);

        impl $name {
            /// Create the identifier from a UUID.
            #[must_use]
            pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            /// Create the identifier from raw UUID bytes.
            #[must_use]
            pub const fn from_bytes(bytes: [u8; 16]) -> Self {
                Self(uuid::Uuid::from_bytes(bytes))
            }

            /// Generate a new random identifier.
            #[must_use]
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            /// Return the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> &uuid::Uuid {
                &self.0
            }

            /// Return the bytes of the UUID.
            #[must_use]
            pub fn as_bytes(&self) -> &[u8; 16] {
                self.0.as_bytes()
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = uuid::Uuid::parse_str(s).map_err(|_| IdError::InvalidUuid)?;
                Ok(Self(uuid))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0.to_string()
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                self.0.as_bytes()
            }
        }
    };
}

uuid_id! {
    /// Identifier of a user account (admin, agent or customer).
    UserId
}

uuid_id! {
    /// Identifier of a purchase order record.
    OrderId
}

uuid_id! {
    /// Identifier of a chat message posted on an order.
    MessageId
}

uuid_id! {
    /// Identifier of an uploaded contract file.
    ContractId
}

uuid_id! {
    /// Identifier of an audit log entry.
    AuditId
}

/// Human-facing purchase order number, rendered as `PO-NNNN`.
///
/// Numbers are four digits (1000-9999). They are unique per store but not
/// sequential; callers retry generation on collision.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderNumber(u16);

impl OrderNumber {
    /// Smallest valid number.
    pub const MIN: u16 = 1000;
    /// Largest valid number.
    pub const MAX: u16 = 9999;

    const PREFIX: &'static str = "PO-";

    /// Create an order number from its numeric part.
    ///
    /// # Errors
    ///
    /// Returns `IdError::OrderNumberOutOfRange` if the value is not four digits.
    pub fn new(value: u16) -> Result<Self, IdError> {
        if value < Self::MIN || value > Self::MAX {
            return Err(IdError::OrderNumberOutOfRange(value));
        }
        Ok(Self(value))
    }

    /// Draw a random order number in the valid range.
    #[must_use]
    pub fn random() -> Self {
        let span = u128::from(Self::MAX - Self::MIN + 1);
        let offset = u16::try_from(uuid::Uuid::new_v4().as_u128() % span).unwrap_or_default();
        Self(Self::MIN + offset)
    }

    /// Return the numeric part.
    #[must_use]
    pub const fn value(self) -> u16 {
        self.0
    }
}

impl FromStr for OrderNumber {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix(Self::PREFIX)
            .ok_or_else(|| IdError::InvalidOrderNumber(s.to_string()))?;
        let value: u16 = digits
            .parse()
            .map_err(|_| IdError::InvalidOrderNumber(s.to_string()))?;
        Self::new(value)
    }
}

impl fmt::Debug for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OrderNumber({self})")
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::PREFIX, self.0)
    }
}

impl TryFrom<String> for OrderNumber {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OrderNumber> for String {
    fn from(number: OrderNumber) -> Self {
        number.to_string()
    }
}

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The input is not a valid UUID.
    #[error("invalid UUID format")]
    InvalidUuid,

    /// The input is not of the form `PO-NNNN`.
    #[error("invalid order number: {0}")]
    InvalidOrderNumber(String),

    /// The numeric part is not four digits.
    #[error("order number out of range: {0}")]
    OrderNumberOutOfRange(u16),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_roundtrip() {
        let id = UserId::generate();
        let parsed = UserId::from_str(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn order_id_invalid_uuid() {
        let result = OrderId::from_str("not-a-uuid");
        assert!(matches!(result, Err(IdError::InvalidUuid)));
    }

    #[test]
    fn ids_are_distinct_types_with_same_bytes() {
        let bytes = [7u8; 16];
        let user = UserId::from_bytes(bytes);
        let order = OrderId::from_bytes(bytes);
        assert_eq!(user.as_bytes(), order.as_bytes());
        assert_eq!(format!("{user:?}"), format!("UserId({})", user));
    }

    #[test]
    fn message_id_serde_json() {
        let id = MessageId::generate();
        let json = serde_json::to_string(&id).unwrap();
        let parsed: MessageId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn order_number_display_and_parse() {
        let number = OrderNumber::new(1052).unwrap();
        assert_eq!(number.to_string(), "PO-1052");
        assert_eq!(OrderNumber::from_str("PO-1052").unwrap(), number);
    }

    #[test]
    fn order_number_rejects_bad_input() {
        assert!(matches!(
            OrderNumber::from_str("1052"),
            Err(IdError::InvalidOrderNumber(_))
        ));
        assert!(matches!(
            OrderNumber::from_str("PO-abc"),
            Err(IdError::InvalidOrderNumber(_))
        ));
        assert!(matches!(
            OrderNumber::from_str("PO-999"),
            Err(IdError::OrderNumberOutOfRange(999))
        ));
        assert!(OrderNumber::new(10_000).is_err());
    }

    #[test]
    fn order_number_random_in_range() {
        for _ in 0..200 {
            let n = OrderNumber::random().value();
            assert!((OrderNumber::MIN..=OrderNumber::MAX).contains(&n));
        }
    }

    #[test]
    fn order_number_serde_json() {
        let number = OrderNumber::new(4321).unwrap();
        let json = serde_json::to_string(&number).unwrap();
        assert_eq!(json, "\"PO-4321\"");
        let parsed: OrderNumber = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, number);
    }
}
