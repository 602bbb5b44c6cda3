//! Audit trail helpers.

use chrono::Utc;
use yarnflow_core::{AuditId, UserId};
use yarnflow_store::{AuditEntry, EntityType, Store};

use crate::error::Result;

/// Actions recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    /// An order was created.
    OrderCreated,
    /// Order fields were edited.
    OrderUpdated,
    /// An order changed pipeline stage.
    OrderMoved,
    /// Agents were assigned to an order.
    OrderAssigned,
    /// An order was confirmed to a single agent.
    OrderConfirmed,
    /// An order and its thread were deleted.
    OrderDeleted,
    /// A chat message was posted.
    MessageSent,
    /// A contract file was uploaded.
    ContractUploaded,
    /// A contract file was downloaded.
    ContractDownloaded,
    /// An account was reactivated.
    UserActivated,
    /// An account was deactivated.
    UserDeactivated,
}

impl AuditAction {
    /// The stored action name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OrderCreated => "order_created",
            Self::OrderUpdated => "order_updated",
            Self::OrderMoved => "order_moved",
            Self::OrderAssigned => "order_assigned",
            Self::OrderConfirmed => "order_confirmed",
            Self::OrderDeleted => "order_deleted",
            Self::MessageSent => "message_sent",
            Self::ContractUploaded => "contract_uploaded",
            Self::ContractDownloaded => "contract_downloaded",
            Self::UserActivated => "user_activated",
            Self::UserDeactivated => "user_deactivated",
        }
    }

    /// The kind of entity this action applies to.
    #[must_use]
    pub const fn entity_type(self) -> EntityType {
        match self {
            Self::OrderCreated
            | Self::OrderUpdated
            | Self::OrderMoved
            | Self::OrderAssigned
            | Self::OrderConfirmed
            | Self::OrderDeleted => EntityType::Order,
            Self::MessageSent => EntityType::Chat,
            Self::ContractUploaded | Self::ContractDownloaded => EntityType::Contract,
            Self::UserActivated | Self::UserDeactivated => EntityType::User,
        }
    }
}

/// Build an audit entry for `action` on `entity_id` without writing it.
///
/// Mutations stage the entry next to their record with
/// `WriteOp::AppendAudit` so both land in one batch.
pub fn entry(
    user_id: &UserId,
    action: AuditAction,
    entity_id: impl ToString,
    details: impl Into<String>,
) -> AuditEntry {
    AuditEntry {
        audit_id: AuditId::generate(),
        user_id: *user_id,
        action: action.as_str().to_string(),
        entity_type: action.entity_type(),
        entity_id: entity_id.to_string(),
        details: Some(details.into()),
        created_at: Utc::now(),
    }
}

/// Append a stand-alone audit entry for `action` on `entity_id`.
///
/// For actions that change nothing else, such as a download.
///
/// # Errors
///
/// Returns an error if the store write fails.
pub fn record<S: Store>(
    store: &S,
    user_id: &UserId,
    action: AuditAction,
    entity_id: impl ToString,
    details: impl Into<String>,
) -> Result<AuditEntry> {
    let entry = entry(user_id, action, entity_id, details);

    store.append_audit(&entry)?;
    tracing::debug!(user_id = %user_id, action = action.as_str(), "Recorded audit entry");

    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use yarnflow_core::OrderId;
    use yarnflow_store::RocksStore;
    use tempfile::TempDir;

    #[test]
    fn record_appends_entry() {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        let user_id = UserId::generate();
        let order_id = OrderId::generate();

        let entry = record(
            &store,
            &user_id,
            AuditAction::OrderMoved,
            order_id,
            "Moved PO-1000 from New Order to Under Booking",
        )
        .unwrap();

        assert_eq!(entry.action, "order_moved");
        assert_eq!(entry.entity_type, EntityType::Order);
        assert_eq!(entry.entity_id, order_id.to_string());

        let stored = store.list_audit(10).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].audit_id, entry.audit_id);
    }

    #[test]
    fn entry_is_built_but_not_written() {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        let user_id = UserId::generate();

        let built = entry(&user_id, AuditAction::UserDeactivated, user_id, "Deactivated bob");

        assert_eq!(built.entity_type, EntityType::User);
        assert_eq!(built.details.as_deref(), Some("Deactivated bob"));
        assert!(store.list_audit(10).unwrap().is_empty());
    }

    #[test]
    fn action_entity_types() {
        assert_eq!(AuditAction::MessageSent.entity_type(), EntityType::Chat);
        assert_eq!(
            AuditAction::ContractDownloaded.entity_type(),
            EntityType::Contract
        );
        assert_eq!(AuditAction::UserDeactivated.as_str(), "user_deactivated");
    }
}
