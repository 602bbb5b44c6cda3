//! Per-role visibility of orders, chat messages and contracts.
//!
//! All checks are pure functions of the viewer and the record, so the same
//! rules apply to lists, single lookups and writes.

use yarnflow_core::UserId;
use yarnflow_store::{ChatMessage, Order, OrderStatus, Role};

use crate::types::Actor;

/// Returns true if `user_id` is the primary or a secondary assignee.
#[must_use]
pub fn is_assigned(user_id: &UserId, order: &Order) -> bool {
    order.is_assigned(user_id)
}

/// Check if `viewer` may see `order`.
///
/// Agents lose sight of confirmed orders unless they are the primary assignee.
#[must_use]
pub fn can_view_order(viewer: &Actor, order: &Order) -> bool {
    match viewer.role {
        Role::Admin => true,
        Role::Agent => {
            if order.status == OrderStatus::Confirmed {
                order.primary_agent == Some(viewer.user_id)
            } else {
                is_assigned(&viewer.user_id, order)
            }
        }
        Role::User => order.created_by == viewer.user_id,
    }
}

/// Keep only the orders `viewer` may see.
#[must_use]
pub fn filter_orders(viewer: &Actor, orders: Vec<Order>) -> Vec<Order> {
    orders
        .into_iter()
        .filter(|order| can_view_order(viewer, order))
        .collect()
}

/// Check if `viewer` may see `message`, given they can see its order.
#[must_use]
pub fn can_view_message(viewer: &Actor, message: &ChatMessage) -> bool {
    if message.sender_id == viewer.user_id {
        return true;
    }

    match viewer.role {
        Role::Admin => true,
        Role::Agent => {
            message.sender_role == Role::Admin
                && (message.tagged_agents.is_empty()
                    || message.tagged_agents.contains(&viewer.user_id))
        }
        Role::User => false,
    }
}

/// Keep only the messages `viewer` may see, preserving order.
#[must_use]
pub fn filter_messages(viewer: &Actor, messages: Vec<ChatMessage>) -> Vec<ChatMessage> {
    messages
        .into_iter()
        .filter(|message| can_view_message(viewer, message))
        .collect()
}

/// Check if `viewer` may list, upload or download contracts of `order`.
#[must_use]
pub fn can_access_contract(viewer: &Actor, order: &Order) -> bool {
    match viewer.role {
        Role::Admin => true,
        Role::Agent => order.primary_agent == Some(viewer.user_id),
        Role::User => order.created_by == viewer.user_id,
    }
}

/// Check if `viewer` may edit the business fields of `order`.
#[must_use]
pub fn can_edit_order(viewer: &Actor, order: &Order) -> bool {
    match viewer.role {
        Role::Admin => true,
        Role::Agent => is_assigned(&viewer.user_id, order),
        Role::User => order.created_by == viewer.user_id,
    }
}
