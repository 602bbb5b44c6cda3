//! Order status pipeline and the per-role move guard.
//!
//! # Pipeline
//!
//! ```text
//!  ┌───────────┐   ┌───────────────┐   ┌────────┐   ┌───────────────────┐   ┌──────────┐
//!  │ New Order │◄─►│ Under Booking │◄─►│ Booked │◄─►│ Received Contract │──►│ Archived │
//!  └───────────┘   └───────────────┘   └────────┘   └───────────────────┘   └──────────┘
//!        1                 2                3                 4                  5
//!
//!                        ┌───────────┐
//!   (confirm action) ───►│ Confirmed │   no level, never a move target
//!                        └───────────┘
//! ```
//!
//! - admin: any pipeline stage, from anywhere
//! - agent: one level up or down, never into Archived
//! - user: nothing

use yarnflow_core::OrderId;
use yarnflow_store::{OrderStatus, Role};

use crate::error::{DeskError, Result};

/// Validates a move and returns the target status if allowed.
///
/// # Errors
///
/// Returns `DeskError::InvalidTransition` if the move is not allowed for the role.
pub fn validate_move(
    order_id: &OrderId,
    role: Role,
    from: OrderStatus,
    to: OrderStatus,
) -> Result<OrderStatus> {
    if can_move_order(role, from, to) {
        Ok(to)
    } else {
        Err(DeskError::InvalidTransition {
            order_id: *order_id,
            role,
            from,
            to,
        })
    }
}

/// Check if `role` may move an order from `from` to `to`.
#[must_use]
pub const fn can_move_order(role: Role, from: OrderStatus, to: OrderStatus) -> bool {
    let Some(to_level) = to.level() else {
        return false;
    };

    match role {
        Role::Admin => true,
        Role::Agent => match from.level() {
            Some(from_level) => {
                from_level.abs_diff(to_level) == 1 && !matches!(to, OrderStatus::Archived)
            }
            None => false,
        },
        Role::User => false,
    }
}

/// Returns the statuses `role` may move an order to from `from`.
#[must_use]
pub fn valid_moves_from(role: Role, from: OrderStatus) -> Vec<OrderStatus> {
    OrderStatus::pipeline()
        .into_iter()
        .filter(|&to| to != from && can_move_order(role, from, to))
        .collect()
}

/// Returns true if the order still counts as open work.
#[must_use]
pub const fn is_active(status: OrderStatus) -> bool {
    !matches!(status, OrderStatus::Archived)
}

/// Returns true if the order is at a stage where contracts are handled.
#[must_use]
pub const fn is_contract_stage(status: OrderStatus) -> bool {
    matches!(
        status,
        OrderStatus::Booked | OrderStatus::ReceivedContract
    )
}

/// The status an order moves to when a contract is uploaded, if any.
#[must_use]
pub const fn status_after_contract(status: OrderStatus) -> Option<OrderStatus> {
    match status {
        OrderStatus::Booked => Some(OrderStatus::ReceivedContract),
        _ => None,
    }
}
