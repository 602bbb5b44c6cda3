//! Plain-text rendering of API results.

use std::fmt::Write as _;

use crate::types::{ChatMessage, Order};

/// One line per order: number, status, customer, yarn, quantity, amount.
#[must_use]
pub fn order_table(orders: &[Order]) -> String {
    if orders.is_empty() {
        return "No orders.\n".to_string();
    }

    let mut out = format!(
        "{:<8} {:<18} {:<24} {:<18} {:>10} {:>12}\n",
        "NUMBER", "STATUS", "CUSTOMER", "YARN", "QTY (KG)", "AMOUNT (USD)"
    );
    for order in orders {
        let _ = writeln!(
            out,
            "{:<8} {:<18} {:<24} {:<18} {:>10.1} {:>12.2}",
            order.order_number,
            order.status,
            truncate(&order.customer_name, 24),
            truncate(&order.yarn_type, 18),
            order.quantity_kg,
            order.amount_usd,
        );
    }
    out
}

/// Multi-line detail view of one order.
#[must_use]
pub fn order_detail(order: &Order) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} ({})", order.order_number, order.order_id);
    let _ = writeln!(out, "  status:    {}", order.status);
    let _ = writeln!(out, "  customer:  {}", order.customer_name);
    let _ = writeln!(out, "  yarn:      {}", order.yarn_type);
    let _ = writeln!(out, "  quantity:  {} kg", order.quantity_kg);
    let _ = writeln!(out, "  startup:   {}", order.startup_date);
    let _ = writeln!(out, "  type:      {}", order.order_type);
    let _ = writeln!(out, "  amount:    ${:.2}", order.amount_usd);
    let _ = writeln!(
        out,
        "  primary:   {}",
        order.primary_agent.as_deref().unwrap_or("unassigned")
    );
    if !order.secondary_agents.is_empty() {
        let _ = writeln!(out, "  secondary: {}", order.secondary_agents.join(", "));
    }
    let _ = writeln!(out, "  updated:   {}", order.updated_at.format("%Y-%m-%d %H:%M"));
    if !order.valid_moves.is_empty() {
        let _ = writeln!(out, "  moves:     {}", order.valid_moves.join(", "));
    }
    out
}

/// Chat thread, oldest first.
#[must_use]
pub fn message_list(messages: &[ChatMessage]) -> String {
    if messages.is_empty() {
        return "No messages.\n".to_string();
    }

    let mut out = String::new();
    for message in messages {
        let _ = write!(
            out,
            "[{}] {} ({}): {}",
            message.created_at.format("%Y-%m-%d %H:%M"),
            message.sender_id,
            message.sender_role,
            message.body
        );
        if !message.tagged_agents.is_empty() {
            let _ = write!(out, "  @{}", message.tagged_agents.join(" @"));
        }
        out.push('\n');
    }
    out
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        value.to_string()
    } else {
        let mut cut: String = value.chars().take(width.saturating_sub(1)).collect();
        cut.push('~');
        cut
    }
}
