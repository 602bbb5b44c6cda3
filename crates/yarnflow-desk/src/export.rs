//! CSV export of orders.

use std::collections::HashMap;

use yarnflow_core::UserId;
use yarnflow_store::Order;

use crate::error::{DeskError, Result};

/// Column headers of the order export.
pub const HEADERS: [&str; 12] = [
    "Order ID",
    "Customer Name",
    "Yarn Type",
    "Quantity (kg)",
    "Startup Date",
    "Order Type",
    "Amount (USD)",
    "Status",
    "Created By",
    "Assigned Agent",
    "Created At",
    "Updated At",
];

/// File name suggested to clients.
pub const EXPORT_FILENAME: &str = "orders_export.csv";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render `orders` as CSV. `usernames` resolves creator and agent ids;
/// unknown ids render as the raw id.
///
/// # Errors
///
/// Returns an error if CSV encoding fails.
pub fn orders_to_csv(orders: &[Order], usernames: &HashMap<UserId, String>) -> Result<String> {
    let name = |id: &UserId| {
        usernames
            .get(id)
            .cloned()
            .unwrap_or_else(|| id.to_string())
    };

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADERS)?;

    for order in orders {
        let agent = order
            .primary_agent
            .as_ref()
            .map_or_else(|| "Unassigned".to_string(), name);

        writer.write_record([
            order.order_number.to_string(),
            order.customer_name.clone(),
            order.yarn_type.clone(),
            order.quantity_kg.to_string(),
            order.startup_date.format("%Y-%m-%d").to_string(),
            order.order_type.to_string(),
            order.amount_usd.to_string(),
            order.status.to_string(),
            name(&order.created_by),
            agent,
            order.created_at.format(TIMESTAMP_FORMAT).to_string(),
            order.updated_at.format(TIMESTAMP_FORMAT).to_string(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| DeskError::Internal(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| DeskError::Internal(e.to_string()))
}
