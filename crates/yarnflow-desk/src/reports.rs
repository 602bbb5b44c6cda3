//! Dashboard, report and statistics aggregation.
//!
//! Pure functions over already visibility-filtered order sets.

use std::collections::BTreeMap;

use yarnflow_store::{Order, OrderStatus, OrderType};

use crate::pipeline;
use crate::types::{
    Dashboard, OrderFilter, OrderTotals, Report, ReportFilter, Revenue, StatusColumn,
};

/// Check `order` against a list filter. The agent filter is only applied
/// when `honour_agent` is set.
#[must_use]
pub fn matches_filter(order: &Order, filter: &OrderFilter, honour_agent: bool) -> bool {
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let needle = search.to_lowercase();
        let hit = order.order_number.to_string().to_lowercase().contains(&needle)
            || order.customer_name.to_lowercase().contains(&needle)
            || order.yarn_type.to_lowercase().contains(&needle);
        if !hit {
            return false;
        }
    }
    if filter.status.is_some_and(|s| s != order.status) {
        return false;
    }
    if honour_agent && filter.agent.is_some() && filter.agent != order.primary_agent {
        return false;
    }
    if filter.order_type.is_some_and(|t| t != order.order_type) {
        return false;
    }
    true
}

/// Check `order` against the admin report filter.
#[must_use]
pub fn matches_report(order: &Order, filter: &ReportFilter) -> bool {
    if filter.start_date.is_some_and(|d| order.startup_date < d) {
        return false;
    }
    if filter.end_date.is_some_and(|d| order.startup_date > d) {
        return false;
    }
    if filter.agent.is_some() && filter.agent != order.primary_agent {
        return false;
    }
    if let Some(customer) = filter.customer.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        if !order
            .customer_name
            .to_lowercase()
            .contains(&customer.to_lowercase())
        {
            return false;
        }
    }
    if filter.order_type.is_some_and(|t| t != order.order_type) {
        return false;
    }
    true
}

/// Sort orders newest first.
pub fn sort_newest_first(orders: &mut [Order]) {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// Summary figures over `orders`.
#[must_use]
pub fn totals(orders: &[Order]) -> OrderTotals {
    let total_orders = orders.len();
    let active_orders = orders
        .iter()
        .filter(|o| pipeline::is_active(o.status))
        .count();
    let archived = total_orders - active_orders;
    let total_value = orders.iter().map(|o| o.amount_usd).sum();
    let completion_rate = if total_orders == 0 {
        0.0
    } else {
        percentage(archived, total_orders)
    };

    OrderTotals {
        total_orders,
        active_orders,
        total_value,
        completion_rate,
    }
}

#[allow(clippy::cast_precision_loss)]
fn percentage(part: usize, whole: usize) -> f64 {
    let rate = part as f64 / whole as f64 * 100.0;
    (rate * 10.0).round() / 10.0
}

/// Group orders into the board columns: the pipeline, then Confirmed.
#[must_use]
pub fn dashboard(mut orders: Vec<Order>) -> Dashboard {
    sort_newest_first(&mut orders);
    let totals = totals(&orders);
    let yarn_types = yarn_distribution(&orders);

    let columns = OrderStatus::ALL
        .into_iter()
        .map(|status| StatusColumn {
            status,
            orders: orders
                .iter()
                .filter(|o| o.status == status)
                .cloned()
                .collect(),
        })
        .collect();

    Dashboard {
        columns,
        totals,
        yarn_types,
    }
}

/// Order count per yarn type.
#[must_use]
pub fn yarn_distribution(orders: &[Order]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for order in orders {
        *counts.entry(order.yarn_type.clone()).or_insert(0) += 1;
    }
    counts
}

/// Order count per status label, including zero entries.
#[must_use]
pub fn count_by_status(orders: &[Order]) -> BTreeMap<String, usize> {
    OrderStatus::ALL
        .into_iter()
        .map(|status| {
            let n = orders.iter().filter(|o| o.status == status).count();
            (status.to_string(), n)
        })
        .collect()
}

/// Order count per order type, including zero entries.
#[must_use]
pub fn count_by_type(orders: &[Order]) -> BTreeMap<String, usize> {
    OrderType::ALL
        .into_iter()
        .map(|t| {
            let n = orders.iter().filter(|o| o.order_type == t).count();
            (t.to_string(), n)
        })
        .collect()
}

/// Build the admin report over `orders`.
#[must_use]
pub fn report(orders: Vec<Order>, filter: &ReportFilter) -> Report {
    let mut orders: Vec<Order> = orders
        .into_iter()
        .filter(|o| matches_report(o, filter))
        .collect();
    sort_newest_first(&mut orders);

    Report {
        by_status: count_by_status(&orders),
        by_type: count_by_type(&orders),
        total_orders: orders.len(),
        total_amount: orders.iter().map(|o| o.amount_usd).sum(),
        orders,
    }
}

/// Revenue over `orders`, split by order type.
#[must_use]
pub fn revenue(orders: &[Order]) -> Revenue {
    let sum_of = |t: OrderType| {
        orders
            .iter()
            .filter(|o| o.order_type == t)
            .map(|o| o.amount_usd)
            .sum()
    };
    Revenue {
        total: orders.iter().map(|o| o.amount_usd).sum(),
        local: sum_of(OrderType::Local),
        export: sum_of(OrderType::Export),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, Utc};
    use yarnflow_core::{OrderId, OrderNumber, UserId};

    fn order(n: u16, status: OrderStatus, order_type: OrderType, amount: f64) -> Order {
        Order {
            order_id: OrderId::generate(),
            order_number: OrderNumber::new(n).unwrap(),
            customer_name: format!("Customer {n}"),
            yarn_type: if n % 2 == 0 { "Cotton" } else { "Polyester" }.to_string(),
            quantity_kg: 100.0,
            startup_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
                + Duration::days(i64::from(n - 1000)),
            order_type,
            amount_usd: amount,
            status,
            created_by: UserId::generate(),
            primary_agent: None,
            secondary_agents: Vec::new(),
            created_at: Utc::now() + Duration::seconds(i64::from(n)),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn search_matches_number_customer_and_yarn() {
        let o = order(1234, OrderStatus::NewOrder, OrderType::Local, 1.0);
        let search = |s: &str| OrderFilter {
            search: Some(s.to_string()),
            ..OrderFilter::default()
        };

        assert!(matches_filter(&o, &search("po-12"), true));
        assert!(matches_filter(&o, &search("customer 1234"), true));
        assert!(matches_filter(&o, &search("COTTON"), true));
        assert!(!matches_filter(&o, &search("wool"), true));
        assert!(matches_filter(&o, &search("   "), true));
    }

    #[test]
    fn agent_filter_only_when_honoured() {
        let mut o = order(1001, OrderStatus::Booked, OrderType::Export, 1.0);
        let agent = UserId::generate();
        let filter = OrderFilter {
            agent: Some(agent),
            ..OrderFilter::default()
        };

        assert!(!matches_filter(&o, &filter, true));
        assert!(matches_filter(&o, &filter, false));
        o.primary_agent = Some(agent);
        assert!(matches_filter(&o, &filter, true));
    }

    #[test]
    fn status_and_type_filters() {
        let o = order(1001, OrderStatus::Booked, OrderType::Export, 1.0);
        let filter = OrderFilter {
            status: Some(OrderStatus::Booked),
            order_type: Some(OrderType::Local),
            ..OrderFilter::default()
        };
        assert!(!matches_filter(&o, &filter, true));
    }

    #[test]
    fn dashboard_groups_and_totals() {
        let orders = vec![
            order(1000, OrderStatus::NewOrder, OrderType::Local, 100.0),
            order(1001, OrderStatus::NewOrder, OrderType::Export, 200.0),
            order(1002, OrderStatus::Archived, OrderType::Local, 300.0),
            order(1003, OrderStatus::Confirmed, OrderType::Export, 400.0),
        ];
        let board = dashboard(orders);

        assert_eq!(board.columns.len(), 6);
        assert_eq!(board.columns[0].status, OrderStatus::NewOrder);
        assert_eq!(board.columns[0].orders.len(), 2);
        assert_eq!(
            board.columns[0].orders[0].order_number,
            OrderNumber::new(1001).unwrap()
        );
        assert_eq!(board.columns[5].status, OrderStatus::Confirmed);
        assert_eq!(board.columns[5].orders.len(), 1);

        assert_eq!(board.totals.total_orders, 4);
        assert_eq!(board.totals.active_orders, 3);
        assert!((board.totals.total_value - 1000.0).abs() < f64::EPSILON);
        assert!((board.totals.completion_rate - 25.0).abs() < f64::EPSILON);
        assert_eq!(board.yarn_types.get("Cotton"), Some(&2));
        assert_eq!(board.yarn_types.get("Polyester"), Some(&2));
    }

    #[test]
    fn empty_totals() {
        let t = totals(&[]);
        assert_eq!(t, OrderTotals::default());
    }

    #[test]
    fn report_filters_by_date_and_customer() {
        let orders = vec![
            order(1000, OrderStatus::NewOrder, OrderType::Local, 100.0),
            order(1010, OrderStatus::Booked, OrderType::Export, 200.0),
            order(1020, OrderStatus::Archived, OrderType::Export, 300.0),
        ];
        let filter = ReportFilter {
            start_date: NaiveDate::from_ymd_opt(2025, 1, 5),
            end_date: NaiveDate::from_ymd_opt(2025, 1, 25),
            ..ReportFilter::default()
        };
        let r = report(orders.clone(), &filter);
        assert_eq!(r.total_orders, 2);
        assert!((r.total_amount - 500.0).abs() < f64::EPSILON);
        assert_eq!(r.by_type.get("Export"), Some(&2));
        assert_eq!(r.by_type.get("Local"), Some(&0));
        assert_eq!(r.by_status.get("Booked"), Some(&1));
        assert_eq!(r.by_status.len(), 6);

        let by_customer = report(
            orders,
            &ReportFilter {
                customer: Some("customer 1000".into()),
                ..ReportFilter::default()
            },
        );
        assert_eq!(by_customer.total_orders, 1);
    }

    #[test]
    fn revenue_split() {
        let orders = vec![
            order(1000, OrderStatus::NewOrder, OrderType::Local, 100.0),
            order(1001, OrderStatus::NewOrder, OrderType::Export, 250.0),
        ];
        let r = revenue(&orders);
        assert!((r.total - 350.0).abs() < f64::EPSILON);
        assert!((r.local - 100.0).abs() < f64::EPSILON);
        assert!((r.export - 250.0).abs() < f64::EPSILON);
    }
}
