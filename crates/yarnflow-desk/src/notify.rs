//! Assignment notifications.
//!
//! Agents are told when they are put on an order. Delivery is best-effort:
//! the desk logs a failed notification and carries on.

use async_trait::async_trait;
use yarnflow_store::{Order, User};

/// Error returned by a notifier.
#[derive(Debug, thiserror::Error)]
#[error("notification failed: {0}")]
pub struct NotifyError(pub String);

/// Trait for delivering assignment notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Tell `agent` they have been assigned to `order`.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError` if delivery fails.
    async fn notify_assignment(&self, agent: &User, order: &Order) -> Result<(), NotifyError>;
}

/// Subject line for an assignment email.
#[must_use]
pub fn assignment_subject(order: &Order) -> String {
    format!("New Order Assignment: {}", order.order_number)
}

/// Body text for an assignment email.
#[must_use]
pub fn assignment_body(agent: &User, order: &Order) -> String {
    format!(
        "Hello {},\n\nYou have been assigned to an order:\n\n\
         Order ID: {}\nCustomer: {}\nYarn Type: {}\nQuantity: {} kg\nAmount: ${}\n\n\
         Please log in to view and work on this order.",
        agent.username,
        order.order_number,
        order.customer_name,
        order.yarn_type,
        order.quantity_kg,
        order.amount_usd,
    )
}

/// Notifier that writes each email as a structured log event.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_assignment(&self, agent: &User, order: &Order) -> Result<(), NotifyError> {
        tracing::info!(
            to = %agent.email,
            subject = %assignment_subject(order),
            body = %assignment_body(agent, order),
            "Email notification"
        );
        Ok(())
    }
}

/// Notifier that drops every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify_assignment(&self, _agent: &User, _order: &Order) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Notifier that remembers who was notified, for tests.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: std::sync::Mutex<Vec<(yarnflow_core::UserId, yarnflow_core::OrderId)>>,
    /// When set, every call fails after recording.
    pub fail: bool,
}

#[cfg(any(test, feature = "test-utils"))]
impl RecordingNotifier {
    /// A notifier whose every delivery fails.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Returns `(agent, order)` pairs in the order they were notified.
    #[must_use]
    pub fn sent(&self) -> Vec<(yarnflow_core::UserId, yarnflow_core::OrderId)> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify_assignment(&self, agent: &User, order: &Order) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .map_err(|e| NotifyError(e.to_string()))?
            .push((agent.user_id, order.order_id));
        if self.fail {
            return Err(NotifyError("mail server unavailable".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use yarnflow_core::{OrderId, OrderNumber, UserId};
    use yarnflow_store::{OrderStatus, OrderType, Role};

    fn fixtures() -> (User, Order) {
        let agent = User {
            user_id: UserId::generate(),
            username: "agent1".into(),
            email: "agent1@example.com".into(),
            password_hash: String::new(),
            role: Role::Agent,
            is_active: true,
            created_at: Utc::now(),
        };
        let order = Order {
            order_id: OrderId::generate(),
            order_number: OrderNumber::new(1052).unwrap(),
            customer_name: "Acme".into(),
            yarn_type: "Viscose".into(),
            quantity_kg: 250.0,
            startup_date: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
            order_type: OrderType::Export,
            amount_usd: 900.0,
            status: OrderStatus::NewOrder,
            created_by: UserId::generate(),
            primary_agent: Some(agent.user_id),
            secondary_agents: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        (agent, order)
    }

    #[test]
    fn email_text_mentions_order() {
        let (agent, order) = fixtures();
        assert_eq!(assignment_subject(&order), "New Order Assignment: PO-1052");
        let body = assignment_body(&agent, &order);
        assert!(body.starts_with("Hello agent1"));
        assert!(body.contains("Customer: Acme"));
    }

    #[tokio::test]
    async fn log_and_noop_notifiers_succeed() {
        let (agent, order) = fixtures();
        assert!(LogNotifier.notify_assignment(&agent, &order).await.is_ok());
        assert!(NoopNotifier.notify_assignment(&agent, &order).await.is_ok());
    }

    #[tokio::test]
    async fn recording_notifier_records_even_on_failure() {
        let (agent, order) = fixtures();
        let notifier = RecordingNotifier {
            fail: true,
            ..RecordingNotifier::default()
        };
        assert!(notifier.notify_assignment(&agent, &order).await.is_err());
        assert_eq!(notifier.sent(), vec![(agent.user_id, order.order_id)]);
    }
}
