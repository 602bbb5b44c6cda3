//! Order chat threads.
//!
//! Every order has one thread. Callers check that the actor can see the order
//! before calling in; these functions apply the per-message rules on top.

use chrono::Utc;
use yarnflow_core::{MessageId, UserId};
use yarnflow_store::{ChatMessage, Order, Store, User, WriteOp};

use crate::audit::{self, AuditAction};
use crate::error::{DeskError, Result};
use crate::types::{Actor, PostMessageRequest};
use crate::visibility;

/// Post a message on the thread of `order`.
///
/// Only admins may tag, and only agents assigned to the order may be tagged.
/// Duplicate tags are collapsed.
///
/// # Errors
///
/// Returns an error if:
/// - The body is empty
/// - A non-admin sender tags anyone
/// - A tagged user is not assigned to the order
pub fn post_message<S: Store>(
    store: &S,
    actor: &Actor,
    order: &Order,
    request: PostMessageRequest,
) -> Result<ChatMessage> {
    let body = request.body.trim();
    if body.is_empty() {
        return Err(DeskError::validation("message cannot be empty"));
    }

    let tagged_agents = dedup(request.tagged_agents);
    if !tagged_agents.is_empty() {
        if !actor.is_admin() {
            return Err(DeskError::forbidden("only admins can tag agents"));
        }
        if let Some(stray) = tagged_agents
            .iter()
            .find(|id| !visibility::is_assigned(id, order))
        {
            return Err(DeskError::Validation(format!(
                "agent {stray} is not assigned to order {}",
                order.order_number
            )));
        }
    }

    let message = ChatMessage {
        message_id: MessageId::generate(),
        order_id: order.order_id,
        sender_id: actor.user_id,
        sender_role: actor.role,
        body: body.to_string(),
        tagged_agents,
        created_at: Utc::now(),
    };

    let details = if message.tagged_agents.is_empty() {
        format!("Sent message on order {}", order.order_number)
    } else {
        format!(
            "Sent message on order {} tagging {} agent(s)",
            order.order_number,
            message.tagged_agents.len()
        )
    };
    let entry = audit::entry(
        &actor.user_id,
        AuditAction::MessageSent,
        message.message_id,
        details,
    );
    store.commit(&[WriteOp::PutMessage(&message), WriteOp::AppendAudit(&entry)])?;

    Ok(message)
}

/// List the messages of `order` visible to `actor`, oldest first.
///
/// # Errors
///
/// Returns an error if the store read fails.
pub fn list_messages<S: Store>(store: &S, actor: &Actor, order: &Order) -> Result<Vec<ChatMessage>> {
    let messages = store.list_messages_by_order(&order.order_id)?;
    Ok(visibility::filter_messages(actor, messages))
}

/// Agents an admin may tag on `order`: the primary followed by secondaries.
///
/// # Errors
///
/// Returns `DeskError::Forbidden` for non-admins.
pub fn taggable_agents<S: Store>(store: &S, actor: &Actor, order: &Order) -> Result<Vec<User>> {
    if !actor.is_admin() {
        return Err(DeskError::forbidden("only admins can tag agents"));
    }

    let mut agents = Vec::new();
    for agent_id in order.assignees() {
        if let Some(agent) = store.get_user(&agent_id)? {
            agents.push(agent);
        }
    }
    Ok(agents)
}

fn dedup(ids: Vec<UserId>) -> Vec<UserId> {
    let mut seen = Vec::with_capacity(ids.len());
    for id in ids {
        if !seen.contains(&id) {
            seen.push(id);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;
    use yarnflow_core::{OrderId, OrderNumber};
    use yarnflow_store::{OrderStatus, OrderType, Role, RocksStore};

    struct Fixture {
        store: RocksStore,
        _dir: TempDir,
        admin: Actor,
        primary: Actor,
        secondary: Actor,
        creator: Actor,
        order: Order,
    }

    fn user(store: &RocksStore, name: &str, role: Role) -> Actor {
        let user = User {
            user_id: UserId::generate(),
            username: name.to_string(),
            email: format!("{name}@example.com"),
            password_hash: String::new(),
            role,
            is_active: true,
            created_at: Utc::now(),
        };
        store.put_user(&user).unwrap();
        Actor::from(&user)
    }

    fn setup() -> Fixture {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        let admin = user(&store, "admin", Role::Admin);
        let primary = user(&store, "agent1", Role::Agent);
        let secondary = user(&store, "agent2", Role::Agent);
        let creator = user(&store, "user1", Role::User);

        let order = Order {
            order_id: OrderId::generate(),
            order_number: OrderNumber::new(4100).unwrap(),
            customer_name: "Acme".into(),
            yarn_type: "Cotton".into(),
            quantity_kg: 100.0,
            startup_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            order_type: OrderType::Local,
            amount_usd: 300.0,
            status: OrderStatus::UnderBooking,
            created_by: creator.user_id,
            primary_agent: Some(primary.user_id),
            secondary_agents: vec![secondary.user_id],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        store.put_order(&order).unwrap();

        Fixture {
            store,
            _dir: dir,
            admin,
            primary,
            secondary,
            creator,
            order,
        }
    }

    fn req(body: &str, tags: Vec<UserId>) -> PostMessageRequest {
        PostMessageRequest {
            body: body.to_string(),
            tagged_agents: tags,
        }
    }

    #[test]
    fn post_and_list_applies_filter() {
        let f = setup();

        post_message(&f.store, &f.creator, &f.order, req("when will it ship?", vec![])).unwrap();
        post_message(&f.store, &f.admin, &f.order, req("team, please update", vec![])).unwrap();
        post_message(
            &f.store,
            &f.admin,
            &f.order,
            req("primary only", vec![f.primary.user_id]),
        )
        .unwrap();
        post_message(&f.store, &f.secondary, &f.order, req("on it", vec![])).unwrap();

        assert_eq!(list_messages(&f.store, &f.admin, &f.order).unwrap().len(), 4);

        let primary_view: Vec<_> = list_messages(&f.store, &f.primary, &f.order)
            .unwrap()
            .into_iter()
            .map(|m| m.body)
            .collect();
        assert_eq!(primary_view, vec!["team, please update", "primary only"]);

        let secondary_view: Vec<_> = list_messages(&f.store, &f.secondary, &f.order)
            .unwrap()
            .into_iter()
            .map(|m| m.body)
            .collect();
        assert_eq!(secondary_view, vec!["team, please update", "on it"]);

        let creator_view = list_messages(&f.store, &f.creator, &f.order).unwrap();
        assert_eq!(creator_view.len(), 1);
        assert_eq!(creator_view[0].body, "when will it ship?");
    }

    #[test]
    fn empty_body_is_rejected() {
        let f = setup();
        let result = post_message(&f.store, &f.admin, &f.order, req("   ", vec![]));
        assert!(matches!(result, Err(DeskError::Validation(_))));
    }

    #[test]
    fn only_admins_tag() {
        let f = setup();
        let result = post_message(
            &f.store,
            &f.primary,
            &f.order,
            req("hey", vec![f.secondary.user_id]),
        );
        assert!(matches!(result, Err(DeskError::Forbidden(_))));
    }

    #[test]
    fn tags_must_be_assigned() {
        let f = setup();
        let outsider = user(&f.store, "agent9", Role::Agent);
        let result = post_message(
            &f.store,
            &f.admin,
            &f.order,
            req("hey", vec![outsider.user_id]),
        );
        assert!(matches!(result, Err(DeskError::Validation(_))));
    }

    #[test]
    fn duplicate_tags_collapse_and_audit_is_written() {
        let f = setup();
        let message = post_message(
            &f.store,
            &f.admin,
            &f.order,
            req("hi", vec![f.primary.user_id, f.primary.user_id]),
        )
        .unwrap();
        assert_eq!(message.tagged_agents, vec![f.primary.user_id]);

        let audit = f.store.list_audit(5).unwrap();
        assert_eq!(audit[0].action, "message_sent");
    }

    #[test]
    fn taggable_agents_admin_only() {
        let f = setup();
        let agents = taggable_agents(&f.store, &f.admin, &f.order).unwrap();
        let names: Vec<_> = agents.iter().map(|a| a.username.as_str()).collect();
        assert_eq!(names, vec!["agent1", "agent2"]);

        assert!(taggable_agents(&f.store, &f.primary, &f.order).is_err());
    }
}
