//! Order desk service implementation.
//!
//! This module provides the `OrderDesk` trait and `OrderDeskService`
//! implementation that coordinates accounts, the order pipeline, chat,
//! contracts and reporting.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use yarnflow_core::{ContractId, OrderId, OrderNumber, UserId};
use yarnflow_store::{
    AuditEntry, ChatMessage, Contract, Order, OrderStatus, Role, Store, StoreError, User, WriteOp,
};

use crate::audit::{self, AuditAction};
use crate::chat;
use crate::contracts;
use crate::error::{DeskError, Result};
use crate::export;
use crate::notify::{LogNotifier, Notifier};
use crate::pipeline;
use crate::reports;
use crate::seed;
use crate::types::{
    Actor, AdminStats, ContractFile, CreateOrderRequest, Dashboard, DeskConfig, OrderDetail,
    OrderFields, OrderFilter, PostMessageRequest, RegisterRequest, Report, ReportFilter,
    UpdateOrderRequest, UpdateProfileRequest, UserProfile,
};
use crate::visibility;

/// Trait defining the order desk operations.
///
/// Every operation that acts on behalf of a user takes the caller's `Actor`.
/// Implementations re-resolve the actor against the stored account, so a
/// deactivated or demoted user loses access immediately.
#[async_trait]
pub trait OrderDesk: Send + Sync {
    // =========================================================================
    // Accounts
    // =========================================================================

    /// Register a new account.
    ///
    /// Anyone may register as a user or agent; only an admin caller may
    /// create another admin.
    ///
    /// # Errors
    ///
    /// Returns `DeskError::Validation` for malformed input,
    /// `DeskError::Conflict` if the username or email is taken.
    async fn register_user(
        &self,
        caller: Option<&Actor>,
        request: RegisterRequest,
    ) -> Result<UserProfile>;

    /// Check a username and password.
    ///
    /// # Errors
    ///
    /// Returns `DeskError::InvalidCredentials` on mismatch and
    /// `DeskError::Inactive` for deactivated accounts.
    async fn authenticate(&self, username: &str, password: &str) -> Result<UserProfile>;

    /// The caller's own profile.
    async fn get_user(&self, actor: &Actor) -> Result<UserProfile>;

    /// Change the caller's username, email or password.
    async fn update_profile(
        &self,
        actor: &Actor,
        request: UpdateProfileRequest,
    ) -> Result<UserProfile>;

    /// List all accounts. Admin only.
    async fn list_users(&self, actor: &Actor) -> Result<Vec<UserProfile>>;

    /// Activate or deactivate an account. Admin only.
    async fn set_user_active(
        &self,
        actor: &Actor,
        target: &UserId,
        active: bool,
    ) -> Result<UserProfile>;

    /// List active agents. Admin only.
    async fn list_agents(&self, actor: &Actor) -> Result<Vec<UserProfile>>;

    // =========================================================================
    // Orders
    // =========================================================================

    /// Create an order in New Order.
    ///
    /// # Errors
    ///
    /// Returns `DeskError::Forbidden` for agents.
    async fn create_order(&self, actor: &Actor, request: CreateOrderRequest) -> Result<Order>;

    /// Get an order visible to the caller.
    async fn get_order(&self, actor: &Actor, order_id: &OrderId) -> Result<Order>;

    /// Get an order visible to the caller together with the stages the
    /// caller's role may move it to.
    async fn order_detail(&self, actor: &Actor, order_id: &OrderId) -> Result<OrderDetail>;

    /// List visible orders matching `filter`, newest first.
    async fn list_orders(&self, actor: &Actor, filter: &OrderFilter) -> Result<Vec<Order>>;

    /// The board view over visible orders matching `filter`.
    async fn dashboard(&self, actor: &Actor, filter: &OrderFilter) -> Result<Dashboard>;

    /// Edit an order's business fields.
    async fn update_order(
        &self,
        actor: &Actor,
        order_id: &OrderId,
        request: UpdateOrderRequest,
    ) -> Result<Order>;

    /// Move an order to another pipeline stage.
    ///
    /// # Errors
    ///
    /// Returns `DeskError::InvalidTransition` if the caller's role may not
    /// make this move.
    async fn move_order(&self, actor: &Actor, order_id: &OrderId, to: OrderStatus)
        -> Result<Order>;

    /// Replace the agents assigned to an order. Admin only.
    async fn assign_agents(
        &self,
        actor: &Actor,
        order_id: &OrderId,
        agent_ids: Vec<UserId>,
    ) -> Result<Order>;

    /// Confirm an order to a single agent. Admin only.
    async fn confirm_order(
        &self,
        actor: &Actor,
        order_id: &OrderId,
        agent_id: &UserId,
    ) -> Result<Order>;

    /// Delete an order with its chat thread and contracts. Admin only.
    async fn delete_order(&self, actor: &Actor, order_id: &OrderId) -> Result<()>;

    // =========================================================================
    // Chat
    // =========================================================================

    /// Post a message on an order thread.
    async fn post_message(
        &self,
        actor: &Actor,
        order_id: &OrderId,
        request: PostMessageRequest,
    ) -> Result<ChatMessage>;

    /// Messages of an order thread visible to the caller, oldest first.
    async fn list_messages(&self, actor: &Actor, order_id: &OrderId) -> Result<Vec<ChatMessage>>;

    /// Agents an admin may tag on an order.
    async fn taggable_agents(&self, actor: &Actor, order_id: &OrderId)
        -> Result<Vec<UserProfile>>;

    // =========================================================================
    // Contracts
    // =========================================================================

    /// Orders at a contract stage the caller has contract access to.
    async fn contract_orders(&self, actor: &Actor) -> Result<Vec<Order>>;

    /// Upload a contract file for an order.
    async fn upload_contract(
        &self,
        actor: &Actor,
        order_id: &OrderId,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<Contract>;

    /// Contracts of an order.
    async fn list_contracts(&self, actor: &Actor, order_id: &OrderId) -> Result<Vec<Contract>>;

    /// Read a contract file.
    async fn download_contract(
        &self,
        actor: &Actor,
        contract_id: &ContractId,
    ) -> Result<ContractFile>;

    // =========================================================================
    // Reporting
    // =========================================================================

    /// Filtered report over all orders. Admin only.
    async fn report(&self, actor: &Actor, filter: &ReportFilter) -> Result<Report>;

    /// System-wide statistics. Admin only.
    async fn admin_stats(&self, actor: &Actor) -> Result<AdminStats>;

    /// All orders as CSV. Admin only.
    async fn export_orders_csv(&self, actor: &Actor) -> Result<String>;

    /// Newest audit entries. Admin only.
    async fn list_audit(&self, actor: &Actor, limit: usize) -> Result<Vec<AuditEntry>>;

    // =========================================================================
    // Operational
    // =========================================================================

    /// Create the demo accounts when no admin exists.
    async fn seed_default_users(&self) -> Result<usize>;
}

/// The main order desk service implementation.
pub struct OrderDeskService<S: Store> {
    store: Arc<S>,
    config: DeskConfig,
    notifier: Arc<dyn Notifier>,
}

impl<S: Store> OrderDeskService<S> {
    /// Create a new order desk service that logs notifications.
    #[must_use]
    pub fn new(store: Arc<S>, config: DeskConfig) -> Self {
        Self {
            store,
            config,
            notifier: Arc::new(LogNotifier),
        }
    }

    /// Create with default configuration.
    #[must_use]
    pub fn with_defaults(store: Arc<S>) -> Self {
        Self::new(store, DeskConfig::default())
    }

    /// Replace the notifier.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Get a reference to the store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &DeskConfig {
        &self.config
    }

    /// Resolve the caller against the stored account.
    fn resolve(&self, actor: &Actor) -> Result<Actor> {
        let user = self
            .store
            .get_user(&actor.user_id)?
            .ok_or(DeskError::InvalidCredentials)?;
        if !user.is_active {
            return Err(DeskError::Inactive(user.user_id));
        }
        Ok(Actor::from(&user))
    }

    fn resolve_admin(&self, actor: &Actor) -> Result<Actor> {
        let actor = self.resolve(actor)?;
        if !actor.is_admin() {
            return Err(DeskError::forbidden("admin access required"));
        }
        Ok(actor)
    }

    fn load_order(&self, order_id: &OrderId) -> Result<Order> {
        self.store
            .get_order(order_id)?
            .ok_or(DeskError::OrderNotFound(*order_id))
    }

    fn visible_order(&self, actor: &Actor, order_id: &OrderId) -> Result<Order> {
        let order = self.load_order(order_id)?;
        if !visibility::can_view_order(actor, &order) {
            return Err(DeskError::forbidden("you do not have access to this order"));
        }
        Ok(order)
    }

    fn visible_orders(&self, actor: &Actor) -> Result<Vec<Order>> {
        let orders = match actor.role {
            Role::User => self.store.list_orders_by_creator(&actor.user_id)?,
            Role::Admin | Role::Agent => self.store.list_orders()?,
        };
        Ok(visibility::filter_orders(actor, orders))
    }

    /// Look up each id as an active agent, dropping duplicates.
    fn resolve_agents(&self, agent_ids: &[UserId]) -> Result<Vec<User>> {
        let mut agents: Vec<User> = Vec::with_capacity(agent_ids.len());
        for agent_id in agent_ids {
            if agents.iter().any(|a| a.user_id == *agent_id) {
                continue;
            }
            let agent = self
                .store
                .get_user(agent_id)?
                .filter(|u| u.role == Role::Agent && u.is_active)
                .ok_or_else(|| DeskError::Validation(format!("{agent_id} is not an active agent")))?;
            agents.push(agent);
        }
        Ok(agents)
    }

    fn allocate_order_number(&self) -> Result<OrderNumber> {
        for _ in 0..self.config.order_number_attempts {
            let candidate = OrderNumber::random();
            if self.store.get_order_by_number(candidate)?.is_none() {
                return Ok(candidate);
            }
        }
        Err(DeskError::Conflict(
            "could not allocate a free order number".to_string(),
        ))
    }

    fn check_unique(&self, username: &str, email: &str, except: Option<&UserId>) -> Result<()> {
        let taken_by_other = |user: Option<User>| user.is_some_and(|u| Some(&u.user_id) != except);

        if taken_by_other(self.store.get_user_by_username(username)?) {
            return Err(DeskError::Conflict(format!("username {username} is taken")));
        }
        if taken_by_other(self.store.get_user_by_email(email)?) {
            return Err(DeskError::Conflict(format!("email {email} is already registered")));
        }
        Ok(())
    }

    fn check_password(&self, password: &str) -> Result<()> {
        if password.chars().count() < self.config.min_password_len {
            return Err(DeskError::Validation(format!(
                "password must be at least {} characters",
                self.config.min_password_len
            )));
        }
        Ok(())
    }

    /// Tell newly assigned agents about `order`. Failures are logged only.
    async fn notify_agents(&self, agents: &[User], order: &Order) {
        for agent in agents {
            if let Err(e) = self.notifier.notify_assignment(agent, order).await {
                tracing::warn!(
                    order_id = %order.order_id,
                    agent_id = %agent.user_id,
                    error = %e,
                    "Assignment notification failed"
                );
            }
        }
    }
}

fn validate_username(username: &str) -> Result<String> {
    let username = username.trim();
    if username.is_empty() {
        return Err(DeskError::validation("username is required"));
    }
    if username.chars().any(char::is_whitespace) {
        return Err(DeskError::validation("username cannot contain spaces"));
    }
    Ok(username.to_string())
}

fn validate_email(email: &str) -> Result<String> {
    let email = email.trim();
    let well_formed = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !well_formed || email.chars().any(char::is_whitespace) {
        return Err(DeskError::Validation(format!("invalid email address: {email}")));
    }
    Ok(email.to_string())
}

fn validate_fields(fields: &mut OrderFields) -> Result<()> {
    fields.customer_name = fields.customer_name.trim().to_string();
    fields.yarn_type = fields.yarn_type.trim().to_string();

    if fields.customer_name.is_empty() {
        return Err(DeskError::validation("customer name is required"));
    }
    if fields.yarn_type.is_empty() {
        return Err(DeskError::validation("yarn type is required"));
    }
    if !fields.quantity_kg.is_finite() || fields.quantity_kg <= 0.0 {
        return Err(DeskError::validation("quantity must be greater than zero"));
    }
    if !fields.amount_usd.is_finite() || fields.amount_usd < 0.0 {
        return Err(DeskError::validation("amount cannot be negative"));
    }
    Ok(())
}

fn apply_fields(order: &mut Order, fields: OrderFields) {
    order.customer_name = fields.customer_name;
    order.yarn_type = fields.yarn_type;
    order.quantity_kg = fields.quantity_kg;
    order.startup_date = fields.startup_date;
    order.order_type = fields.order_type;
    order.amount_usd = fields.amount_usd;
}

/// First agent becomes primary, the rest secondary.
fn apply_assignment(order: &mut Order, agents: &[User]) {
    order.primary_agent = agents.first().map(|a| a.user_id);
    order.secondary_agents = agents.iter().skip(1).map(|a| a.user_id).collect();
}

/// Agents in `agents` not already assigned to `before`.
fn newly_assigned(before: &Order, agents: Vec<User>) -> Vec<User> {
    agents
        .into_iter()
        .filter(|a| !before.is_assigned(&a.user_id))
        .collect()
}

#[async_trait]
impl<S: Store + 'static> OrderDesk for OrderDeskService<S> {
    // =========================================================================
    // Accounts
    // =========================================================================

    async fn register_user(
        &self,
        caller: Option<&Actor>,
        request: RegisterRequest,
    ) -> Result<UserProfile> {
        let role = request.role.unwrap_or(Role::User);
        if role == Role::Admin {
            let caller = caller.ok_or_else(|| DeskError::forbidden("admin access required"))?;
            self.resolve_admin(caller)?;
        }

        let username = validate_username(&request.username)?;
        let email = validate_email(&request.email)?;
        self.check_password(&request.password)?;
        self.check_unique(&username, &email, None)?;

        let user = User {
            user_id: UserId::generate(),
            username,
            email,
            password_hash: yarnflow_auth::hash_password(&request.password)?,
            role,
            is_active: true,
            created_at: Utc::now(),
        };
        self.store.put_user(&user)?;

        tracing::info!(
            user_id = %user.user_id,
            username = %user.username,
            role = %user.role,
            "Registered user"
        );

        Ok(UserProfile::from(&user))
    }

    async fn authenticate(&self, username: &str, password: &str) -> Result<UserProfile> {
        let user = self
            .store
            .get_user_by_username(username.trim())?
            .ok_or(DeskError::InvalidCredentials)?;

        yarnflow_auth::verify_password(password, &user.password_hash).map_err(|e| {
            tracing::debug!(username = %user.username, error = %e, "Password check failed");
            DeskError::InvalidCredentials
        })?;

        if !user.is_active {
            return Err(DeskError::Inactive(user.user_id));
        }

        tracing::info!(user_id = %user.user_id, "User authenticated");
        Ok(UserProfile::from(&user))
    }

    async fn get_user(&self, actor: &Actor) -> Result<UserProfile> {
        let actor = self.resolve(actor)?;
        let user = self
            .store
            .get_user(&actor.user_id)?
            .ok_or(DeskError::UserNotFound(actor.user_id))?;
        Ok(UserProfile::from(&user))
    }

    async fn update_profile(
        &self,
        actor: &Actor,
        request: UpdateProfileRequest,
    ) -> Result<UserProfile> {
        let actor = self.resolve(actor)?;
        let mut user = self
            .store
            .get_user(&actor.user_id)?
            .ok_or(DeskError::UserNotFound(actor.user_id))?;

        if let Some(username) = request.username.as_deref() {
            user.username = validate_username(username)?;
        }
        if let Some(email) = request.email.as_deref() {
            user.email = validate_email(email)?;
        }
        self.check_unique(&user.username, &user.email, Some(&user.user_id))?;

        if let Some(password) = request.password.as_deref() {
            self.check_password(password)?;
            user.password_hash = yarnflow_auth::hash_password(password)?;
        }

        self.store.put_user(&user)?;
        tracing::info!(user_id = %user.user_id, "Updated profile");

        Ok(UserProfile::from(&user))
    }

    async fn list_users(&self, actor: &Actor) -> Result<Vec<UserProfile>> {
        self.resolve_admin(actor)?;
        let mut users = self.store.list_users()?;
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users.iter().map(UserProfile::from).collect())
    }

    async fn set_user_active(
        &self,
        actor: &Actor,
        target: &UserId,
        active: bool,
    ) -> Result<UserProfile> {
        let actor = self.resolve_admin(actor)?;
        if !active && actor.user_id == *target {
            return Err(DeskError::validation("you cannot deactivate your own account"));
        }

        let mut user = self
            .store
            .get_user(target)?
            .ok_or(DeskError::UserNotFound(*target))?;
        user.is_active = active;

        let (action, verb) = if active {
            (AuditAction::UserActivated, "Activated")
        } else {
            (AuditAction::UserDeactivated, "Deactivated")
        };
        let entry = audit::entry(
            &actor.user_id,
            action,
            user.user_id,
            format!("{verb} user {}", user.username),
        );
        self.store
            .commit(&[WriteOp::PutUser(&user), WriteOp::AppendAudit(&entry)])?;

        tracing::info!(user_id = %user.user_id, active, "Changed account state");
        Ok(UserProfile::from(&user))
    }

    async fn list_agents(&self, actor: &Actor) -> Result<Vec<UserProfile>> {
        self.resolve_admin(actor)?;
        let mut agents: Vec<User> = self
            .store
            .list_users_by_role(Role::Agent)?
            .into_iter()
            .filter(|u| u.is_active)
            .collect();
        agents.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(agents.iter().map(UserProfile::from).collect())
    }

    // =========================================================================
    // Orders
    // =========================================================================

    async fn create_order(&self, actor: &Actor, request: CreateOrderRequest) -> Result<Order> {
        let actor = self.resolve(actor)?;
        if actor.role == Role::Agent {
            return Err(DeskError::forbidden("agents cannot create orders"));
        }

        let mut fields = request.fields;
        validate_fields(&mut fields)?;

        let agents = if actor.is_admin() {
            self.resolve_agents(&request.agent_ids)?
        } else {
            Vec::new()
        };

        let now = Utc::now();
        let mut order = Order {
            order_id: OrderId::generate(),
            order_number: self.allocate_order_number()?,
            customer_name: fields.customer_name,
            yarn_type: fields.yarn_type,
            quantity_kg: fields.quantity_kg,
            startup_date: fields.startup_date,
            order_type: fields.order_type,
            amount_usd: fields.amount_usd,
            status: OrderStatus::NewOrder,
            created_by: actor.user_id,
            primary_agent: None,
            secondary_agents: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        apply_assignment(&mut order, &agents);

        // Another writer may take the drawn number before the commit.
        let mut redraws = self.config.order_number_attempts;
        loop {
            let entry = audit::entry(
                &actor.user_id,
                AuditAction::OrderCreated,
                order.order_id,
                format!(
                    "Created order {} for {}",
                    order.order_number, order.customer_name
                ),
            );
            match self
                .store
                .commit(&[WriteOp::PutOrder(&order), WriteOp::AppendAudit(&entry)])
            {
                Ok(()) => break,
                Err(StoreError::Conflict(reason)) if redraws > 0 => {
                    redraws -= 1;
                    tracing::debug!(%reason, "Order number taken, drawing again");
                    order.order_number = self.allocate_order_number()?;
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::info!(
            order_id = %order.order_id,
            order_number = %order.order_number,
            created_by = %actor.user_id,
            agents = agents.len(),
            "Created order"
        );

        self.notify_agents(&agents, &order).await;
        Ok(order)
    }

    async fn get_order(&self, actor: &Actor, order_id: &OrderId) -> Result<Order> {
        let actor = self.resolve(actor)?;
        self.visible_order(&actor, order_id)
    }

    async fn order_detail(&self, actor: &Actor, order_id: &OrderId) -> Result<OrderDetail> {
        let actor = self.resolve(actor)?;
        let order = self.visible_order(&actor, order_id)?;
        let valid_moves = pipeline::valid_moves_from(actor.role, order.status);
        Ok(OrderDetail { order, valid_moves })
    }

    async fn list_orders(&self, actor: &Actor, filter: &OrderFilter) -> Result<Vec<Order>> {
        let actor = self.resolve(actor)?;
        let mut orders: Vec<Order> = self
            .visible_orders(&actor)?
            .into_iter()
            .filter(|o| reports::matches_filter(o, filter, actor.is_admin()))
            .collect();
        reports::sort_newest_first(&mut orders);
        Ok(orders)
    }

    async fn dashboard(&self, actor: &Actor, filter: &OrderFilter) -> Result<Dashboard> {
        let orders = self.list_orders(actor, filter).await?;
        Ok(reports::dashboard(orders))
    }

    async fn update_order(
        &self,
        actor: &Actor,
        order_id: &OrderId,
        request: UpdateOrderRequest,
    ) -> Result<Order> {
        let actor = self.resolve(actor)?;
        let mut order = self.visible_order(&actor, order_id)?;
        if !visibility::can_edit_order(&actor, &order) {
            return Err(DeskError::forbidden("you cannot edit this order"));
        }
        if !actor.is_admin() && (request.status.is_some() || request.agent_ids.is_some()) {
            return Err(DeskError::forbidden(
                "only admins can change status or assignment",
            ));
        }

        let mut fields = request.fields;
        validate_fields(&mut fields)?;
        let before = order.clone();
        apply_fields(&mut order, fields);

        let mut assigned = Vec::new();
        if let Some(agent_ids) = request.agent_ids {
            assigned = self.resolve_agents(&agent_ids)?;
            apply_assignment(&mut order, &assigned);
        }
        if let Some(status) = request.status {
            order.status = status;
        }

        // A confirmed order keeps exactly one agent.
        if order.status == OrderStatus::Confirmed {
            if order.primary_agent.is_none() {
                return Err(DeskError::validation(
                    "a confirmed order needs a primary agent",
                ));
            }
            order.secondary_agents.clear();
        }
        assigned.retain(|a| order.is_assigned(&a.user_id));
        let added = newly_assigned(&before, assigned);

        order.updated_at = Utc::now();
        let entry = audit::entry(
            &actor.user_id,
            AuditAction::OrderUpdated,
            order.order_id,
            format!("Updated order {}", order.order_number),
        );
        self.store
            .commit(&[WriteOp::PutOrder(&order), WriteOp::AppendAudit(&entry)])?;

        tracing::info!(order_id = %order.order_id, "Updated order");

        self.notify_agents(&added, &order).await;
        Ok(order)
    }

    async fn move_order(
        &self,
        actor: &Actor,
        order_id: &OrderId,
        to: OrderStatus,
    ) -> Result<Order> {
        let actor = self.resolve(actor)?;
        let mut order = self.visible_order(&actor, order_id)?;
        if actor.role == Role::User {
            return Err(DeskError::forbidden("users cannot move orders"));
        }
        let from = order.status;
        let to = pipeline::validate_move(order_id, actor.role, from, to)?;

        if from == to {
            return Ok(order);
        }

        order.status = to;
        order.updated_at = Utc::now();
        let entry = audit::entry(
            &actor.user_id,
            AuditAction::OrderMoved,
            order.order_id,
            format!("Moved order {} from {from} to {to}", order.order_number),
        );
        self.store
            .commit(&[WriteOp::PutOrder(&order), WriteOp::AppendAudit(&entry)])?;

        tracing::info!(
            order_id = %order_id,
            from = %from,
            to = %to,
            role = %actor.role,
            "Moved order"
        );

        Ok(order)
    }

    async fn assign_agents(
        &self,
        actor: &Actor,
        order_id: &OrderId,
        agent_ids: Vec<UserId>,
    ) -> Result<Order> {
        let actor = self.resolve_admin(actor)?;
        let mut order = self.load_order(order_id)?;
        if agent_ids.is_empty() {
            return Err(DeskError::validation("select at least one agent"));
        }

        let agents = self.resolve_agents(&agent_ids)?;
        let before = order.clone();
        apply_assignment(&mut order, &agents);
        order.updated_at = Utc::now();

        let entry = audit::entry(
            &actor.user_id,
            AuditAction::OrderAssigned,
            order.order_id,
            format!(
                "Assigned {} agent(s) to order {}",
                agents.len(),
                order.order_number
            ),
        );
        self.store
            .commit(&[WriteOp::PutOrder(&order), WriteOp::AppendAudit(&entry)])?;

        tracing::info!(order_id = %order_id, agents = agents.len(), "Assigned agents");

        self.notify_agents(&newly_assigned(&before, agents), &order)
            .await;
        Ok(order)
    }

    async fn confirm_order(
        &self,
        actor: &Actor,
        order_id: &OrderId,
        agent_id: &UserId,
    ) -> Result<Order> {
        let actor = self.resolve_admin(actor)?;
        let mut order = self.load_order(order_id)?;
        let agents = self.resolve_agents(std::slice::from_ref(agent_id))?;

        let before = order.clone();
        order.status = OrderStatus::Confirmed;
        apply_assignment(&mut order, &agents);
        order.updated_at = Utc::now();

        let entry = audit::entry(
            &actor.user_id,
            AuditAction::OrderConfirmed,
            order.order_id,
            format!("Confirmed order {} to agent {agent_id}", order.order_number),
        );
        self.store
            .commit(&[WriteOp::PutOrder(&order), WriteOp::AppendAudit(&entry)])?;

        tracing::info!(order_id = %order_id, agent_id = %agent_id, "Confirmed order");

        self.notify_agents(&newly_assigned(&before, agents), &order)
            .await;
        Ok(order)
    }

    async fn delete_order(&self, actor: &Actor, order_id: &OrderId) -> Result<()> {
        let actor = self.resolve_admin(actor)?;
        let order = self.load_order(order_id)?;

        let entry = audit::entry(
            &actor.user_id,
            AuditAction::OrderDeleted,
            order.order_id,
            format!("Deleted order {}", order.order_number),
        );
        let contracts = self
            .store
            .delete_order(order_id, &entry)
            .map_err(|e| match e {
                StoreError::NotFound => DeskError::OrderNotFound(*order_id),
                other => other.into(),
            })?;
        contracts::remove_files(&contracts, order_id).await;

        tracing::info!(
            order_id = %order_id,
            contracts = contracts.len(),
            "Deleted order"
        );

        Ok(())
    }

    // =========================================================================
    // Chat
    // =========================================================================

    async fn post_message(
        &self,
        actor: &Actor,
        order_id: &OrderId,
        request: PostMessageRequest,
    ) -> Result<ChatMessage> {
        let actor = self.resolve(actor)?;
        let order = self.visible_order(&actor, order_id)?;
        let message = chat::post_message(&*self.store, &actor, &order, request)?;

        tracing::debug!(
            order_id = %order_id,
            message_id = %message.message_id,
            tagged = message.tagged_agents.len(),
            "Posted message"
        );

        Ok(message)
    }

    async fn list_messages(&self, actor: &Actor, order_id: &OrderId) -> Result<Vec<ChatMessage>> {
        let actor = self.resolve(actor)?;
        let order = self.visible_order(&actor, order_id)?;
        chat::list_messages(&*self.store, &actor, &order)
    }

    async fn taggable_agents(
        &self,
        actor: &Actor,
        order_id: &OrderId,
    ) -> Result<Vec<UserProfile>> {
        let actor = self.resolve(actor)?;
        let order = self.visible_order(&actor, order_id)?;
        let agents = chat::taggable_agents(&*self.store, &actor, &order)?;
        Ok(agents.iter().map(UserProfile::from).collect())
    }

    // =========================================================================
    // Contracts
    // =========================================================================

    async fn contract_orders(&self, actor: &Actor) -> Result<Vec<Order>> {
        let actor = self.resolve(actor)?;
        contracts::contract_orders(&*self.store, &actor)
    }

    async fn upload_contract(
        &self,
        actor: &Actor,
        order_id: &OrderId,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<Contract> {
        let actor = self.resolve(actor)?;
        let order = self.load_order(order_id)?;
        let (contract, _order) =
            contracts::upload_contract(&*self.store, &self.config, &actor, order, filename, bytes)
                .await?;
        Ok(contract)
    }

    async fn list_contracts(&self, actor: &Actor, order_id: &OrderId) -> Result<Vec<Contract>> {
        let actor = self.resolve(actor)?;
        let order = self.load_order(order_id)?;
        contracts::list_contracts(&*self.store, &actor, &order)
    }

    async fn download_contract(
        &self,
        actor: &Actor,
        contract_id: &ContractId,
    ) -> Result<ContractFile> {
        let actor = self.resolve(actor)?;
        contracts::download_contract(&*self.store, &actor, contract_id).await
    }

    // =========================================================================
    // Reporting
    // =========================================================================

    async fn report(&self, actor: &Actor, filter: &ReportFilter) -> Result<Report> {
        self.resolve_admin(actor)?;
        Ok(reports::report(self.store.list_orders()?, filter))
    }

    async fn admin_stats(&self, actor: &Actor) -> Result<AdminStats> {
        self.resolve_admin(actor)?;

        let mut orders = self.store.list_orders()?;
        reports::sort_newest_first(&mut orders);

        let mut users_by_role = BTreeMap::new();
        for role in Role::ALL {
            users_by_role.insert(role.to_string(), self.store.count_users_by_role(role)?);
        }
        let total_users = self.store.list_users()?.len();

        let agents: HashMap<UserId, String> = self
            .store
            .list_users_by_role(Role::Agent)?
            .into_iter()
            .map(|u| (u.user_id, u.username))
            .collect();
        let mut orders_by_agent: BTreeMap<String, usize> =
            agents.values().map(|name| (name.clone(), 0)).collect();
        for order in &orders {
            if let Some(name) = order.primary_agent.as_ref().and_then(|id| agents.get(id)) {
                *orders_by_agent.entry(name.clone()).or_insert(0) += 1;
            }
        }

        Ok(AdminStats {
            total_orders: orders.len(),
            total_users,
            users_by_role,
            orders_by_status: reports::count_by_status(&orders),
            orders_by_agent,
            revenue: reports::revenue(&orders),
            recent_messages: self.store.list_recent_messages(self.config.recent_limit)?,
            recent_orders: orders.into_iter().take(self.config.recent_limit).collect(),
        })
    }

    async fn export_orders_csv(&self, actor: &Actor) -> Result<String> {
        let actor = self.resolve_admin(actor)?;

        let mut orders = self.store.list_orders()?;
        reports::sort_newest_first(&mut orders);
        let usernames: HashMap<UserId, String> = self
            .store
            .list_users()?
            .into_iter()
            .map(|u| (u.user_id, u.username))
            .collect();

        let csv = export::orders_to_csv(&orders, &usernames)?;
        tracing::info!(user_id = %actor.user_id, orders = orders.len(), "Exported orders");
        Ok(csv)
    }

    async fn list_audit(&self, actor: &Actor, limit: usize) -> Result<Vec<AuditEntry>> {
        self.resolve_admin(actor)?;
        Ok(self.store.list_audit(limit)?)
    }

    // =========================================================================
    // Operational
    // =========================================================================

    async fn seed_default_users(&self) -> Result<usize> {
        seed::seed_default_users(&*self.store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::RecordingNotifier;
    use chrono::NaiveDate;
    use tempfile::TempDir;
    use yarnflow_store::{OrderType, RocksStore};

    struct Fixture {
        service: OrderDeskService<RocksStore>,
        notifier: Arc<RecordingNotifier>,
        _dir: TempDir,
        admin: Actor,
        agent1: Actor,
        agent2: Actor,
        user1: Actor,
    }

    fn add_user(store: &RocksStore, name: &str, role: Role) -> Actor {
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

    fn setup_with(notifier: RecordingNotifier) -> Fixture {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(RocksStore::open(dir.path().join("db")).unwrap());
        let admin = add_user(&store, "admin", Role::Admin);
        let agent1 = add_user(&store, "agent1", Role::Agent);
        let agent2 = add_user(&store, "agent2", Role::Agent);
        let user1 = add_user(&store, "user1", Role::User);

        let config = DeskConfig {
            upload_dir: dir.path().join("uploads"),
            ..DeskConfig::default()
        };
        let notifier = Arc::new(notifier);
        let service = OrderDeskService::new(store, config).with_notifier(notifier.clone());

        Fixture {
            service,
            notifier,
            _dir: dir,
            admin,
            agent1,
            agent2,
            user1,
        }
    }

    fn setup() -> Fixture {
        setup_with(RecordingNotifier::default())
    }

    fn fields(customer: &str) -> OrderFields {
        OrderFields {
            customer_name: customer.to_string(),
            yarn_type: "Cotton 30s".to_string(),
            quantity_kg: 500.0,
            startup_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            order_type: OrderType::Export,
            amount_usd: 1200.0,
        }
    }

    fn create_request(customer: &str, agent_ids: Vec<UserId>) -> CreateOrderRequest {
        CreateOrderRequest {
            fields: fields(customer),
            agent_ids,
        }
    }

    fn update_request(customer: &str) -> UpdateOrderRequest {
        UpdateOrderRequest {
            fields: fields(customer),
            status: None,
            agent_ids: None,
        }
    }

    async fn assigned_order(f: &Fixture) -> Order {
        f.service
            .create_order(
                &f.admin,
                create_request("Acme", vec![f.agent1.user_id, f.agent2.user_id]),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn register_and_authenticate() {
        let f = setup();
        let request = RegisterRequest {
            username: "  newuser ".into(),
            email: "new@example.com".into(),
            password: "secret1".into(),
            role: None,
        };
        let profile = f.service.register_user(None, request).await.unwrap();
        assert_eq!(profile.username, "newuser");
        assert_eq!(profile.role, Role::User);

        let authed = f.service.authenticate("newuser", "secret1").await.unwrap();
        assert_eq!(authed.user_id, profile.user_id);

        let wrong = f.service.authenticate("newuser", "nope").await;
        assert!(matches!(wrong, Err(DeskError::InvalidCredentials)));
        let unknown = f.service.authenticate("ghost", "secret1").await;
        assert!(matches!(unknown, Err(DeskError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn register_validation() {
        let f = setup();
        let request = |username: &str, email: &str, password: &str, role| RegisterRequest {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            role,
        };

        let short = f
            .service
            .register_user(None, request("bob", "bob@example.com", "123", None))
            .await;
        assert!(matches!(short, Err(DeskError::Validation(_))));

        let bad_email = f
            .service
            .register_user(None, request("bob", "bob", "secret1", None))
            .await;
        assert!(matches!(bad_email, Err(DeskError::Validation(_))));

        let taken = f
            .service
            .register_user(None, request("Agent1", "x@example.com", "secret1", None))
            .await;
        assert!(matches!(taken, Err(DeskError::Conflict(_))));

        let email_taken = f
            .service
            .register_user(None, request("bob", "AGENT1@example.com", "secret1", None))
            .await;
        assert!(matches!(email_taken, Err(DeskError::Conflict(_))));

        let anonymous_admin = f
            .service
            .register_user(
                None,
                request("boss", "boss@example.com", "secret1", Some(Role::Admin)),
            )
            .await;
        assert!(matches!(anonymous_admin, Err(DeskError::Forbidden(_))));

        let agent_admin = f
            .service
            .register_user(
                Some(&f.agent1),
                request("boss", "boss@example.com", "secret1", Some(Role::Admin)),
            )
            .await;
        assert!(matches!(agent_admin, Err(DeskError::Forbidden(_))));
    }

    #[tokio::test]
    async fn deactivated_user_is_locked_out() {
        let f = setup();
        f.service
            .set_user_active(&f.admin, &f.user1.user_id, false)
            .await
            .unwrap();

        let result = f.service.get_user(&f.user1).await;
        assert!(matches!(result, Err(DeskError::Inactive(_))));
        let result = f
            .service
            .create_order(&f.user1, create_request("Acme", vec![]))
            .await;
        assert!(matches!(result, Err(DeskError::Inactive(_))));

        let own = f
            .service
            .set_user_active(&f.admin, &f.admin.user_id, false)
            .await;
        assert!(matches!(own, Err(DeskError::Validation(_))));

        let audit = f.service.list_audit(&f.admin, 10).await.unwrap();
        assert_eq!(audit[0].action, "user_deactivated");
    }

    #[tokio::test]
    async fn update_profile_rechecks_uniqueness() {
        let f = setup();
        let taken = f
            .service
            .update_profile(
                &f.user1,
                UpdateProfileRequest {
                    username: Some("agent2".into()),
                    ..UpdateProfileRequest::default()
                },
            )
            .await;
        assert!(matches!(taken, Err(DeskError::Conflict(_))));

        let same = f
            .service
            .update_profile(
                &f.user1,
                UpdateProfileRequest {
                    username: Some("user1".into()),
                    email: Some("renamed@example.com".into()),
                    password: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(same.email, "renamed@example.com");
    }

    #[tokio::test]
    async fn user_creates_order_without_agents() {
        let f = setup();
        let order = f
            .service
            .create_order(&f.user1, create_request("  Acme  ", vec![f.agent1.user_id]))
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::NewOrder);
        assert_eq!(order.customer_name, "Acme");
        assert_eq!(order.created_by, f.user1.user_id);
        assert!(order.primary_agent.is_none());
        assert!((1000..=9999).contains(&order.order_number.value()));
        assert!(f.notifier.sent().is_empty());

        let audit = f.service.list_audit(&f.admin, 10).await.unwrap();
        assert_eq!(audit[0].action, "order_created");
    }

    #[tokio::test]
    async fn agents_cannot_create_orders() {
        let f = setup();
        let result = f
            .service
            .create_order(&f.agent1, create_request("Acme", vec![]))
            .await;
        assert!(matches!(result, Err(DeskError::Forbidden(_))));
    }

    #[tokio::test]
    async fn admin_assigns_on_create_and_notifies() {
        let f = setup();
        let order = f
            .service
            .create_order(
                &f.admin,
                create_request(
                    "Acme",
                    vec![f.agent1.user_id, f.agent2.user_id, f.agent1.user_id],
                ),
            )
            .await
            .unwrap();

        assert_eq!(order.primary_agent, Some(f.agent1.user_id));
        assert_eq!(order.secondary_agents, vec![f.agent2.user_id]);
        assert_eq!(
            f.notifier.sent(),
            vec![
                (f.agent1.user_id, order.order_id),
                (f.agent2.user_id, order.order_id)
            ]
        );
    }

    #[tokio::test]
    async fn non_agent_assignment_is_rejected() {
        let f = setup();
        let result = f
            .service
            .create_order(&f.admin, create_request("Acme", vec![f.user1.user_id]))
            .await;
        assert!(matches!(result, Err(DeskError::Validation(_))));
    }

    #[tokio::test]
    async fn failed_notification_does_not_fail_create() {
        let f = setup_with(RecordingNotifier::failing());
        let order = assigned_order(&f).await;
        assert_eq!(f.notifier.sent().len(), 2);
        assert!(f.service.store().get_order(&order.order_id).unwrap().is_some());
    }

    #[tokio::test]
    async fn invalid_fields_are_rejected() {
        let f = setup();
        let mut request = create_request("Acme", vec![]);
        request.fields.quantity_kg = 0.0;
        let result = f.service.create_order(&f.user1, request).await;
        assert!(matches!(result, Err(DeskError::Validation(_))));

        let result = f
            .service
            .create_order(&f.user1, create_request("   ", vec![]))
            .await;
        assert!(matches!(result, Err(DeskError::Validation(_))));
    }

    #[tokio::test]
    async fn list_orders_applies_visibility_and_filters() {
        let f = setup();
        let own = f
            .service
            .create_order(&f.user1, create_request("Acme", vec![]))
            .await
            .unwrap();
        let assigned = assigned_order(&f).await;

        let user_view = f
            .service
            .list_orders(&f.user1, &OrderFilter::default())
            .await
            .unwrap();
        assert_eq!(user_view.len(), 1);
        assert_eq!(user_view[0].order_id, own.order_id);

        let agent_view = f
            .service
            .list_orders(&f.agent2, &OrderFilter::default())
            .await
            .unwrap();
        assert_eq!(agent_view.len(), 1);
        assert_eq!(agent_view[0].order_id, assigned.order_id);

        let admin_view = f
            .service
            .list_orders(&f.admin, &OrderFilter::default())
            .await
            .unwrap();
        assert_eq!(admin_view.len(), 2);
        assert_eq!(admin_view[0].order_id, assigned.order_id);

        let by_agent = f
            .service
            .list_orders(
                &f.admin,
                &OrderFilter {
                    agent: Some(f.agent1.user_id),
                    ..OrderFilter::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(by_agent.len(), 1);

        let hidden = f.service.get_order(&f.user1, &assigned.order_id).await;
        assert!(matches!(hidden, Err(DeskError::Forbidden(_))));
    }

    #[tokio::test]
    async fn dashboard_counts_visible_orders() {
        let f = setup();
        assigned_order(&f).await;
        f.service
            .create_order(&f.user1, create_request("Globex", vec![]))
            .await
            .unwrap();

        let board = f
            .service
            .dashboard(&f.agent1, &OrderFilter::default())
            .await
            .unwrap();
        assert_eq!(board.totals.total_orders, 1);
        assert_eq!(board.columns[0].orders.len(), 1);
    }

    #[tokio::test]
    async fn agent_moves_one_step() {
        let f = setup();
        let order = assigned_order(&f).await;

        let moved = f
            .service
            .move_order(&f.agent2, &order.order_id, OrderStatus::UnderBooking)
            .await
            .unwrap();
        assert_eq!(moved.status, OrderStatus::UnderBooking);

        let skip = f
            .service
            .move_order(&f.agent2, &order.order_id, OrderStatus::ReceivedContract)
            .await;
        assert!(matches!(skip, Err(DeskError::InvalidTransition { .. })));

        let audit = f.service.list_audit(&f.admin, 1).await.unwrap();
        assert_eq!(audit[0].action, "order_moved");
    }

    #[tokio::test]
    async fn users_cannot_move_orders() {
        let f = setup();
        let order = f
            .service
            .create_order(&f.user1, create_request("Acme", vec![]))
            .await
            .unwrap();
        let result = f
            .service
            .move_order(&f.user1, &order.order_id, OrderStatus::UnderBooking)
            .await;
        assert!(matches!(result, Err(DeskError::Forbidden(_))));

        let unchanged = f.service.get_order(&f.user1, &order.order_id).await.unwrap();
        assert_eq!(unchanged.status, OrderStatus::NewOrder);
    }

    #[tokio::test]
    async fn admin_jumps_and_confirmed_is_not_a_target() {
        let f = setup();
        let order = assigned_order(&f).await;

        let archived = f
            .service
            .move_order(&f.admin, &order.order_id, OrderStatus::Archived)
            .await
            .unwrap();
        assert_eq!(archived.status, OrderStatus::Archived);

        let confirmed = f
            .service
            .move_order(&f.admin, &order.order_id, OrderStatus::Confirmed)
            .await;
        assert!(matches!(confirmed, Err(DeskError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn confirm_narrows_to_one_agent() {
        let f = setup();
        let order = assigned_order(&f).await;

        let confirmed = f
            .service
            .confirm_order(&f.admin, &order.order_id, &f.agent2.user_id)
            .await
            .unwrap();
        assert_eq!(confirmed.status, OrderStatus::Confirmed);
        assert_eq!(confirmed.primary_agent, Some(f.agent2.user_id));
        assert!(confirmed.secondary_agents.is_empty());

        assert!(f
            .service
            .get_order(&f.agent2, &order.order_id)
            .await
            .is_ok());
        let lost = f.service.get_order(&f.agent1, &order.order_id).await;
        assert!(matches!(lost, Err(DeskError::Forbidden(_))));

        let by_agent = f.service.confirm_order(&f.agent2, &order.order_id, &f.agent2.user_id).await;
        assert!(matches!(by_agent, Err(DeskError::Forbidden(_))));
    }

    #[tokio::test]
    async fn assign_replaces_and_notifies_new_agents_only() {
        let f = setup();
        let order = f
            .service
            .create_order(&f.admin, create_request("Acme", vec![f.agent1.user_id]))
            .await
            .unwrap();

        let updated = f
            .service
            .assign_agents(
                &f.admin,
                &order.order_id,
                vec![f.agent2.user_id, f.agent1.user_id, f.agent2.user_id],
            )
            .await
            .unwrap();
        assert_eq!(updated.primary_agent, Some(f.agent2.user_id));
        assert_eq!(updated.secondary_agents, vec![f.agent1.user_id]);

        let sent = f.notifier.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].0, f.agent2.user_id);

        let empty = f
            .service
            .assign_agents(&f.admin, &order.order_id, vec![])
            .await;
        assert!(matches!(empty, Err(DeskError::Validation(_))));

        let by_agent = f
            .service
            .assign_agents(&f.agent1, &order.order_id, vec![f.agent1.user_id])
            .await;
        assert!(matches!(by_agent, Err(DeskError::Forbidden(_))));
    }

    #[tokio::test]
    async fn creator_edits_fields_only() {
        let f = setup();
        let order = f
            .service
            .create_order(&f.user1, create_request("Acme", vec![]))
            .await
            .unwrap();

        let edited = f
            .service
            .update_order(&f.user1, &order.order_id, update_request("Acme Ltd"))
            .await
            .unwrap();
        assert_eq!(edited.customer_name, "Acme Ltd");
        assert_eq!(edited.order_number, order.order_number);

        let mut with_status = update_request("Acme Ltd");
        with_status.status = Some(OrderStatus::Booked);
        let result = f
            .service
            .update_order(&f.user1, &order.order_id, with_status)
            .await;
        assert!(matches!(result, Err(DeskError::Forbidden(_))));
    }

    #[tokio::test]
    async fn admin_edit_sets_status_and_agents() {
        let f = setup();
        let order = f
            .service
            .create_order(&f.user1, create_request("Acme", vec![]))
            .await
            .unwrap();

        let mut request = update_request("Acme");
        request.status = Some(OrderStatus::Booked);
        request.agent_ids = Some(vec![f.agent1.user_id]);
        let edited = f
            .service
            .update_order(&f.admin, &order.order_id, request)
            .await
            .unwrap();

        assert_eq!(edited.status, OrderStatus::Booked);
        assert_eq!(edited.primary_agent, Some(f.agent1.user_id));
        assert_eq!(f.notifier.sent(), vec![(f.agent1.user_id, order.order_id)]);
    }

    #[tokio::test]
    async fn chat_requires_visibility() {
        let f = setup();
        let order = assigned_order(&f).await;

        f.service
            .post_message(
                &f.admin,
                &order.order_id,
                PostMessageRequest {
                    body: "for agent1".into(),
                    tagged_agents: vec![f.agent1.user_id],
                },
            )
            .await
            .unwrap();

        let agent2_view = f
            .service
            .list_messages(&f.agent2, &order.order_id)
            .await
            .unwrap();
        assert!(agent2_view.is_empty());
        let agent1_view = f
            .service
            .list_messages(&f.agent1, &order.order_id)
            .await
            .unwrap();
        assert_eq!(agent1_view.len(), 1);

        let outsider = f
            .service
            .post_message(
                &f.user1,
                &order.order_id,
                PostMessageRequest {
                    body: "hello".into(),
                    tagged_agents: vec![],
                },
            )
            .await;
        assert!(matches!(outsider, Err(DeskError::Forbidden(_))));

        let taggable = f
            .service
            .taggable_agents(&f.admin, &order.order_id)
            .await
            .unwrap();
        assert_eq!(taggable.len(), 2);
    }

    #[tokio::test]
    async fn upload_advances_booked_and_delete_cascades() {
        let f = setup();
        let order = assigned_order(&f).await;
        f.service
            .move_order(&f.admin, &order.order_id, OrderStatus::Booked)
            .await
            .unwrap();

        let contract = f
            .service
            .upload_contract(&f.agent1, &order.order_id, "deal.pdf", b"%PDF".to_vec())
            .await
            .unwrap();
        let after = f.service.get_order(&f.admin, &order.order_id).await.unwrap();
        assert_eq!(after.status, OrderStatus::ReceivedContract);

        let secondary = f
            .service
            .upload_contract(&f.agent2, &order.order_id, "other.pdf", b"x".to_vec())
            .await;
        assert!(matches!(secondary, Err(DeskError::Forbidden(_))));

        let file = f
            .service
            .download_contract(&f.admin, &contract.contract_id)
            .await
            .unwrap();
        assert_eq!(file.bytes, b"%PDF");

        let listed = f
            .service
            .contract_orders(&f.agent1)
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);

        f.service
            .post_message(
                &f.admin,
                &order.order_id,
                PostMessageRequest {
                    body: "done".into(),
                    tagged_agents: vec![],
                },
            )
            .await
            .unwrap();

        f.service.delete_order(&f.admin, &order.order_id).await.unwrap();

        let store = f.service.store();
        assert!(store.get_order(&order.order_id).unwrap().is_none());
        assert!(store.get_contract(&contract.contract_id).unwrap().is_none());
        assert!(store.list_messages_by_order(&order.order_id).unwrap().is_empty());
        assert!(!std::path::Path::new(&contract.stored_path).exists());

        let audit = f.service.list_audit(&f.admin, 1).await.unwrap();
        assert_eq!(audit[0].action, "order_deleted");
    }

    #[tokio::test]
    async fn admin_only_reporting() {
        let f = setup();
        assigned_order(&f).await;
        f.service
            .create_order(&f.user1, create_request("Globex", vec![]))
            .await
            .unwrap();

        let stats = f.service.admin_stats(&f.admin).await.unwrap();
        assert_eq!(stats.total_orders, 2);
        assert_eq!(stats.total_users, 4);
        assert_eq!(stats.users_by_role.get("agent"), Some(&2));
        assert_eq!(stats.orders_by_agent.get("agent1"), Some(&1));
        assert_eq!(stats.orders_by_agent.get("agent2"), Some(&0));
        assert!((stats.revenue.export - 2400.0).abs() < f64::EPSILON);
        assert_eq!(stats.recent_orders.len(), 2);

        let csv = f.service.export_orders_csv(&f.admin).await.unwrap();
        assert_eq!(csv.lines().count(), 3);
        assert!(csv.contains(",Unassigned,"));

        let report = f
            .service
            .report(&f.admin, &ReportFilter::default())
            .await
            .unwrap();
        assert_eq!(report.total_orders, 2);

        assert!(matches!(
            f.service.admin_stats(&f.agent1).await,
            Err(DeskError::Forbidden(_))
        ));
        assert!(matches!(
            f.service.export_orders_csv(&f.user1).await,
            Err(DeskError::Forbidden(_))
        ));
        assert!(matches!(
            f.service.report(&f.user1, &ReportFilter::default()).await,
            Err(DeskError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn list_agents_is_admin_only() {
        let f = setup();
        let agents = f.service.list_agents(&f.admin).await.unwrap();
        let names: Vec<_> = agents.iter().map(|a| a.username.as_str()).collect();
        assert_eq!(names, vec!["agent1", "agent2"]);

        assert!(f.service.list_users(&f.agent1).await.is_err());
    }

    #[tokio::test]
    async fn confirmed_order_cannot_lose_its_primary() {
        let f = setup();
        let order = assigned_order(&f).await;
        f.service
            .confirm_order(&f.admin, &order.order_id, &f.agent1.user_id)
            .await
            .unwrap();

        let mut clear = update_request("Acme");
        clear.agent_ids = Some(vec![]);
        let result = f
            .service
            .update_order(&f.admin, &order.order_id, clear)
            .await;
        assert!(matches!(result, Err(DeskError::Validation(_))));

        let kept = f.service.get_order(&f.agent1, &order.order_id).await.unwrap();
        assert_eq!(kept.status, OrderStatus::Confirmed);
        assert_eq!(kept.primary_agent, Some(f.agent1.user_id));

        let mut widen = update_request("Acme");
        widen.agent_ids = Some(vec![f.agent2.user_id, f.agent1.user_id]);
        let edited = f
            .service
            .update_order(&f.admin, &order.order_id, widen)
            .await
            .unwrap();
        assert_eq!(edited.primary_agent, Some(f.agent2.user_id));
        assert!(edited.secondary_agents.is_empty());
    }

    #[tokio::test]
    async fn order_detail_lists_moves_for_the_callers_role() {
        let f = setup();
        let order = assigned_order(&f).await;

        let admin = f
            .service
            .order_detail(&f.admin, &order.order_id)
            .await
            .unwrap();
        assert_eq!(admin.order.order_id, order.order_id);
        assert_eq!(
            admin.valid_moves,
            vec![
                OrderStatus::UnderBooking,
                OrderStatus::Booked,
                OrderStatus::ReceivedContract,
                OrderStatus::Archived,
            ]
        );

        let agent = f
            .service
            .order_detail(&f.agent1, &order.order_id)
            .await
            .unwrap();
        assert_eq!(agent.valid_moves, vec![OrderStatus::UnderBooking]);

        let own = f
            .service
            .create_order(&f.user1, create_request("Globex", vec![]))
            .await
            .unwrap();
        let user = f
            .service
            .order_detail(&f.user1, &own.order_id)
            .await
            .unwrap();
        assert!(user.valid_moves.is_empty());

        let hidden = f.service.order_detail(&f.user1, &order.order_id).await;
        assert!(matches!(hidden, Err(DeskError::Forbidden(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_registrations_share_no_username() {
        let Fixture {
            service, _dir: dir, ..
        } = setup();
        let service = Arc::new(service);

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let service = Arc::clone(&service);
                tokio::spawn(async move {
                    let request = RegisterRequest {
                        username: "alice".into(),
                        email: format!("alice{i}@example.com"),
                        password: "secret1".into(),
                        role: None,
                    };
                    service.register_user(None, request).await
                })
            })
            .collect();

        let mut registered = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => registered += 1,
                Err(e) => assert!(matches!(e, DeskError::Conflict(_)), "unexpected error: {e}"),
            }
        }
        assert_eq!(registered, 1);

        let named_alice = service
            .store()
            .list_users()
            .unwrap()
            .into_iter()
            .filter(|u| u.username == "alice")
            .count();
        assert_eq!(named_alice, 1);
        drop(dir);
    }

    /// Delegates to a `RocksStore` but refuses any batch that carries an
    /// audit entry.
    struct AuditlessStore {
        inner: RocksStore,
    }

    impl Store for AuditlessStore {
        fn commit(&self, ops: &[WriteOp<'_>]) -> yarnflow_store::Result<()> {
            if ops.iter().any(|op| matches!(op, WriteOp::AppendAudit(_))) {
                return Err(StoreError::Database("audit log unavailable".into()));
            }
            self.inner.commit(ops)
        }
        fn get_user(&self, user_id: &UserId) -> yarnflow_store::Result<Option<User>> {
            self.inner.get_user(user_id)
        }
        fn get_user_by_username(&self, username: &str) -> yarnflow_store::Result<Option<User>> {
            self.inner.get_user_by_username(username)
        }
        fn get_user_by_email(&self, email: &str) -> yarnflow_store::Result<Option<User>> {
            self.inner.get_user_by_email(email)
        }
        fn list_users(&self) -> yarnflow_store::Result<Vec<User>> {
            self.inner.list_users()
        }
        fn list_users_by_role(&self, role: Role) -> yarnflow_store::Result<Vec<User>> {
            self.inner.list_users_by_role(role)
        }
        fn count_users_by_role(&self, role: Role) -> yarnflow_store::Result<u32> {
            self.inner.count_users_by_role(role)
        }
        fn get_order(&self, order_id: &OrderId) -> yarnflow_store::Result<Option<Order>> {
            self.inner.get_order(order_id)
        }
        fn get_order_by_number(&self, number: OrderNumber) -> yarnflow_store::Result<Option<Order>> {
            self.inner.get_order_by_number(number)
        }
        fn list_orders(&self) -> yarnflow_store::Result<Vec<Order>> {
            self.inner.list_orders()
        }
        fn list_orders_by_status(&self, status: OrderStatus) -> yarnflow_store::Result<Vec<Order>> {
            self.inner.list_orders_by_status(status)
        }
        fn list_orders_by_creator(&self, user_id: &UserId) -> yarnflow_store::Result<Vec<Order>> {
            self.inner.list_orders_by_creator(user_id)
        }
        fn delete_order(
            &self,
            _order_id: &OrderId,
            _audit: &AuditEntry,
        ) -> yarnflow_store::Result<Vec<Contract>> {
            Err(StoreError::Database("audit log unavailable".into()))
        }
        fn list_messages_by_order(
            &self,
            order_id: &OrderId,
        ) -> yarnflow_store::Result<Vec<ChatMessage>> {
            self.inner.list_messages_by_order(order_id)
        }
        fn list_recent_messages(&self, limit: usize) -> yarnflow_store::Result<Vec<ChatMessage>> {
            self.inner.list_recent_messages(limit)
        }
        fn get_contract(&self, contract_id: &ContractId) -> yarnflow_store::Result<Option<Contract>> {
            self.inner.get_contract(contract_id)
        }
        fn list_contracts_by_order(
            &self,
            order_id: &OrderId,
        ) -> yarnflow_store::Result<Vec<Contract>> {
            self.inner.list_contracts_by_order(order_id)
        }
        fn list_audit(&self, limit: usize) -> yarnflow_store::Result<Vec<AuditEntry>> {
            self.inner.list_audit(limit)
        }
    }

    #[tokio::test]
    async fn failed_audit_write_leaves_no_partial_state() {
        let dir = TempDir::new().unwrap();
        let inner = RocksStore::open(dir.path().join("db")).unwrap();
        let admin = add_user(&inner, "admin", Role::Admin);
        let agent = add_user(&inner, "agent1", Role::Agent);

        let existing = Order {
            order_id: OrderId::generate(),
            order_number: OrderNumber::new(4242).unwrap(),
            customer_name: "Initech".into(),
            yarn_type: "Polyester".into(),
            quantity_kg: 90.0,
            startup_date: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
            order_type: OrderType::Local,
            amount_usd: 300.0,
            status: OrderStatus::NewOrder,
            created_by: admin.user_id,
            primary_agent: None,
            secondary_agents: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        inner.put_order(&existing).unwrap();

        let config = DeskConfig {
            upload_dir: dir.path().join("uploads"),
            ..DeskConfig::default()
        };
        let service = OrderDeskService::new(Arc::new(AuditlessStore { inner }), config)
            .with_notifier(Arc::new(RecordingNotifier::default()));

        let created = service
            .create_order(&admin, create_request("Acme", vec![]))
            .await;
        assert!(created.is_err());
        assert_eq!(service.store().list_orders().unwrap().len(), 1);

        let moved = service
            .move_order(&admin, &existing.order_id, OrderStatus::Booked)
            .await;
        assert!(moved.is_err());

        let assigned = service
            .assign_agents(&admin, &existing.order_id, vec![agent.user_id])
            .await;
        assert!(assigned.is_err());

        let posted = service
            .post_message(
                &admin,
                &existing.order_id,
                PostMessageRequest {
                    body: "hello".into(),
                    tagged_agents: vec![],
                },
            )
            .await;
        assert!(posted.is_err());

        let stored = service.store().get_order(&existing.order_id).unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::NewOrder);
        assert!(stored.primary_agent.is_none());
        assert!(service
            .store()
            .list_messages_by_order(&existing.order_id)
            .unwrap()
            .is_empty());

        let deactivated = service.set_user_active(&admin, &agent.user_id, false).await;
        assert!(deactivated.is_err());
        assert!(service.store().get_user(&agent.user_id).unwrap().unwrap().is_active);

        let deleted = service.delete_order(&admin, &existing.order_id).await;
        assert!(deleted.is_err());
        assert!(service.store().get_order(&existing.order_id).unwrap().is_some());

        assert!(service.store().list_audit(usize::MAX).unwrap().is_empty());
    }

    #[tokio::test]
    async fn audit_log_only_grows() {
        let f = setup();
        let audit_ids = |f: &Fixture| -> Vec<_> {
            f.service
                .store()
                .list_audit(usize::MAX)
                .unwrap()
                .into_iter()
                .map(|e| e.audit_id)
                .collect()
        };

        let order = assigned_order(&f).await;
        let after_create = audit_ids(&f);
        assert_eq!(after_create.len(), 1);

        let skip = f
            .service
            .move_order(&f.agent1, &order.order_id, OrderStatus::Archived)
            .await;
        assert!(skip.is_err());
        let denied = f
            .service
            .move_order(&f.user1, &order.order_id, OrderStatus::UnderBooking)
            .await;
        assert!(denied.is_err());
        assert_eq!(audit_ids(&f), after_create);

        f.service
            .set_user_active(&f.admin, &f.user1.user_id, false)
            .await
            .unwrap();
        let after_deactivate = audit_ids(&f);
        assert_eq!(after_deactivate.len(), 2);

        f.service.delete_order(&f.admin, &order.order_id).await.unwrap();
        let after_delete = audit_ids(&f);
        assert_eq!(after_delete.len(), 3);
        assert!(after_deactivate.iter().all(|id| after_delete.contains(id)));

        let again = f.service.delete_order(&f.admin, &order.order_id).await;
        assert!(matches!(again, Err(DeskError::OrderNotFound(_))));
        assert_eq!(audit_ids(&f), after_delete);
    }
}
