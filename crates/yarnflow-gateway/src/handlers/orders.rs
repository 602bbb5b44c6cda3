//! Order endpoints.
//!
//! This module provides handlers for the dashboard, order CRUD and pipeline
//! operations.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use yarnflow_auth::JwtValidator;
use yarnflow_core::{OrderId, UserId};
use yarnflow_desk::{
    CreateOrderRequest, Order, OrderDesk, OrderFilter, OrderStatus, UpdateOrderRequest,
};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::handlers::parse_id;
use crate::state::GatewayState;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Response for order lists.
#[derive(Debug, Serialize)]
pub struct ListOrdersResponse {
    /// Matching orders, newest first.
    pub orders: Vec<Order>,
}

/// Request to move an order.
#[derive(Debug, Deserialize)]
pub struct MoveOrderBody {
    /// Target status.
    pub status: OrderStatus,
}

/// Request to assign agents.
#[derive(Debug, Deserialize)]
pub struct AssignAgentsBody {
    /// Agents to assign; first is primary.
    pub agent_ids: Vec<UserId>,
}

/// Request to confirm an order.
#[derive(Debug, Deserialize)]
pub struct ConfirmOrderBody {
    /// The agent the order is confirmed to.
    pub agent_id: UserId,
}

// =============================================================================
// Handlers
// =============================================================================

/// Dashboard over the caller's visible orders.
///
/// # Errors
///
/// Returns an error if the desk operation fails.
pub async fn dashboard<D, V>(
    State(state): State<Arc<GatewayState<D, V>>>,
    user: AuthUser,
    Query(filter): Query<OrderFilter>,
) -> Result<impl IntoResponse, ApiError>
where
    D: OrderDesk + 'static,
    V: JwtValidator + 'static,
{
    let board = state.desk.dashboard(&user.actor(), &filter).await?;
    Ok(Json(board))
}

/// List the caller's visible orders.
///
/// # Errors
///
/// Returns an error if the desk operation fails.
pub async fn list_orders<D, V>(
    State(state): State<Arc<GatewayState<D, V>>>,
    user: AuthUser,
    Query(filter): Query<OrderFilter>,
) -> Result<impl IntoResponse, ApiError>
where
    D: OrderDesk + 'static,
    V: JwtValidator + 'static,
{
    let orders = state.desk.list_orders(&user.actor(), &filter).await?;
    Ok(Json(ListOrdersResponse { orders }))
}

/// Create an order.
///
/// # Errors
///
/// Returns an error if:
/// - The caller is an agent
/// - A field fails validation
/// - An assigned id is not an active agent
pub async fn create_order<D, V>(
    State(state): State<Arc<GatewayState<D, V>>>,
    user: AuthUser,
    Json(body): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, ApiError>
where
    D: OrderDesk + 'static,
    V: JwtValidator + 'static,
{
    let order = state.desk.create_order(&user.actor(), body).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// Get a single order with the stages the caller may move it to.
///
/// # Errors
///
/// Returns an error if the order does not exist or is not visible.
pub async fn get_order<D, V>(
    State(state): State<Arc<GatewayState<D, V>>>,
    user: AuthUser,
    Path(order_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    D: OrderDesk + 'static,
    V: JwtValidator + 'static,
{
    let order_id: OrderId = parse_id("order", &order_id)?;
    let detail = state.desk.order_detail(&user.actor(), &order_id).await?;
    Ok(Json(detail))
}

/// Edit an order.
///
/// # Errors
///
/// Returns an error if the caller may not edit the order or validation fails.
pub async fn update_order<D, V>(
    State(state): State<Arc<GatewayState<D, V>>>,
    user: AuthUser,
    Path(order_id): Path<String>,
    Json(body): Json<UpdateOrderRequest>,
) -> Result<impl IntoResponse, ApiError>
where
    D: OrderDesk + 'static,
    V: JwtValidator + 'static,
{
    let order_id: OrderId = parse_id("order", &order_id)?;
    let order = state
        .desk
        .update_order(&user.actor(), &order_id, body)
        .await?;
    Ok(Json(order))
}

/// Delete an order. Admin only.
///
/// # Errors
///
/// Returns an error if the caller is not an admin or the order does not exist.
pub async fn delete_order<D, V>(
    State(state): State<Arc<GatewayState<D, V>>>,
    user: AuthUser,
    Path(order_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    D: OrderDesk + 'static,
    V: JwtValidator + 'static,
{
    let order_id: OrderId = parse_id("order", &order_id)?;
    state.desk.delete_order(&user.actor(), &order_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Move an order to another stage.
///
/// # Errors
///
/// Returns `ApiError::InvalidTransition` if the caller's role may not make
/// the move.
pub async fn move_order<D, V>(
    State(state): State<Arc<GatewayState<D, V>>>,
    user: AuthUser,
    Path(order_id): Path<String>,
    Json(body): Json<MoveOrderBody>,
) -> Result<impl IntoResponse, ApiError>
where
    D: OrderDesk + 'static,
    V: JwtValidator + 'static,
{
    let order_id: OrderId = parse_id("order", &order_id)?;
    let order = state
        .desk
        .move_order(&user.actor(), &order_id, body.status)
        .await?;
    Ok(Json(order))
}

/// Replace the agents on an order. Admin only.
///
/// # Errors
///
/// Returns an error if the caller is not an admin or an id is not an agent.
pub async fn assign_agents<D, V>(
    State(state): State<Arc<GatewayState<D, V>>>,
    user: AuthUser,
    Path(order_id): Path<String>,
    Json(body): Json<AssignAgentsBody>,
) -> Result<impl IntoResponse, ApiError>
where
    D: OrderDesk + 'static,
    V: JwtValidator + 'static,
{
    let order_id: OrderId = parse_id("order", &order_id)?;
    let order = state
        .desk
        .assign_agents(&user.actor(), &order_id, body.agent_ids)
        .await?;
    Ok(Json(order))
}

/// Confirm an order to one agent. Admin only.
///
/// # Errors
///
/// Returns an error if the caller is not an admin or the id is not an agent.
pub async fn confirm_order<D, V>(
    State(state): State<Arc<GatewayState<D, V>>>,
    user: AuthUser,
    Path(order_id): Path<String>,
    Json(body): Json<ConfirmOrderBody>,
) -> Result<impl IntoResponse, ApiError>
where
    D: OrderDesk + 'static,
    V: JwtValidator + 'static,
{
    let order_id: OrderId = parse_id("order", &order_id)?;
    let order = state
        .desk
        .confirm_order(&user.actor(), &order_id, &body.agent_id)
        .await?;
    Ok(Json(order))
}
