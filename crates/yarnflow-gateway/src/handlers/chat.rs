//! Order chat endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use yarnflow_auth::JwtValidator;
use yarnflow_core::OrderId;
use yarnflow_desk::{ChatMessage, OrderDesk, PostMessageRequest, UserProfile};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::handlers::parse_id;
use crate::state::GatewayState;

/// Response for a chat thread.
#[derive(Debug, Serialize)]
pub struct ListMessagesResponse {
    /// Visible messages, oldest first.
    pub messages: Vec<ChatMessage>,
}

/// Response for the tag picker.
#[derive(Debug, Serialize)]
pub struct TaggableAgentsResponse {
    /// Agents assigned to the order, primary first.
    pub agents: Vec<UserProfile>,
}

/// List the messages of an order the caller may see.
///
/// # Errors
///
/// Returns an error if the order is missing or not visible.
pub async fn list_messages<D, V>(
    State(state): State<Arc<GatewayState<D, V>>>,
    user: AuthUser,
    Path(order_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    D: OrderDesk + 'static,
    V: JwtValidator + 'static,
{
    let order_id: OrderId = parse_id("order", &order_id)?;
    let messages = state.desk.list_messages(&user.actor(), &order_id).await?;
    Ok(Json(ListMessagesResponse { messages }))
}

/// Post a message on an order thread.
///
/// # Errors
///
/// Returns an error if the body is empty, the order is not visible, or the
/// tags are not allowed.
pub async fn post_message<D, V>(
    State(state): State<Arc<GatewayState<D, V>>>,
    user: AuthUser,
    Path(order_id): Path<String>,
    Json(body): Json<PostMessageRequest>,
) -> Result<impl IntoResponse, ApiError>
where
    D: OrderDesk + 'static,
    V: JwtValidator + 'static,
{
    let order_id: OrderId = parse_id("order", &order_id)?;
    let message = state
        .desk
        .post_message(&user.actor(), &order_id, body)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// Agents the caller may tag on an order. Admin only.
///
/// # Errors
///
/// Returns an error if the caller is not an admin.
pub async fn taggable_agents<D, V>(
    State(state): State<Arc<GatewayState<D, V>>>,
    user: AuthUser,
    Path(order_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    D: OrderDesk + 'static,
    V: JwtValidator + 'static,
{
    let order_id: OrderId = parse_id("order", &order_id)?;
    let agents = state
        .desk
        .taggable_agents(&user.actor(), &order_id)
        .await?;
    Ok(Json(TaggableAgentsResponse { agents }))
}
