//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use yarnflow_auth::JwtValidator;
use yarnflow_desk::OrderDesk;

use crate::handlers::{accounts, admin, chat, contracts, health, orders};
use crate::state::GatewayState;

/// Create the gateway router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
/// - `POST /v1/auth/register` - Register an account
/// - `POST /v1/auth/login` - Exchange credentials for a token
///
/// ## Profile (authenticated)
/// - `GET /v1/me` - Own profile
/// - `PATCH /v1/me` - Update own profile
///
/// ## Orders (authenticated)
/// - `GET /v1/dashboard` - Board view
/// - `GET /v1/orders` - List orders
/// - `POST /v1/orders` - Create order
/// - `GET /v1/orders/:order_id` - Get order
/// - `PUT /v1/orders/:order_id` - Edit order
/// - `DELETE /v1/orders/:order_id` - Delete order
/// - `POST /v1/orders/:order_id/move` - Move order
/// - `PUT /v1/orders/:order_id/agents` - Assign agents
/// - `POST /v1/orders/:order_id/confirm` - Confirm order
///
/// ## Chat (authenticated)
/// - `GET /v1/orders/:order_id/messages` - List messages
/// - `POST /v1/orders/:order_id/messages` - Post message
/// - `GET /v1/orders/:order_id/taggable-agents` - Tag picker
///
/// ## Contracts (authenticated)
/// - `GET /v1/contracts` - Orders at a contract stage
/// - `GET /v1/orders/:order_id/contracts` - List contracts
/// - `POST /v1/orders/:order_id/contracts` - Upload contract
/// - `GET /v1/contracts/:contract_id/download` - Download contract
///
/// ## Admin (authenticated)
/// - `GET /v1/admin/users` - List accounts
/// - `POST /v1/admin/users/:user_id/activate` - Reactivate account
/// - `POST /v1/admin/users/:user_id/deactivate` - Deactivate account
/// - `GET /v1/admin/agents` - List agents
/// - `GET /v1/admin/stats` - Statistics
/// - `GET /v1/admin/reports` - Filtered report
/// - `GET /v1/admin/export` - CSV export
/// - `GET /v1/admin/audit` - Audit log
pub fn create_router<D, V>(state: GatewayState<D, V>) -> Router
where
    D: OrderDesk + 'static,
    V: JwtValidator + 'static,
{
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);
    let state = Arc::new(state);

    Router::new()
        // Health (public)
        .route("/health", get(health::health))
        // Accounts
        .route("/v1/auth/register", post(accounts::register::<D, V>))
        .route("/v1/auth/login", post(accounts::login::<D, V>))
        .route(
            "/v1/me",
            get(accounts::me::<D, V>).patch(accounts::update_me::<D, V>),
        )
        // Orders
        .route("/v1/dashboard", get(orders::dashboard::<D, V>))
        .route(
            "/v1/orders",
            get(orders::list_orders::<D, V>).post(orders::create_order::<D, V>),
        )
        .route(
            "/v1/orders/:order_id",
            get(orders::get_order::<D, V>)
                .put(orders::update_order::<D, V>)
                .delete(orders::delete_order::<D, V>),
        )
        .route("/v1/orders/:order_id/move", post(orders::move_order::<D, V>))
        .route(
            "/v1/orders/:order_id/agents",
            axum::routing::put(orders::assign_agents::<D, V>),
        )
        .route(
            "/v1/orders/:order_id/confirm",
            post(orders::confirm_order::<D, V>),
        )
        // Chat
        .route(
            "/v1/orders/:order_id/messages",
            get(chat::list_messages::<D, V>).post(chat::post_message::<D, V>),
        )
        .route(
            "/v1/orders/:order_id/taggable-agents",
            get(chat::taggable_agents::<D, V>),
        )
        // Contracts
        .route("/v1/contracts", get(contracts::contract_orders::<D, V>))
        .route(
            "/v1/orders/:order_id/contracts",
            get(contracts::list_contracts::<D, V>).post(contracts::upload_contract::<D, V>),
        )
        .route(
            "/v1/contracts/:contract_id/download",
            get(contracts::download_contract::<D, V>),
        )
        // Admin
        .route("/v1/admin/users", get(admin::list_users::<D, V>))
        .route(
            "/v1/admin/users/:user_id/activate",
            post(admin::activate_user::<D, V>),
        )
        .route(
            "/v1/admin/users/:user_id/deactivate",
            post(admin::deactivate_user::<D, V>),
        )
        .route("/v1/admin/agents", get(admin::list_agents::<D, V>))
        .route("/v1/admin/stats", get(admin::stats::<D, V>))
        .route("/v1/admin/reports", get(admin::report::<D, V>))
        .route("/v1/admin/export", get(admin::export_orders::<D, V>))
        .route("/v1/admin/audit", get(admin::audit_log::<D, V>))
        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(max_body_bytes))
                .layer(TimeoutLayer::new(Duration::from_secs(
                    request_timeout_seconds,
                ))),
        )
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_any_origin() {
        let origins = vec!["*".to_string()];
        let _layer = build_cors_layer(&origins);
    }

    #[test]
    fn cors_specific_origins() {
        let origins = vec![
            "http://localhost:3000".to_string(),
            "https://orders.example.com".to_string(),
        ];
        let _layer = build_cors_layer(&origins);
    }
}
