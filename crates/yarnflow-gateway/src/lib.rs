//! HTTP gateway for the yarnflow order tracker.
//!
//! This crate provides the public-facing JSON API. It handles:
//!
//! - Login and bearer token authentication
//! - REST endpoints for orders, chat, contracts and admin reporting
//! - Multipart contract uploads and attachment downloads
//! - Mapping desk errors to `{"error": {"code", "message"}}` responses
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Clients                              │
//! │                  (browser / yfctl)                          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    yarnflow-gateway                         │
//! │  ┌─────────────┐ ┌─────────────┐ ┌─────────────────────┐    │
//! │  │   Auth      │ │   Router    │ │    Error            │    │
//! │  │  Extractor  │ │  + Handlers │ │    Mapping          │    │
//! │  └─────────────┘ └─────────────┘ └─────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!               ┌──────────────┼──────────────┐
//!               ▼              ▼              ▼
//!        ┌──────────┐   ┌──────────┐   ┌──────────┐
//!        │  Order   │   │  Auth    │   │ Contract │
//!        │  Desk    │   │  (JWT)   │   │  Files   │
//!        └──────────┘   └──────────┘   └──────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use yarnflow_gateway::{GatewayConfig, GatewayState, create_router};
//! use yarnflow_desk::OrderDeskService;
//! use yarnflow_auth::{AuthConfig, HmacJwtValidator, TokenIssuer};
//! use yarnflow_store::RocksStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(RocksStore::open("/tmp/yarnflow")?);
//! let desk = Arc::new(OrderDeskService::with_defaults(store));
//!
//! let auth_config = AuthConfig::default();
//! let validator = Arc::new(HmacJwtValidator::new(&auth_config));
//! let issuer = Arc::new(TokenIssuer::new(auth_config));
//!
//! let state = GatewayState::new(desk, validator, issuer, GatewayConfig::default());
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::GatewayConfig;
pub use error::ApiError;
pub use routes::create_router;
pub use state::GatewayState;

// Re-export key types for convenience
pub use auth::AuthUser;
