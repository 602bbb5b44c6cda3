//! Gateway application state.
//!
//! This module defines the shared state that is available to all request handlers.

use std::sync::Arc;

use yarnflow_auth::{JwtValidator, TokenIssuer};
use yarnflow_desk::OrderDesk;

use crate::config::GatewayConfig;

/// Shared application state for the gateway.
///
/// This struct holds references to all services needed by the HTTP handlers.
pub struct GatewayState<D, V>
where
    D: OrderDesk,
    V: JwtValidator,
{
    /// The order desk.
    pub desk: Arc<D>,
    /// The JWT validator for authentication.
    pub jwt_validator: Arc<V>,
    /// Issues tokens on login.
    pub token_issuer: Arc<TokenIssuer>,
    /// Gateway configuration.
    pub config: GatewayConfig,
}

impl<D, V> GatewayState<D, V>
where
    D: OrderDesk,
    V: JwtValidator,
{
    /// Create a new gateway state.
    #[must_use]
    pub fn new(
        desk: Arc<D>,
        jwt_validator: Arc<V>,
        token_issuer: Arc<TokenIssuer>,
        config: GatewayConfig,
    ) -> Self {
        Self {
            desk,
            jwt_validator,
            token_issuer,
            config,
        }
    }
}

impl<D, V> Clone for GatewayState<D, V>
where
    D: OrderDesk,
    V: JwtValidator,
{
    fn clone(&self) -> Self {
        Self {
            desk: Arc::clone(&self.desk),
            jwt_validator: Arc::clone(&self.jwt_validator),
            token_issuer: Arc::clone(&self.token_issuer),
            config: self.config.clone(),
        }
    }
}
