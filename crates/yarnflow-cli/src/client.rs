//! HTTP client for the gateway REST API.
//!
//! This module provides a typed client for interacting with yarnflow-gateway.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::types::{
    ApiErrorResponse, AssignAgentsRequest, ChatMessage, ConfirmOrderRequest, CreateOrderRequest,
    ListMessagesResponse, ListOrdersResponse, LoginRequest, LoginResponse, MoveOrderRequest, Order,
    OrderQuery, PostMessageRequest,
};

/// Error type for client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error ({status}, {code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// No token was supplied for an authenticated call.
    #[error("not logged in; run `yfctl login` and set YARNFLOW_TOKEN")]
    NotLoggedIn,

    /// Token contains characters not allowed in a header.
    #[error("token is not a valid header value")]
    InvalidToken,
}

/// Client for the gateway REST API.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl GatewayClient {
    /// Create a new gateway client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the gateway (e.g., "http://localhost:8080")
    /// * `token` - Bearer token, if logged in
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Build headers for authenticated requests.
    fn auth_headers(&self) -> Result<HeaderMap, ClientError> {
        let token = self.token.as_deref().ok_or(ClientError::NotLoggedIn)?;
        let value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| ClientError::InvalidToken)?;
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }

    /// Send a request and fail on a non-success status.
    async fn send(request: RequestBuilder) -> Result<Response, ClientError> {
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(Self::handle_error(response).await);
        }
        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ClientError> {
        Self::send(request)
            .await?
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))
    }

    /// Handle API error responses.
    async fn handle_error(response: Response) -> ClientError {
        let status = response.status().as_u16();
        match response.json::<ApiErrorResponse>().await {
            Ok(err) => ClientError::Api {
                status,
                code: err.error.code,
                message: err.error.message,
            },
            Err(_) => ClientError::Api {
                status,
                code: "unknown".to_string(),
                message: "Unknown error".to_string(),
            },
        }
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    /// Exchange credentials for a token.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ClientError> {
        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        Self::send_json(self.client.post(self.url("/v1/auth/login")).json(&request)).await
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// List orders visible to the caller.
    pub async fn list_orders(&self, query: &OrderQuery) -> Result<Vec<Order>, ClientError> {
        let request = self
            .client
            .get(self.url("/v1/orders"))
            .headers(self.auth_headers()?)
            .query(query);
        let body: ListOrdersResponse = Self::send_json(request).await?;
        Ok(body.orders)
    }

    /// Get one order.
    pub async fn get_order(&self, order_id: &str) -> Result<Order, ClientError> {
        let request = self
            .client
            .get(self.url(&format!("/v1/orders/{order_id}")))
            .headers(self.auth_headers()?);
        Self::send_json(request).await
    }

    /// Create an order.
    pub async fn create_order(&self, order: &CreateOrderRequest) -> Result<Order, ClientError> {
        let request = self
            .client
            .post(self.url("/v1/orders"))
            .headers(self.auth_headers()?)
            .json(order);
        Self::send_json(request).await
    }

    /// Move an order to another status.
    pub async fn move_order(&self, order_id: &str, status: &str) -> Result<Order, ClientError> {
        let body = MoveOrderRequest {
            status: status.to_string(),
        };
        let request = self
            .client
            .post(self.url(&format!("/v1/orders/{order_id}/move")))
            .headers(self.auth_headers()?)
            .json(&body);
        Self::send_json(request).await
    }

    /// Replace an order's agents.
    pub async fn assign_agents(
        &self,
        order_id: &str,
        agent_ids: Vec<String>,
    ) -> Result<Order, ClientError> {
        let body = AssignAgentsRequest { agent_ids };
        let request = self
            .client
            .put(self.url(&format!("/v1/orders/{order_id}/agents")))
            .headers(self.auth_headers()?)
            .json(&body);
        Self::send_json(request).await
    }

    /// Confirm an order to one agent.
    pub async fn confirm_order(&self, order_id: &str, agent_id: &str) -> Result<Order, ClientError> {
        let body = ConfirmOrderRequest {
            agent_id: agent_id.to_string(),
        };
        let request = self
            .client
            .post(self.url(&format!("/v1/orders/{order_id}/confirm")))
            .headers(self.auth_headers()?)
            .json(&body);
        Self::send_json(request).await
    }

    // =========================================================================
    // Chat
    // =========================================================================

    /// Messages on an order thread.
    pub async fn list_messages(&self, order_id: &str) -> Result<Vec<ChatMessage>, ClientError> {
        let request = self
            .client
            .get(self.url(&format!("/v1/orders/{order_id}/messages")))
            .headers(self.auth_headers()?);
        let body: ListMessagesResponse = Self::send_json(request).await?;
        Ok(body.messages)
    }

    /// Post a message on an order thread.
    pub async fn post_message(
        &self,
        order_id: &str,
        body: &str,
        tagged_agents: Vec<String>,
    ) -> Result<ChatMessage, ClientError> {
        let body = PostMessageRequest {
            body: body.to_string(),
            tagged_agents,
        };
        let request = self
            .client
            .post(self.url(&format!("/v1/orders/{order_id}/messages")))
            .headers(self.auth_headers()?)
            .json(&body);
        Self::send_json(request).await
    }

    // =========================================================================
    // Export
    // =========================================================================

    /// All orders as CSV text. Admin only.
    pub async fn export_orders(&self) -> Result<String, ClientError> {
        let request = self
            .client
            .get(self.url("/v1/admin/export"))
            .headers(self.auth_headers()?);
        Ok(Self::send(request).await?.text().await?)
    }
}
