//! Contract file endpoints.
//!
//! Uploads arrive as `multipart/form-data` with the file in the
//! `contract_file` field. Downloads are served as attachments.

use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use yarnflow_auth::JwtValidator;
use yarnflow_core::{ContractId, OrderId, UserId};
use yarnflow_desk::{Contract, Order, OrderDesk};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::handlers::parse_id;
use crate::state::GatewayState;

/// Multipart field carrying the uploaded file.
pub const CONTRACT_FIELD: &str = "contract_file";

// =============================================================================
// Request/Response Types
// =============================================================================

/// A contract record as exposed to clients.
#[derive(Debug, Serialize)]
pub struct ContractResponse {
    /// Contract ID.
    pub contract_id: ContractId,
    /// Owning order.
    pub order_id: OrderId,
    /// Stored file name.
    pub filename: String,
    /// File size in bytes.
    pub size_bytes: u64,
    /// BLAKE3 checksum, hex.
    pub checksum: String,
    /// Uploader.
    pub uploaded_by: UserId,
    /// Upload timestamp.
    pub uploaded_at: DateTime<Utc>,
}

impl From<Contract> for ContractResponse {
    fn from(contract: Contract) -> Self {
        Self {
            contract_id: contract.contract_id,
            order_id: contract.order_id,
            filename: contract.filename,
            size_bytes: contract.size_bytes,
            checksum: contract.checksum,
            uploaded_by: contract.uploaded_by,
            uploaded_at: contract.uploaded_at,
        }
    }
}

/// Response for contract lists.
#[derive(Debug, Serialize)]
pub struct ListContractsResponse {
    /// Contracts, oldest first.
    pub contracts: Vec<ContractResponse>,
}

/// Response for the contract overview.
#[derive(Debug, Serialize)]
pub struct ContractOrdersResponse {
    /// Orders at a contract stage.
    pub orders: Vec<Order>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Orders at Booked or Received Contract the caller has contract access to.
///
/// # Errors
///
/// Returns an error if the desk operation fails.
pub async fn contract_orders<D, V>(
    State(state): State<Arc<GatewayState<D, V>>>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError>
where
    D: OrderDesk + 'static,
    V: JwtValidator + 'static,
{
    let orders = state.desk.contract_orders(&user.actor()).await?;
    Ok(Json(ContractOrdersResponse { orders }))
}

/// List the contracts of an order.
///
/// # Errors
///
/// Returns an error if the caller has no contract access to the order.
pub async fn list_contracts<D, V>(
    State(state): State<Arc<GatewayState<D, V>>>,
    user: AuthUser,
    Path(order_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    D: OrderDesk + 'static,
    V: JwtValidator + 'static,
{
    let order_id: OrderId = parse_id("order", &order_id)?;
    let contracts = state.desk.list_contracts(&user.actor(), &order_id).await?;
    Ok(Json(ListContractsResponse {
        contracts: contracts.into_iter().map(ContractResponse::from).collect(),
    }))
}

/// Upload a contract file.
///
/// # Errors
///
/// Returns an error if:
/// - The form has no `contract_file` field or the file is empty
/// - The caller is neither an admin nor the primary agent
/// - The file cannot be stored
pub async fn upload_contract<D, V>(
    State(state): State<Arc<GatewayState<D, V>>>,
    user: AuthUser,
    Path(order_id): Path<String>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError>
where
    D: OrderDesk + 'static,
    V: JwtValidator + 'static,
{
    let order_id: OrderId = parse_id("order", &order_id)?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        if field.name() != Some(CONTRACT_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        upload = Some((filename, bytes));
        break;
    }

    let (filename, bytes) =
        upload.ok_or_else(|| ApiError::BadRequest("no file selected".to_string()))?;

    let contract = state
        .desk
        .upload_contract(&user.actor(), &order_id, &filename, bytes.to_vec())
        .await?;

    Ok((StatusCode::CREATED, Json(ContractResponse::from(contract))))
}

/// Download a contract file as an attachment.
///
/// # Errors
///
/// Returns an error if the contract is missing or the caller has no access.
pub async fn download_contract<D, V>(
    State(state): State<Arc<GatewayState<D, V>>>,
    user: AuthUser,
    Path(contract_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    D: OrderDesk + 'static,
    V: JwtValidator + 'static,
{
    let contract_id: ContractId = parse_id("contract", &contract_id)?;
    let file = state
        .desk
        .download_contract(&user.actor(), &contract_id)
        .await?;

    let headers = [
        (header::CONTENT_TYPE, "application/octet-stream".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file.filename),
        ),
    ];
    Ok((headers, file.bytes))
}
