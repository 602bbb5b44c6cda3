//! Contract file storage.
//!
//! Files live flat in the upload directory as `PO-NNNN_<name>`; the store
//! keeps metadata and a blake3 checksum.

use std::io::ErrorKind;
use std::path::Path;

use chrono::Utc;
use yarnflow_core::{ContractId, OrderId};
use yarnflow_store::{Contract, Order, OrderStatus, Role, Store, StoreError, WriteOp};

use crate::audit::{self, AuditAction};
use crate::error::{DeskError, Result};
use crate::pipeline;
use crate::types::{Actor, ContractFile, DeskConfig};
use crate::visibility;

/// Reduce a client-supplied file name to a safe single path component.
///
/// # Errors
///
/// Returns `DeskError::Validation` if nothing usable is left.
pub fn sanitize_filename(name: &str) -> Result<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '_') {
        return Err(DeskError::validation("no file selected"));
    }
    Ok(cleaned)
}

/// Stored file name for an upload on `order`.
#[must_use]
pub fn stored_filename(order: &Order, sanitized: &str) -> String {
    format!("{}_{sanitized}", order.order_number)
}

/// Hex blake3 digest of `bytes`.
#[must_use]
pub fn checksum(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

fn can_upload(actor: &Actor, order: &Order) -> bool {
    match actor.role {
        Role::Admin => true,
        Role::Agent => order.primary_agent == Some(actor.user_id),
        Role::User => false,
    }
}

/// Store a contract file for `order`.
///
/// Re-uploading a file with the same name replaces the earlier one. A Booked
/// order advances to Received Contract. The contract record, the status change
/// and the audit entry are committed together; a new file is removed again if
/// that commit fails. Returns the contract and the order as it is after the
/// upload.
///
/// # Errors
///
/// Returns an error if:
/// - The actor is neither an admin nor the primary agent
/// - The file name or contents are empty, or the file is too large
/// - The file cannot be written
pub async fn upload_contract<S: Store>(
    store: &S,
    config: &DeskConfig,
    actor: &Actor,
    mut order: Order,
    filename: &str,
    bytes: Vec<u8>,
) -> Result<(Contract, Order)> {
    if !can_upload(actor, &order) {
        return Err(DeskError::forbidden(
            "only admins and the primary agent can upload contracts",
        ));
    }
    if bytes.is_empty() {
        return Err(DeskError::validation("no file selected"));
    }
    if bytes.len() > config.max_contract_bytes {
        return Err(DeskError::Validation(format!(
            "contract exceeds {} bytes",
            config.max_contract_bytes
        )));
    }

    let sanitized = sanitize_filename(filename)?;
    let stored_name = stored_filename(&order, &sanitized);
    let path = config.upload_dir.join(&stored_name);

    let existing = store
        .list_contracts_by_order(&order.order_id)?
        .into_iter()
        .find(|c| c.filename == stored_name);
    let replaces = existing.is_some();

    tokio::fs::create_dir_all(&config.upload_dir).await?;
    tokio::fs::write(&path, &bytes).await?;

    let contract = Contract {
        contract_id: existing.map_or_else(ContractId::generate, |c| c.contract_id),
        order_id: order.order_id,
        filename: stored_name,
        stored_path: path.to_string_lossy().into_owned(),
        size_bytes: u64::try_from(bytes.len()).unwrap_or(u64::MAX),
        checksum: checksum(&bytes),
        uploaded_by: actor.user_id,
        uploaded_at: Utc::now(),
    };

    let advanced = pipeline::status_after_contract(order.status);
    if let Some(next) = advanced {
        order.status = next;
        order.updated_at = Utc::now();
    }

    let entry = audit::entry(
        &actor.user_id,
        AuditAction::ContractUploaded,
        contract.contract_id,
        format!("Uploaded contract for order {}", order.order_number),
    );
    let mut ops = vec![WriteOp::PutContract(&contract), WriteOp::AppendAudit(&entry)];
    if advanced.is_some() {
        ops.push(WriteOp::PutOrder(&order));
    }

    if let Err(e) = store.commit(&ops) {
        if !replaces {
            remove_files(std::slice::from_ref(&contract), &order.order_id).await;
        }
        return Err(match e {
            StoreError::NotFound => DeskError::OrderNotFound(order.order_id),
            other => other.into(),
        });
    }

    tracing::info!(
        order_id = %order.order_id,
        contract_id = %contract.contract_id,
        size_bytes = contract.size_bytes,
        "Uploaded contract"
    );

    Ok((contract, order))
}

/// List the contracts of `order`.
///
/// # Errors
///
/// Returns `DeskError::Forbidden` if the actor has no contract access.
pub fn list_contracts<S: Store>(store: &S, actor: &Actor, order: &Order) -> Result<Vec<Contract>> {
    if !visibility::can_access_contract(actor, order) {
        return Err(DeskError::forbidden("no access to contracts of this order"));
    }
    Ok(store.list_contracts_by_order(&order.order_id)?)
}

/// Read a contract file.
///
/// # Errors
///
/// Returns an error if the contract or its order is missing, the actor has no
/// contract access, or the file cannot be read.
pub async fn download_contract<S: Store>(
    store: &S,
    actor: &Actor,
    contract_id: &ContractId,
) -> Result<ContractFile> {
    let contract = store
        .get_contract(contract_id)?
        .ok_or(DeskError::ContractNotFound(*contract_id))?;
    let order = store
        .get_order(&contract.order_id)?
        .ok_or(DeskError::OrderNotFound(contract.order_id))?;

    if !visibility::can_access_contract(actor, &order) {
        return Err(DeskError::forbidden("no access to contracts of this order"));
    }

    let bytes = match tokio::fs::read(&contract.stored_path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(DeskError::ContractNotFound(*contract_id));
        }
        Err(e) => return Err(e.into()),
    };

    if checksum(&bytes) != contract.checksum {
        tracing::warn!(contract_id = %contract_id, "Contract file checksum mismatch");
    }

    audit::record(
        store,
        &actor.user_id,
        AuditAction::ContractDownloaded,
        contract.contract_id,
        format!("Downloaded contract {}", contract.filename),
    )?;

    Ok(ContractFile {
        filename: contract.filename,
        bytes,
    })
}

/// Orders at a contract stage on which `actor` has contract access, newest first.
///
/// # Errors
///
/// Returns an error if the store read fails.
pub fn contract_orders<S: Store>(store: &S, actor: &Actor) -> Result<Vec<Order>> {
    let mut orders = Vec::new();
    let stages = OrderStatus::pipeline()
        .into_iter()
        .filter(|s| pipeline::is_contract_stage(*s));
    for status in stages {
        orders.extend(
            store
                .list_orders_by_status(status)?
                .into_iter()
                .filter(|o| visibility::can_access_contract(actor, o)),
        );
    }
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(orders)
}

/// Remove the files of deleted contracts. Missing files are ignored.
pub async fn remove_files(contracts: &[Contract], order_id: &OrderId) {
    for contract in contracts {
        match tokio::fs::remove_file(Path::new(&contract.stored_path)).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                order_id = %order_id,
                path = %contract.stored_path,
                error = %e,
                "Failed to remove contract file"
            ),
        }
    }
}
