//! Admin endpoints: accounts, statistics, reports, export and audit.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use yarnflow_auth::JwtValidator;
use yarnflow_core::UserId;
use yarnflow_desk::export::EXPORT_FILENAME;
use yarnflow_desk::{AuditEntry, OrderDesk, ReportFilter, UserProfile};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::handlers::parse_id;
use crate::state::GatewayState;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Response for account lists.
#[derive(Debug, Serialize)]
pub struct ListUsersResponse {
    /// Accounts, sorted by username.
    pub users: Vec<UserProfile>,
}

/// Query parameters for the audit log.
#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    /// Maximum entries to return.
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Response for the audit log.
#[derive(Debug, Serialize)]
pub struct AuditResponse {
    /// Entries, newest first.
    pub entries: Vec<AuditEntry>,
}

// =============================================================================
// Handlers
// =============================================================================

/// List all accounts.
///
/// # Errors
///
/// Returns an error if the caller is not an admin.
pub async fn list_users<D, V>(
    State(state): State<Arc<GatewayState<D, V>>>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError>
where
    D: OrderDesk + 'static,
    V: JwtValidator + 'static,
{
    let users = state.desk.list_users(&user.actor()).await?;
    Ok(Json(ListUsersResponse { users }))
}

/// List active agents.
///
/// # Errors
///
/// Returns an error if the caller is not an admin.
pub async fn list_agents<D, V>(
    State(state): State<Arc<GatewayState<D, V>>>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError>
where
    D: OrderDesk + 'static,
    V: JwtValidator + 'static,
{
    let users = state.desk.list_agents(&user.actor()).await?;
    Ok(Json(ListUsersResponse { users }))
}

/// Reactivate an account.
///
/// # Errors
///
/// Returns an error if the caller is not an admin or the account is missing.
pub async fn activate_user<D, V>(
    State(state): State<Arc<GatewayState<D, V>>>,
    user: AuthUser,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    D: OrderDesk + 'static,
    V: JwtValidator + 'static,
{
    let target: UserId = parse_id("user", &user_id)?;
    let profile = state
        .desk
        .set_user_active(&user.actor(), &target, true)
        .await?;
    Ok(Json(profile))
}

/// Deactivate an account.
///
/// # Errors
///
/// Returns an error if the caller is not an admin, targets themselves, or the
/// account is missing.
pub async fn deactivate_user<D, V>(
    State(state): State<Arc<GatewayState<D, V>>>,
    user: AuthUser,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    D: OrderDesk + 'static,
    V: JwtValidator + 'static,
{
    let target: UserId = parse_id("user", &user_id)?;
    let profile = state
        .desk
        .set_user_active(&user.actor(), &target, false)
        .await?;
    Ok(Json(profile))
}

/// System-wide statistics.
///
/// # Errors
///
/// Returns an error if the caller is not an admin.
pub async fn stats<D, V>(
    State(state): State<Arc<GatewayState<D, V>>>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError>
where
    D: OrderDesk + 'static,
    V: JwtValidator + 'static,
{
    let stats = state.desk.admin_stats(&user.actor()).await?;
    Ok(Json(stats))
}

/// Filtered order report.
///
/// # Errors
///
/// Returns an error if the caller is not an admin.
pub async fn report<D, V>(
    State(state): State<Arc<GatewayState<D, V>>>,
    user: AuthUser,
    Query(filter): Query<ReportFilter>,
) -> Result<impl IntoResponse, ApiError>
where
    D: OrderDesk + 'static,
    V: JwtValidator + 'static,
{
    let report = state.desk.report(&user.actor(), &filter).await?;
    Ok(Json(report))
}

/// All orders as a CSV attachment.
///
/// # Errors
///
/// Returns an error if the caller is not an admin.
pub async fn export_orders<D, V>(
    State(state): State<Arc<GatewayState<D, V>>>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError>
where
    D: OrderDesk + 'static,
    V: JwtValidator + 'static,
{
    let csv = state.desk.export_orders_csv(&user.actor()).await?;

    let headers = [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{EXPORT_FILENAME}\""),
        ),
    ];
    Ok((headers, csv))
}

/// Newest audit entries.
///
/// # Errors
///
/// Returns an error if the caller is not an admin.
pub async fn audit_log<D, V>(
    State(state): State<Arc<GatewayState<D, V>>>,
    user: AuthUser,
    Query(query): Query<AuditQuery>,
) -> Result<impl IntoResponse, ApiError>
where
    D: OrderDesk + 'static,
    V: JwtValidator + 'static,
{
    let limit = query.limit.unwrap_or(state.config.audit_page_size);
    let entries = state.desk.list_audit(&user.actor(), limit).await?;
    Ok(Json(AuditResponse { entries }))
}
