//! Dashboard analytics over a user's stored snapshots. Nothing here calls
//! a platform API; use the refresh endpoints for fresh numbers.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use socdash_core::{AccountMetrics, Overview, Platform, PlatformView};
use socdash_db::AccountRow;

use crate::middleware::RequestId;

use super::{map_db_error, parse_platform, resolve_user, ApiError, ApiResponse, AppState};

/// Stored rows with an unknown platform are skipped; unreadable snapshots
/// are treated as never fetched.
fn account_metrics(row: &AccountRow) -> Option<AccountMetrics> {
    let platform: Platform = match row.platform.parse() {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(account_id = %row.public_id, error = %e, "skipping account with unknown platform");
            return None;
        }
    };
    let snapshot = row.snapshot().unwrap_or_else(|e| {
        tracing::warn!(account_id = %row.public_id, error = %e, "stored snapshot unreadable");
        None
    });
    Some(AccountMetrics {
        account_id: row.public_id,
        platform,
        handle: row.handle.clone(),
        snapshot,
        updated_at: row.metrics_updated_at,
    })
}

pub(super) async fn overview(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<Overview>>, ApiError> {
    let rid = &req_id.0;
    let user = resolve_user(&state.pool, &user_id, rid).await?;
    let rows = socdash_db::list_accounts_for_user(&state.pool, user.id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    let accounts: Vec<AccountMetrics> = rows.iter().filter_map(account_metrics).collect();
    Ok(Json(ApiResponse::new(socdash_core::overview(&accounts), rid)))
}

pub(super) async fn platform(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((user_id, platform)): Path<(String, String)>,
) -> Result<Json<ApiResponse<PlatformView>>, ApiError> {
    let rid = &req_id.0;
    let platform = parse_platform(rid, &platform)?;
    let user = resolve_user(&state.pool, &user_id, rid).await?;
    let rows = socdash_db::list_accounts_for_user(&state.pool, user.id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    let account = rows
        .iter()
        .filter_map(account_metrics)
        .find(|a| a.platform == platform)
        .ok_or_else(|| {
            ApiError::new(
                rid,
                "not_found",
                format!("no {platform} account connected"),
            )
        })?;

    Ok(Json(ApiResponse::new(socdash_core::platform_view(&account), rid)))
}
