//! `GET /api/v1/public/{platform}/{username}`: live metrics for any public
//! profile, without connecting or storing anything.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use socdash_core::MetricsSnapshot;

use crate::middleware::RequestId;

use super::{map_connect_error, parse_platform, ApiError, ApiResponse, AppState};

pub(super) async fn lookup(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((platform, username)): Path<(String, String)>,
) -> Result<Json<ApiResponse<MetricsSnapshot>>, ApiError> {
    let rid = &req_id.0;
    let platform = parse_platform(rid, &platform)?;

    let snapshot = socdash_platforms::lookup(&state.clients, platform, &username)
        .await
        .map_err(|e| map_connect_error(rid, &e, platform.as_str()))?;

    tracing::debug!(request_id = %rid, %platform, %username, "public lookup");
    Ok(Json(ApiResponse::new(snapshot, rid)))
}
