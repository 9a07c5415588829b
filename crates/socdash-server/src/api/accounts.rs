//! Connected-account handlers.
//!
//! - `GET    /api/v1/users/{user_id}/accounts`                       : list
//! - `POST   /api/v1/users/{user_id}/accounts`                       : connect
//! - `POST   /api/v1/users/{user_id}/accounts/refresh`               : refresh all
//! - `GET    /api/v1/users/{user_id}/accounts/{account_id}`          : one account
//! - `DELETE /api/v1/users/{user_id}/accounts/{account_id}`          : disconnect
//! - `POST   /api/v1/users/{user_id}/accounts/{account_id}/refresh`  : refresh one

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use socdash_core::MetricsSnapshot;
use socdash_db::AccountRow;
use socdash_platforms::{Credential, NewConnection, RefreshOutcome};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{
    classify_connect_error, map_connect_error, map_db_error, parse_platform, parse_uuid,
    resolve_user, ApiError, ApiResponse, AppState,
};

/// A connected account as returned by the API. Tokens are never included.
#[derive(Debug, Serialize)]
pub(super) struct AccountItem {
    pub id: Uuid,
    pub platform: String,
    pub handle: String,
    pub followers: Option<i64>,
    pub posts: Option<i64>,
    pub engagement_rate: Option<f64>,
    pub metrics: Option<MetricsSnapshot>,
    pub metrics_updated_at: Option<DateTime<Utc>>,
    pub connected_with_token: bool,
    pub token_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AccountItem {
    /// A snapshot that no longer decodes is logged and reported as absent.
    pub(super) fn from_row(row: AccountRow) -> Self {
        let metrics = row.snapshot().unwrap_or_else(|e| {
            tracing::warn!(account_id = %row.public_id, error = %e, "stored snapshot unreadable");
            None
        });
        Self {
            id: row.public_id,
            platform: row.platform,
            handle: row.handle,
            followers: row.followers,
            posts: row.posts,
            engagement_rate: row.engagement_rate,
            metrics,
            metrics_updated_at: row.metrics_updated_at,
            connected_with_token: row.access_token.is_some(),
            token_expires_at: row.token_expires_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct ConnectAccountRequest {
    pub platform: String,
    pub access_token: Option<String>,
    pub username: Option<String>,
    pub refresh_token: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
}

fn connection_from_request(
    req_id: &str,
    body: ConnectAccountRequest,
) -> Result<NewConnection, ApiError> {
    let platform = parse_platform(req_id, &body.platform)?;
    let credential = match (body.access_token, body.username) {
        (Some(token), None) => Credential::AccessToken(token),
        (None, Some(username)) => Credential::Username(username),
        _ => {
            return Err(ApiError::new(
                req_id,
                "validation_error",
                "provide exactly one of 'access_token' or 'username'",
            ))
        }
    };
    Ok(NewConnection {
        platform,
        credential,
        refresh_token: body.refresh_token,
        token_expires_at: body.token_expires_at,
    })
}

pub(super) async fn list_accounts(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<AccountItem>>>, ApiError> {
    let rid = &req_id.0;
    let user = resolve_user(&state.pool, &user_id, rid).await?;
    let rows = socdash_db::list_accounts_for_user(&state.pool, user.id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    let data = rows.into_iter().map(AccountItem::from_row).collect();
    Ok(Json(ApiResponse::new(data, rid)))
}

pub(super) async fn connect_account(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(user_id): Path<String>,
    Json(body): Json<ConnectAccountRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AccountItem>>), ApiError> {
    let rid = &req_id.0;
    let connection = connection_from_request(rid, body)?;
    let platform = connection.platform;
    let user = resolve_user(&state.pool, &user_id, rid).await?;

    let row = socdash_platforms::connect(&state.pool, &state.clients, user.id, connection)
        .await
        .map_err(|e| map_connect_error(rid, &e, platform.as_str()))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(AccountItem::from_row(row), rid)),
    ))
}

async fn resolve_account(
    state: &AppState,
    user_id: &str,
    account_id: &str,
    req_id: &str,
) -> Result<AccountRow, ApiError> {
    let account_id = parse_uuid(req_id, account_id, "account id")?;
    let user = resolve_user(&state.pool, user_id, req_id).await?;
    socdash_db::get_account(&state.pool, user.id, account_id)
        .await
        .map_err(|e| map_db_error(req_id.to_owned(), &e))?
        .ok_or_else(|| {
            ApiError::new(req_id, "not_found", format!("account '{account_id}' not found"))
        })
}

pub(super) async fn get_account(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((user_id, account_id)): Path<(String, String)>,
) -> Result<Json<ApiResponse<AccountItem>>, ApiError> {
    let row = resolve_account(&state, &user_id, &account_id, &req_id.0).await?;
    Ok(Json(ApiResponse::new(AccountItem::from_row(row), &req_id.0)))
}

#[derive(Debug, Serialize)]
pub(super) struct DisconnectedAccount {
    pub id: Uuid,
    pub platform: String,
}

pub(super) async fn disconnect_account(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((user_id, account_id)): Path<(String, String)>,
) -> Result<Json<ApiResponse<DisconnectedAccount>>, ApiError> {
    let rid = &req_id.0;
    let row = resolve_account(&state, &user_id, &account_id, rid).await?;
    socdash_db::delete_account(&state.pool, row.user_id, row.public_id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    tracing::info!(request_id = %rid, account_id = %row.public_id, platform = %row.platform, "account disconnected");
    Ok(Json(ApiResponse::new(
        DisconnectedAccount {
            id: row.public_id,
            platform: row.platform,
        },
        rid,
    )))
}

pub(super) async fn refresh_account(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((user_id, account_id)): Path<(String, String)>,
) -> Result<Json<ApiResponse<AccountItem>>, ApiError> {
    let rid = &req_id.0;
    let row = resolve_account(&state, &user_id, &account_id, rid).await?;
    let refreshed = socdash_platforms::refresh(&state.pool, &state.clients, &row)
        .await
        .map_err(|e| map_connect_error(rid, &e, &row.platform))?;
    Ok(Json(ApiResponse::new(AccountItem::from_row(refreshed), rid)))
}

#[derive(Debug, Serialize)]
pub(super) struct RefreshOutcomeItem {
    pub account_id: Uuid,
    pub platform: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<AccountItem>,
}

impl From<RefreshOutcome> for RefreshOutcomeItem {
    fn from(outcome: RefreshOutcome) -> Self {
        match outcome.result {
            Ok(row) => Self {
                account_id: outcome.account_id,
                platform: outcome.platform,
                status: "ok",
                error: None,
                account: Some(AccountItem::from_row(row)),
            },
            Err(e) => {
                let (_, message) = classify_connect_error(&e, &outcome.platform);
                Self {
                    account_id: outcome.account_id,
                    platform: outcome.platform,
                    status: "failed",
                    error: Some(message),
                    account: None,
                }
            }
        }
    }
}

pub(super) async fn refresh_all_accounts(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<RefreshOutcomeItem>>>, ApiError> {
    let rid = &req_id.0;
    let user = resolve_user(&state.pool, &user_id, rid).await?;
    let outcomes = socdash_platforms::refresh_all(&state.pool, &state.clients, user.id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    let data = outcomes.into_iter().map(RefreshOutcomeItem::from).collect();
    Ok(Json(ApiResponse::new(data, rid)))
}
