mod accounts;
mod analytics;
mod auth;
mod oauth;
mod public;
mod users;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use socdash_db::{DbError, UserRow};
use socdash_platforms::{ConnectError, PlatformClients, PlatformError};
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::middleware::{
    enforce_rate_limit, request_id, require_bearer_auth, AuthState, RateLimitState, RequestId,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub clients: Arc<PlatformClients>,
    /// Externally reachable origin, used to build OAuth redirect URIs.
    pub public_base_url: String,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn new(data: T, request_id: &str) -> Self {
        Self {
            data,
            meta: ResponseMeta::new(request_id.to_owned()),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "upstream_error" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 200)
}

pub(super) fn map_db_error(request_id: String, error: &DbError) -> ApiError {
    match error {
        DbError::NotFound => ApiError::new(request_id, "not_found", "record not found"),
        DbError::Duplicate(_) | DbError::AlreadyConnected(_) | DbError::LimitReached { .. } => {
            ApiError::new(request_id, "conflict", error.to_string())
        }
        _ => {
            tracing::error!(request_id = %request_id, error = %error, "database query failed");
            ApiError::new(request_id, "internal_error", "database query failed")
        }
    }
}

/// Error code and client-facing message for a connector failure. Upstream
/// details stay in the log.
pub(super) fn classify_connect_error(error: &ConnectError, platform: &str) -> (&'static str, String) {
    match error {
        ConnectError::LimitReached { .. } | ConnectError::AlreadyConnected(_) => {
            ("conflict", error.to_string())
        }
        ConnectError::CredentialNotAccepted { .. }
        | ConnectError::InvalidCredential(_)
        | ConnectError::MissingToken(_)
        | ConnectError::UnknownPlatform(_)
        | ConnectError::Platform(PlatformError::Unsupported { .. }) => {
            ("validation_error", error.to_string())
        }
        ConnectError::UserNotFound => ("not_found", error.to_string()),
        ConnectError::Platform(_) => (
            "upstream_error",
            format!("failed to fetch {platform} metrics"),
        ),
        ConnectError::Db(DbError::NotFound) => ("not_found", "record not found".to_owned()),
        ConnectError::Db(_) => ("internal_error", "database query failed".to_owned()),
    }
}

pub(super) fn map_connect_error(request_id: &str, error: &ConnectError, platform: &str) -> ApiError {
    let (code, message) = classify_connect_error(error, platform);
    if matches!(code, "upstream_error" | "internal_error") {
        tracing::error!(request_id, platform, error = %error, "account operation failed");
    } else {
        tracing::debug!(request_id, platform, error = %error, "account operation rejected");
    }
    ApiError::new(request_id, code, message)
}

pub(super) fn parse_uuid(request_id: &str, raw: &str, what: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| ApiError::new(request_id, "validation_error", format!("invalid {what}: '{raw}'")))
}

pub(super) fn parse_platform(
    request_id: &str,
    raw: &str,
) -> Result<socdash_core::Platform, ApiError> {
    raw.parse()
        .map_err(|e: socdash_core::CoreError| ApiError::new(request_id, "validation_error", e.to_string()))
}

/// Resolve a public user id to a live (non-deleted) user, or 404.
pub(super) async fn resolve_user(
    pool: &PgPool,
    raw_id: &str,
    request_id: &str,
) -> Result<UserRow, ApiError> {
    let public_id = parse_uuid(request_id, raw_id, "user id")?;
    socdash_db::get_user_by_public_id(pool, public_id)
        .await
        .map_err(|e| map_db_error(request_id.to_owned(), &e))?
        .ok_or_else(|| ApiError::new(request_id, "not_found", format!("user '{public_id}' not found")))
}

/// Deserializes a present field (including `null`) as `Some`, so PATCH
/// bodies can tell "clear" from "not supplied".
#[allow(clippy::option_option)]
pub(super) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn protected_router(auth: AuthState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/signup", post(auth::signup))
        .route("/api/v1/auth/verify", post(auth::verify))
        .route("/api/v1/users", get(users::list_users))
        .route(
            "/api/v1/users/by-username/{username}",
            get(users::get_user_by_username),
        )
        .route(
            "/api/v1/users/{user_id}",
            get(users::get_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        )
        .route(
            "/api/v1/users/{user_id}/accounts",
            get(accounts::list_accounts).post(accounts::connect_account),
        )
        .route(
            "/api/v1/users/{user_id}/accounts/refresh",
            post(accounts::refresh_all_accounts),
        )
        .route(
            "/api/v1/users/{user_id}/accounts/{account_id}",
            get(accounts::get_account).delete(accounts::disconnect_account),
        )
        .route(
            "/api/v1/users/{user_id}/accounts/{account_id}/refresh",
            post(accounts::refresh_account),
        )
        .route(
            "/api/v1/users/{user_id}/analytics/overview",
            get(analytics::overview),
        )
        .route(
            "/api/v1/users/{user_id}/analytics/{platform}",
            get(analytics::platform),
        )
        .route(
            "/api/v1/public/{platform}/{username}",
            get(public::lookup),
        )
        .route(
            "/api/v1/oauth/{platform}/authorize",
            get(oauth::authorize),
        )
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    auth,
                    require_bearer_auth,
                )),
        )
}

pub fn build_app(state: AppState, auth: AuthState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/oauth/{platform}/callback", get(oauth::callback));

    Router::new()
        .merge(public_routes)
        .merge(protected_router(auth, rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match socdash_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
