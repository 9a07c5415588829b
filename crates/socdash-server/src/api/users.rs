//! User profile handlers.
//!
//! - `GET    /api/v1/users`                       : list/search users
//! - `GET    /api/v1/users/{user_id}`             : one user
//! - `GET    /api/v1/users/by-username/{username}`: profile by username
//! - `PATCH  /api/v1/users/{user_id}`             : partial update
//! - `DELETE /api/v1/users/{user_id}`             : mark deleted

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use socdash_core::{AccountType, UserStatus};
use socdash_db::{UserFilters, UserRow, UserUpdate};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{
    double_option, map_db_error, normalize_limit, resolve_user, ApiError, ApiResponse, AppState,
};

const USERNAME_MAX_CHARS: usize = 32;

#[derive(Debug, Serialize)]
pub(super) struct UserItem {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub account_type: String,
    pub status: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub profile_image_url: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub niche: Option<String>,
    pub interests: Vec<String>,
    pub associated_company: Option<String>,
    pub level: Option<String>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserRow> for UserItem {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.public_id,
            email: row.email,
            username: row.username,
            account_type: row.account_type,
            status: row.status,
            display_name: row.display_name,
            bio: row.bio,
            profile_image_url: row.profile_image_url,
            location: row.location,
            website: row.website,
            niche: row.niche,
            interests: row.interests,
            associated_company: row.associated_company,
            level: row.level,
            last_login_at: row.last_login_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Usernames are 3-32 characters of ASCII letters, digits, `_` and `.`.
pub(super) fn validate_username(req_id: &str, username: &str) -> Result<(), ApiError> {
    let len = username.chars().count();
    let valid_chars = username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    if (3..=USERNAME_MAX_CHARS).contains(&len) && valid_chars {
        Ok(())
    } else {
        Err(ApiError::new(
            req_id,
            "validation_error",
            format!(
                "username must be 3-{USERNAME_MAX_CHARS} characters of letters, digits, '_' or '.'"
            ),
        ))
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct UserListQuery {
    pub q: Option<String>,
    pub account_type: Option<String>,
    pub limit: Option<i64>,
}

pub(super) async fn list_users(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<UserListQuery>,
) -> Result<Json<ApiResponse<Vec<UserItem>>>, ApiError> {
    let account_type = query
        .account_type
        .as_deref()
        .map(str::parse::<AccountType>)
        .transpose()
        .map_err(|e| ApiError::new(&req_id.0, "validation_error", e.to_string()))?;

    let rows = socdash_db::list_users(
        &state.pool,
        UserFilters {
            query: query.q.as_deref(),
            account_type: account_type.map(AccountType::as_str),
            limit: Some(normalize_limit(query.limit)),
        },
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows.into_iter().map(UserItem::from).collect();
    Ok(Json(ApiResponse::new(data, &req_id.0)))
}

pub(super) async fn get_user(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<UserItem>>, ApiError> {
    let user = resolve_user(&state.pool, &user_id, &req_id.0).await?;
    Ok(Json(ApiResponse::new(UserItem::from(user), &req_id.0)))
}

pub(super) async fn get_user_by_username(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(username): Path<String>,
) -> Result<Json<ApiResponse<UserItem>>, ApiError> {
    let user = socdash_db::get_user_by_username(&state.pool, &username)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| {
            ApiError::new(&req_id.0, "not_found", format!("user '{username}' not found"))
        })?;
    Ok(Json(ApiResponse::new(UserItem::from(user), &req_id.0)))
}

// Option<Option<T>>: outer None = "not in request" (keep current),
// Some(None) = "explicitly cleared", Some(Some(v)) = "set to value".
#[allow(clippy::option_option)]
#[derive(Debug, Deserialize)]
pub(super) struct UpdateUserRequest {
    pub username: Option<String>,
    pub account_type: Option<AccountType>,
    pub status: Option<UserStatus>,
    #[serde(default, deserialize_with = "double_option")]
    pub display_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub bio: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub profile_image_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub location: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub website: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub niche: Option<Option<String>>,
    pub interests: Option<Vec<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub associated_company: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub level: Option<Option<String>>,
}

fn validate_update(req_id: &str, body: &UpdateUserRequest) -> Result<(), ApiError> {
    if let Some(username) = &body.username {
        validate_username(req_id, username)?;
    }
    if body.status == Some(UserStatus::Deleted) {
        return Err(ApiError::new(
            req_id,
            "validation_error",
            "use DELETE to remove a user",
        ));
    }
    Ok(())
}

fn nested(value: Option<&Option<String>>) -> Option<Option<&str>> {
    value.map(Option::as_deref)
}

pub(super) async fn update_user(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(user_id): Path<String>,
    Json(body): Json<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserItem>>, ApiError> {
    let rid = &req_id.0;
    validate_update(rid, &body)?;
    let user = resolve_user(&state.pool, &user_id, rid).await?;

    let update = UserUpdate {
        username: body.username.as_deref(),
        account_type: body.account_type.map(AccountType::as_str),
        status: body.status.map(UserStatus::as_str),
        display_name: nested(body.display_name.as_ref()),
        bio: nested(body.bio.as_ref()),
        profile_image_url: nested(body.profile_image_url.as_ref()),
        location: nested(body.location.as_ref()),
        website: nested(body.website.as_ref()),
        niche: nested(body.niche.as_ref()),
        interests: body.interests.as_deref(),
        associated_company: nested(body.associated_company.as_ref()),
        level: nested(body.level.as_ref()),
    };
    let row = socdash_db::update_user(&state.pool, user.id, &update)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    tracing::info!(request_id = %rid, user_id = %row.public_id, "user updated");
    Ok(Json(ApiResponse::new(UserItem::from(row), rid)))
}

#[derive(Debug, Serialize)]
pub(super) struct DeletedUser {
    pub id: Uuid,
    pub status: &'static str,
}

pub(super) async fn delete_user(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<DeletedUser>>, ApiError> {
    let rid = &req_id.0;
    let user = resolve_user(&state.pool, &user_id, rid).await?;
    socdash_db::mark_user_deleted(&state.pool, user.id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    tracing::info!(request_id = %rid, user_id = %user.public_id, "user marked deleted");
    Ok(Json(ApiResponse::new(
        DeletedUser {
            id: user.public_id,
            status: UserStatus::Deleted.as_str(),
        },
        rid,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_rules() {
        assert!(validate_username("r", "jane_doe.1").is_ok());
        assert!(validate_username("r", "jd").is_err());
        assert!(validate_username("r", "has space").is_err());
        assert!(validate_username("r", &"x".repeat(33)).is_err());
    }

    #[test]
    fn patch_body_distinguishes_null_from_missing() {
        let body: UpdateUserRequest =
            serde_json::from_str(r#"{"bio": null, "website": "https://example.com"}"#)
                .expect("deserialize");
        assert_eq!(body.bio, Some(None));
        assert_eq!(body.website, Some(Some("https://example.com".to_owned())));
        assert_eq!(body.location, None);
        assert!(body.username.is_none());
    }

    #[test]
    fn patch_cannot_set_deleted_status() {
        let body: UpdateUserRequest =
            serde_json::from_str(r#"{"status": "DELETED"}"#).expect("deserialize");
        assert!(validate_update("r", &body).is_err());
        let body: UpdateUserRequest =
            serde_json::from_str(r#"{"status": "BLOCKED"}"#).expect("deserialize");
        assert!(validate_update("r", &body).is_ok());
    }
}
