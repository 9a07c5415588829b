//! Sign-up and credential verification.
//!
//! - `POST /api/v1/signup`     : create a user with a bcrypt-hashed password
//! - `POST /api/v1/auth/verify`: check email + password, return the user

use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::Deserialize;
use socdash_core::{AccountType, UserStatus};
use socdash_db::NewUser;

use crate::middleware::RequestId;

use super::users::{validate_username, UserItem};
use super::{map_db_error, ApiError, ApiResponse, AppState};

const PASSWORD_HASH_COST: u32 = 10;
const PASSWORD_MIN_CHARS: usize = 8;

fn hash_password(password: String) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, PASSWORD_HASH_COST)
}

fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    bcrypt::verify(password, hash)
}

#[derive(Debug, Deserialize)]
pub(super) struct SignupRequest {
    pub email: String,
    pub password: String,
    pub username: String,
    pub account_type: AccountType,
    pub display_name: Option<String>,
    pub niche: Option<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    pub associated_company: Option<String>,
    pub level: Option<String>,
}

fn validate_email(req_id: &str, email: &str) -> Result<(), ApiError> {
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'))
        && !email.chars().any(char::is_whitespace);
    if valid {
        Ok(())
    } else {
        Err(ApiError::new(
            req_id,
            "validation_error",
            format!("'{email}' is not a valid email address"),
        ))
    }
}

fn validate_signup(req_id: &str, body: &SignupRequest) -> Result<(), ApiError> {
    validate_email(req_id, body.email.trim())?;
    validate_username(req_id, body.username.trim())?;
    if body.password.chars().count() < PASSWORD_MIN_CHARS {
        return Err(ApiError::new(
            req_id,
            "validation_error",
            format!("password must be at least {PASSWORD_MIN_CHARS} characters"),
        ));
    }
    Ok(())
}

/// Role-specific profile fields kept for `account_type`; the others are dropped.
struct RoleFields<'a> {
    niche: Option<&'a str>,
    interests: &'a [String],
    associated_company: Option<&'a str>,
    level: Option<&'a str>,
}

fn role_fields(body: &SignupRequest) -> RoleFields<'_> {
    match body.account_type {
        AccountType::Influencer => RoleFields {
            niche: body.niche.as_deref(),
            interests: &body.interests,
            associated_company: None,
            level: None,
        },
        AccountType::CampaignManager => RoleFields {
            niche: None,
            interests: &[],
            associated_company: body.associated_company.as_deref(),
            level: body.level.as_deref(),
        },
    }
}

pub(super) async fn signup(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<SignupRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserItem>>), ApiError> {
    let rid = &req_id.0;
    validate_signup(rid, &body)?;

    let password = body.password.clone();
    let password_hash = tokio::task::spawn_blocking(move || hash_password(password))
        .await
        .map_err(|e| {
            tracing::error!(request_id = %rid, error = %e, "password hashing task failed");
            ApiError::new(rid, "internal_error", "failed to hash password")
        })?
        .map_err(|e| {
            tracing::error!(request_id = %rid, error = %e, "password hashing failed");
            ApiError::new(rid, "internal_error", "failed to hash password")
        })?;

    let roles = role_fields(&body);
    let row = socdash_db::create_user(
        &state.pool,
        &NewUser {
            email: body.email.trim(),
            username: body.username.trim(),
            password_hash: Some(&password_hash),
            account_type: body.account_type.as_str(),
            display_name: body.display_name.as_deref(),
            niche: roles.niche,
            interests: roles.interests,
            associated_company: roles.associated_company,
            level: roles.level,
        },
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    tracing::info!(
        request_id = %rid,
        user_id = %row.public_id,
        account_type = %row.account_type,
        "user signed up"
    );
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(UserItem::from(row), rid)),
    ))
}

#[derive(Debug, Deserialize)]
pub(super) struct VerifyRequest {
    pub email: String,
    pub password: String,
}

pub(super) async fn verify(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<VerifyRequest>,
) -> Result<Json<ApiResponse<UserItem>>, ApiError> {
    let rid = &req_id.0;
    let invalid = || ApiError::new(rid, "unauthorized", "invalid email or password");

    let user = socdash_db::get_user_by_email(&state.pool, body.email.trim())
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(invalid)?;
    let Some(hash) = user.password_hash.clone() else {
        return Err(invalid());
    };

    let password = body.password;
    let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| {
            tracing::error!(request_id = %rid, error = %e, "password verification task failed");
            ApiError::new(rid, "internal_error", "failed to verify password")
        })?
        .unwrap_or_else(|e| {
            tracing::warn!(request_id = %rid, user_id = %user.public_id, error = %e, "stored password hash is unreadable");
            false
        });
    if !matches {
        return Err(invalid());
    }

    if user.status != UserStatus::Active.as_str() {
        tracing::info!(request_id = %rid, user_id = %user.public_id, status = %user.status, "login refused for inactive user");
        return Err(ApiError::new(rid, "unauthorized", "account is not active"));
    }

    socdash_db::record_login(&state.pool, user.id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse::new(UserItem::from(user), rid)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup_body(account_type: AccountType) -> SignupRequest {
        SignupRequest {
            email: "jane@example.com".to_owned(),
            password: "correct horse".to_owned(),
            username: "jane".to_owned(),
            account_type,
            display_name: None,
            niche: Some("fitness".to_owned()),
            interests: vec!["running".to_owned()],
            associated_company: Some("Acme".to_owned()),
            level: Some("senior".to_owned()),
        }
    }

    #[test]
    fn influencers_keep_only_influencer_fields() {
        let body = signup_body(AccountType::Influencer);
        let roles = role_fields(&body);
        assert_eq!(roles.niche, Some("fitness"));
        assert_eq!(roles.interests.len(), 1);
        assert!(roles.associated_company.is_none());
        assert!(roles.level.is_none());
    }

    #[test]
    fn campaign_managers_keep_only_company_fields() {
        let body = signup_body(AccountType::CampaignManager);
        let roles = role_fields(&body);
        assert!(roles.niche.is_none());
        assert!(roles.interests.is_empty());
        assert_eq!(roles.associated_company, Some("Acme"));
        assert_eq!(roles.level, Some("senior"));
    }

    #[test]
    fn signup_validation() {
        assert!(validate_signup("r", &signup_body(AccountType::Influencer)).is_ok());

        let mut body = signup_body(AccountType::Influencer);
        body.email = "not-an-email".to_owned();
        assert!(validate_signup("r", &body).is_err());

        let mut body = signup_body(AccountType::Influencer);
        body.password = "short".to_owned();
        assert!(validate_signup("r", &body).is_err());
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = bcrypt::hash("s3cret-pass", 4).expect("hash");
        assert!(verify_password("s3cret-pass", &hash).expect("verify"));
        assert!(!verify_password("wrong-pass", &hash).expect("verify"));
    }
}
