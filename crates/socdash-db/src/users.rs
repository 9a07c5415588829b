//! Database operations for the `users` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `users` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    pub public_id: Uuid,
    pub email: String,
    pub username: String,
    pub password_hash: Option<String>,
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

const USER_COLUMNS: &str = "id, public_id, email, username, password_hash, account_type, status, \
     display_name, bio, profile_image_url, location, website, niche, interests, \
     associated_company, level, last_login_at, created_at, updated_at";

/// Fields for a new user. Role-specific fields are expected to be cleared by
/// the caller when they do not apply to `account_type`.
#[derive(Debug, Clone, Default)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub username: &'a str,
    pub password_hash: Option<&'a str>,
    pub account_type: &'a str,
    pub display_name: Option<&'a str>,
    pub niche: Option<&'a str>,
    pub interests: &'a [String],
    pub associated_company: Option<&'a str>,
    pub level: Option<&'a str>,
}

// Option<Option<T>> distinguishes "not supplied" (None) from "clear" (Some(None)).
#[allow(clippy::option_option)]
#[derive(Debug, Clone, Default)]
pub struct UserUpdate<'a> {
    pub username: Option<&'a str>,
    pub account_type: Option<&'a str>,
    pub status: Option<&'a str>,
    pub display_name: Option<Option<&'a str>>,
    pub bio: Option<Option<&'a str>>,
    pub profile_image_url: Option<Option<&'a str>>,
    pub location: Option<Option<&'a str>>,
    pub website: Option<Option<&'a str>>,
    pub niche: Option<Option<&'a str>>,
    pub interests: Option<&'a [String]>,
    pub associated_company: Option<Option<&'a str>>,
    pub level: Option<Option<&'a str>>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UserFilters<'a> {
    /// Case-insensitive substring match on username or email.
    pub query: Option<&'a str>,
    pub account_type: Option<&'a str>,
    pub limit: Option<i64>,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Inserts a new user and returns the full row.
///
/// # Errors
///
/// Returns [`DbError::Duplicate`] when the email or username is taken, or
/// [`DbError::Sqlx`] if the query otherwise fails.
pub async fn create_user(pool: &PgPool, user: &NewUser<'_>) -> Result<UserRow, DbError> {
    let sql = format!(
        "INSERT INTO users \
           (public_id, email, username, password_hash, account_type, display_name, niche, \
            interests, associated_company, level) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         RETURNING {USER_COLUMNS}"
    );
    sqlx::query_as::<_, UserRow>(&sql)
        .bind(Uuid::new_v4())
        .bind(user.email)
        .bind(user.username)
        .bind(user.password_hash)
        .bind(user.account_type)
        .bind(user.display_name)
        .bind(user.niche)
        .bind(user.interests)
        .bind(user.associated_company)
        .bind(user.level)
        .fetch_one(pool)
        .await
        .map_err(|e| map_user_unique_violation(DbError::from(e)))
}

/// Returns a user by internal id, or `None`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_user_by_id(pool: &PgPool, id: i64) -> Result<Option<UserRow>, DbError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
    let row = sqlx::query_as::<_, UserRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Returns a non-deleted user by public id, or `None`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_user_by_public_id(
    pool: &PgPool,
    public_id: Uuid,
) -> Result<Option<UserRow>, DbError> {
    let sql = format!(
        "SELECT {USER_COLUMNS} FROM users WHERE public_id = $1 AND status <> 'DELETED'"
    );
    let row = sqlx::query_as::<_, UserRow>(&sql)
        .bind(public_id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Returns a non-deleted user by exact username, or `None`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_user_by_username(
    pool: &PgPool,
    username: &str,
) -> Result<Option<UserRow>, DbError> {
    let sql = format!(
        "SELECT {USER_COLUMNS} FROM users WHERE username = $1 AND status <> 'DELETED'"
    );
    let row = sqlx::query_as::<_, UserRow>(&sql)
        .bind(username)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Returns a user by email (case-insensitive), including deleted users so
/// that a deleted email cannot be silently re-registered.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_user_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRow>, DbError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)");
    let row = sqlx::query_as::<_, UserRow>(&sql)
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Lists non-deleted users, newest first, optionally filtered.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_users(pool: &PgPool, filters: UserFilters<'_>) -> Result<Vec<UserRow>, DbError> {
    let pattern = filters
        .query
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(|q| format!("%{}%", escape_like(q)));
    let sql = format!(
        "SELECT {USER_COLUMNS} FROM users \
         WHERE status <> 'DELETED' \
           AND ($1::TEXT IS NULL OR username ILIKE $1 OR email ILIKE $1) \
           AND ($2::TEXT IS NULL OR account_type = $2) \
         ORDER BY created_at DESC, id DESC \
         LIMIT $3"
    );
    let rows = sqlx::query_as::<_, UserRow>(&sql)
        .bind(pattern)
        .bind(filters.account_type)
        .bind(filters.limit.unwrap_or(50))
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Applies a sparse update and returns the updated row.
///
/// `None` keeps the current value; for nullable columns `Some(None)` clears it.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no such user exists, [`DbError::Duplicate`]
/// if the new username is taken, or [`DbError::Sqlx`] on other failures.
pub async fn update_user(
    pool: &PgPool,
    user_id: i64,
    update: &UserUpdate<'_>,
) -> Result<UserRow, DbError> {
    let sql = format!(
        "UPDATE users \
         SET username           = COALESCE($2, username), \
             account_type       = COALESCE($3, account_type), \
             status             = COALESCE($4, status), \
             display_name       = CASE WHEN $5::BOOL  THEN $6  ELSE display_name END, \
             bio                = CASE WHEN $7::BOOL  THEN $8  ELSE bio END, \
             profile_image_url  = CASE WHEN $9::BOOL  THEN $10 ELSE profile_image_url END, \
             location           = CASE WHEN $11::BOOL THEN $12 ELSE location END, \
             website            = CASE WHEN $13::BOOL THEN $14 ELSE website END, \
             niche              = CASE WHEN $15::BOOL THEN $16 ELSE niche END, \
             interests          = COALESCE($17, interests), \
             associated_company = CASE WHEN $18::BOOL THEN $19 ELSE associated_company END, \
             level              = CASE WHEN $20::BOOL THEN $21 ELSE level END, \
             updated_at         = NOW() \
         WHERE id = $1 \
         RETURNING {USER_COLUMNS}"
    );
    sqlx::query_as::<_, UserRow>(&sql)
        .bind(user_id)
        .bind(update.username)
        .bind(update.account_type)
        .bind(update.status)
        .bind(update.display_name.is_some())
        .bind(update.display_name.flatten())
        .bind(update.bio.is_some())
        .bind(update.bio.flatten())
        .bind(update.profile_image_url.is_some())
        .bind(update.profile_image_url.flatten())
        .bind(update.location.is_some())
        .bind(update.location.flatten())
        .bind(update.website.is_some())
        .bind(update.website.flatten())
        .bind(update.niche.is_some())
        .bind(update.niche.flatten())
        .bind(update.interests)
        .bind(update.associated_company.is_some())
        .bind(update.associated_company.flatten())
        .bind(update.level.is_some())
        .bind(update.level.flatten())
        .fetch_optional(pool)
        .await
        .map_err(|e| map_user_unique_violation(DbError::from(e)))?
        .ok_or(DbError::NotFound)
}

/// Sets `last_login_at = NOW()`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn record_login(pool: &PgPool, user_id: i64) -> Result<(), DbError> {
    sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Marks a user `DELETED` and removes their connected accounts.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the user does not exist or is already
/// deleted, or [`DbError::Sqlx`] if a query fails.
pub async fn mark_user_deleted(pool: &PgPool, user_id: i64) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        "UPDATE users SET status = 'DELETED', updated_at = NOW() \
         WHERE id = $1 AND status <> 'DELETED'",
    )
    .bind(user_id)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    sqlx::query("DELETE FROM social_accounts WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

fn map_user_unique_violation(err: DbError) -> DbError {
    if !err.is_unique_violation() {
        return err;
    }
    match err.constraint() {
        Some("users_email_key") => DbError::Duplicate("email"),
        Some("users_username_key") => DbError::Duplicate("username"),
        _ => err,
    }
}

/// Escape `%`, `_` and `\` so user input matches literally inside `ILIKE`.
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
