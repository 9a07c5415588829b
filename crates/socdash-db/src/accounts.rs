//! Database operations for the `social_accounts` table.
//!
//! The latest metrics snapshot is stored twice: headline counts as columns
//! (for sorting and listing) and the full snapshot as JSONB.

use chrono::{DateTime, Utc};
use socdash_core::{MetricsSnapshot, MAX_CONNECTED_ACCOUNTS};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `social_accounts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AccountRow {
    pub id: i64,
    pub public_id: Uuid,
    pub user_id: i64,
    pub platform: String,
    pub handle: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
    pub followers: Option<i64>,
    pub posts: Option<i64>,
    pub engagement_rate: Option<f64>,
    pub metrics: Option<serde_json::Value>,
    pub metrics_updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AccountRow {
    /// Decode the stored JSONB snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Decode`] if the stored JSON does not match
    /// [`MetricsSnapshot`].
    pub fn snapshot(&self) -> Result<Option<MetricsSnapshot>, DbError> {
        self.metrics
            .as_ref()
            .map(|v| {
                serde_json::from_value::<MetricsSnapshot>(v.clone())
                    .map_err(|e| DbError::Decode(format!("account {}: {e}", self.public_id)))
            })
            .transpose()
    }
}

const ACCOUNT_COLUMNS: &str = "id, public_id, user_id, platform, handle, access_token, \
     refresh_token, token_expires_at, followers, posts, engagement_rate, metrics, \
     metrics_updated_at, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct NewAccount<'a> {
    pub user_id: i64,
    pub platform: &'a str,
    pub handle: &'a str,
    pub access_token: Option<&'a str>,
    pub refresh_token: Option<&'a str>,
    pub token_expires_at: Option<DateTime<Utc>>,
    pub snapshot: Option<&'a MetricsSnapshot>,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Lists a user's connected accounts ordered by platform.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_accounts_for_user(pool: &PgPool, user_id: i64) -> Result<Vec<AccountRow>, DbError> {
    let sql = format!(
        "SELECT {ACCOUNT_COLUMNS} FROM social_accounts WHERE user_id = $1 ORDER BY platform, id"
    );
    let rows = sqlx::query_as::<_, AccountRow>(&sql)
        .bind(user_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Returns the ids of every connected account belonging to an active user.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_all_account_ids(pool: &PgPool) -> Result<Vec<(i64, Uuid)>, DbError> {
    let rows = sqlx::query_as::<_, (i64, Uuid)>(
        "SELECT a.user_id, a.public_id FROM social_accounts a \
         JOIN users u ON u.id = a.user_id \
         WHERE u.status = 'ACTIVE' \
         ORDER BY a.user_id, a.platform",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Returns one account by public id, scoped to its owner.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_account(
    pool: &PgPool,
    user_id: i64,
    public_id: Uuid,
) -> Result<Option<AccountRow>, DbError> {
    let sql = format!(
        "SELECT {ACCOUNT_COLUMNS} FROM social_accounts WHERE user_id = $1 AND public_id = $2"
    );
    let row = sqlx::query_as::<_, AccountRow>(&sql)
        .bind(user_id)
        .bind(public_id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Inserts an account while enforcing the per-user cap and the one-account-
/// per-platform rule.
///
/// The owner's `users` row is locked for the duration of the transaction so
/// that concurrent inserts for the same user serialize on the count check.
///
/// # Errors
///
/// - [`DbError::NotFound`] if the user does not exist.
/// - [`DbError::AlreadyConnected`] if the platform is already linked.
/// - [`DbError::LimitReached`] if the user already has the maximum.
/// - [`DbError::Sqlx`] on any other failure.
pub async fn insert_account_capped(
    pool: &PgPool,
    account: &NewAccount<'_>,
) -> Result<AccountRow, DbError> {
    let mut tx = pool.begin().await?;

    let locked = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE id = $1 FOR UPDATE")
        .bind(account.user_id)
        .fetch_optional(&mut *tx)
        .await?;
    if locked.is_none() {
        return Err(DbError::NotFound);
    }

    let (count, same_platform) = sqlx::query_as::<_, (i64, bool)>(
        "SELECT COUNT(*), COALESCE(BOOL_OR(platform = $2), false) \
         FROM social_accounts WHERE user_id = $1",
    )
    .bind(account.user_id)
    .bind(account.platform)
    .fetch_one(&mut *tx)
    .await?;

    if same_platform {
        return Err(DbError::AlreadyConnected(account.platform.to_string()));
    }
    if count >= MAX_CONNECTED_ACCOUNTS {
        return Err(DbError::LimitReached {
            limit: MAX_CONNECTED_ACCOUNTS,
        });
    }

    let metrics = account.snapshot.map(serde_json::to_value).transpose().map_err(|e| {
        DbError::Decode(format!("snapshot for new {} account: {e}", account.platform))
    })?;
    let sql = format!(
        "INSERT INTO social_accounts \
           (public_id, user_id, platform, handle, access_token, refresh_token, token_expires_at, \
            followers, posts, engagement_rate, metrics, metrics_updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
         RETURNING {ACCOUNT_COLUMNS}"
    );
    let row = sqlx::query_as::<_, AccountRow>(&sql)
        .bind(Uuid::new_v4())
        .bind(account.user_id)
        .bind(account.platform)
        .bind(account.handle)
        .bind(account.access_token)
        .bind(account.refresh_token)
        .bind(account.token_expires_at)
        .bind(account.snapshot.map(|s| s.followers))
        .bind(account.snapshot.map(|s| s.posts))
        .bind(account.snapshot.map(|s| s.engagement_rate))
        .bind(metrics)
        .bind(account.snapshot.map(|s| s.fetched_at))
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            let err = DbError::from(e);
            if err.constraint() == Some("social_accounts_user_platform_key") {
                DbError::AlreadyConnected(account.platform.to_string())
            } else {
                err
            }
        })?;

    tx.commit().await?;
    Ok(row)
}

/// Overwrites the stored snapshot (and the handle, when the platform reported
/// one) and returns the updated row.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the account no longer exists, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn update_account_metrics(
    pool: &PgPool,
    account_id: i64,
    snapshot: &MetricsSnapshot,
) -> Result<AccountRow, DbError> {
    let metrics = serde_json::to_value(snapshot)
        .map_err(|e| DbError::Decode(format!("snapshot for account {account_id}: {e}")))?;
    let sql = format!(
        "UPDATE social_accounts \
         SET handle             = COALESCE($2, handle), \
             followers          = $3, \
             posts              = $4, \
             engagement_rate    = $5, \
             metrics            = $6, \
             metrics_updated_at = $7, \
             updated_at         = NOW() \
         WHERE id = $1 \
         RETURNING {ACCOUNT_COLUMNS}"
    );
    sqlx::query_as::<_, AccountRow>(&sql)
        .bind(account_id)
        .bind(snapshot.handle.as_deref())
        .bind(snapshot.followers)
        .bind(snapshot.posts)
        .bind(snapshot.engagement_rate)
        .bind(metrics)
        .bind(snapshot.fetched_at)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

/// Replaces the stored OAuth tokens.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn update_account_tokens(
    pool: &PgPool,
    account_id: i64,
    access_token: &str,
    refresh_token: Option<&str>,
    token_expires_at: Option<DateTime<Utc>>,
) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE social_accounts \
         SET access_token     = $2, \
             refresh_token    = COALESCE($3, refresh_token), \
             token_expires_at = $4, \
             updated_at       = NOW() \
         WHERE id = $1",
    )
    .bind(account_id)
    .bind(access_token)
    .bind(refresh_token)
    .bind(token_expires_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Deletes an account owned by `user_id`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no such account belongs to the user, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn delete_account(pool: &PgPool, user_id: i64, public_id: Uuid) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM social_accounts WHERE user_id = $1 AND public_id = $2")
        .bind(user_id)
        .bind(public_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}
