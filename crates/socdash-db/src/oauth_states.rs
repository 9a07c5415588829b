//! Pending OAuth authorizations, keyed by the `state` parameter.
//!
//! A state is single-use: [`take_oauth_state`] deletes it in the same
//! statement that reads it.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// How long an authorize redirect stays valid.
pub const OAUTH_STATE_TTL_SECS: i64 = 600;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OAuthStateRow {
    pub state: String,
    pub user_id: i64,
    pub platform: String,
    pub code_verifier: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Stores a new pending state.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_oauth_state(
    pool: &PgPool,
    state: &str,
    user_id: i64,
    platform: &str,
    code_verifier: Option<&str>,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO oauth_states (state, user_id, platform, code_verifier) \
         VALUES ($1, $2, $3, $4)",
    )
    .bind(state)
    .bind(user_id)
    .bind(platform)
    .bind(code_verifier)
    .execute(pool)
    .await?;
    Ok(())
}

/// Consumes a state. Returns `None` if it never existed, was already used,
/// or is older than [`OAUTH_STATE_TTL_SECS`]. Expired states for any user
/// are purged as a side effect.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a query fails.
pub async fn take_oauth_state(pool: &PgPool, state: &str) -> Result<Option<OAuthStateRow>, DbError> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query_as::<_, OAuthStateRow>(
        "DELETE FROM oauth_states WHERE state = $1 \
         RETURNING state, user_id, platform, code_verifier, created_at",
    )
    .bind(state)
    .fetch_optional(&mut *tx)
    .await?;

    let purged = sqlx::query(
        "DELETE FROM oauth_states WHERE created_at < NOW() - $1::BIGINT * INTERVAL '1 second'",
    )
    .bind(OAUTH_STATE_TTL_SECS)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    tx.commit().await?;

    if purged > 0 {
        tracing::debug!(purged, "expired oauth states removed");
    }

    Ok(row.filter(|r| is_fresh(r.created_at, Utc::now())))
}

fn is_fresh(created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    (now - created_at).num_seconds() <= OAUTH_STATE_TTL_SECS
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn state_expires_after_ttl() {
        let now = Utc::now();
        assert!(is_fresh(now - Duration::seconds(30), now));
        assert!(is_fresh(now - Duration::seconds(OAUTH_STATE_TTL_SECS), now));
        assert!(!is_fresh(now - Duration::seconds(OAUTH_STATE_TTL_SECS + 1), now));
    }
}
