//! `refresh` command handlers.
//!
//! Refreshes run sequentially. A failing account is reported in the summary
//! and does not stop the run; the caller decides the exit status from the
//! returned failure count.

use socdash_platforms::{PlatformClients, RefreshOutcome};
use sqlx::PgPool;
use uuid::Uuid;

/// Refresh every account of one user.
///
/// Returns the number of accounts that failed.
///
/// # Errors
///
/// Returns an error if the user does not exist or the account list cannot be
/// loaded.
pub(crate) async fn run_refresh_user(
    pool: &PgPool,
    clients: &PlatformClients,
    public_id: Uuid,
) -> anyhow::Result<usize> {
    let user = socdash_db::get_user_by_public_id(pool, public_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("user '{public_id}' not found"))?;

    let outcomes = socdash_platforms::refresh_all(pool, clients, user.id).await?;
    if outcomes.is_empty() {
        println!("user '{}' has no connected accounts", user.username);
        return Ok(0);
    }
    Ok(print_summary(&outcomes))
}

/// Refresh every connected account in the database.
///
/// # Errors
///
/// Returns an error if the account list cannot be loaded.
pub(crate) async fn run_refresh_all(
    pool: &PgPool,
    clients: &PlatformClients,
) -> anyhow::Result<usize> {
    let outcomes = socdash_platforms::refresh_every_account(pool, clients).await?;
    if outcomes.is_empty() {
        println!("no connected accounts to refresh");
        return Ok(0);
    }
    Ok(print_summary(&outcomes))
}

fn outcome_line(outcome: &RefreshOutcome) -> String {
    match &outcome.result {
        Ok(row) => format!(
            "ok      {:<10} {:<24} followers={}",
            outcome.platform,
            row.handle,
            row.followers.map_or_else(|| "-".to_owned(), |f| f.to_string()),
        ),
        Err(e) => format!(
            "failed  {:<10} {:<24} {e}",
            outcome.platform, outcome.account_id
        ),
    }
}

fn print_summary(outcomes: &[RefreshOutcome]) -> usize {
    for outcome in outcomes {
        println!("{}", outcome_line(outcome));
    }
    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    println!(
        "refreshed {} of {} account(s)",
        outcomes.len() - failed,
        outcomes.len()
    );
    failed
}
