//! Connecting, refreshing and looking up accounts: the glue between the
//! platform clients and the `social_accounts` table.

use chrono::{DateTime, Duration, Utc};
use socdash_core::{MetricsSnapshot, Platform, MAX_CONNECTED_ACCOUNTS};
use socdash_db::{
    get_account, insert_account_capped, list_accounts_for_user, list_all_account_ids,
    update_account_metrics, update_account_tokens, AccountRow, DbError, NewAccount,
};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::clients::{Credential, PlatformClients};
use crate::error::PlatformError;

/// Tokens expiring within this margin are refreshed before fetching.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 300;

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("user already has the maximum of {limit} connected accounts")]
    LimitReached { limit: i64 },

    #[error("a {0} account is already connected")]
    AlreadyConnected(Platform),

    #[error("{platform} accounts cannot be connected with {credential}")]
    CredentialNotAccepted {
        platform: Platform,
        credential: &'static str,
    },

    #[error("{0}")]
    InvalidCredential(String),

    #[error("stored {0} account has no access token")]
    MissingToken(Platform),

    #[error("unknown platform: {0}")]
    UnknownPlatform(String),

    #[error("user not found")]
    UserNotFound,

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error(transparent)]
    Db(#[from] DbError),
}

impl ConnectError {
    fn from_insert(err: DbError, platform: Platform) -> Self {
        match err {
            DbError::LimitReached { limit } => ConnectError::LimitReached { limit },
            DbError::AlreadyConnected(_) => ConnectError::AlreadyConnected(platform),
            DbError::NotFound => ConnectError::UserNotFound,
            other => ConnectError::Db(other),
        }
    }
}

/// A request to link one platform account to a user.
#[derive(Debug, Clone)]
pub struct NewConnection {
    pub platform: Platform,
    pub credential: Credential,
    pub refresh_token: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
}

/// Result of refreshing one account during a bulk refresh.
#[derive(Debug)]
pub struct RefreshOutcome {
    pub account_id: Uuid,
    pub platform: String,
    pub result: Result<AccountRow, ConnectError>,
}

impl RefreshOutcome {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Trims whitespace and a leading `@` from a username and rejects credential
/// kinds the platform cannot be read with.
fn validate_credential(platform: Platform, credential: Credential) -> Result<Credential, ConnectError> {
    let (accepted, credential) = match credential {
        Credential::AccessToken(token) => {
            let token = token.trim().to_owned();
            if token.is_empty() {
                return Err(ConnectError::InvalidCredential(
                    "access token must not be empty".to_owned(),
                ));
            }
            (platform.accepts_access_token(), Credential::AccessToken(token))
        }
        Credential::Username(username) => {
            let username = username.trim().trim_start_matches('@').to_owned();
            if username.is_empty() {
                return Err(ConnectError::InvalidCredential(
                    "username must not be empty".to_owned(),
                ));
            }
            if !platform.is_valid_username(&username) {
                return Err(ConnectError::InvalidCredential(format!(
                    "'{username}' is not a valid {platform} username"
                )));
            }
            (platform.accepts_username(), Credential::Username(username))
        }
    };
    if accepted {
        Ok(credential)
    } else {
        Err(ConnectError::CredentialNotAccepted {
            platform,
            credential: credential.kind(),
        })
    }
}

/// The duplicate-platform and cap checks, run against the user's current
/// accounts before anything is fetched.
fn check_capacity(existing: &[AccountRow], platform: Platform) -> Result<(), ConnectError> {
    if existing.iter().any(|a| a.platform == platform.as_str()) {
        return Err(ConnectError::AlreadyConnected(platform));
    }
    let count = i64::try_from(existing.len()).unwrap_or(i64::MAX);
    if count >= MAX_CONNECTED_ACCOUNTS {
        return Err(ConnectError::LimitReached {
            limit: MAX_CONNECTED_ACCOUNTS,
        });
    }
    Ok(())
}

/// Fetches metrics for a new account and stores it.
///
/// # Errors
///
/// - [`ConnectError::CredentialNotAccepted`] / [`ConnectError::InvalidCredential`]
///   before any lookup.
/// - [`ConnectError::AlreadyConnected`] / [`ConnectError::LimitReached`]
///   before any external call, and again if a concurrent connect won the race.
/// - [`ConnectError::Platform`] if the fetch fails; nothing is stored.
/// - [`ConnectError::UserNotFound`] / [`ConnectError::Db`] on storage failure.
pub async fn connect(
    pool: &PgPool,
    clients: &PlatformClients,
    user_id: i64,
    connection: NewConnection,
) -> Result<AccountRow, ConnectError> {
    let platform = connection.platform;
    let credential = validate_credential(platform, connection.credential)?;

    let existing = list_accounts_for_user(pool, user_id).await?;
    check_capacity(&existing, platform)?;

    let snapshot = clients.fetch(platform, &credential).await?;

    let (access_token, username) = match &credential {
        Credential::AccessToken(token) => (Some(token.as_str()), None),
        Credential::Username(username) => (None, Some(username.as_str())),
    };
    let handle = snapshot
        .handle
        .as_deref()
        .or(username)
        .unwrap_or(platform.as_str());

    let row = insert_account_capped(
        pool,
        &NewAccount {
            user_id,
            platform: platform.as_str(),
            handle,
            access_token,
            refresh_token: connection.refresh_token.as_deref(),
            token_expires_at: connection.token_expires_at,
            snapshot: Some(&snapshot),
        },
    )
    .await
    .map_err(|e| ConnectError::from_insert(e, platform))?;

    tracing::info!(
        user_id,
        account_id = %row.public_id,
        %platform,
        handle = %row.handle,
        followers = snapshot.followers,
        "account connected"
    );
    Ok(row)
}

fn needs_token_refresh(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    expires_at.is_some_and(|at| at <= now + Duration::seconds(TOKEN_REFRESH_MARGIN_SECS))
}

/// Picks the credential a stored account is refreshed with: its access token
/// when the platform reads by token, otherwise its handle.
fn stored_credential(
    platform: Platform,
    access_token: Option<String>,
    handle: &str,
) -> Result<Credential, ConnectError> {
    match access_token {
        Some(token) if platform.accepts_access_token() => Ok(Credential::AccessToken(token)),
        _ if platform.accepts_username() => Ok(Credential::Username(handle.to_owned())),
        _ => Err(ConnectError::MissingToken(platform)),
    }
}

/// Refreshes the account's OAuth token when it is about to expire and a
/// refresh token is stored. Returns the access token to fetch with.
async fn current_access_token(
    pool: &PgPool,
    clients: &PlatformClients,
    platform: Platform,
    account: &AccountRow,
) -> Result<Option<String>, ConnectError> {
    let Some(refresh_token) = account.refresh_token.as_deref() else {
        return Ok(account.access_token.clone());
    };
    if !needs_token_refresh(account.token_expires_at, Utc::now())
        || !clients.oauth.is_configured(platform)
    {
        return Ok(account.access_token.clone());
    }

    let grant = clients.oauth.refresh(platform, refresh_token).await?;
    update_account_tokens(
        pool,
        account.id,
        &grant.access_token,
        grant.refresh_token.as_deref(),
        grant.expires_at,
    )
    .await?;
    tracing::info!(account_id = %account.public_id, %platform, "access token refreshed");
    Ok(Some(grant.access_token))
}

/// Fetches a fresh snapshot for a stored account and overwrites the old one.
///
/// # Errors
///
/// - [`ConnectError::UnknownPlatform`] if the stored platform is not recognized.
/// - [`ConnectError::MissingToken`] if a token-only platform has no token.
/// - [`ConnectError::Platform`] if the token refresh or fetch fails; the
///   stored snapshot is left untouched.
/// - [`ConnectError::Db`] on storage failure.
pub async fn refresh(
    pool: &PgPool,
    clients: &PlatformClients,
    account: &AccountRow,
) -> Result<AccountRow, ConnectError> {
    let platform: Platform = account
        .platform
        .parse()
        .map_err(|_| ConnectError::UnknownPlatform(account.platform.clone()))?;

    let access_token = current_access_token(pool, clients, platform, account).await?;
    let credential = stored_credential(platform, access_token, &account.handle)?;
    let snapshot = clients.fetch(platform, &credential).await?;
    let row = update_account_metrics(pool, account.id, &snapshot).await?;

    tracing::info!(
        account_id = %row.public_id,
        %platform,
        followers = snapshot.followers,
        engagement_rate = snapshot.engagement_rate,
        "account refreshed"
    );
    Ok(row)
}

async fn refresh_logged(
    pool: &PgPool,
    clients: &PlatformClients,
    account: &AccountRow,
) -> RefreshOutcome {
    let result = refresh(pool, clients, account).await;
    if let Err(e) = &result {
        tracing::warn!(
            account_id = %account.public_id,
            platform = %account.platform,
            error = %e,
            "account refresh failed"
        );
    }
    RefreshOutcome {
        account_id: account.public_id,
        platform: account.platform.clone(),
        result,
    }
}

/// Refreshes every account of one user, one at a time. A failure is recorded
/// in that account's outcome and does not stop the rest.
///
/// # Errors
///
/// Returns [`DbError`] only if the account list cannot be loaded.
pub async fn refresh_all(
    pool: &PgPool,
    clients: &PlatformClients,
    user_id: i64,
) -> Result<Vec<RefreshOutcome>, DbError> {
    let accounts = list_accounts_for_user(pool, user_id).await?;
    let mut outcomes = Vec::with_capacity(accounts.len());
    for account in &accounts {
        outcomes.push(refresh_logged(pool, clients, account).await);
    }

    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    tracing::info!(user_id, total = outcomes.len(), failed, "refresh all completed");
    Ok(outcomes)
}

/// Refreshes the accounts of every active user. Accounts removed while the
/// run is in progress are skipped.
///
/// # Errors
///
/// Returns [`DbError`] if the account list or an account row cannot be loaded.
pub async fn refresh_every_account(
    pool: &PgPool,
    clients: &PlatformClients,
) -> Result<Vec<RefreshOutcome>, DbError> {
    let ids = list_all_account_ids(pool).await?;
    let mut outcomes = Vec::with_capacity(ids.len());
    for (user_id, account_id) in ids {
        let Some(account) = get_account(pool, user_id, account_id).await? else {
            tracing::debug!(%account_id, "account disappeared before refresh");
            continue;
        };
        outcomes.push(refresh_logged(pool, clients, &account).await);
    }
    Ok(outcomes)
}

/// Fetches a public snapshot by username without storing anything.
///
/// # Errors
///
/// - [`ConnectError::CredentialNotAccepted`] if the platform cannot be read
///   by username.
/// - [`ConnectError::Platform`] if the fetch fails.
pub async fn lookup(
    clients: &PlatformClients,
    platform: Platform,
    username: &str,
) -> Result<MetricsSnapshot, ConnectError> {
    let credential = validate_credential(platform, Credential::Username(username.to_owned()))?;
    Ok(clients.fetch(platform, &credential).await?)
}
