//! Offline tests for socdash-db pool configuration and row types.
//! These tests do not require a live database connection.

use chrono::Utc;
use socdash_core::{AppConfig, Environment, MetricsSnapshot};
use socdash_db::{AccountRow, DbError, PoolConfig, UserRow};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use uuid::Uuid;

fn app_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_string(),
        public_base_url: "http://localhost:3000".to_string(),
        api_keys: Vec::new(),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        http_timeout_secs: 30,
        http_user_agent: "ua".to_string(),
        http_max_retries: 2,
        http_retry_backoff_ms: 500,
        engagement_window_days: 30,
        recent_window_days: 6,
        rapidapi_key: None,
        twitter_bearer_token: None,
        facebook_oauth: None,
        google_oauth: None,
        twitter_oauth: None,
    }
}

fn account_row(metrics: Option<serde_json::Value>) -> AccountRow {
    AccountRow {
        id: 3,
        public_id: Uuid::new_v4(),
        user_id: 1,
        platform: "tiktok".to_string(),
        handle: "creator".to_string(),
        access_token: None,
        refresh_token: None,
        token_expires_at: None,
        followers: Some(1_200),
        posts: Some(40),
        engagement_rate: Some(3.5),
        metrics,
        metrics_updated_at: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let pool_config = PoolConfig::from_app_config(&app_config());
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

#[test]
fn account_snapshot_decodes_stored_json() {
    let stored = MetricsSnapshot::new(1_200, 40, 42, Utc::now());
    let row = account_row(Some(serde_json::to_value(&stored).expect("serialize")));

    let decoded = row.snapshot().expect("decode").expect("snapshot present");
    assert_eq!(decoded, stored);
}

#[test]
fn account_snapshot_absent_when_never_fetched() {
    let row = account_row(None);
    assert!(row.snapshot().expect("decode").is_none());
}

#[test]
fn account_snapshot_rejects_malformed_json() {
    let row = account_row(Some(serde_json::json!({ "followers": "lots" })));
    assert!(matches!(row.snapshot(), Err(DbError::Decode(_))));
}

/// Compile-time smoke test: confirm that [`UserRow`] has all expected
/// fields with the correct types. No database required.
#[test]
fn user_row_has_expected_fields() {
    let row = UserRow {
        id: 9_i64,
        public_id: Uuid::new_v4(),
        email: "maya@example.com".to_string(),
        username: "maya".to_string(),
        password_hash: None,
        account_type: "INFLUENCER".to_string(),
        status: "ACTIVE".to_string(),
        display_name: Some("Maya".to_string()),
        bio: None,
        profile_image_url: None,
        location: None,
        website: None,
        niche: Some("travel".to_string()),
        interests: vec!["food".to_string()],
        associated_company: None,
        level: None,
        last_login_at: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    assert_eq!(row.id, 9);
    assert_eq!(row.account_type, "INFLUENCER");
    assert_eq!(row.niche.as_deref(), Some("travel"));
    assert_eq!(row.interests, vec!["food".to_string()]);
}

#[test]
fn db_error_messages_name_the_problem() {
    assert_eq!(
        DbError::LimitReached { limit: 5 }.to_string(),
        "user already has the maximum of 5 connected accounts"
    );
    assert_eq!(
        DbError::AlreadyConnected("youtube".to_string()).to_string(),
        "youtube account already connected"
    );
    assert_eq!(DbError::Duplicate("email").to_string(), "email already taken");
}
