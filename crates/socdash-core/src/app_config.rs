use std::net::SocketAddr;

use crate::Platform;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Client id/secret pair registered with an OAuth provider.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .finish()
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub public_base_url: String,
    pub api_keys: Vec<String>,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub http_timeout_secs: u64,
    pub http_user_agent: String,
    pub http_max_retries: u32,
    pub http_retry_backoff_ms: u64,
    pub engagement_window_days: u32,
    pub recent_window_days: u32,
    pub rapidapi_key: Option<String>,
    pub twitter_bearer_token: Option<String>,
    pub facebook_oauth: Option<OAuthCredentials>,
    pub google_oauth: Option<OAuthCredentials>,
    pub twitter_oauth: Option<OAuthCredentials>,
}

impl AppConfig {
    /// OAuth credentials used to connect `platform`, if configured.
    ///
    /// Instagram business accounts are reached through a Facebook login, and
    /// YouTube through a Google login.
    #[must_use]
    pub fn oauth_for(&self, platform: Platform) -> Option<&OAuthCredentials> {
        match platform {
            Platform::Facebook | Platform::Instagram => self.facebook_oauth.as_ref(),
            Platform::Youtube => self.google_oauth.as_ref(),
            Platform::Twitter => self.twitter_oauth.as_ref(),
            Platform::Linkedin | Platform::Tiktok => None,
        }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("public_base_url", &self.public_base_url)
            .field("database_url", &"[redacted]")
            .field("api_keys", &format!("[{} redacted]", self.api_keys.len()))
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("http_user_agent", &self.http_user_agent)
            .field("http_max_retries", &self.http_max_retries)
            .field("http_retry_backoff_ms", &self.http_retry_backoff_ms)
            .field("engagement_window_days", &self.engagement_window_days)
            .field("recent_window_days", &self.recent_window_days)
            .field(
                "rapidapi_key",
                &self.rapidapi_key.as_ref().map(|_| "[redacted]"),
            )
            .field(
                "twitter_bearer_token",
                &self.twitter_bearer_token.as_ref().map(|_| "[redacted]"),
            )
            .field("facebook_oauth", &self.facebook_oauth)
            .field("google_oauth", &self.google_oauth)
            .field("twitter_oauth", &self.twitter_oauth)
            .finish()
    }
}
