use crate::app_config::{AppConfig, Environment, OAuthCredentials};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

const MAX_HTTP_TIMEOUT_SECS: u64 = 300;
/// Upstream insight APIs keep about a year of history.
const MAX_WINDOW_DAYS: u64 = 365;

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can drive it with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let parse = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    // A provider is configured only when both halves are present.
    let oauth = |id_var: &str, secret_var: &str| -> Option<OAuthCredentials> {
        match (optional(id_var), optional(secret_var)) {
            (Some(client_id), Some(client_secret)) => Some(OAuthCredentials {
                client_id,
                client_secret,
            }),
            _ => None,
        }
    };

    let database_url = require("DATABASE_URL")?;

    let env = parse_environment(&or_default("SOCDASH_ENV", "development"))?;

    let bind_addr = parse("SOCDASH_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("SOCDASH_LOG_LEVEL", "info");
    let public_base_url = or_default("SOCDASH_PUBLIC_BASE_URL", "http://localhost:3000")
        .trim_end_matches('/')
        .to_string();
    let api_keys = parse_api_keys(&or_default("SOCDASH_API_KEYS", ""));

    let db_max_connections = parse_u32("SOCDASH_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("SOCDASH_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("SOCDASH_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let in_range = |var: &str, value: u64, min: u64, max: u64| -> Result<(), ConfigError> {
        if (min..=max).contains(&value) {
            Ok(())
        } else {
            Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: format!("must be between {min} and {max}, got {value}"),
            })
        }
    };

    let http_timeout_secs = parse_u64("SOCDASH_HTTP_TIMEOUT_SECS", "30")?;
    in_range("SOCDASH_HTTP_TIMEOUT_SECS", http_timeout_secs, 1, MAX_HTTP_TIMEOUT_SECS)?;
    let http_user_agent = or_default("SOCDASH_HTTP_USER_AGENT", "socdash/0.1 (social-analytics)");
    let http_max_retries = parse_u32("SOCDASH_HTTP_MAX_RETRIES", "2")?;
    let http_retry_backoff_ms = parse_u64("SOCDASH_HTTP_RETRY_BACKOFF_MS", "500")?;

    let engagement_window_days = parse_u32("SOCDASH_ENGAGEMENT_WINDOW_DAYS", "30")?;
    in_range(
        "SOCDASH_ENGAGEMENT_WINDOW_DAYS",
        u64::from(engagement_window_days),
        1,
        MAX_WINDOW_DAYS,
    )?;
    let recent_window_days = parse_u32("SOCDASH_RECENT_WINDOW_DAYS", "6")?;
    in_range(
        "SOCDASH_RECENT_WINDOW_DAYS",
        u64::from(recent_window_days),
        1,
        MAX_WINDOW_DAYS,
    )?;

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        public_base_url,
        api_keys,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        http_timeout_secs,
        http_user_agent,
        http_max_retries,
        http_retry_backoff_ms,
        engagement_window_days,
        recent_window_days,
        rapidapi_key: optional("RAPIDAPI_KEY"),
        twitter_bearer_token: optional("TWITTER_BEARER_TOKEN"),
        facebook_oauth: oauth("FACEBOOK_CLIENT_ID", "FACEBOOK_CLIENT_SECRET"),
        google_oauth: oauth("GOOGLE_CLIENT_ID", "GOOGLE_CLIENT_SECRET"),
        twitter_oauth: oauth("TWITTER_CLIENT_ID", "TWITTER_CLIENT_SECRET"),
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "SOCDASH_ENV".to_string(),
            reason: format!("expected development, test or production, got '{other}'"),
        }),
    }
}

/// Split a comma-separated key list, dropping blanks.
fn parse_api_keys(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
