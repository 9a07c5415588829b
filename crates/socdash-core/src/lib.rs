//! Domain model and configuration shared by every socdash crate.

pub mod analytics;
pub mod app_config;
pub mod config;
pub mod metrics;
pub mod platform;
pub mod users;

use thiserror::Error;

pub use analytics::{overview, platform_view, AccountMetrics, Overview, PlatformSummary, PlatformView};
pub use app_config::{AppConfig, Environment, OAuthCredentials};
pub use config::{load_app_config, load_app_config_from_env};
pub use metrics::{engagement_rate, GrowthBucket, MetricsSnapshot, TopPost};
pub use platform::{ConnectMethod, Platform};
pub use users::{AccountType, UserStatus};

/// Maximum number of connected accounts a single user may hold.
pub const MAX_CONNECTED_ACCOUNTS: i64 = 5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("unknown platform: {0}")]
    UnknownPlatform(String),
    #[error("unknown account type: {0}")]
    UnknownAccountType(String),
    #[error("unknown user status: {0}")]
    UnknownUserStatus(String),
}
