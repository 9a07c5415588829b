use reqwest::StatusCode;
use socdash_core::Platform;
use thiserror::Error;

/// Errors returned by the platform API clients.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The upstream answered with a non-2xx status.
    #[error("{platform} returned HTTP {status}: {message}")]
    Status {
        platform: Platform,
        status: StatusCode,
        message: String,
    },

    /// The upstream answered 2xx but reported an error in the body.
    #[error("{platform} API error: {message}")]
    Api { platform: Platform, message: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no Facebook page is managed by this account")]
    NoPage,

    #[error("no YouTube channel is associated with this account")]
    NoChannel,

    #[error("the Facebook page has no linked Instagram business account")]
    NoLinkedAccount,

    /// A key or token needed to call the upstream is not configured.
    #[error("missing credential: {0}")]
    MissingCredential(&'static str),

    #[error("{platform} cannot be fetched with {credential}")]
    Unsupported {
        platform: Platform,
        credential: &'static str,
    },

    #[error("OAuth error: {0}")]
    OAuth(String),

    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}
