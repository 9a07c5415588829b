//! API clients for the supported social platforms and the services that
//! connect and refresh accounts with them.

pub mod accounts;
pub mod clients;
pub mod error;
pub mod facebook;
pub mod http;
pub mod normalize;
pub mod oauth;
pub mod rapidapi;
pub(crate) mod retry;
pub mod twitter;
pub mod types;
pub mod youtube;

pub use accounts::{
    connect, lookup, refresh, refresh_all, refresh_every_account, ConnectError, NewConnection,
    RefreshOutcome,
};
pub use clients::{Credential, PlatformClients};
pub use error::PlatformError;
pub use facebook::GraphClient;
pub use http::HttpSettings;
pub use normalize::FetchWindow;
pub use oauth::{code_challenge, generate_code_verifier, generate_state, OAuthClient, TokenGrant};
pub use rapidapi::RapidApiClient;
pub use twitter::{TwitterClient, TwitterTarget};
pub use youtube::YoutubeClient;
