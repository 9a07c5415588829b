//! One handle over every platform client, dispatching a fetch by platform
//! and credential kind.

use chrono::Utc;
use socdash_core::{AppConfig, MetricsSnapshot, Platform};

use crate::error::PlatformError;
use crate::facebook::GraphClient;
use crate::http::HttpSettings;
use crate::normalize::FetchWindow;
use crate::oauth::OAuthClient;
use crate::rapidapi::RapidApiClient;
use crate::twitter::{TwitterClient, TwitterTarget};
use crate::youtube::YoutubeClient;

/// What an account is read with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    AccessToken(String),
    Username(String),
}

impl Credential {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Credential::AccessToken(_) => "an access token",
            Credential::Username(_) => "a username",
        }
    }
}

pub struct PlatformClients {
    pub graph: GraphClient,
    pub youtube: YoutubeClient,
    pub rapidapi: RapidApiClient,
    pub twitter: TwitterClient,
    pub oauth: OAuthClient,
    /// Days of posts counted toward engagement.
    pub engagement_window_days: u32,
    /// Days of posts eligible as LinkedIn top posts.
    pub recent_window_days: u32,
}

impl PlatformClients {
    /// Builds production clients from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Http`] if a `reqwest::Client` cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Self, PlatformError> {
        let settings = HttpSettings::from_app_config(config);
        Ok(Self {
            graph: GraphClient::new(settings.clone())?,
            youtube: YoutubeClient::new(settings.clone())?,
            rapidapi: RapidApiClient::new(settings.clone(), config.rapidapi_key.clone())?,
            twitter: TwitterClient::new(settings, config.twitter_bearer_token.clone())?,
            oauth: OAuthClient::from_config(config)?,
            engagement_window_days: config.engagement_window_days,
            recent_window_days: config.recent_window_days,
        })
    }

    /// Fetches a fresh snapshot for one account.
    ///
    /// # Errors
    ///
    /// - [`PlatformError::Unsupported`] if `platform` cannot be read with this
    ///   kind of credential.
    /// - Any error of the underlying platform client.
    pub async fn fetch(
        &self,
        platform: Platform,
        credential: &Credential,
    ) -> Result<MetricsSnapshot, PlatformError> {
        let now = Utc::now();
        let engagement = FetchWindow::ending_at(now, self.engagement_window_days);
        tracing::info!(%platform, credential = credential.kind(), "fetching metrics");

        match (platform, credential) {
            (Platform::Facebook, Credential::AccessToken(token)) => {
                self.graph.fetch_facebook(token, engagement).await
            }
            (Platform::Instagram, Credential::AccessToken(token)) => {
                self.graph.fetch_instagram(token, engagement).await
            }
            (Platform::Youtube, Credential::AccessToken(token)) => {
                self.youtube.fetch(token, engagement).await
            }
            (Platform::Linkedin, Credential::Username(username)) => {
                let recent = FetchWindow::ending_at(now, self.recent_window_days);
                self.rapidapi.fetch_linkedin(username, recent).await
            }
            (Platform::Tiktok, Credential::Username(username)) => {
                self.rapidapi.fetch_tiktok(username, now).await
            }
            (Platform::Twitter, Credential::AccessToken(token)) => {
                self.twitter
                    .fetch(TwitterTarget::Me { access_token: token }, now)
                    .await
            }
            (Platform::Twitter, Credential::Username(username)) => {
                self.twitter.fetch(TwitterTarget::Username(username), now).await
            }
            (platform, credential) => Err(PlatformError::Unsupported {
                platform,
                credential: credential.kind(),
            }),
        }
    }
}
