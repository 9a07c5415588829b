//! Client for the Twitter / X API v2.
//!
//! A user-context OAuth token reads the owner's own profile via `users/me`;
//! without one, a public username is resolved with the app bearer token.

use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use socdash_core::{MetricsSnapshot, Platform, TopPost};

use crate::error::PlatformError;
use crate::http::{decode, get_json, join, parse_base_url, HttpSettings};
use crate::normalize::{parse_timestamp, top_posts, TOP_POSTS_LIMIT};
use crate::types::{DataList, Tweet, TwitterEnvelope, TwitterUser};

const DEFAULT_BASE_URL: &str = "https://api.twitter.com/2/";
const TWEETS_PAGE: &str = "50";

pub struct TwitterClient {
    client: Client,
    settings: HttpSettings,
    base_url: Url,
    app_bearer_token: Option<String>,
}

/// Whose metrics to read, and with which token.
#[derive(Debug, Clone, Copy)]
pub enum TwitterTarget<'a> {
    /// The owner of a user-context OAuth token.
    Me { access_token: &'a str },
    /// A public account, read with the app bearer token.
    Username(&'a str),
}

impl TwitterClient {
    /// # Errors
    ///
    /// Returns [`PlatformError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(
        settings: HttpSettings,
        app_bearer_token: Option<String>,
    ) -> Result<Self, PlatformError> {
        Self::with_base_url(settings, app_bearer_token, DEFAULT_BASE_URL)
    }

    /// # Errors
    ///
    /// Returns [`PlatformError::Http`] if the `reqwest::Client` cannot be
    /// built, or [`PlatformError::InvalidUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        settings: HttpSettings,
        app_bearer_token: Option<String>,
        base_url: &str,
    ) -> Result<Self, PlatformError> {
        Ok(Self {
            client: settings.build_client()?,
            settings,
            base_url: parse_base_url(base_url)?,
            app_bearer_token,
        })
    }

    /// Fetches follower and tweet counts plus the engagement (likes +
    /// replies + retweets + quotes) of the latest tweets.
    ///
    /// # Errors
    ///
    /// - [`PlatformError::MissingCredential`] when reading by username without
    ///   an app bearer token.
    /// - [`PlatformError::Api`] if the API reports the user does not exist.
    /// - [`PlatformError::Status`] / [`PlatformError::Http`] on upstream failure.
    pub async fn fetch(
        &self,
        target: TwitterTarget<'_>,
        fetched_at: DateTime<Utc>,
    ) -> Result<MetricsSnapshot, PlatformError> {
        let (token, user_url) = match target {
            TwitterTarget::Me { access_token } => {
                (access_token, join(&self.base_url, "users/me")?)
            }
            TwitterTarget::Username(username) => (
                self.app_bearer_token
                    .as_deref()
                    .ok_or(PlatformError::MissingCredential("TWITTER_BEARER_TOKEN"))?,
                self.username_url(username)?,
            ),
        };

        let user: TwitterUser = {
            let body = self
                .get(&user_url, token, &[("user.fields", "public_metrics")])
                .await?;
            let envelope: TwitterEnvelope<TwitterUser> = decode(body, user_url.path())?;
            envelope.data.ok_or_else(|| PlatformError::Api {
                platform: Platform::Twitter,
                message: envelope
                    .errors
                    .into_iter()
                    .find_map(|p| p.detail.or(p.title))
                    .unwrap_or_else(|| "user not found".to_owned()),
            })?
        };

        let tweets: Vec<Tweet> = {
            let path = format!("users/{}/tweets", user.id);
            let url = join(&self.base_url, &path)?;
            let body = self
                .get(
                    &url,
                    token,
                    &[
                        ("max_results", TWEETS_PAGE),
                        ("tweet.fields", "public_metrics,created_at"),
                    ],
                )
                .await?;
            decode::<DataList<Tweet>>(body, &path)?.data
        };

        let tweet_engagement =
            |t: &Tweet| t.public_metrics.as_ref().map_or(0, |m| m.engagement());
        let engagement: i64 = tweets.iter().map(tweet_engagement).sum();
        let likes: i64 = tweets
            .iter()
            .filter_map(|t| t.public_metrics.as_ref().map(|m| m.like_count))
            .sum();
        let candidates = tweets
            .iter()
            .map(|t| TopPost {
                id: t.id.clone(),
                text: t.text.clone(),
                engagement: tweet_engagement(t),
                posted_at: t.created_at.as_deref().and_then(parse_timestamp),
            })
            .collect();

        let metrics = user.public_metrics.unwrap_or_default();
        let mut snapshot = MetricsSnapshot::new(
            metrics.followers_count,
            metrics.tweet_count,
            engagement,
            fetched_at,
        );
        snapshot.handle = Some(user.username);
        snapshot.total_likes = Some(likes);
        snapshot.top_posts = top_posts(candidates, TOP_POSTS_LIMIT);

        tracing::debug!(
            user_id = %user.id,
            followers = snapshot.followers,
            tweets = tweets.len(),
            "twitter metrics fetched"
        );
        Ok(snapshot)
    }

    /// `users/by/username/{username}` with the username as one encoded
    /// path segment.
    fn username_url(&self, username: &str) -> Result<Url, PlatformError> {
        let mut url = join(&self.base_url, "users/by/username/")?;
        url.path_segments_mut()
            .map_err(|()| PlatformError::InvalidUrl {
                url: self.base_url.to_string(),
                reason: "base URL cannot have path segments".to_owned(),
            })?
            .pop_if_empty()
            .push(username);
        Ok(url)
    }

    async fn get(
        &self,
        url: &Url,
        token: &str,
        query: &[(&str, &str)],
    ) -> Result<serde_json::Value, PlatformError> {
        get_json(&self.settings, Platform::Twitter, url.path(), || {
            self.client.get(url.clone()).bearer_auth(token).query(query)
        })
        .await
    }
}
