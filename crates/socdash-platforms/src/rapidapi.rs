//! Username-based lookups through RapidAPI proxies: LinkedIn via
//! "fresh-linkedin-profile-data" and TikTok via "tiktok-scraper7".
//!
//! Both proxies authenticate with the same `X-RapidAPI-Key`.

use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use socdash_core::{GrowthBucket, MetricsSnapshot, Platform, TopPost};

use crate::error::PlatformError;
use crate::http::{decode, get_json, join, parse_base_url, HttpSettings};
use crate::normalize::{parse_timestamp, top_posts, FetchWindow, TOP_POSTS_LIMIT};
use crate::types::{LinkedinEnvelope, LinkedinPost, LinkedinProfile, TiktokEnvelope};

const LINKEDIN_HOST: &str = "fresh-linkedin-profile-data.p.rapidapi.com";
const TIKTOK_HOST: &str = "tiktok-scraper7.p.rapidapi.com";
const LINKEDIN_POSTS_PAGE: &str = "50";

pub struct RapidApiClient {
    client: Client,
    settings: HttpSettings,
    api_key: Option<String>,
    linkedin_base: Url,
    tiktok_base: Url,
}

impl RapidApiClient {
    /// # Errors
    ///
    /// Returns [`PlatformError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(settings: HttpSettings, api_key: Option<String>) -> Result<Self, PlatformError> {
        Self::with_base_urls(
            settings,
            api_key,
            &format!("https://{LINKEDIN_HOST}/"),
            &format!("https://{TIKTOK_HOST}/"),
        )
    }

    /// # Errors
    ///
    /// Returns [`PlatformError::Http`] if the `reqwest::Client` cannot be
    /// built, or [`PlatformError::InvalidUrl`] if a base URL does not parse.
    pub fn with_base_urls(
        settings: HttpSettings,
        api_key: Option<String>,
        linkedin_base: &str,
        tiktok_base: &str,
    ) -> Result<Self, PlatformError> {
        Ok(Self {
            client: settings.build_client()?,
            settings,
            api_key,
            linkedin_base: parse_base_url(linkedin_base)?,
            tiktok_base: parse_base_url(tiktok_base)?,
        })
    }

    /// Fetches a LinkedIn profile and its latest posts.
    ///
    /// Engagement is the total likes across the fetched posts. Top posts are
    /// taken from posts inside `recent`; posts without a parseable timestamp
    /// still count toward totals. LinkedIn exposes no follower history, so the
    /// growth map is a single `current` bucket.
    ///
    /// # Errors
    ///
    /// - [`PlatformError::MissingCredential`] if no RapidAPI key is configured.
    /// - [`PlatformError::Api`] if the profile does not exist.
    /// - [`PlatformError::Status`] / [`PlatformError::Http`] on upstream failure.
    pub async fn fetch_linkedin(
        &self,
        username: &str,
        recent: FetchWindow,
    ) -> Result<MetricsSnapshot, PlatformError> {
        let profile_url = format!("https://www.linkedin.com/in/{username}");

        let profile: LinkedinEnvelope<LinkedinProfile> = {
            let url = join(&self.linkedin_base, "get-linkedin-profile")?;
            let body = self
                .get(
                    Platform::Linkedin,
                    LINKEDIN_HOST,
                    &url,
                    &[("linkedin_url", &profile_url), ("include_skills", "false")],
                )
                .await?;
            decode(body, "get-linkedin-profile")?
        };
        let profile = profile.data.ok_or_else(|| PlatformError::Api {
            platform: Platform::Linkedin,
            message: profile
                .message
                .unwrap_or_else(|| format!("profile '{username}' not found")),
        })?;

        let posts: Vec<LinkedinPost> = {
            let url = join(&self.linkedin_base, "get-profile-posts")?;
            let body = self
                .get(
                    Platform::Linkedin,
                    LINKEDIN_HOST,
                    &url,
                    &[
                        ("linkedin_url", &profile_url),
                        ("start", "0"),
                        ("count", LINKEDIN_POSTS_PAGE),
                    ],
                )
                .await?;
            let envelope: LinkedinEnvelope<Vec<LinkedinPost>> = decode(body, "get-profile-posts")?;
            envelope.data.unwrap_or_default()
        };

        let followers = crate::normalize::first_nonzero(&[profile.connection_count, profile.followers]);
        let total_likes: i64 = posts.iter().map(LinkedinPost::like_count).sum();
        let recent_posts = linkedin_recent_posts(&posts, recent);

        let mut snapshot = MetricsSnapshot::new(
            followers,
            i64::try_from(posts.len()).unwrap_or(i64::MAX),
            total_likes,
            recent.end,
        );
        snapshot.handle = Some(
            profile
                .username
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| username.to_owned()),
        );
        snapshot.total_likes = Some(total_likes);
        snapshot.growth = Some(vec![GrowthBucket {
            bucket: "current".to_owned(),
            followers,
        }]);
        snapshot.top_posts = top_posts(recent_posts, TOP_POSTS_LIMIT);

        tracing::debug!(
            username,
            followers,
            posts = snapshot.posts,
            "linkedin metrics fetched"
        );
        Ok(snapshot)
    }

    /// Fetches TikTok account stats. Engagement is the account's lifetime
    /// heart count.
    ///
    /// # Errors
    ///
    /// - [`PlatformError::MissingCredential`] if no RapidAPI key is configured.
    /// - [`PlatformError::Api`] if the proxy reports a non-zero `code` or no stats.
    /// - [`PlatformError::Status`] / [`PlatformError::Http`] on upstream failure.
    pub async fn fetch_tiktok(
        &self,
        username: &str,
        fetched_at: DateTime<Utc>,
    ) -> Result<MetricsSnapshot, PlatformError> {
        let url = join(&self.tiktok_base, "user/info")?;
        let body = self
            .get(Platform::Tiktok, TIKTOK_HOST, &url, &[("unique_id", username)])
            .await?;
        let envelope: TiktokEnvelope = decode(body, "user/info")?;

        let api_error = |msg: Option<String>| PlatformError::Api {
            platform: Platform::Tiktok,
            message: msg.unwrap_or_else(|| format!("no stats for '{username}'")),
        };
        if envelope.code != 0 {
            return Err(api_error(envelope.msg));
        }
        let info = envelope.data.ok_or_else(|| api_error(None))?;
        let stats = info.stats.ok_or_else(|| api_error(None))?;

        let mut snapshot = MetricsSnapshot::new(
            stats.follower_count,
            stats.video_count,
            stats.heart_count,
            fetched_at,
        );
        snapshot.handle = Some(
            info.user
                .and_then(|u| u.unique_id)
                .unwrap_or_else(|| username.to_owned()),
        );
        snapshot.total_likes = Some(stats.heart_count);

        tracing::debug!(
            username,
            followers = stats.follower_count,
            "tiktok metrics fetched"
        );
        Ok(snapshot)
    }

    async fn get(
        &self,
        platform: Platform,
        host: &str,
        url: &Url,
        query: &[(&str, &str)],
    ) -> Result<serde_json::Value, PlatformError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or(PlatformError::MissingCredential("RAPIDAPI_KEY"))?;
        get_json(&self.settings, platform, url.path(), || {
            self.client
                .get(url.clone())
                .header("X-RapidAPI-Key", key)
                .header("X-RapidAPI-Host", host)
                .query(query)
        })
        .await
    }
}

/// Posts inside `recent`, as top-post candidates. Posts with a missing or
/// unparseable timestamp are skipped.
fn linkedin_recent_posts(posts: &[LinkedinPost], recent: FetchWindow) -> Vec<TopPost> {
    posts
        .iter()
        .filter_map(|post| {
            let posted_at = post.timestamp().and_then(parse_timestamp)?;
            if !recent.contains(posted_at) {
                return None;
            }
            Some(TopPost {
                id: post
                    .urn
                    .clone()
                    .or_else(|| post.id.clone())
                    .unwrap_or_default(),
                text: post.text.clone().unwrap_or_default(),
                engagement: post.like_count(),
                posted_at: Some(posted_at),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn linkedin_post(urn: &str, likes: i64, posted: Option<&str>) -> LinkedinPost {
        serde_json::from_value(serde_json::json!({
            "urn": urn,
            "text": format!("post {urn}"),
            "num_likes": likes,
            "posted": posted,
        }))
        .expect("deserialize")
    }

    #[test]
    fn recent_posts_exclude_old_and_undated() {
        let end = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
        let window = FetchWindow::ending_at(end, 6);
        let posts = vec![
            linkedin_post("new", 10, Some("2025-03-09 09:00:00")),
            linkedin_post("old", 99, Some("2025-02-01 09:00:00")),
            linkedin_post("undated", 50, None),
            linkedin_post("garbled", 40, Some("last week")),
        ];

        let recent = linkedin_recent_posts(&posts, window);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, "new");
        assert_eq!(recent[0].engagement, 10);
    }

    #[test]
    fn reshared_posts_use_repost_time() {
        let post: LinkedinPost = serde_json::from_value(serde_json::json!({
            "urn": "r1",
            "reshared": true,
            "posted": "2024-01-01 00:00:00",
            "reposted": "2025-03-09 00:00:00",
        }))
        .expect("deserialize");
        assert_eq!(post.timestamp(), Some("2025-03-09 00:00:00"));
    }

    #[test]
    fn like_count_falls_back_across_fields() {
        let post: LinkedinPost = serde_json::from_value(serde_json::json!({
            "num_likes": 0,
            "likes": null,
            "reaction_count": 7,
        }))
        .expect("deserialize");
        assert_eq!(post.like_count(), 7);
    }
}
