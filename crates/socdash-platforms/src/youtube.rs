//! Client for the YouTube Data API v3.

use reqwest::{Client, Url};
use socdash_core::{MetricsSnapshot, Platform, TopPost};

use crate::error::PlatformError;
use crate::http::{decode, get_json, join, parse_base_url, HttpSettings};
use crate::normalize::{parse_timestamp, top_posts, FetchWindow, TOP_POSTS_LIMIT};
use crate::types::{SearchItem, YoutubeChannel, YoutubeList, YoutubeVideo};

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3/";
const SEARCH_MAX_RESULTS: &str = "50";

pub struct YoutubeClient {
    client: Client,
    settings: HttpSettings,
    base_url: Url,
}

impl YoutubeClient {
    /// # Errors
    ///
    /// Returns [`PlatformError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(settings: HttpSettings) -> Result<Self, PlatformError> {
        Self::with_base_url(settings, DEFAULT_BASE_URL)
    }

    /// # Errors
    ///
    /// Returns [`PlatformError::Http`] if the `reqwest::Client` cannot be
    /// built, or [`PlatformError::InvalidUrl`] if `base_url` does not parse.
    pub fn with_base_url(settings: HttpSettings, base_url: &str) -> Result<Self, PlatformError> {
        Ok(Self {
            client: settings.build_client()?,
            base_url: parse_base_url(base_url)?,
            settings,
        })
    }

    /// Fetches the authenticated user's channel statistics and the engagement
    /// (likes + comments) of videos published inside `window`.
    ///
    /// # Errors
    ///
    /// - [`PlatformError::NoChannel`] if the token has no channel.
    /// - [`PlatformError::Status`] / [`PlatformError::Http`] on upstream failure.
    /// - [`PlatformError::Deserialize`] if a response has an unexpected shape.
    pub async fn fetch(
        &self,
        access_token: &str,
        window: FetchWindow,
    ) -> Result<MetricsSnapshot, PlatformError> {
        let channel = self.own_channel(access_token).await?;
        let video_ids = self.video_ids(access_token, &channel.id, window).await?;
        let videos = if video_ids.is_empty() {
            tracing::debug!(channel_id = %channel.id, "no videos in window");
            Vec::new()
        } else {
            self.videos(access_token, &video_ids).await?
        };

        let video_engagement = |v: &YoutubeVideo| {
            v.statistics
                .as_ref()
                .map_or(0, |s| s.like_count.unwrap_or(0) + s.comment_count.unwrap_or(0))
        };
        let engagement: i64 = videos.iter().map(video_engagement).sum();
        let likes: i64 = videos
            .iter()
            .filter_map(|v| v.statistics.as_ref().and_then(|s| s.like_count))
            .sum();
        let candidates = videos
            .iter()
            .map(|v| TopPost {
                id: v.id.clone(),
                text: v
                    .snippet
                    .as_ref()
                    .and_then(|s| s.title.clone())
                    .unwrap_or_default(),
                engagement: video_engagement(v),
                posted_at: v
                    .snippet
                    .as_ref()
                    .and_then(|s| s.published_at.as_deref())
                    .and_then(parse_timestamp),
            })
            .collect();

        let stats = channel.statistics.unwrap_or_default();
        let mut snapshot = MetricsSnapshot::new(
            stats.subscriber_count.unwrap_or(0),
            stats.video_count.unwrap_or(0),
            engagement,
            window.end,
        );
        snapshot.handle = channel.snippet.and_then(|s| {
            s.custom_url
                .map(|u| u.trim_start_matches('@').to_owned())
                .or(s.title)
        });
        snapshot.total_views = stats.view_count;
        snapshot.total_likes = Some(likes);
        snapshot.top_posts = top_posts(candidates, TOP_POSTS_LIMIT);

        tracing::debug!(
            channel_id = %channel.id,
            subscribers = snapshot.followers,
            videos_in_window = videos.len(),
            "youtube metrics fetched"
        );
        Ok(snapshot)
    }

    async fn own_channel(&self, token: &str) -> Result<YoutubeChannel, PlatformError> {
        let url = join(&self.base_url, "channels")?;
        let body = self
            .get(&url, token, &[("part", "snippet,statistics"), ("mine", "true")])
            .await?;
        let list: YoutubeList<YoutubeChannel> = decode(body, "channels")?;
        list.items.into_iter().next().ok_or(PlatformError::NoChannel)
    }

    async fn video_ids(
        &self,
        token: &str,
        channel_id: &str,
        window: FetchWindow,
    ) -> Result<Vec<String>, PlatformError> {
        let url = join(&self.base_url, "search")?;
        let after = window.start.to_rfc3339();
        let before = window.end.to_rfc3339();
        let body = self
            .get(
                &url,
                token,
                &[
                    ("part", "id"),
                    ("channelId", channel_id),
                    ("type", "video"),
                    ("maxResults", SEARCH_MAX_RESULTS),
                    ("publishedAfter", &after),
                    ("publishedBefore", &before),
                ],
            )
            .await?;
        let list: YoutubeList<SearchItem> = decode(body, "search")?;
        Ok(list.items.into_iter().filter_map(|i| i.id.video_id).collect())
    }

    async fn videos(&self, token: &str, ids: &[String]) -> Result<Vec<YoutubeVideo>, PlatformError> {
        let url = join(&self.base_url, "videos")?;
        let joined = ids.join(",");
        let body = self
            .get(&url, token, &[("part", "statistics,snippet"), ("id", &joined)])
            .await?;
        Ok(decode::<YoutubeList<YoutubeVideo>>(body, "videos")?.items)
    }

    async fn get(
        &self,
        url: &Url,
        token: &str,
        query: &[(&str, &str)],
    ) -> Result<serde_json::Value, PlatformError> {
        get_json(&self.settings, Platform::Youtube, url.path(), || {
            self.client.get(url.clone()).bearer_auth(token).query(query)
        })
        .await
    }
}
