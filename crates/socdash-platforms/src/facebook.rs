//! Client for the Facebook Graph API, covering both Facebook pages and the
//! Instagram business accounts linked to them.
//!
//! Every call starts from the user token: `/me/accounts` yields the managed
//! page and a page-scoped token, and all further calls use the page token.

use reqwest::{Client, Url};
use socdash_core::{MetricsSnapshot, Platform, TopPost};

use crate::error::PlatformError;
use crate::http::{decode, get_json, join, parse_base_url, HttpSettings};
use crate::normalize::{
    insight_series, parse_timestamp, sum_insight_values, top_posts, weekly_growth, FetchWindow,
    TOP_POSTS_LIMIT,
};
use crate::types::{
    DataList, InsightsResponse, InstagramAccount, InstagramMedia, ManagedPage, PageInfo, PagePost,
};

const DEFAULT_BASE_URL: &str = "https://graph.facebook.com/v18.0/";
const PAGE_POST_FIELDS: &str =
    "id,message,created_time,shares,likes.summary(true),comments.summary(true)";
const PAGE_FIELDS: &str = "followers_count,name,instagram_business_account{id,username}";
const PAGE_LIMIT: &str = "100";

/// Client for the Graph API. Use [`GraphClient::new`] for production or
/// [`GraphClient::with_base_url`] to point at a mock server in tests.
pub struct GraphClient {
    client: Client,
    settings: HttpSettings,
    base_url: Url,
}

/// A managed page together with the token scoped to it.
struct PageAccess {
    id: String,
    token: String,
}

impl GraphClient {
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

    /// Fetches the metrics of the first page the user manages.
    ///
    /// Followers come from the page, posts and engagement (likes + comments +
    /// shares) from the page's posts inside `window`, impressions and the
    /// weekly growth map from page insights.
    ///
    /// # Errors
    ///
    /// - [`PlatformError::NoPage`] if the user manages no page.
    /// - [`PlatformError::Status`] / [`PlatformError::Http`] on upstream failure.
    /// - [`PlatformError::Deserialize`] if a response has an unexpected shape.
    pub async fn fetch_facebook(
        &self,
        user_token: &str,
        window: FetchWindow,
    ) -> Result<MetricsSnapshot, PlatformError> {
        let page = self.first_page(Platform::Facebook, user_token).await?;
        let info = self.page_info(Platform::Facebook, &page).await?;
        let posts = self.page_posts(&page, window).await?;
        let impressions = self.insights(&page, "page_impressions", window).await?;
        let fans = self.insights(&page, "page_fans", window).await?;

        let engagement: i64 = posts
            .iter()
            .map(|p| p.like_count() + p.comment_count() + p.share_count())
            .sum();
        let shares: i64 = posts.iter().map(PagePost::share_count).sum();
        let candidates = posts
            .iter()
            .map(|p| TopPost {
                id: p.id.clone(),
                text: p.message.clone().unwrap_or_default(),
                engagement: p.like_count() + p.comment_count() + p.share_count(),
                posted_at: p.created_time.as_deref().and_then(parse_timestamp),
            })
            .collect();

        let followers = info.followers_count.unwrap_or(0);
        let mut snapshot = MetricsSnapshot::new(
            followers,
            i64::try_from(posts.len()).unwrap_or(i64::MAX),
            engagement,
            window.end,
        );
        snapshot.handle = info.name;
        snapshot.shares = Some(shares);
        snapshot.impressions = Some(sum_insight_values(&impressions));
        snapshot.growth = Some(weekly_growth(&insight_series(&fans), window.start));
        snapshot.top_posts = top_posts(candidates, TOP_POSTS_LIMIT);

        tracing::debug!(
            page_id = %page.id,
            followers,
            posts = snapshot.posts,
            "facebook metrics fetched"
        );
        Ok(snapshot)
    }

    /// Fetches the metrics of the Instagram business account linked to the
    /// user's first page.
    ///
    /// # Errors
    ///
    /// - [`PlatformError::NoPage`] if the user manages no page.
    /// - [`PlatformError::NoLinkedAccount`] if the page has no Instagram
    ///   business account.
    /// - [`PlatformError::Status`] / [`PlatformError::Http`] on upstream failure.
    /// - [`PlatformError::Deserialize`] if a response has an unexpected shape.
    pub async fn fetch_instagram(
        &self,
        user_token: &str,
        window: FetchWindow,
    ) -> Result<MetricsSnapshot, PlatformError> {
        let page = self.first_page(Platform::Instagram, user_token).await?;
        let info = self.page_info(Platform::Instagram, &page).await?;
        let linked = info
            .instagram_business_account
            .ok_or(PlatformError::NoLinkedAccount)?;

        let account: InstagramAccount = {
            let url = join(&self.base_url, &linked.id)?;
            let body = self
                .get(
                    Platform::Instagram,
                    &url,
                    &page.token,
                    &[("fields", "followers_count,media_count,username")],
                )
                .await?;
            decode(body, "instagram account")?
        };

        let media: Vec<InstagramMedia> = {
            let url = join(&self.base_url, &format!("{}/media", linked.id))?;
            let since = window.start.timestamp().to_string();
            let until = window.end.timestamp().to_string();
            let body = self
                .get(
                    Platform::Instagram,
                    &url,
                    &page.token,
                    &[
                        ("fields", "id,caption,like_count,comments_count,timestamp"),
                        ("since", &since),
                        ("until", &until),
                        ("limit", PAGE_LIMIT),
                    ],
                )
                .await?;
            decode::<DataList<InstagramMedia>>(body, "instagram media")?.data
        };

        let reach = {
            let url = join(&self.base_url, &format!("{}/insights", linked.id))?;
            let since = window.start.timestamp().to_string();
            let until = window.end.timestamp().to_string();
            let body = self
                .get(
                    Platform::Instagram,
                    &url,
                    &page.token,
                    &[
                        ("metric", "reach"),
                        ("period", "day"),
                        ("since", &since),
                        ("until", &until),
                    ],
                )
                .await?;
            sum_insight_values(&decode::<InsightsResponse>(body, "instagram insights")?)
        };

        let media_engagement =
            |m: &InstagramMedia| m.like_count.unwrap_or(0) + m.comments_count.unwrap_or(0);
        let engagement: i64 = media.iter().map(media_engagement).sum();
        let likes: i64 = media.iter().map(|m| m.like_count.unwrap_or(0)).sum();
        let candidates = media
            .iter()
            .map(|m| TopPost {
                id: m.id.clone(),
                text: m.caption.clone().unwrap_or_default(),
                engagement: media_engagement(m),
                posted_at: m.timestamp.as_deref().and_then(parse_timestamp),
            })
            .collect();

        let mut snapshot = MetricsSnapshot::new(
            account.followers_count.unwrap_or(0),
            account.media_count.unwrap_or(0),
            engagement,
            window.end,
        );
        snapshot.handle = account.username.or(linked.username);
        snapshot.reach = Some(reach);
        snapshot.total_likes = Some(likes);
        snapshot.top_posts = top_posts(candidates, TOP_POSTS_LIMIT);

        tracing::debug!(
            instagram_id = %linked.id,
            followers = snapshot.followers,
            "instagram metrics fetched"
        );
        Ok(snapshot)
    }

    async fn first_page(
        &self,
        platform: Platform,
        user_token: &str,
    ) -> Result<PageAccess, PlatformError> {
        let url = join(&self.base_url, "me/accounts")?;
        let body = self.get(platform, &url, user_token, &[]).await?;
        let pages: DataList<ManagedPage> = decode(body, "me/accounts")?;
        let page = pages.data.into_iter().next().ok_or(PlatformError::NoPage)?;
        tracing::debug!(page_id = %page.id, page_name = ?page.name, "using first managed page");
        Ok(PageAccess {
            token: page.access_token.unwrap_or_else(|| user_token.to_owned()),
            id: page.id,
        })
    }

    async fn page_info(
        &self,
        platform: Platform,
        page: &PageAccess,
    ) -> Result<PageInfo, PlatformError> {
        let url = join(&self.base_url, &page.id)?;
        let body = self
            .get(platform, &url, &page.token, &[("fields", PAGE_FIELDS)])
            .await?;
        decode(body, "page info")
    }

    async fn page_posts(
        &self,
        page: &PageAccess,
        window: FetchWindow,
    ) -> Result<Vec<PagePost>, PlatformError> {
        let url = join(&self.base_url, &format!("{}/posts", page.id))?;
        let since = window.start.timestamp().to_string();
        let until = window.end.timestamp().to_string();
        let body = self
            .get(
                Platform::Facebook,
                &url,
                &page.token,
                &[
                    ("fields", PAGE_POST_FIELDS),
                    ("since", &since),
                    ("until", &until),
                    ("limit", PAGE_LIMIT),
                ],
            )
            .await?;
        Ok(decode::<DataList<PagePost>>(body, "page posts")?.data)
    }

    async fn insights(
        &self,
        page: &PageAccess,
        metric: &str,
        window: FetchWindow,
    ) -> Result<InsightsResponse, PlatformError> {
        let url = join(&self.base_url, &format!("{}/insights/{metric}", page.id))?;
        let since = window.start.timestamp().to_string();
        let until = window.end.timestamp().to_string();
        let body = self
            .get(
                Platform::Facebook,
                &url,
                &page.token,
                &[("period", "day"), ("since", &since), ("until", &until)],
            )
            .await?;
        decode(body, metric)
    }

    /// `platform` tags errors, since Instagram is read through the same API.
    async fn get(
        &self,
        platform: Platform,
        url: &Url,
        token: &str,
        query: &[(&str, &str)],
    ) -> Result<serde_json::Value, PlatformError> {
        get_json(&self.settings, platform, url.path(), || {
            self.client
                .get(url.clone())
                .query(&[("access_token", token)])
                .query(query)
        })
        .await
    }
}
