//! Wire types for the upstream platform APIs.
//!
//! Only the fields the normalizer reads are modelled. Everything optional on
//! the wire is optional here; upstreams routinely omit zero counts.

use serde::{Deserialize, Deserializer};

/// Accepts a JSON number or a numeric string (YouTube sends counts as strings).
fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_i64(),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Graph/Twitter/RapidAPI list envelope: `{ "data": [...] }`.
#[derive(Debug, Deserialize)]
pub struct DataList<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

// ---------------------------------------------------------------------------
// Facebook / Instagram Graph API
// ---------------------------------------------------------------------------

/// One entry of `GET /me/accounts`.
#[derive(Debug, Deserialize)]
pub struct ManagedPage {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Page-scoped token; page endpoints need it instead of the user token.
    #[serde(default)]
    pub access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PageInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub followers_count: Option<i64>,
    #[serde(default)]
    pub instagram_business_account: Option<LinkedInstagram>,
}

#[derive(Debug, Deserialize)]
pub struct LinkedInstagram {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SummaryCount {
    #[serde(default)]
    pub summary: Option<TotalCount>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TotalCount {
    #[serde(default)]
    pub total_count: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct ShareCount {
    #[serde(default)]
    pub count: i64,
}

#[derive(Debug, Deserialize)]
pub struct PagePost {
    pub id: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub created_time: Option<String>,
    #[serde(default)]
    pub shares: Option<ShareCount>,
    #[serde(default)]
    pub likes: Option<SummaryCount>,
    #[serde(default)]
    pub comments: Option<SummaryCount>,
}

impl PagePost {
    #[must_use]
    pub fn like_count(&self) -> i64 {
        summary_total(self.likes.as_ref())
    }

    #[must_use]
    pub fn comment_count(&self) -> i64 {
        summary_total(self.comments.as_ref())
    }

    #[must_use]
    pub fn share_count(&self) -> i64 {
        self.shares.as_ref().map_or(0, |s| s.count)
    }
}

fn summary_total(count: Option<&SummaryCount>) -> i64 {
    count
        .and_then(|c| c.summary.as_ref())
        .map_or(0, |s| s.total_count)
}

/// `GET /{page-or-ig}/insights...`
#[derive(Debug, Deserialize)]
pub struct InsightsResponse {
    #[serde(default)]
    pub data: Vec<InsightMetric>,
}

#[derive(Debug, Deserialize)]
pub struct InsightMetric {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub values: Vec<InsightValue>,
}

#[derive(Debug, Deserialize)]
pub struct InsightValue {
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub value: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct InstagramAccount {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub followers_count: Option<i64>,
    #[serde(default)]
    pub media_count: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct InstagramMedia {
    pub id: String,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub like_count: Option<i64>,
    #[serde(default)]
    pub comments_count: Option<i64>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

// ---------------------------------------------------------------------------
// YouTube Data API v3
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct YoutubeList<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub struct YoutubeChannel {
    pub id: String,
    #[serde(default)]
    pub snippet: Option<ChannelSnippet>,
    #[serde(default)]
    pub statistics: Option<ChannelStatistics>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSnippet {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub custom_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStatistics {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub subscriber_count: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub video_count: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub view_count: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SearchItem {
    pub id: SearchItemId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchItemId {
    #[serde(default)]
    pub video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct YoutubeVideo {
    pub id: String,
    #[serde(default)]
    pub snippet: Option<VideoSnippet>,
    #[serde(default)]
    pub statistics: Option<VideoStatistics>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSnippet {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStatistics {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub like_count: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub comment_count: Option<i64>,
}

// ---------------------------------------------------------------------------
// RapidAPI: fresh-linkedin-profile-data
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct LinkedinEnvelope<T> {
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LinkedinProfile {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub connection_count: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub followers: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct LinkedinPost {
    #[serde(default)]
    pub urn: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub num_likes: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub likes: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub reaction_count: Option<i64>,
    #[serde(default)]
    pub posted: Option<String>,
    #[serde(default)]
    pub reposted: Option<String>,
    #[serde(default)]
    pub reshared: Option<bool>,
}

impl LinkedinPost {
    /// Repost time for reshared posts, else the original post time.
    #[must_use]
    pub fn timestamp(&self) -> Option<&str> {
        match (self.reshared, self.reposted.as_deref()) {
            (Some(true), Some(reposted)) => Some(reposted),
            _ => self.posted.as_deref(),
        }
    }

    #[must_use]
    pub fn like_count(&self) -> i64 {
        crate::normalize::first_nonzero(&[self.num_likes, self.likes, self.reaction_count])
    }
}

// ---------------------------------------------------------------------------
// RapidAPI: tiktok-scraper7
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct TiktokEnvelope {
    pub code: i64,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub data: Option<TiktokUserInfo>,
}

#[derive(Debug, Deserialize)]
pub struct TiktokUserInfo {
    #[serde(default)]
    pub user: Option<TiktokUser>,
    #[serde(default)]
    pub stats: Option<TiktokStats>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TiktokUser {
    #[serde(default)]
    pub unique_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TiktokStats {
    #[serde(default)]
    pub follower_count: i64,
    #[serde(default)]
    pub heart_count: i64,
    #[serde(default)]
    pub video_count: i64,
}

// ---------------------------------------------------------------------------
// Twitter / X API v2
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct TwitterEnvelope<T> {
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<TwitterProblem>,
}

#[derive(Debug, Deserialize)]
pub struct TwitterProblem {
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TwitterUser {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub public_metrics: Option<TwitterUserMetrics>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TwitterUserMetrics {
    #[serde(default)]
    pub followers_count: i64,
    #[serde(default)]
    pub tweet_count: i64,
}

#[derive(Debug, Deserialize)]
pub struct Tweet {
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub public_metrics: Option<TweetMetrics>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TweetMetrics {
    #[serde(default)]
    pub like_count: i64,
    #[serde(default)]
    pub reply_count: i64,
    #[serde(default)]
    pub retweet_count: i64,
    #[serde(default)]
    pub quote_count: i64,
}

impl TweetMetrics {
    #[must_use]
    pub fn engagement(&self) -> i64 {
        self.like_count + self.reply_count + self.retweet_count + self.quote_count
    }
}

// ---------------------------------------------------------------------------
// OAuth token endpoint
// ---------------------------------------------------------------------------

/// RFC 6749 token response, as returned by every supported provider.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub expires_in: Option<i64>,
}
