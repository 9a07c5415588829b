//! The uniform metrics shape every platform is normalized into.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One point of a growth map: follower count at the end of a time bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrowthBucket {
    pub bucket: String,
    pub followers: i64,
}

/// A recent, highly engaged post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopPost {
    pub id: String,
    pub text: String,
    pub engagement: i64,
    pub posted_at: Option<DateTime<Utc>>,
}

/// Latest metrics for one connected account. Replaced wholesale on refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Handle reported by the platform, when it returns one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    pub followers: i64,
    pub posts: i64,
    pub engagement_rate: f64,
    #[serde(default)]
    pub reach: Option<i64>,
    #[serde(default)]
    pub impressions: Option<i64>,
    #[serde(default)]
    pub shares: Option<i64>,
    #[serde(default)]
    pub total_views: Option<i64>,
    #[serde(default)]
    pub total_likes: Option<i64>,
    #[serde(default)]
    pub growth: Option<Vec<GrowthBucket>>,
    #[serde(default)]
    pub top_posts: Vec<TopPost>,
    pub fetched_at: DateTime<Utc>,
}

impl MetricsSnapshot {
    /// A snapshot with counts and the derived engagement rate, all optional
    /// metrics left empty.
    #[must_use]
    pub fn new(followers: i64, posts: i64, total_engagement: i64, fetched_at: DateTime<Utc>) -> Self {
        Self {
            handle: None,
            followers,
            posts,
            engagement_rate: engagement_rate(total_engagement, followers),
            reach: None,
            impressions: None,
            shares: None,
            total_views: None,
            total_likes: None,
            growth: None,
            top_posts: Vec::new(),
            fetched_at,
        }
    }
}

/// Total engagement as a percentage of followers. Zero when there are no
/// followers.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn engagement_rate(total_engagement: i64, followers: i64) -> f64 {
    if followers <= 0 {
        return 0.0;
    }
    (total_engagement as f64 / followers as f64) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engagement_rate_is_percentage_of_followers() {
        assert!((engagement_rate(50, 1_000) - 5.0).abs() < f64::EPSILON);
        assert!((engagement_rate(3, 2) - 150.0).abs() < f64::EPSILON);
    }

    #[test]
    fn engagement_rate_zero_without_followers() {
        assert!(engagement_rate(500, 0).abs() < f64::EPSILON);
        assert!(engagement_rate(500, -3).abs() < f64::EPSILON);
    }

    #[test]
    fn new_snapshot_derives_rate() {
        let snapshot = MetricsSnapshot::new(200, 12, 10, Utc::now());
        assert!((snapshot.engagement_rate - 5.0).abs() < f64::EPSILON);
        assert!(snapshot.growth.is_none());
        assert!(snapshot.top_posts.is_empty());
    }

    #[test]
    fn snapshot_deserializes_with_missing_optionals() {
        let json = serde_json::json!({
            "followers": 10,
            "posts": 2,
            "engagement_rate": 1.5,
            "fetched_at": "2025-03-01T00:00:00Z"
        });
        let snapshot: MetricsSnapshot = serde_json::from_value(json).expect("deserialize");
        assert_eq!(snapshot.followers, 10);
        assert!(snapshot.reach.is_none());
        assert!(snapshot.top_posts.is_empty());
    }
}
