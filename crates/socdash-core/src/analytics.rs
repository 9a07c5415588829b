//! Cross-platform aggregation of connected-account snapshots for dashboard
//! display.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{GrowthBucket, MetricsSnapshot, Platform, TopPost};

/// Aggregator input: one connected account and whatever was last fetched for it.
#[derive(Debug, Clone)]
pub struct AccountMetrics {
    pub account_id: Uuid,
    pub platform: Platform,
    pub handle: String,
    pub snapshot: Option<MetricsSnapshot>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformSummary {
    pub account_id: Uuid,
    pub platform: Platform,
    pub handle: String,
    pub followers: i64,
    pub posts: i64,
    pub engagement_rate: f64,
    pub metrics_updated_at: Option<DateTime<Utc>>,
}

/// One row of the audience-growth table: a bucket and the follower count
/// of every platform that reported it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthRow {
    pub bucket: String,
    pub platforms: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub connected_accounts: usize,
    pub total_followers: i64,
    pub total_posts: i64,
    pub average_engagement_rate: f64,
    pub total_reach: i64,
    pub total_impressions: i64,
    pub total_shares: i64,
    pub platforms: Vec<PlatformSummary>,
    pub audience_growth: Vec<GrowthRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformView {
    pub account_id: Uuid,
    pub platform: Platform,
    pub handle: String,
    pub followers: i64,
    pub posts: i64,
    pub engagement_rate: f64,
    pub reach: Option<i64>,
    pub impressions: Option<i64>,
    pub shares: Option<i64>,
    pub total_views: Option<i64>,
    pub total_likes: Option<i64>,
    pub growth: Vec<GrowthBucket>,
    pub top_posts: Vec<TopPost>,
    pub metrics_updated_at: Option<DateTime<Utc>>,
}

/// Compute cross-platform totals and averages.
///
/// Accounts without a snapshot count toward `connected_accounts` and appear
/// in `platforms` with zeroes, but are excluded from the engagement average.
#[must_use]
pub fn overview(accounts: &[AccountMetrics]) -> Overview {
    let mut sorted: Vec<&AccountMetrics> = accounts.iter().collect();
    sorted.sort_by_key(|a| a.platform);

    let mut total_followers = 0_i64;
    let mut total_posts = 0_i64;
    let mut total_reach = 0_i64;
    let mut total_impressions = 0_i64;
    let mut total_shares = 0_i64;
    let mut rate_sum = 0.0_f64;
    let mut rated = 0_u32;
    let mut platforms = Vec::with_capacity(sorted.len());

    for account in &sorted {
        let (followers, posts, rate) = match &account.snapshot {
            Some(s) => {
                total_reach += s.reach.unwrap_or(0);
                total_impressions += s.impressions.unwrap_or(0);
                total_shares += s.shares.unwrap_or(0);
                rate_sum += s.engagement_rate;
                rated += 1;
                (s.followers, s.posts, s.engagement_rate)
            }
            None => (0, 0, 0.0),
        };
        total_followers += followers;
        total_posts += posts;

        platforms.push(PlatformSummary {
            account_id: account.account_id,
            platform: account.platform,
            handle: account.handle.clone(),
            followers,
            posts,
            engagement_rate: rate,
            metrics_updated_at: account.updated_at,
        });
    }

    let average_engagement_rate = if rated == 0 {
        0.0
    } else {
        rate_sum / f64::from(rated)
    };

    Overview {
        connected_accounts: sorted.len(),
        total_followers,
        total_posts,
        average_engagement_rate,
        total_reach,
        total_impressions,
        total_shares,
        platforms,
        audience_growth: audience_growth(&sorted),
    }
}

/// Merge every account's growth map into one table keyed by bucket label,
/// preserving the order in which buckets first appear.
fn audience_growth(accounts: &[&AccountMetrics]) -> Vec<GrowthRow> {
    let mut rows: Vec<GrowthRow> = Vec::new();

    for account in accounts {
        let Some(growth) = account.snapshot.as_ref().and_then(|s| s.growth.as_ref()) else {
            continue;
        };
        for point in growth {
            let row = match rows.iter().position(|r| r.bucket == point.bucket) {
                Some(idx) => &mut rows[idx],
                None => {
                    rows.push(GrowthRow {
                        bucket: point.bucket.clone(),
                        platforms: BTreeMap::new(),
                    });
                    let last = rows.len() - 1;
                    &mut rows[last]
                }
            };
            row.platforms
                .insert(account.platform.as_str().to_string(), point.followers);
        }
    }

    rows
}

/// Flatten one account's snapshot for a single-platform analytics page.
#[must_use]
pub fn platform_view(account: &AccountMetrics) -> PlatformView {
    let snapshot = account.snapshot.as_ref();
    PlatformView {
        account_id: account.account_id,
        platform: account.platform,
        handle: account.handle.clone(),
        followers: snapshot.map_or(0, |s| s.followers),
        posts: snapshot.map_or(0, |s| s.posts),
        engagement_rate: snapshot.map_or(0.0, |s| s.engagement_rate),
        reach: snapshot.and_then(|s| s.reach),
        impressions: snapshot.and_then(|s| s.impressions),
        shares: snapshot.and_then(|s| s.shares),
        total_views: snapshot.and_then(|s| s.total_views),
        total_likes: snapshot.and_then(|s| s.total_likes),
        growth: snapshot
            .and_then(|s| s.growth.clone())
            .unwrap_or_default(),
        top_posts: snapshot.map(|s| s.top_posts.clone()).unwrap_or_default(),
        metrics_updated_at: account.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(followers: i64, posts: i64, rate: f64) -> MetricsSnapshot {
        MetricsSnapshot {
            handle: None,
            followers,
            posts,
            engagement_rate: rate,
            reach: None,
            impressions: None,
            shares: None,
            total_views: None,
            total_likes: None,
            growth: None,
            top_posts: Vec::new(),
            fetched_at: Utc::now(),
        }
    }

    fn account(platform: Platform, snapshot: Option<MetricsSnapshot>) -> AccountMetrics {
        AccountMetrics {
            account_id: Uuid::new_v4(),
            platform,
            handle: format!("{platform}-handle"),
            snapshot,
            updated_at: None,
        }
    }

    #[test]
    fn overview_of_nothing_is_zeroed() {
        let o = overview(&[]);
        assert_eq!(o.connected_accounts, 0);
        assert_eq!(o.total_followers, 0);
        assert!(o.average_engagement_rate.abs() < f64::EPSILON);
        assert!(o.platforms.is_empty());
        assert!(o.audience_growth.is_empty());
    }

    #[test]
    fn overview_sums_and_averages() {
        let mut fb = snapshot(1_000, 10, 2.0);
        fb.reach = Some(300);
        fb.shares = Some(7);
        let mut ig = snapshot(500, 4, 4.0);
        ig.reach = Some(200);
        ig.impressions = Some(900);

        let o = overview(&[
            account(Platform::Instagram, Some(ig)),
            account(Platform::Facebook, Some(fb)),
        ]);

        assert_eq!(o.connected_accounts, 2);
        assert_eq!(o.total_followers, 1_500);
        assert_eq!(o.total_posts, 14);
        assert!((o.average_engagement_rate - 3.0).abs() < f64::EPSILON);
        assert_eq!(o.total_reach, 500);
        assert_eq!(o.total_impressions, 900);
        assert_eq!(o.total_shares, 7);
        assert_eq!(o.platforms[0].platform, Platform::Facebook);
        assert_eq!(o.platforms[1].platform, Platform::Instagram);
    }

    #[test]
    fn accounts_without_snapshot_are_excluded_from_average() {
        let o = overview(&[
            account(Platform::Tiktok, Some(snapshot(100, 1, 6.0))),
            account(Platform::Linkedin, None),
        ]);
        assert_eq!(o.connected_accounts, 2);
        assert!((o.average_engagement_rate - 6.0).abs() < f64::EPSILON);
        let linkedin = o
            .platforms
            .iter()
            .find(|p| p.platform == Platform::Linkedin)
            .expect("linkedin row");
        assert_eq!(linkedin.followers, 0);
    }

    #[test]
    fn audience_growth_merges_buckets_across_platforms() {
        let mut fb = snapshot(120, 0, 0.0);
        fb.growth = Some(vec![
            GrowthBucket { bucket: "week1".into(), followers: 100 },
            GrowthBucket { bucket: "week2".into(), followers: 120 },
        ]);
        let mut ig = snapshot(60, 0, 0.0);
        ig.growth = Some(vec![GrowthBucket { bucket: "week2".into(), followers: 60 }]);

        let o = overview(&[
            account(Platform::Facebook, Some(fb)),
            account(Platform::Instagram, Some(ig)),
        ]);

        assert_eq!(o.audience_growth.len(), 2);
        assert_eq!(o.audience_growth[0].bucket, "week1");
        assert_eq!(o.audience_growth[0].platforms.get("facebook"), Some(&100));
        assert!(o.audience_growth[0].platforms.get("instagram").is_none());
        assert_eq!(o.audience_growth[1].platforms.get("instagram"), Some(&60));
    }

    #[test]
    fn platform_view_defaults_without_snapshot() {
        let view = platform_view(&account(Platform::Youtube, None));
        assert_eq!(view.followers, 0);
        assert!(view.growth.is_empty());
        assert!(view.top_posts.is_empty());
        assert!(view.reach.is_none());
    }

    #[test]
    fn platform_view_copies_snapshot_fields() {
        let mut s = snapshot(42, 3, 1.25);
        s.total_views = Some(9_000);
        s.top_posts = vec![TopPost {
            id: "p1".into(),
            text: "hello".into(),
            engagement: 5,
            posted_at: None,
        }];
        let view = platform_view(&account(Platform::Youtube, Some(s)));
        assert_eq!(view.followers, 42);
        assert_eq!(view.total_views, Some(9_000));
        assert_eq!(view.top_posts.len(), 1);
    }
}
