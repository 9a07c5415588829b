//! Pure helpers that turn raw platform payloads into [`MetricsSnapshot`]
//! fields.
//!
//! [`MetricsSnapshot`]: socdash_core::MetricsSnapshot

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use socdash_core::{GrowthBucket, TopPost};

use crate::types::InsightsResponse;

/// Maximum characters of post text kept in a [`TopPost`].
pub const TOP_POST_TEXT_CHARS: usize = 50;

/// Number of top posts kept per snapshot.
pub const TOP_POSTS_LIMIT: usize = 3;

const GROWTH_BUCKET_DAYS: i64 = 7;

/// A closed time range `[start, end]` used for windowed upstream queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl FetchWindow {
    /// The `days` days ending at `end`.
    #[must_use]
    pub fn ending_at(end: DateTime<Utc>, days: u32) -> Self {
        Self {
            start: end - Duration::days(i64::from(days)),
            end,
        }
    }

    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at <= self.end
    }
}

/// Buckets a day-granular follower series into consecutive 7-day buckets
/// starting at `window_start`, labelled `week1`, `week2`, ...
///
/// Each bucket holds the last observed value that falls inside it. A bucket
/// with no samples carries the previous bucket's value forward. Samples
/// before `window_start` are ignored, and leading buckets with nothing to
/// carry are omitted (labels stay positional). An empty series yields an
/// empty map.
#[must_use]
pub fn weekly_growth(
    series: &[(DateTime<Utc>, i64)],
    window_start: DateTime<Utc>,
) -> Vec<GrowthBucket> {
    let mut in_window: Vec<(i64, DateTime<Utc>, i64)> = series
        .iter()
        .filter(|(at, _)| *at >= window_start)
        .map(|&(at, value)| ((at - window_start).num_days() / GROWTH_BUCKET_DAYS, at, value))
        .collect();
    if in_window.is_empty() {
        return Vec::new();
    }
    in_window.sort_by_key(|&(_, at, _)| at);

    let last_bucket = in_window.iter().map(|&(idx, _, _)| idx).max().unwrap_or(0);
    let mut buckets = Vec::new();
    let mut carried: Option<i64> = None;
    let mut samples = in_window.iter().peekable();

    for idx in 0..=last_bucket {
        while let Some(&(_, _, value)) = samples.next_if(|&&(i, _, _)| i == idx) {
            carried = Some(value);
        }
        if let Some(followers) = carried {
            buckets.push(GrowthBucket {
                bucket: format!("week{}", idx + 1),
                followers,
            });
        }
    }

    buckets
}

/// Sorts posts by engagement (descending, stable on ties), keeps `limit`, and
/// truncates each post's text to [`TOP_POST_TEXT_CHARS`] characters.
#[must_use]
pub fn top_posts(mut posts: Vec<TopPost>, limit: usize) -> Vec<TopPost> {
    posts.sort_by(|a, b| b.engagement.cmp(&a.engagement));
    posts.truncate(limit);
    for post in &mut posts {
        post.text = truncate_text(&post.text, TOP_POST_TEXT_CHARS);
    }
    posts
}

/// Truncates on a char boundary.
#[must_use]
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Sums the integer values of the first metric in a Graph insights response.
/// Non-numeric values are skipped; a response with no metric sums to zero.
#[must_use]
pub fn sum_insight_values(insights: &InsightsResponse) -> i64 {
    insights
        .data
        .first()
        .map_or(0, |metric| {
            metric
                .values
                .iter()
                .filter_map(|v| v.value.as_i64())
                .sum()
        })
}

/// The first metric of an insights response as a `(time, value)` series.
#[must_use]
pub fn insight_series(insights: &InsightsResponse) -> Vec<(DateTime<Utc>, i64)> {
    insights
        .data
        .first()
        .map(|metric| {
            metric
                .values
                .iter()
                .filter_map(|v| {
                    let at = parse_timestamp(v.end_time.as_deref()?)?;
                    Some((at, v.value.as_i64()?))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Parses the timestamp shapes the supported platforms emit: RFC 3339,
/// Graph's `2025-03-01T08:00:00+0000`, and a naive `2025-03-01 08:00:00`
/// taken as UTC.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// First value that is present and non-zero, else zero.
pub(crate) fn first_nonzero(values: &[Option<i64>]) -> i64 {
    values
        .iter()
        .flatten()
        .copied()
        .find(|&v| v != 0)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::types::{InsightMetric, InsightValue};

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, d, 8, 0, 0).unwrap()
    }

    fn post(id: &str, engagement: i64) -> TopPost {
        TopPost {
            id: id.to_owned(),
            text: format!("post {id}"),
            engagement,
            posted_at: None,
        }
    }

    fn insights(values: Vec<(Option<&str>, serde_json::Value)>) -> InsightsResponse {
        InsightsResponse {
            data: vec![InsightMetric {
                name: Some("page_fans".to_owned()),
                values: values
                    .into_iter()
                    .map(|(end_time, value)| InsightValue {
                        end_time: end_time.map(str::to_owned),
                        value,
                    })
                    .collect(),
            }],
        }
    }

    #[test]
    fn weekly_growth_of_empty_series_is_empty() {
        assert!(weekly_growth(&[], day(1)).is_empty());
    }

    #[test]
    fn weekly_growth_keeps_last_value_per_bucket() {
        let series = [(day(1), 100), (day(3), 105), (day(8), 110), (day(14), 118)];
        let growth = weekly_growth(&series, day(1));
        assert_eq!(
            growth,
            vec![
                GrowthBucket { bucket: "week1".into(), followers: 105 },
                GrowthBucket { bucket: "week2".into(), followers: 118 },
            ]
        );
    }

    #[test]
    fn weekly_growth_bucket_boundary_is_seven_days() {
        // day 7 is 6 days after start (week1); day 8 is exactly 7 days (week2).
        let series = [(day(7), 10), (day(8), 20)];
        let growth = weekly_growth(&series, day(1));
        assert_eq!(growth[0].followers, 10);
        assert_eq!(growth[1].bucket, "week2");
        assert_eq!(growth[1].followers, 20);
    }

    #[test]
    fn weekly_growth_carries_value_over_empty_bucket() {
        let series = [(day(2), 50), (day(22), 70)];
        let growth = weekly_growth(&series, day(1));
        let labels: Vec<_> = growth.iter().map(|b| (b.bucket.as_str(), b.followers)).collect();
        assert_eq!(labels, vec![("week1", 50), ("week2", 50), ("week3", 50), ("week4", 70)]);
    }

    #[test]
    fn weekly_growth_ignores_samples_before_window() {
        let start = day(10);
        let series = [(day(1), 999), (day(11), 40)];
        let growth = weekly_growth(&series, start);
        assert_eq!(growth.len(), 1);
        assert_eq!(growth[0].followers, 40);
    }

    #[test]
    fn weekly_growth_sorts_unordered_input() {
        let series = [(day(5), 30), (day(2), 10)];
        let growth = weekly_growth(&series, day(1));
        assert_eq!(growth[0].followers, 30);
    }

    #[test]
    fn weekly_growth_omits_leading_empty_buckets() {
        let growth = weekly_growth(&[(day(16), 12)], day(1));
        assert_eq!(
            growth,
            vec![GrowthBucket { bucket: "week3".into(), followers: 12 }]
        );
    }

    #[test]
    fn top_posts_sorts_by_engagement_and_limits() {
        let posts = vec![post("a", 5), post("b", 50), post("c", 20), post("d", 1)];
        let top = top_posts(posts, 3);
        let ids: Vec<_> = top.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[test]
    fn top_posts_is_stable_on_ties() {
        let posts = vec![post("first", 7), post("second", 7), post("third", 7)];
        let top = top_posts(posts, 2);
        assert_eq!(top[0].id, "first");
        assert_eq!(top[1].id, "second");
    }

    #[test]
    fn top_posts_truncates_text_on_char_boundary() {
        let mut long = post("x", 1);
        long.text = "é".repeat(80);
        let top = top_posts(vec![long], 3);
        assert_eq!(top[0].text.chars().count(), TOP_POST_TEXT_CHARS);
    }

    #[test]
    fn sum_insight_values_adds_numeric_values() {
        let response = insights(vec![
            (None, serde_json::json!(10)),
            (None, serde_json::json!(15)),
            (None, serde_json::json!({"nested": 1})),
        ]);
        assert_eq!(sum_insight_values(&response), 25);
        assert_eq!(sum_insight_values(&InsightsResponse { data: vec![] }), 0);
    }

    #[test]
    fn insight_series_parses_graph_timestamps() {
        let response = insights(vec![
            (Some("2025-03-02T08:00:00+0000"), serde_json::json!(100)),
            (None, serde_json::json!(101)),
        ]);
        let series = insight_series(&response);
        assert_eq!(series, vec![(day(2), 100)]);
    }

    #[test]
    fn parse_timestamp_accepts_supported_shapes() {
        assert_eq!(parse_timestamp("2025-03-02T08:00:00Z"), Some(day(2)));
        assert_eq!(parse_timestamp("2025-03-02T08:00:00+0000"), Some(day(2)));
        assert_eq!(parse_timestamp("2025-03-02 08:00:00"), Some(day(2)));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn fetch_window_contains_its_bounds() {
        let window = FetchWindow::ending_at(day(10), 6);
        assert_eq!(window.start, day(4));
        assert!(window.contains(day(4)));
        assert!(window.contains(day(10)));
        assert!(!window.contains(day(3)));
    }

    #[test]
    fn first_nonzero_skips_missing_and_zero() {
        assert_eq!(first_nonzero(&[None, Some(0), Some(12), Some(4)]), 12);
        assert_eq!(first_nonzero(&[None, None]), 0);
    }
}
