//! `lookup` command: live public metrics for a username.

use std::fmt::Write as _;

use socdash_core::{MetricsSnapshot, Platform};
use socdash_platforms::PlatformClients;

fn render(platform: Platform, username: &str, snapshot: &MetricsSnapshot) -> String {
    let mut out = format!(
        "{platform} @{}\n  followers:       {}\n  posts:           {}\n  engagement rate: {:.2}%\n",
        snapshot.handle.as_deref().unwrap_or(username),
        snapshot.followers,
        snapshot.posts,
        snapshot.engagement_rate,
    );
    if let Some(likes) = snapshot.total_likes {
        let _ = writeln!(out, "  total likes:     {likes}");
    }
    if let Some(views) = snapshot.total_views {
        let _ = writeln!(out, "  total views:     {views}");
    }
    for post in &snapshot.top_posts {
        let _ = writeln!(
            out,
            "  top post {}: {} ({} engagements)",
            post.id, post.text, post.engagement
        );
    }
    out
}

/// # Errors
///
/// Returns an error for an unknown platform, a platform that cannot be read
/// by username, or a failed fetch.
pub(crate) async fn run_lookup(
    clients: &PlatformClients,
    platform: &str,
    username: &str,
) -> anyhow::Result<()> {
    let platform: Platform = platform.parse()?;
    let snapshot = socdash_platforms::lookup(clients, platform, username).await?;
    print!("{}", render(platform, username, &snapshot));
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn render_prefers_platform_handle() {
        let mut snapshot = MetricsSnapshot::new(1000, 20, 60, Utc::now());
        snapshot.handle = Some("dancer".to_owned());
        snapshot.total_likes = Some(5000);

        let out = render(Platform::Tiktok, "@Dancer", &snapshot);
        assert!(out.starts_with("tiktok @dancer\n"));
        assert!(out.contains("followers:       1000"));
        assert!(out.contains("total likes:     5000"));
        assert!(!out.contains("total views"));
    }
}
