use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// A third-party social platform an account can be connected to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Facebook,
    Instagram,
    Youtube,
    Linkedin,
    Tiktok,
    Twitter,
}

/// How an account on a platform is linked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectMethod {
    /// An access token obtained through the provider's OAuth flow.
    OAuth,
    /// A public username looked up through a proxy API.
    Username,
    /// Either of the above.
    OAuthOrUsername,
}

impl Platform {
    pub const ALL: [Platform; 6] = [
        Platform::Facebook,
        Platform::Instagram,
        Platform::Youtube,
        Platform::Linkedin,
        Platform::Tiktok,
        Platform::Twitter,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Facebook => "facebook",
            Platform::Instagram => "instagram",
            Platform::Youtube => "youtube",
            Platform::Linkedin => "linkedin",
            Platform::Tiktok => "tiktok",
            Platform::Twitter => "twitter",
        }
    }

    #[must_use]
    pub fn connect_method(self) -> ConnectMethod {
        match self {
            Platform::Facebook | Platform::Instagram | Platform::Youtube => ConnectMethod::OAuth,
            Platform::Linkedin | Platform::Tiktok => ConnectMethod::Username,
            Platform::Twitter => ConnectMethod::OAuthOrUsername,
        }
    }

    /// Whether a public username alone is enough to fetch metrics.
    #[must_use]
    pub fn accepts_username(self) -> bool {
        matches!(
            self.connect_method(),
            ConnectMethod::Username | ConnectMethod::OAuthOrUsername
        )
    }

    /// Whether `username` fits the platform's handle alphabet and length.
    /// Handles end up in upstream URL paths, so anything else is refused.
    #[must_use]
    pub fn is_valid_username(self, username: &str) -> bool {
        let (max_chars, extra): (usize, &[char]) = match self {
            Platform::Twitter => (15, &['_']),
            Platform::Tiktok => (24, &['_', '.']),
            Platform::Instagram => (30, &['_', '.']),
            Platform::Linkedin => (100, &['-', '_']),
            Platform::Facebook | Platform::Youtube => (100, &['-', '_', '.']),
        };
        let len = username.chars().count();
        (1..=max_chars).contains(&len)
            && username
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || extra.contains(&c))
    }

    /// Whether an OAuth access token can be used to fetch metrics.
    #[must_use]
    pub fn accepts_access_token(self) -> bool {
        matches!(
            self.connect_method(),
            ConnectMethod::OAuth | ConnectMethod::OAuthOrUsername
        )
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "facebook" => Ok(Platform::Facebook),
            "instagram" => Ok(Platform::Instagram),
            "youtube" => Ok(Platform::Youtube),
            "linkedin" => Ok(Platform::Linkedin),
            "tiktok" => Ok(Platform::Tiktok),
            "twitter" | "x" => Ok(Platform::Twitter),
            _ => Err(CoreError::UnknownPlatform(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_as_str() {
        for platform in Platform::ALL {
            assert_eq!(platform.as_str().parse::<Platform>(), Ok(platform));
        }
    }

    #[test]
    fn parse_is_case_insensitive_and_accepts_x_alias() {
        assert_eq!("YouTube".parse::<Platform>(), Ok(Platform::Youtube));
        assert_eq!("x".parse::<Platform>(), Ok(Platform::Twitter));
    }

    #[test]
    fn parse_rejects_unknown() {
        assert_eq!(
            "myspace".parse::<Platform>(),
            Err(CoreError::UnknownPlatform("myspace".to_string()))
        );
    }

    #[test]
    fn username_platforms_do_not_take_tokens() {
        assert!(Platform::Tiktok.accepts_username());
        assert!(!Platform::Tiktok.accepts_access_token());
        assert!(Platform::Facebook.accepts_access_token());
        assert!(!Platform::Facebook.accepts_username());
        assert!(Platform::Twitter.accepts_username());
        assert!(Platform::Twitter.accepts_access_token());
    }

    #[test]
    fn usernames_follow_platform_alphabet() {
        assert!(Platform::Twitter.is_valid_username("jack_1"));
        assert!(!Platform::Twitter.is_valid_username("../../me"));
        assert!(!Platform::Twitter.is_valid_username("has.dot"));
        assert!(!Platform::Twitter.is_valid_username(&"a".repeat(16)));
        assert!(Platform::Tiktok.is_valid_username("dance.queen_"));
        assert!(!Platform::Tiktok.is_valid_username("a/b"));
        assert!(Platform::Linkedin.is_valid_username("jane-doe-42"));
        assert!(!Platform::Linkedin.is_valid_username("jane%2Fdoe"));
        assert!(!Platform::Linkedin.is_valid_username(""));
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&Platform::Linkedin).unwrap();
        assert_eq!(json, "\"linkedin\"");
    }
}
