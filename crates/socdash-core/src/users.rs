use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Role a user signed up with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    Influencer,
    CampaignManager,
}

impl AccountType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AccountType::Influencer => "INFLUENCER",
            AccountType::CampaignManager => "CAMPAIGN_MANAGER",
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INFLUENCER" => Ok(AccountType::Influencer),
            "CAMPAIGN_MANAGER" => Ok(AccountType::CampaignManager),
            _ => Err(CoreError::UnknownAccountType(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    Active,
    Blocked,
    Deleted,
}

impl UserStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            UserStatus::Active => "ACTIVE",
            UserStatus::Blocked => "BLOCKED",
            UserStatus::Deleted => "DELETED",
        }
    }
}

impl FromStr for UserStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(UserStatus::Active),
            "BLOCKED" => Ok(UserStatus::Blocked),
            "DELETED" => Ok(UserStatus::Deleted),
            _ => Err(CoreError::UnknownUserStatus(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_type_parses_wire_values() {
        assert_eq!(
            "CAMPAIGN_MANAGER".parse::<AccountType>(),
            Ok(AccountType::CampaignManager)
        );
        assert!("influencer".parse::<AccountType>().is_err());
    }

    #[test]
    fn account_type_serde_matches_as_str() {
        let json = serde_json::to_string(&AccountType::CampaignManager).unwrap();
        assert_eq!(json, format!("\"{}\"", AccountType::CampaignManager.as_str()));
    }

    #[test]
    fn user_status_round_trips() {
        for status in [UserStatus::Active, UserStatus::Blocked, UserStatus::Deleted] {
            assert_eq!(status.as_str().parse::<UserStatus>(), Ok(status));
        }
    }
}
