use serde::{Deserialize, Serialize, Serializer};
use std::str::FromStr;

use crate::error::DomainError;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Free,
    Pro,
    Enterprise,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Free, Tier::Pro, Tier::Enterprise];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Pro => "pro",
            Self::Enterprise => "enterprise",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        value.parse().ok()
    }

    pub fn definition(&self) -> TierDefinition {
        match self {
            Self::Free => TierDefinition {
                tier: Self::Free,
                monthly_quota: Quota::Limited(10),
                manual_review: false,
                price_usd: Some(0),
            },
            Self::Pro => TierDefinition {
                tier: Self::Pro,
                monthly_quota: Quota::Limited(500),
                manual_review: true,
                price_usd: Some(49),
            },
            Self::Enterprise => TierDefinition {
                tier: Self::Enterprise,
                monthly_quota: Quota::Unlimited,
                manual_review: true,
                price_usd: None,
            },
        }
    }
}

impl FromStr for Tier {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "free" => Ok(Self::Free),
            "pro" => Ok(Self::Pro),
            "enterprise" => Ok(Self::Enterprise),
            other => Err(DomainError::InvalidTier(other.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TierDefinition {
    pub tier: Tier,
    pub monthly_quota: Quota,
    pub manual_review: bool,
    pub price_usd: Option<u32>,
}

/// A monthly scan allowance. Serializes as a number, or the literal string
/// `"unlimited"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Quota {
    Limited(u64),
    Unlimited,
}

impl Quota {
    pub fn is_exhausted(&self, used: u64) -> bool {
        match self {
            Self::Limited(limit) => used >= *limit,
            Self::Unlimited => false,
        }
    }

    pub fn remaining(&self, used: u64) -> Quota {
        match self {
            Self::Limited(limit) => Self::Limited(limit.saturating_sub(used)),
            Self::Unlimited => Self::Unlimited,
        }
    }

    pub fn limit(&self) -> Option<u64> {
        match self {
            Self::Limited(limit) => Some(*limit),
            Self::Unlimited => None,
        }
    }
}

impl Serialize for Quota {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Limited(value) => serializer.serialize_u64(*value),
            Self::Unlimited => serializer.serialize_str("unlimited"),
        }
    }
}
