//! Plan tiers, credit balances and credit costs.

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Credits granted to a free user the first time their balance is read.
pub const INITIAL_FREE_CREDITS: i64 = 20;

/// Cost of a title, description or script generation.
pub const TEXT_CREDIT_COST: i64 = 1;

/// Default cost of a thumbnail generation.
pub const DEFAULT_THUMBNAIL_CREDIT_COST: i64 = 5;

/// Subscription tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    Free,
    Premium,
}

impl Plan {
    /// Parse a plan value as found in user metadata or token claims.
    ///
    /// Accepts scoped claim values such as `u:premium`. Anything that does
    /// not name premium is the free plan.
    pub fn from_claim(s: &str) -> Self {
        let value = s.trim();
        let value = value.rsplit(':').next().unwrap_or(value);
        if value.eq_ignore_ascii_case("premium") {
            Plan::Premium
        } else {
            Plan::Free
        }
    }

    /// Get the plan name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Premium => "premium",
        }
    }

    pub fn is_premium(&self) -> bool {
        matches!(self, Plan::Premium)
    }
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user's remaining credits.
///
/// Premium users are `Unlimited`, which serializes as JSON `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Balance {
    Unlimited,
    Limited(i64),
}

impl Balance {
    pub fn is_unlimited(&self) -> bool {
        matches!(self, Balance::Unlimited)
    }

    /// Whether this balance can pay for an operation of the given cost.
    pub fn covers(&self, cost: i64) -> bool {
        match self {
            Balance::Unlimited => true,
            Balance::Limited(credits) => *credits >= cost,
        }
    }

    /// Remaining credits, `None` when unlimited.
    pub fn remaining(&self) -> Option<i64> {
        match self {
            Balance::Unlimited => None,
            Balance::Limited(credits) => Some(*credits),
        }
    }

    /// Credits consumed out of the initial allowance.
    pub fn used(&self) -> i64 {
        match self {
            Balance::Unlimited => 0,
            Balance::Limited(credits) => INITIAL_FREE_CREDITS.saturating_sub(*credits).max(0),
        }
    }
}

impl Serialize for Balance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Balance::Unlimited => serializer.serialize_none(),
            Balance::Limited(credits) => serializer.serialize_i64(*credits),
        }
    }
}

impl<'de> Deserialize<'de> for Balance {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<i64>::deserialize(deserializer)? {
            Some(credits) => Balance::Limited(credits),
            None => Balance::Unlimited,
        })
    }
}

/// Per-feature credit costs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CreditCosts {
    pub text: i64,
    pub thumbnail: i64,
}

impl Default for CreditCosts {
    fn default() -> Self {
        Self {
            text: TEXT_CREDIT_COST,
            thumbnail: DEFAULT_THUMBNAIL_CREDIT_COST,
        }
    }
}
