//! Billing tiers.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::cost::GIB;
use crate::error::BillingError;

/// Monthly upload limit on the Free tier.
pub const FREE_MONTHLY_LIMIT: u64 = 3 * GIB;

/// Monthly upload limit on every paid tier.
pub const PAID_MONTHLY_LIMIT: u64 = 1024 * GIB;

/// Usage at which a Light account is moved to Plus.
pub const LIGHT_UPGRADE_THRESHOLD: u64 = 100 * GIB;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Light,
    Plus,
    Partner,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Free, Tier::Light, Tier::Plus, Tier::Partner];

    /// Price per GiB-month.
    pub fn price_per_gb(self) -> Amount {
        match self {
            Self::Free => Amount::ZERO,
            Self::Light => Amount::from_micros(220_000),
            Self::Plus => Amount::from_micros(165_000),
            Self::Partner => Amount::from_micros(160_000),
        }
    }

    pub fn monthly_limit(self) -> u64 {
        match self {
            Self::Free => FREE_MONTHLY_LIMIT,
            Self::Light | Self::Plus | Self::Partner => PAID_MONTHLY_LIMIT,
        }
    }

    pub fn is_free(self) -> bool {
        self == Self::Free
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Light => "light",
            Self::Plus => "plus",
            Self::Partner => "partner",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = BillingError;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Tier::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| BillingError::InvalidTier {
                name: s.to_string(),
            })
    }
}
