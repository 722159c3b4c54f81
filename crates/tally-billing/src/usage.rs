//! Monthly upload usage and tier limits.

use serde::{Deserialize, Serialize};
use tally_core::Username;

use crate::error::BillingError;
use crate::tier::{Tier, LIGHT_UPGRADE_THRESHOLD};

/// A user's monthly upload allowance and consumption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub username: Username,
    pub tier: Tier,
    /// Bytes allowed per month.
    pub monthly_limit: u64,
    /// Bytes uploaded so far this month.
    pub current_usage: u64,
}

impl UsageRecord {
    pub fn new(username: Username, tier: Tier) -> Self {
        Self {
            username,
            tier,
            monthly_limit: tier.monthly_limit(),
            current_usage: 0,
        }
    }

    pub fn remaining(&self) -> u64 {
        self.monthly_limit.saturating_sub(self.current_usage)
    }

    /// Whether an upload of `bytes` stays strictly below the monthly limit.
    pub fn can_upload(&self, bytes: u64) -> bool {
        self.current_usage
            .checked_add(bytes)
            .is_some_and(|total| total < self.monthly_limit)
    }

    /// [`can_upload`](Self::can_upload) as a `Result`.
    pub fn ensure_can_upload(&self, bytes: u64) -> Result<(), BillingError> {
        if self.can_upload(bytes) {
            return Ok(());
        }
        Err(BillingError::UsageLimitExceeded {
            username: self.username.to_string(),
            requested: bytes,
            remaining: self.remaining(),
        })
    }

    /// Add `bytes` to this month's usage.
    ///
    /// A Light account that reaches the upgrade threshold is moved to Plus.
    pub fn record_upload(&mut self, bytes: u64) -> Result<(), BillingError> {
        self.ensure_can_upload(bytes)?;
        self.current_usage += bytes;
        if self.tier == Tier::Light && self.current_usage >= LIGHT_UPGRADE_THRESHOLD {
            self.set_tier(Tier::Plus);
            tracing::info!(
                user = %self.username,
                usage = self.current_usage,
                "light account upgraded to plus"
            );
        }
        Ok(())
    }

    /// Change tier, adopting the new tier's limit.
    pub fn set_tier(&mut self, tier: Tier) {
        self.tier = tier;
        self.monthly_limit = tier.monthly_limit();
    }

    /// Start a new billing month.
    pub fn reset(&mut self) {
        self.current_usage = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::GIB;

    fn record(tier: Tier) -> UsageRecord {
        UsageRecord::new(Username::new("alice").unwrap(), tier)
    }

    #[test]
    fn free_tier_limit_is_three_gib() {
        let mut usage = record(Tier::Free);
        assert!(usage.can_upload(2 * GIB));
        usage.record_upload(2 * GIB).unwrap();
        assert!(!usage.can_upload(GIB), "reaching the limit is rejected");
        assert!(usage.can_upload(GIB - 1));
    }

    #[test]
    fn rejected_upload_leaves_usage_untouched() {
        let mut usage = record(Tier::Free);
        let err = usage.record_upload(3 * GIB).unwrap_err();
        assert_eq!(
            err,
            BillingError::UsageLimitExceeded {
                username: "alice".into(),
                requested: 3 * GIB,
                remaining: 3 * GIB,
            }
        );
        assert_eq!(usage.current_usage, 0);
    }

    #[test]
    fn light_upgrades_to_plus_at_threshold() {
        let mut usage = record(Tier::Light);
        usage.record_upload(99 * GIB).unwrap();
        assert_eq!(usage.tier, Tier::Light);
        usage.record_upload(GIB).unwrap();
        assert_eq!(usage.tier, Tier::Plus);
        assert_eq!(usage.monthly_limit, Tier::Plus.monthly_limit());
    }

    #[test]
    fn overflowing_request_is_rejected() {
        let mut usage = record(Tier::Partner);
        usage.record_upload(10).unwrap();
        assert!(!usage.can_upload(u64::MAX));
    }

    #[test]
    fn reset_clears_usage_only() {
        let mut usage = record(Tier::Plus);
        usage.record_upload(GIB).unwrap();
        usage.reset();
        assert_eq!(usage.current_usage, 0);
        assert_eq!(usage.tier, Tier::Plus);
    }
}
