//! Storage cost calculation.
//!
//! `cost = bytes / 2^30 × price_per_gb × hold_months`, evaluated as
//! `bytes × price_micros × months / 2^30` in `u128` and rounded half-up.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tally_core::Username;

use crate::amount::Amount;
use crate::error::BillingError;
use crate::tier::Tier;

/// Bytes in one GiB, the billing unit.
pub const GIB: u64 = 1 << 30;

/// Cost of holding `bytes` for `hold_months` on `tier`.
pub fn file_cost(bytes: u64, hold_months: u32, tier: Tier) -> Result<Amount, BillingError> {
    let price = u128::from(tier.price_per_gb().micros());
    if price == 0 || bytes == 0 || hold_months == 0 {
        return Ok(Amount::ZERO);
    }
    let gib = u128::from(GIB);
    let numerator = u128::from(bytes) * price * u128::from(hold_months);
    let micros = (numerator + gib / 2) / gib;
    u64::try_from(micros)
        .map(Amount::from_micros)
        .map_err(|_| BillingError::Overflow { bytes, hold_months })
}

/// Where a user's tier name comes from.
///
/// Returns the raw stored name; [`CostCalculator`] parses it so that an
/// unknown stored value surfaces as [`BillingError::InvalidTier`].
#[async_trait]
pub trait TierSource: Send + Sync {
    async fn tier_of(&self, username: &Username) -> Result<String, BillingError>;
}

/// In-memory tier table, optionally with a tier for users not listed.
#[derive(Debug, Clone, Default)]
pub struct StaticTierTable {
    tiers: Arc<RwLock<HashMap<Username, String>>>,
    default: Option<String>,
}

impl StaticTierTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tier reported for users with no explicit entry.
    pub fn with_default(mut self, tier: impl Into<String>) -> Self {
        self.default = Some(tier.into());
        self
    }

    pub fn set(&self, username: Username, tier: impl Into<String>) {
        self.tiers.write().insert(username, tier.into());
    }
}

#[async_trait]
impl TierSource for StaticTierTable {
    async fn tier_of(&self, username: &Username) -> Result<String, BillingError> {
        if let Some(tier) = self.tiers.read().get(username) {
            return Ok(tier.clone());
        }
        self.default
            .clone()
            .ok_or_else(|| BillingError::UnknownUser {
                username: username.to_string(),
            })
    }
}

/// Prices uploads for users according to their tier.
#[derive(Debug, Clone)]
pub struct CostCalculator<T> {
    tiers: T,
}

impl<T: TierSource> CostCalculator<T> {
    pub fn new(tiers: T) -> Self {
        Self { tiers }
    }

    pub async fn tier_of(&self, username: &Username) -> Result<Tier, BillingError> {
        let raw = self.tiers.tier_of(username).await?;
        raw.parse().map_err(|e| {
            tracing::warn!(user = %username, tier = %raw, "stored billing tier is not recognised");
            e
        })
    }

    /// Cost of pinning `bytes` for `hold_months` for `username`.
    pub async fn calculate_pin_cost(
        &self,
        username: &Username,
        bytes: u64,
        hold_months: u32,
    ) -> Result<Amount, BillingError> {
        let tier = self.tier_of(username).await?;
        let cost = file_cost(bytes, hold_months, tier)?;
        tracing::debug!(user = %username, %tier, bytes, hold_months, %cost, "pin cost");
        Ok(cost)
    }

    /// Cost of `bytes` for `hold_months` on a known tier.
    pub fn calculate_file_cost(
        &self,
        bytes: u64,
        hold_months: u32,
        tier: Tier,
    ) -> Result<Amount, BillingError> {
        file_cost(bytes, hold_months, tier)
    }
}
