//! Upload quotes: dedup-aware byte count plus its price.

use serde::Serialize;
use tally_core::{ContentHash, Username};
use tally_directory::UserDirectory;
use tally_ledger::{CallContext, DedupAccountant};
use tally_store::ContentStore;

use crate::amount::Amount;
use crate::cost::{CostCalculator, TierSource};
use crate::error::{BillingError, QuoteError};
use crate::tier::Tier;
use crate::usage::UsageRecord;

/// What an upload would cost a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadQuote {
    pub username: Username,
    pub hash: ContentHash,
    /// Bytes not already covered by the user's ledger.
    pub new_bytes: u64,
    pub hold_months: u32,
    pub tier: Tier,
    pub cost: Amount,
}

impl UploadQuote {
    /// Check the upload against the user's monthly allowance. Only the
    /// deduplicated `new_bytes` count toward the limit.
    pub fn check_usage(&self, usage: &UsageRecord) -> Result<(), BillingError> {
        usage.ensure_can_upload(self.new_bytes)
    }
}

/// Quote `hash` for `user`, pricing only the bytes the ledger does not
/// already cover.
pub async fn quote_upload<S, D, T>(
    accountant: &DedupAccountant<S, D>,
    calculator: &CostCalculator<T>,
    ctx: &CallContext,
    user: &Username,
    hash: &ContentHash,
    hold_months: u32,
) -> Result<UploadQuote, QuoteError>
where
    S: ContentStore,
    D: UserDirectory,
    T: TierSource,
{
    let new_bytes = accountant.quote(ctx, user, hash).await?;
    let tier = calculator.tier_of(user).await?;
    let cost = calculator.calculate_file_cost(new_bytes, hold_months, tier)?;
    Ok(UploadQuote {
        username: user.clone(),
        hash: hash.clone(),
        new_bytes,
        hold_months,
        tier,
        cost,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::{StaticTierTable, GIB};
    use tally_directory::MemoryDirectory;
    use tally_store::MemoryDagStore;

    fn alice() -> Username {
        Username::new("alice").unwrap()
    }

    fn setup(tier: &str) -> (
        DedupAccountant<MemoryDagStore, MemoryDirectory>,
        CostCalculator<StaticTierTable>,
    ) {
        let acct = DedupAccountant::new(
            MemoryDagStore::new(),
            MemoryDirectory::with_users([alice()]),
        );
        let tiers = StaticTierTable::new();
        tiers.set(alice(), tier);
        (acct, CostCalculator::new(tiers))
    }

    #[tokio::test]
    async fn prices_only_new_bytes() {
        let (acct, calc) = setup("light");
        let ctx = CallContext::new();
        let blob = acct.store().add_raw(vec![0u8; 4096]).unwrap();

        let before = quote_upload(&acct, &calc, &ctx, &alice(), &blob, 12).await.unwrap();
        assert_eq!(before.new_bytes, 4096);
        assert_eq!(before.tier, Tier::Light);
        assert_eq!(
            before.cost,
            calc.calculate_file_cost(4096, 12, Tier::Light).unwrap()
        );

        acct.update(&ctx, &alice(), &blob).await.unwrap();
        let after = quote_upload(&acct, &calc, &ctx, &alice(), &blob, 12).await.unwrap();
        assert_eq!(after.new_bytes, 0);
        assert_eq!(after.cost, Amount::ZERO);
    }

    #[tokio::test]
    async fn free_tier_quotes_bytes_at_no_cost() {
        let (acct, calc) = setup("free");
        let ctx = CallContext::new();
        let blob = acct.store().add_raw(vec![0u8; 2048]).unwrap();
        let quote = quote_upload(&acct, &calc, &ctx, &alice(), &blob, 24).await.unwrap();
        assert_eq!(quote.new_bytes, 2048);
        assert_eq!(quote.cost, Amount::ZERO);
    }

    #[tokio::test]
    async fn usage_limit_counts_only_new_bytes() {
        let (acct, calc) = setup("free");
        let ctx = CallContext::new();
        let blob = acct.store().add_raw(vec![0u8; 2048]).unwrap();
        let mut usage = UsageRecord::new(alice(), Tier::Free);
        usage.current_usage = 3 * GIB - 2048;

        let quote = quote_upload(&acct, &calc, &ctx, &alice(), &blob, 1).await.unwrap();
        assert!(matches!(
            quote.check_usage(&usage),
            Err(BillingError::UsageLimitExceeded { requested: 2048, remaining: 2048, .. })
        ));

        usage.current_usage -= 1;
        assert!(quote.check_usage(&usage).is_ok());

        acct.update(&ctx, &alice(), &blob).await.unwrap();
        usage.current_usage = 3 * GIB - 1;
        let again = quote_upload(&acct, &calc, &ctx, &alice(), &blob, 1).await.unwrap();
        assert!(again.check_usage(&usage).is_ok());
    }

    #[tokio::test]
    async fn invalid_tier_fails_the_quote() {
        let (acct, calc) = setup("diamond");
        let ctx = CallContext::new();
        let blob = acct.store().add_raw(vec![1u8; 10]).unwrap();
        let err = quote_upload(&acct, &calc, &ctx, &alice(), &blob, 1)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            QuoteError::Billing(BillingError::InvalidTier { .. })
        ));
    }
}
