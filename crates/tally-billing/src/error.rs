//! Billing error types.

use tally_ledger::AccountingError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BillingError {
    /// The stored tier name is not a known tier.
    #[error("invalid billing tier {name:?}")]
    InvalidTier { name: String },

    /// The cost does not fit in an [`Amount`](crate::Amount).
    #[error("cost of {bytes} bytes for {hold_months} months overflows")]
    Overflow { bytes: u64, hold_months: u32 },

    /// The tier source has no record of the user.
    #[error("no billing tier recorded for {username}")]
    UnknownUser { username: String },

    /// Looking the tier up failed.
    #[error("tier lookup for {username} failed: {reason}")]
    TierLookup { username: String, reason: String },

    /// The upload would reach the user's monthly limit.
    #[error("upload of {requested} bytes exceeds the monthly limit for {username} ({remaining} bytes remaining)")]
    UsageLimitExceeded {
        username: String,
        requested: u64,
        remaining: u64,
    },
}

/// Failure to produce an upload quote.
#[derive(Error, Debug)]
pub enum QuoteError {
    #[error(transparent)]
    Accounting(#[from] AccountingError),

    #[error(transparent)]
    Billing(#[from] BillingError),
}
