//! # tally-billing — Storage Pricing
//!
//! Turns byte counts into money. Prices are per GiB-month and depend on the
//! user's [`Tier`]; amounts are integer micro-units ([`Amount`]), never
//! floating point.
//!
//! ## Crate Policy
//!
//! - All arithmetic is integer. Intermediate products are computed in `u128`
//!   and rounded half-up to the nearest micro-unit once, at the end.
//! - An unknown tier name is an error, never a default tier.
//! - The Free tier always costs zero.

pub mod amount;
pub mod cost;
pub mod error;
pub mod quote;
pub mod tier;
pub mod usage;

pub use amount::{Amount, MICROS_PER_UNIT};
pub use cost::{file_cost, CostCalculator, StaticTierTable, TierSource, GIB};
pub use error::{BillingError, QuoteError};
pub use quote::{quote_upload, UploadQuote};
pub use tier::Tier;
pub use usage::UsageRecord;
