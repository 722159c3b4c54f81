//! # Pricing Subcommands
//!
//! `cost` prices a known size on a named tier; `empty-ledger` prints the
//! digest every new user's ledger starts from. Neither touches a backend.

use std::io::Write;

use anyhow::Result;
use clap::Args;
use tally_billing::{file_cost, Tier};
use tally_ledger::{Ledger, EMPTY_LEDGER_DIGEST};

/// Arguments for `tally cost`.
#[derive(Args, Debug)]
pub struct CostArgs {
    /// Size in bytes.
    #[arg(long)]
    pub bytes: u64,
    /// Months held.
    #[arg(long, default_value_t = 1)]
    pub months: u32,
    /// Billing tier (free, light, plus, partner).
    #[arg(long)]
    pub tier: String,
}

pub fn run_cost(args: &CostArgs, out: &mut impl Write) -> Result<u8> {
    let tier: Tier = args.tier.parse()?;
    let cost = file_cost(args.bytes, args.months, tier)?;
    writeln!(out, "{cost}")?;
    Ok(0)
}

pub fn run_empty_ledger(out: &mut impl Write) -> Result<u8> {
    let digest = Ledger::empty().digest()?;
    if digest.to_string() != EMPTY_LEDGER_DIGEST {
        anyhow::bail!("empty ledger digest {digest} does not match {EMPTY_LEDGER_DIGEST}");
    }
    writeln!(out, "{digest}")?;
    Ok(0)
}
