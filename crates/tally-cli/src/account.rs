//! # Account Subcommands
//!
//! `quote`, `commit`, `ledger`, and `register`. Handlers are generic over the
//! store and directory and write their output to `out`, so they run the same
//! against the in-memory backends.

use std::io::Write;

use anyhow::{Context, Result};
use clap::Args;
use tally_billing::{quote_upload, CostCalculator, TierSource, UsageRecord};
use tally_core::{ContentHash, Username};
use tally_directory::UserDirectory;
use tally_ledger::{CallContext, DedupAccountant};
use tally_store::ContentStore;

/// Arguments naming one user.
#[derive(Args, Debug)]
pub struct UserArgs {
    /// Account name.
    pub user: String,
}

/// Arguments naming one user and one upload.
#[derive(Args, Debug)]
pub struct UploadArgs {
    /// Account name.
    pub user: String,
    /// Content hash of the upload root.
    pub hash: String,
}

/// Arguments for `tally quote`.
#[derive(Args, Debug)]
pub struct QuoteArgs {
    #[command(flatten)]
    pub upload: UploadArgs,
    /// Months the upload will be held.
    #[arg(long, default_value_t = 1)]
    pub months: u32,
    /// Bytes already uploaded this month; rejects the quote if the new bytes
    /// would reach the tier's monthly limit.
    #[arg(long)]
    pub used_bytes: Option<u64>,
}

fn parse_user(raw: &str) -> Result<Username> {
    Username::new(raw).with_context(|| format!("invalid username: {raw:?}"))
}

fn parse_hash(raw: &str) -> Result<ContentHash> {
    ContentHash::new(raw).with_context(|| format!("invalid content hash: {raw:?}"))
}

/// Print the dedup-aware byte count and price of an upload as JSON.
pub async fn run_quote<S, D, T>(
    args: &QuoteArgs,
    accountant: &DedupAccountant<S, D>,
    calculator: &CostCalculator<T>,
    ctx: &CallContext,
    out: &mut impl Write,
) -> Result<u8>
where
    S: ContentStore,
    D: UserDirectory,
    T: TierSource,
{
    let user = parse_user(&args.upload.user)?;
    let hash = parse_hash(&args.upload.hash)?;
    let quote = quote_upload(accountant, calculator, ctx, &user, &hash, args.months).await?;
    if let Some(used) = args.used_bytes {
        let mut usage = UsageRecord::new(user, quote.tier);
        usage.current_usage = used;
        quote.check_usage(&usage)?;
    }
    writeln!(out, "{}", serde_json::to_string_pretty(&quote)?)?;
    Ok(0)
}

/// Commit an upload and print the new ledger hash.
pub async fn run_commit<S, D>(
    args: &UploadArgs,
    accountant: &DedupAccountant<S, D>,
    ctx: &CallContext,
    out: &mut impl Write,
) -> Result<u8>
where
    S: ContentStore,
    D: UserDirectory,
{
    let user = parse_user(&args.user)?;
    let hash = parse_hash(&args.hash)?;
    match accountant.update(ctx, &user, &hash).await? {
        Some(ledger) => writeln!(out, "OK: committed {hash} for {user}, ledger={ledger}")?,
        None => writeln!(out, "OK: {hash} already recorded for {user}, ledger unchanged")?,
    }
    Ok(0)
}

/// Print the user's current ledger as JSON.
pub async fn run_ledger<S, D>(
    args: &UserArgs,
    accountant: &DedupAccountant<S, D>,
    ctx: &CallContext,
    out: &mut impl Write,
) -> Result<u8>
where
    S: ContentStore,
    D: UserDirectory,
{
    let user = parse_user(&args.user)?;
    let ledger = accountant.ledger_for(ctx, &user).await?;
    writeln!(out, "{}", serde_json::to_string_pretty(&ledger)?)?;
    Ok(0)
}

/// Create a directory entry for the user.
pub async fn run_register(
    args: &UserArgs,
    directory: &impl UserDirectory,
    out: &mut impl Write,
) -> Result<u8> {
    let user = parse_user(&args.user)?;
    let entry = directory.register(&user).await?;
    match entry.ledger {
        Some(ledger) => writeln!(out, "OK: {user} already registered, ledger={ledger}")?,
        None => writeln!(out, "OK: registered {user}")?,
    }
    Ok(0)
}
