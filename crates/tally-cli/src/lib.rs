//! # tally-cli — Command-line Interface
//!
//! Provides the `tally` binary.
//!
//! ## Subcommands
//!
//! - `tally quote <user> <hash> [--used-bytes N]`: new bytes and price of an
//!   upload, optionally checked against the monthly limit.
//! - `tally commit <user> <hash>`: record an upload in the user's ledger.
//! - `tally ledger <user>`: print the user's current ledger.
//! - `tally register <user>`: create a directory entry with no ledger.
//! - `tally cost --bytes N --months M --tier T`: price a known size.
//! - `tally empty-ledger`: print the canonical empty ledger digest.
//!
//! ```bash
//! tally --config tally.yaml quote alice QmRoot --months 12
//! DATABASE_URL=postgres://localhost/tally tally commit alice QmRoot
//! ```

pub mod account;
pub mod backend;
pub mod config;
pub mod pricing;

use std::time::Duration;

use tally_ledger::CallContext;
use tokio_util::sync::CancellationToken;

/// Context for one command: the configured deadline, cancelled by `shutdown`.
pub fn command_context(timeout_secs: u64, shutdown: &CancellationToken) -> CallContext {
    CallContext::with_timeout(Duration::from_secs(timeout_secs))
        .with_cancellation(shutdown.child_token())
}
