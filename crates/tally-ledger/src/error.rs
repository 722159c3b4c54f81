//! Accounting errors.
//!
//! Every variant carries the user it concerns and the hash being handled.
//! The hash is optional only where the call had no upload in hand (reading
//! a ledger through `ledger_for`).

use tally_core::CanonicalizationError;
use tally_directory::DirectoryError;
use tally_store::StoreError;
use thiserror::Error;

use crate::context::Interruption;

#[derive(Error, Debug)]
pub enum AccountingError {
    /// A content store call failed. Nothing was committed.
    #[error("content store failure on {hash} for {username}: {source}")]
    Retrieval {
        username: String,
        hash: String,
        #[source]
        source: StoreError,
    },

    /// The user's stored ledger is not a valid ledger.
    #[error("ledger {hash} for {username} failed to decode: {reason}")]
    Decode {
        username: String,
        hash: String,
        reason: String,
    },

    /// The new ledger is stored and pinned, but the directory write failed.
    /// Retrying the update is safe.
    #[error("ledger {ledger} stored for {username} but the pointer write failed: {source}")]
    PointerWrite {
        username: String,
        ledger: String,
        #[source]
        source: DirectoryError,
    },

    /// Another writer moved the pointer between read and write.
    #[error("ledger pointer for {username} moved while committing {ledger}")]
    PointerConflict {
        username: String,
        ledger: String,
        #[source]
        source: DirectoryError,
    },

    /// Looking the user up failed.
    #[error("directory lookup for {username} failed: {source}")]
    Directory {
        username: String,
        hash: Option<String>,
        #[source]
        source: DirectoryError,
    },

    /// The user has no directory entry.
    #[error("user {username} is not registered")]
    UnknownUser {
        username: String,
        hash: Option<String>,
    },

    #[error("{operation} for {username} {reason}")]
    Interrupted {
        username: String,
        hash: Option<String>,
        operation: &'static str,
        reason: Interruption,
    },

    #[error("cannot canonicalize ledger for {username}: {source}")]
    Canonicalization {
        username: String,
        #[source]
        source: CanonicalizationError,
    },
}

impl AccountingError {
    /// Whether the same call may succeed if simply repeated.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Retrieval { .. }
                | Self::PointerWrite { .. }
                | Self::PointerConflict { .. }
                | Self::Interrupted { .. }
        )
    }
}
