//! Directory error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from [`UserDirectory`](crate::UserDirectory) implementations.
#[derive(Error, Debug)]
pub enum DirectoryError {
    /// The user has no directory entry.
    #[error("user {username} is not registered")]
    NotRegistered { username: String },

    /// The stored pointer did not match the expected value.
    #[error("ledger pointer for {username} changed concurrently: expected {expected}, found {found}")]
    Conflict {
        username: String,
        expected: String,
        found: String,
    },

    /// Reading or writing the backing file failed.
    #[error("directory file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A stored record could not be interpreted.
    #[error("corrupt directory record: {reason}")]
    Corrupt { reason: String },

    /// The backend refused the request.
    #[error("directory unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Render an optional pointer for error messages.
pub(crate) fn describe(pointer: Option<&tally_core::ContentHash>) -> String {
    pointer.map_or_else(|| "<none>".to_string(), |h| h.to_string())
}
