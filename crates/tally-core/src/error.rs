//! # Error Types
//!
//! Leaf error types shared by every crate in the workspace. Higher layers
//! wrap these with operation context (username, hash) rather than
//! re-describing them.

use thiserror::Error;

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    /// Sizes and amounts must be integers.
    #[error("float values are not permitted in canonical representations: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// An identifier failed validation at construction time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Username is empty, too long, or contains control characters.
    #[error("invalid username {value:?}: {reason}")]
    InvalidUsername {
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Content hash is empty or contains whitespace.
    #[error("invalid content hash {value:?}: {reason}")]
    InvalidContentHash {
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}
