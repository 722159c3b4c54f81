//! Content store errors.

use thiserror::Error;

/// Failure of a content store operation.
///
/// None of these are retried by the store; callers decide retry policy.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The requested object does not exist in the store.
    #[error("object not found: {hash}")]
    NotFound {
        /// The missing address.
        hash: String,
    },

    /// The request never produced a response (connect, timeout, TLS).
    #[error("transport error calling {endpoint}: {source}")]
    Transport {
        /// Endpoint description, e.g. `POST /api/v0/refs`.
        endpoint: String,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// The store answered with a non-success status.
    #[error("{endpoint} returned {status}: {message}")]
    Backend {
        /// Endpoint description.
        endpoint: String,
        /// HTTP status code.
        status: u16,
        /// Error message reported by the store.
        message: String,
    },

    /// The store answered, but the response could not be interpreted.
    #[error("malformed response from {endpoint}: {reason}")]
    Malformed {
        /// Endpoint description.
        endpoint: String,
        /// What was wrong with the response.
        reason: String,
    },

    /// The store is unreachable.
    #[error("content store unavailable: {reason}")]
    Unavailable {
        /// Why the store cannot serve requests.
        reason: String,
    },
}
