//! The [`UserDirectory`] trait and its entry type.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tally_core::{ContentHash, Username};

use crate::error::DirectoryError;

/// One user's directory record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub username: Username,
    /// Current ledger, `None` until the first billed upload.
    pub ledger: Option<ContentHash>,
    pub updated_at: DateTime<Utc>,
}

impl DirectoryEntry {
    /// A freshly registered entry with no ledger.
    pub fn registered(username: Username) -> Self {
        Self {
            username,
            ledger: None,
            updated_at: Utc::now(),
        }
    }
}

/// Username → ledger pointer directory.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Look up a user. `Ok(None)` means the user was never registered.
    async fn find(&self, username: &Username) -> Result<Option<DirectoryEntry>, DirectoryError>;

    /// Swap the user's pointer from `expected` to `new`.
    ///
    /// Fails with [`DirectoryError::Conflict`] when the stored pointer is not
    /// `expected`, and [`DirectoryError::NotRegistered`] when there is no
    /// entry at all.
    async fn update(
        &self,
        username: &Username,
        expected: Option<&ContentHash>,
        new: &ContentHash,
    ) -> Result<(), DirectoryError>;

    /// Create an entry with no ledger. Registering an existing user returns
    /// the existing entry unchanged.
    async fn register(&self, username: &Username) -> Result<DirectoryEntry, DirectoryError>;
}

#[async_trait]
impl<T: UserDirectory + ?Sized> UserDirectory for Arc<T> {
    async fn find(&self, username: &Username) -> Result<Option<DirectoryEntry>, DirectoryError> {
        (**self).find(username).await
    }

    async fn update(
        &self,
        username: &Username,
        expected: Option<&ContentHash>,
        new: &ContentHash,
    ) -> Result<(), DirectoryError> {
        (**self).update(username, expected, new).await
    }

    async fn register(&self, username: &Username) -> Result<DirectoryEntry, DirectoryError> {
        (**self).register(username).await
    }
}
