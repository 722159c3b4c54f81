//! In-memory directory for tests and local development.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use tally_core::{ContentHash, Username};

use crate::directory::{DirectoryEntry, UserDirectory};
use crate::error::{describe, DirectoryError};

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<Username, DirectoryEntry>,
    failing_updates: Option<String>,
}

/// Thread-safe in-memory [`UserDirectory`].
///
/// Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A directory with each of `users` registered and no ledgers.
    pub fn with_users<I>(users: I) -> Self
    where
        I: IntoIterator<Item = Username>,
    {
        let dir = Self::new();
        {
            let mut inner = dir.inner.write();
            for user in users {
                inner
                    .entries
                    .insert(user.clone(), DirectoryEntry::registered(user));
            }
        }
        dir
    }

    /// Make every `update` fail with [`DirectoryError::Unavailable`] until
    /// cleared with `None`.
    pub fn set_failing_updates(&self, reason: Option<&str>) {
        self.inner.write().failing_updates = reason.map(str::to_string);
    }

    /// Current pointer for `username`, without going through the trait.
    pub fn pointer(&self, username: &Username) -> Option<ContentHash> {
        self.inner
            .read()
            .entries
            .get(username)
            .and_then(|e| e.ledger.clone())
    }
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn find(&self, username: &Username) -> Result<Option<DirectoryEntry>, DirectoryError> {
        Ok(self.inner.read().entries.get(username).cloned())
    }

    async fn update(
        &self,
        username: &Username,
        expected: Option<&ContentHash>,
        new: &ContentHash,
    ) -> Result<(), DirectoryError> {
        let mut inner = self.inner.write();
        if let Some(reason) = &inner.failing_updates {
            return Err(DirectoryError::Unavailable {
                reason: reason.clone(),
            });
        }
        let entry =
            inner
                .entries
                .get_mut(username)
                .ok_or_else(|| DirectoryError::NotRegistered {
                    username: username.to_string(),
                })?;
        if entry.ledger.as_ref() != expected {
            return Err(DirectoryError::Conflict {
                username: username.to_string(),
                expected: describe(expected),
                found: describe(entry.ledger.as_ref()),
            });
        }
        entry.ledger = Some(new.clone());
        entry.updated_at = Utc::now();
        Ok(())
    }

    async fn register(&self, username: &Username) -> Result<DirectoryEntry, DirectoryError> {
        let mut inner = self.inner.write();
        let entry = inner
            .entries
            .entry(username.clone())
            .or_insert_with(|| DirectoryEntry::registered(username.clone()));
        Ok(entry.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str) -> Username {
        Username::new(name).unwrap()
    }

    fn hash(s: &str) -> ContentHash {
        ContentHash::new(s).unwrap()
    }

    #[tokio::test]
    async fn unknown_user_is_none() {
        let dir = MemoryDirectory::new();
        assert!(dir.find(&user("ghost")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn registered_user_has_no_ledger() {
        let dir = MemoryDirectory::new();
        let entry = dir.register(&user("alice")).await.unwrap();
        assert!(entry.ledger.is_none());
        let found = dir.find(&user("alice")).await.unwrap().unwrap();
        assert_eq!(found.username, user("alice"));
        assert!(found.ledger.is_none());
    }

    #[tokio::test]
    async fn register_is_idempotent() {
        let dir = MemoryDirectory::with_users([user("alice")]);
        dir.update(&user("alice"), None, &hash("QmL1")).await.unwrap();
        let entry = dir.register(&user("alice")).await.unwrap();
        assert_eq!(entry.ledger, Some(hash("QmL1")));
    }

    #[tokio::test]
    async fn update_swaps_when_expected_matches() {
        let dir = MemoryDirectory::with_users([user("alice")]);
        dir.update(&user("alice"), None, &hash("QmL1")).await.unwrap();
        dir.update(&user("alice"), Some(&hash("QmL1")), &hash("QmL2"))
            .await
            .unwrap();
        assert_eq!(dir.pointer(&user("alice")), Some(hash("QmL2")));
    }

    #[tokio::test]
    async fn stale_expected_is_a_conflict() {
        let dir = MemoryDirectory::with_users([user("alice")]);
        dir.update(&user("alice"), None, &hash("QmL1")).await.unwrap();
        let err = dir
            .update(&user("alice"), None, &hash("QmL2"))
            .await
            .unwrap_err();
        match err {
            DirectoryError::Conflict {
                expected, found, ..
            } => {
                assert_eq!(expected, "<none>");
                assert_eq!(found, "QmL1");
            }
            other => panic!("expected Conflict, got {other:?}"),
        }
        assert_eq!(dir.pointer(&user("alice")), Some(hash("QmL1")));
    }

    #[tokio::test]
    async fn update_of_unregistered_user_fails() {
        let dir = MemoryDirectory::new();
        let err = dir
            .update(&user("ghost"), None, &hash("QmL1"))
            .await
            .unwrap_err();
        assert!(matches!(err, DirectoryError::NotRegistered { .. }));
    }

    #[tokio::test]
    async fn failing_updates_leave_pointer_untouched() {
        let dir = MemoryDirectory::with_users([user("alice")]);
        dir.set_failing_updates(Some("connection reset"));
        let err = dir
            .update(&user("alice"), None, &hash("QmL1"))
            .await
            .unwrap_err();
        assert!(matches!(err, DirectoryError::Unavailable { .. }));
        assert_eq!(dir.pointer(&user("alice")), None);

        dir.set_failing_updates(None);
        dir.update(&user("alice"), None, &hash("QmL1")).await.unwrap();
        assert_eq!(dir.pointer(&user("alice")), Some(hash("QmL1")));
    }
}
