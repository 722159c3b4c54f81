//! JSON file directory for single-node local development.
//!
//! The whole directory is one JSON object keyed by username. Every write
//! goes to a uniquely named temporary file in the same directory that is
//! then renamed over the original, so readers never observe a half-written
//! file.
//!
//! Writers hold an exclusive advisory lock on `<path>.lock` from the read
//! through the rename, so the compare-and-swap in `update` holds across
//! handles and across processes sharing the file.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tally_core::{ContentHash, Username};

use crate::directory::{DirectoryEntry, UserDirectory};
use crate::error::{describe, DirectoryError};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FileRecord {
    ledger: Option<ContentHash>,
    updated_at: DateTime<Utc>,
}

type Records = BTreeMap<Username, FileRecord>;

/// Exclusive lock on a directory's lock file, released on drop.
struct WriteLock {
    file: std::fs::File,
}

impl Drop for WriteLock {
    fn drop(&mut self) {
        let _ = fs4::fs_std::FileExt::unlock(&self.file);
    }
}

/// [`UserDirectory`] persisted to a single JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileDirectory {
    path: PathBuf,
}

impl JsonFileDirectory {
    /// Open (or lazily create) a directory file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling file writers lock.
    pub fn lock_path(&self) -> PathBuf {
        let mut lock = self.path.clone().into_os_string();
        lock.push(".lock");
        PathBuf::from(lock)
    }

    fn io_error(&self, source: std::io::Error) -> DirectoryError {
        DirectoryError::Io {
            path: self.path.clone(),
            source,
        }
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, DirectoryError>
    where
        F: FnOnce() -> std::io::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        tokio::task::spawn_blocking(f)
            .await
            .map_err(|e| DirectoryError::Unavailable {
                reason: format!("directory file task failed: {e}"),
            })?
            .map_err(|e| self.io_error(e))
    }

    async fn lock(&self) -> Result<WriteLock, DirectoryError> {
        let lock_path = self.lock_path();
        self.blocking(move || {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .truncate(false)
                .read(true)
                .write(true)
                .open(&lock_path)?;
            fs4::fs_std::FileExt::lock_exclusive(&file)?;
            Ok(WriteLock { file })
        })
        .await
    }

    async fn load(&self) -> Result<Records, DirectoryError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Records::new()),
            Err(e) => return Err(self.io_error(e)),
        };
        serde_json::from_slice(&bytes).map_err(|e| DirectoryError::Corrupt {
            reason: format!("{}: {e}", self.path.display()),
        })
    }

    /// Replace the file with `records`. Callers hold the [`WriteLock`].
    async fn store(&self, _lock: &WriteLock, records: &Records) -> Result<(), DirectoryError> {
        let bytes = serde_json::to_vec_pretty(records).map_err(|e| DirectoryError::Corrupt {
            reason: format!("cannot encode directory: {e}"),
        })?;
        let path = self.path.clone();
        self.blocking(move || {
            let parent = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
            tmp.write_all(&bytes)?;
            tmp.as_file().sync_all()?;
            tmp.persist(&path).map_err(|e| e.error)?;
            Ok(())
        })
        .await?;
        tracing::debug!(path = %self.path.display(), users = records.len(), "directory file written");
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for JsonFileDirectory {
    async fn find(&self, username: &Username) -> Result<Option<DirectoryEntry>, DirectoryError> {
        let records = self.load().await?;
        Ok(records.get(username).map(|r| DirectoryEntry {
            username: username.clone(),
            ledger: r.ledger.clone(),
            updated_at: r.updated_at,
        }))
    }

    async fn update(
        &self,
        username: &Username,
        expected: Option<&ContentHash>,
        new: &ContentHash,
    ) -> Result<(), DirectoryError> {
        let lock = self.lock().await?;
        let mut records = self.load().await?;
        let record = records
            .get_mut(username)
            .ok_or_else(|| DirectoryError::NotRegistered {
                username: username.to_string(),
            })?;
        if record.ledger.as_ref() != expected {
            return Err(DirectoryError::Conflict {
                username: username.to_string(),
                expected: describe(expected),
                found: describe(record.ledger.as_ref()),
            });
        }
        record.ledger = Some(new.clone());
        record.updated_at = Utc::now();
        self.store(&lock, &records).await
    }

    async fn register(&self, username: &Username) -> Result<DirectoryEntry, DirectoryError> {
        let lock = self.lock().await?;
        let mut records = self.load().await?;
        if let Some(r) = records.get(username) {
            return Ok(DirectoryEntry {
                username: username.clone(),
                ledger: r.ledger.clone(),
                updated_at: r.updated_at,
            });
        }
        let entry = DirectoryEntry::registered(username.clone());
        records.insert(
            username.clone(),
            FileRecord {
                ledger: None,
                updated_at: entry.updated_at,
            },
        );
        self.store(&lock, &records).await?;
        tracing::info!(user = %username, "user registered");
        Ok(entry)
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
    async fn missing_file_is_an_empty_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = JsonFileDirectory::new(tmp.path().join("users.json"));
        assert!(dir.find(&user("alice")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn pointer_survives_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("users.json");
        {
            let dir = JsonFileDirectory::new(&path);
            dir.register(&user("alice")).await.unwrap();
            dir.update(&user("alice"), None, &hash("QmL1")).await.unwrap();
        }
        let reopened = JsonFileDirectory::new(&path);
        let entry = reopened.find(&user("alice")).await.unwrap().unwrap();
        assert_eq!(entry.ledger, Some(hash("QmL1")));

        let mut names: Vec<_> = std::fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        assert_eq!(names, ["users.json", "users.json.lock"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn separate_handles_share_the_swap() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("users.json");
        let first = JsonFileDirectory::new(&path);
        let second = JsonFileDirectory::new(&path);

        for round in 0..25 {
            let name = user(&format!("user{round}"));
            first.register(&name).await.unwrap();
            let a = hash(&format!("QmA{round}"));
            let b = hash(&format!("QmB{round}"));

            let (ra, rb) = tokio::join!(
                tokio::spawn({
                    let (dir, name, a) = (first.clone(), name.clone(), a.clone());
                    async move { dir.update(&name, None, &a).await }
                }),
                tokio::spawn({
                    let (dir, name, b) = (second.clone(), name.clone(), b.clone());
                    async move { dir.update(&name, None, &b).await }
                }),
            );
            let (ra, rb) = (ra.unwrap(), rb.unwrap());
            assert!(
                ra.is_ok() != rb.is_ok(),
                "round {round}: exactly one swap from <none> may win"
            );
            let (winner, loser) = if ra.is_ok() { (a, rb) } else { (b, ra) };
            assert!(matches!(loser, Err(DirectoryError::Conflict { .. })));

            let reopened = JsonFileDirectory::new(&path);
            assert_eq!(
                reopened.find(&name).await.unwrap().unwrap().ledger,
                Some(winner)
            );
        }

        // Every registration survived the concurrent rewrites.
        for round in 0..25 {
            let entry = second.find(&user(&format!("user{round}"))).await.unwrap();
            assert!(entry.unwrap().ledger.is_some());
        }
    }

    #[tokio::test]
    async fn stale_expected_is_a_conflict() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = JsonFileDirectory::new(tmp.path().join("users.json"));
        dir.register(&user("alice")).await.unwrap();
        dir.update(&user("alice"), None, &hash("QmL1")).await.unwrap();
        let err = dir
            .update(&user("alice"), Some(&hash("QmOther")), &hash("QmL2"))
            .await
            .unwrap_err();
        assert!(matches!(err, DirectoryError::Conflict { .. }));
    }

    #[tokio::test]
    async fn garbage_file_is_corrupt() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("users.json");
        std::fs::write(&path, b"not json").unwrap();
        let dir = JsonFileDirectory::new(&path);
        let err = dir.find(&user("alice")).await.unwrap_err();
        assert!(matches!(err, DirectoryError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn invalid_username_in_file_is_corrupt() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("users.json");
        std::fs::write(
            &path,
            br#"{"":{"ledger":null,"updated_at":"2026-01-01T00:00:00Z"}}"#,
        )
        .unwrap();
        let dir = JsonFileDirectory::new(&path);
        assert!(matches!(
            dir.find(&user("alice")).await.unwrap_err(),
            DirectoryError::Corrupt { .. }
        ));
    }
}
