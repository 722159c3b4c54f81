//! The dedup accountant.
//!
//! ## Billing Rule
//!
//! Given a user's ledger `L` and an upload `h`:
//!
//! | Case | Bytes billed |
//! |------|--------------|
//! | `h ∈ L.root_hashes` | 0 |
//! | `h` has no refs, `h ∈ L.billed_refs` | 0 |
//! | `h` has no refs | `stat(h).cumulative_size` |
//! | `h` has refs `R` | `Σ stat(d).data_size` for `d ∈ R` not in `L` |
//!
//! A linked root's own payload is not billed. Committing records `h` as a
//! root and every newly billed hash as a ref.
//!
//! ## Concurrency
//!
//! Updates for one user are serialized by a per-user async mutex, and the
//! directory write is a compare-and-swap against the pointer that was read.
//! Quotes take no lock.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use tally_core::{ContentHash, Username};
use tally_directory::{DirectoryError, UserDirectory};
use tally_store::{ContentStore, DagCodec, StoreError};
use tokio::sync::Mutex;

use crate::context::CallContext;
use crate::error::AccountingError;
use crate::ledger::Ledger;

/// Result of evaluating one upload against a ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assessment {
    /// Bytes the upload would newly cost.
    pub bytes: u64,
    /// Hashes that a commit would add to `billed_refs`.
    pub new_refs: Vec<ContentHash>,
    /// The upload is already a recorded root.
    pub already_root: bool,
}

/// Quotes and commits uploads against per-user dedup ledgers.
pub struct DedupAccountant<S, D> {
    store: S,
    directory: D,
    codec: DagCodec,
    locks: DashMap<Username, Arc<Mutex<()>>>,
}

impl<S, D> DedupAccountant<S, D>
where
    S: ContentStore,
    D: UserDirectory,
{
    pub fn new(store: S, directory: D) -> Self {
        Self {
            store,
            directory,
            codec: DagCodec::default(),
            locks: DashMap::new(),
        }
    }

    /// Codec used when writing ledgers. Defaults to dag-cbor.
    pub fn with_codec(mut self, codec: DagCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// The user's current ledger. A registered user with no ledger yet gets
    /// the empty ledger.
    pub async fn ledger_for(
        &self,
        ctx: &CallContext,
        user: &Username,
    ) -> Result<Ledger, AccountingError> {
        Ok(self.load(ctx, user, None).await?.0)
    }

    /// Bytes that uploading `hash` would newly cost `user`. Read-only.
    #[tracing::instrument(name = "quote", skip_all, fields(user = %user, hash = %hash))]
    pub async fn quote(
        &self,
        ctx: &CallContext,
        user: &Username,
        hash: &ContentHash,
    ) -> Result<u64, AccountingError> {
        let (ledger, _) = self.load(ctx, user, Some(hash)).await?;
        let assessment = self.assess(ctx, user, &ledger, hash).await?;
        tracing::debug!(bytes = assessment.bytes, "quote computed");
        Ok(assessment.bytes)
    }

    /// Commit `hash` into `user`'s ledger.
    ///
    /// Returns the new ledger's address, or `None` when `hash` is already a
    /// recorded root. Repeating a successful update returns `None`.
    #[tracing::instrument(name = "update", skip_all, fields(user = %user, hash = %hash))]
    pub async fn update(
        &self,
        ctx: &CallContext,
        user: &Username,
        hash: &ContentHash,
    ) -> Result<Option<ContentHash>, AccountingError> {
        let lock = self.user_lock(user);
        let _guard = ctx
            .run(lock.lock())
            .await
            .map_err(|reason| interrupted(user, hash, "lock", reason))?;

        let (ledger, pointer) = self.load(ctx, user, Some(hash)).await?;
        let assessment = self.assess(ctx, user, &ledger, hash).await?;
        if assessment.already_root {
            tracing::debug!("root already recorded, nothing to commit");
            return Ok(None);
        }

        let next = ledger.with_commit(hash, assessment.new_refs.iter().cloned());
        let bytes = next
            .canonical_bytes()
            .map_err(|source| AccountingError::Canonicalization {
                username: user.to_string(),
                source,
            })?;
        let ledger_hash =
            store_call(ctx, user, hash, "dag_put", self.store.dag_put(&bytes, self.codec)).await?;
        store_call(ctx, user, &ledger_hash, "pin", self.store.pin(&ledger_hash)).await?;

        let write = ctx
            .run(self.directory.update(user, pointer.as_ref(), &ledger_hash))
            .await
            .map_err(|reason| interrupted(user, hash, "pointer write", reason))?;
        if let Err(source) = write {
            tracing::warn!(ledger = %ledger_hash, error = %source, "ledger pointer write failed");
            return Err(match source {
                DirectoryError::Conflict { .. } => AccountingError::PointerConflict {
                    username: user.to_string(),
                    ledger: ledger_hash.to_string(),
                    source,
                },
                source => AccountingError::PointerWrite {
                    username: user.to_string(),
                    ledger: ledger_hash.to_string(),
                    source,
                },
            });
        }

        tracing::info!(
            ledger = %ledger_hash,
            bytes = assessment.bytes,
            new_refs = assessment.new_refs.len(),
            roots = next.root_hashes.len(),
            "ledger committed"
        );
        Ok(Some(ledger_hash))
    }

    /// Evaluate `hash` against `ledger` without touching any state.
    pub async fn assess(
        &self,
        ctx: &CallContext,
        user: &Username,
        ledger: &Ledger,
        hash: &ContentHash,
    ) -> Result<Assessment, AccountingError> {
        if ledger.contains_root(hash) {
            return Ok(Assessment {
                bytes: 0,
                new_refs: Vec::new(),
                already_root: true,
            });
        }

        let refs = store_call(ctx, user, hash, "refs", self.store.refs(hash, true, true)).await?;

        if refs.is_empty() {
            if ledger.is_billed(hash) {
                tracing::debug!("leaf already billed under another root");
                return Ok(Assessment {
                    bytes: 0,
                    new_refs: Vec::new(),
                    already_root: false,
                });
            }
            let stat = store_call(ctx, user, hash, "stat", self.store.stat(hash)).await?;
            tracing::debug!(cumulative_size = stat.cumulative_size, "leaf upload");
            return Ok(Assessment {
                bytes: stat.cumulative_size,
                new_refs: vec![hash.clone()],
                already_root: false,
            });
        }

        let total = refs.len();
        let mut bytes = 0u64;
        let mut new_refs = Vec::new();
        for child in refs {
            if ledger.is_known(&child) {
                continue;
            }
            let stat = store_call(ctx, user, &child, "stat", self.store.stat(&child)).await?;
            bytes = bytes.saturating_add(stat.data_size);
            new_refs.push(child);
        }
        tracing::debug!(refs = total, unseen = new_refs.len(), bytes, "linked upload");
        Ok(Assessment {
            bytes,
            new_refs,
            already_root: false,
        })
    }

    /// Current ledger and pointer for `user`. `upload` is the hash being
    /// quoted or committed, carried into lookup errors.
    async fn load(
        &self,
        ctx: &CallContext,
        user: &Username,
        upload: Option<&ContentHash>,
    ) -> Result<(Ledger, Option<ContentHash>), AccountingError> {
        let hash = || upload.map(ContentHash::to_string);
        let entry = ctx
            .run(self.directory.find(user))
            .await
            .map_err(|reason| AccountingError::Interrupted {
                username: user.to_string(),
                hash: hash(),
                operation: "directory lookup",
                reason,
            })?
            .map_err(|source| AccountingError::Directory {
                username: user.to_string(),
                hash: hash(),
                source,
            })?
            .ok_or_else(|| AccountingError::UnknownUser {
                username: user.to_string(),
                hash: hash(),
            })?;

        let Some(pointer) = entry.ledger else {
            return Ok((Ledger::empty(), None));
        };

        let bytes = store_call(ctx, user, &pointer, "dag_get", self.store.dag_get(&pointer)).await?;
        let ledger = Ledger::decode(&bytes).map_err(|e| {
            tracing::error!(ledger = %pointer, error = %e, "stored ledger is not decodable");
            AccountingError::Decode {
                username: user.to_string(),
                hash: pointer.to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok((ledger, Some(pointer)))
    }

    fn user_lock(&self, user: &Username) -> Arc<Mutex<()>> {
        self.locks.entry(user.clone()).or_default().value().clone()
    }
}

fn interrupted(
    user: &Username,
    hash: &ContentHash,
    operation: &'static str,
    reason: crate::context::Interruption,
) -> AccountingError {
    AccountingError::Interrupted {
        username: user.to_string(),
        hash: Some(hash.to_string()),
        operation,
        reason,
    }
}

async fn store_call<T, F>(
    ctx: &CallContext,
    user: &Username,
    hash: &ContentHash,
    operation: &'static str,
    fut: F,
) -> Result<T, AccountingError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    ctx.run(fut)
        .await
        .map_err(|reason| interrupted(user, hash, operation, reason))?
        .map_err(|source| AccountingError::Retrieval {
            username: user.to_string(),
            hash: hash.to_string(),
            source,
        })
}
