//! The per-user dedup ledger.
//!
//! A ledger is two sorted sets of content hashes. Its serialized form is the
//! canonical JSON of those two sets, so ledgers with equal membership have
//! equal bytes and equal digests however they were built.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tally_core::{sha256_digest, CanonicalBytes, CanonicalizationError, ContentDigest, ContentHash};

/// Digest of the canonical empty ledger, `{"billed_refs":[],"root_hashes":[]}`.
pub const EMPTY_LEDGER_DIGEST: &str =
    "sha256:e3858eb8ffa6b6a3da97c51dc73994c6359bb9d2b8b7ca0d00cb88af2255c29b";

/// Record of every hash a user has been billed for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Ledger {
    /// Hashes presented as top-level uploads.
    pub root_hashes: BTreeSet<ContentHash>,
    /// Descendant hashes billed under some root.
    pub billed_refs: BTreeSet<ContentHash>,
}

impl Ledger {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn contains_root(&self, hash: &ContentHash) -> bool {
        self.root_hashes.contains(hash)
    }

    /// Whether `hash` was billed as a descendant of some earlier root.
    pub fn is_billed(&self, hash: &ContentHash) -> bool {
        self.billed_refs.contains(hash)
    }

    /// Whether `hash` is anywhere in the ledger.
    pub fn is_known(&self, hash: &ContentHash) -> bool {
        self.contains_root(hash) || self.is_billed(hash)
    }

    pub fn is_empty(&self) -> bool {
        self.root_hashes.is_empty() && self.billed_refs.is_empty()
    }

    /// The ledger after committing `root` with `new_refs`.
    pub fn with_commit<I>(&self, root: &ContentHash, new_refs: I) -> Self
    where
        I: IntoIterator<Item = ContentHash>,
    {
        let mut next = self.clone();
        next.root_hashes.insert(root.clone());
        next.billed_refs.extend(new_refs);
        next
    }

    pub fn canonical_bytes(&self) -> Result<CanonicalBytes, CanonicalizationError> {
        CanonicalBytes::new(self)
    }

    pub fn digest(&self) -> Result<ContentDigest, CanonicalizationError> {
        Ok(sha256_digest(&self.canonical_bytes()?))
    }

    /// Parse ledger bytes returned by a content store.
    ///
    /// Both fields are required; an object missing either is rejected.
    pub fn decode(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
