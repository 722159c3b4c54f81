//! The `ContentStore` trait and its value types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tally_core::{CanonicalBytes, ContentHash};

use crate::error::StoreError;

/// Size information for a single DAG node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectStat {
    /// The node's own serialized payload, excluding child links.
    pub data_size: u64,
    /// `data_size` plus the cumulative size of every child.
    pub cumulative_size: u64,
}

/// Codec a structured object is stored with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DagCodec {
    /// DAG-CBOR, the default codec for ledgers.
    #[default]
    DagCbor,
    /// DAG-JSON.
    DagJson,
}

impl DagCodec {
    /// Multicodec name, as used by the IPFS HTTP API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DagCbor => "dag-cbor",
            Self::DagJson => "dag-json",
        }
    }
}

impl std::fmt::Display for DagCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A content-addressed object graph.
///
/// Implementations must be `Send + Sync` so one instance can be shared by
/// concurrent accounting calls behind an `Arc`. Every method is a potentially
/// blocking network call; none of them retry.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Size information for `hash`.
    async fn stat(&self, hash: &ContentHash) -> Result<ObjectStat, StoreError>;

    /// Hashes reachable from `hash`, excluding `hash` itself.
    ///
    /// With `recursive`, the whole closure is returned rather than direct
    /// links only. With `unique`, each hash appears at most once. Order is
    /// unspecified.
    async fn refs(
        &self,
        hash: &ContentHash,
        recursive: bool,
        unique: bool,
    ) -> Result<Vec<ContentHash>, StoreError>;

    /// Store a structured object, returning its content address.
    ///
    /// Identical canonical bytes always yield the identical address.
    async fn dag_put(
        &self,
        object: &CanonicalBytes,
        codec: DagCodec,
    ) -> Result<ContentHash, StoreError>;

    /// Fetch a structured object as JSON bytes.
    async fn dag_get(&self, hash: &ContentHash) -> Result<Vec<u8>, StoreError>;

    /// Pin `hash` so the store keeps it.
    async fn pin(&self, hash: &ContentHash) -> Result<(), StoreError>;
}

#[async_trait]
impl<T: ContentStore + ?Sized> ContentStore for std::sync::Arc<T> {
    async fn stat(&self, hash: &ContentHash) -> Result<ObjectStat, StoreError> {
        (**self).stat(hash).await
    }

    async fn refs(
        &self,
        hash: &ContentHash,
        recursive: bool,
        unique: bool,
    ) -> Result<Vec<ContentHash>, StoreError> {
        (**self).refs(hash, recursive, unique).await
    }

    async fn dag_put(
        &self,
        object: &CanonicalBytes,
        codec: DagCodec,
    ) -> Result<ContentHash, StoreError> {
        (**self).dag_put(object, codec).await
    }

    async fn dag_get(&self, hash: &ContentHash) -> Result<Vec<u8>, StoreError> {
        (**self).dag_get(hash).await
    }

    async fn pin(&self, hash: &ContentHash) -> Result<(), StoreError> {
        (**self).pin(hash).await
    }
}
