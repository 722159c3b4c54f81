//! In-memory DAG store for tests and local development.
//!
//! Nodes are `(data, named links)`, mirroring the IPFS object model closely
//! enough for accounting: `stat` reports a node's own payload and the
//! cumulative size of its closure, and `refs` walks links depth-first.
//!
//! Addresses are `sha256:<hex>`:
//!
//! - DAG nodes: digest of the canonical encoding of `{data, links}`.
//! - `dag_put` objects: digest of the object's canonical bytes, so a ledger
//!   stored here is addressed by exactly its canonical digest.
//!
//! Clones share the same underlying storage.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;
use tally_core::{sha256_digest, CanonicalBytes, ContentHash};

use crate::error::StoreError;
use crate::store::{ContentStore, DagCodec, ObjectStat};

/// Payload of an empty UnixFS directory node (`Data { Type: Directory }`).
pub const UNIXFS_EMPTY_DIR: [u8; 2] = [0x08, 0x01];

#[derive(Debug, Clone)]
struct Node {
    data: Vec<u8>,
    links: BTreeMap<String, ContentHash>,
    /// Set for objects written through `dag_put`.
    codec: Option<DagCodec>,
}

#[derive(Serialize)]
struct NodeEncoding<'a> {
    data: String,
    links: &'a BTreeMap<String, ContentHash>,
}

impl Node {
    fn address(&self) -> Result<ContentHash, StoreError> {
        let encoding = NodeEncoding {
            data: self.data.iter().map(|b| format!("{b:02x}")).collect(),
            links: &self.links,
        };
        let canonical = CanonicalBytes::new(&encoding).map_err(|e| StoreError::Malformed {
            endpoint: "memory".into(),
            reason: format!("node encoding failed: {e}"),
        })?;
        Ok(sha256_digest(&canonical).to_content_hash())
    }
}

#[derive(Debug, Default)]
struct Inner {
    nodes: HashMap<ContentHash, Node>,
    pins: HashSet<ContentHash>,
    offline: Option<String>,
    failing_writes: Option<String>,
}

impl Inner {
    fn check_online(&self) -> Result<(), StoreError> {
        match &self.offline {
            Some(reason) => Err(StoreError::Unavailable {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }

    fn node(&self, hash: &ContentHash) -> Result<&Node, StoreError> {
        self.nodes.get(hash).ok_or_else(|| StoreError::NotFound {
            hash: hash.to_string(),
        })
    }

    fn cumulative_size(&self, hash: &ContentHash) -> Result<u64, StoreError> {
        let node = self.node(hash)?;
        let mut total = node.data.len() as u64;
        for child in node.links.values() {
            total += self.cumulative_size(child)?;
        }
        Ok(total)
    }

    fn walk(
        &self,
        hash: &ContentHash,
        recursive: bool,
        seen: Option<&mut HashSet<ContentHash>>,
        out: &mut Vec<ContentHash>,
    ) -> Result<(), StoreError> {
        let node = self.node(hash)?;
        let mut seen = seen;
        for child in node.links.values() {
            if let Some(seen) = seen.as_deref_mut() {
                if !seen.insert(child.clone()) {
                    continue;
                }
            }
            out.push(child.clone());
            if recursive {
                self.walk(child, true, seen.as_deref_mut(), out)?;
            }
        }
        Ok(())
    }
}

/// In-memory content store.
#[derive(Debug, Clone, Default)]
pub struct MemoryDagStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryDagStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a raw leaf object with no links.
    pub fn add_raw(&self, data: impl Into<Vec<u8>>) -> Result<ContentHash, StoreError> {
        self.insert(Node {
            data: data.into(),
            links: BTreeMap::new(),
            codec: None,
        })
    }

    /// Add a node linking to existing objects.
    pub fn add_node<N: Into<String>>(
        &self,
        data: impl Into<Vec<u8>>,
        links: impl IntoIterator<Item = (N, ContentHash)>,
    ) -> Result<ContentHash, StoreError> {
        let links: BTreeMap<String, ContentHash> =
            links.into_iter().map(|(n, h)| (n.into(), h)).collect();
        {
            let inner = self.inner.read();
            for child in links.values() {
                inner.node(child)?;
            }
        }
        self.insert(Node {
            data: data.into(),
            links,
            codec: None,
        })
    }

    /// Add an empty UnixFS directory node.
    pub fn new_unixfs_dir(&self) -> Result<ContentHash, StoreError> {
        self.add_raw(UNIXFS_EMPTY_DIR.to_vec())
    }

    /// Copy `root` with an extra named link to `child`, returning the new
    /// root's address. The original node is left untouched.
    pub fn patch_link(
        &self,
        root: &ContentHash,
        name: &str,
        child: &ContentHash,
    ) -> Result<ContentHash, StoreError> {
        let patched = {
            let inner = self.inner.read();
            inner.node(child)?;
            let mut node = inner.node(root)?.clone();
            node.links.insert(name.to_string(), child.clone());
            node
        };
        self.insert(patched)
    }

    /// Whether `hash` has been pinned.
    pub fn is_pinned(&self, hash: &ContentHash) -> bool {
        self.inner.read().pins.contains(hash)
    }

    /// Codec `hash` was written with, if it came from `dag_put`.
    pub fn codec_of(&self, hash: &ContentHash) -> Option<DagCodec> {
        self.inner.read().nodes.get(hash).and_then(|node| node.codec)
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.inner.read().nodes.len()
    }

    /// Whether the store holds no objects.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make every operation fail with [`StoreError::Unavailable`] until
    /// called again with `None`.
    pub fn set_offline(&self, reason: Option<&str>) {
        self.inner.write().offline = reason.map(str::to_string);
    }

    /// Make `dag_put` and `pin` fail while reads keep working.
    pub fn set_failing_writes(&self, reason: Option<&str>) {
        self.inner.write().failing_writes = reason.map(str::to_string);
    }

    fn insert(&self, node: Node) -> Result<ContentHash, StoreError> {
        let hash = node.address()?;
        let mut inner = self.inner.write();
        inner.check_online()?;
        inner.nodes.entry(hash.clone()).or_insert(node);
        Ok(hash)
    }

    fn check_writable(inner: &Inner) -> Result<(), StoreError> {
        inner.check_online()?;
        match &inner.failing_writes {
            Some(reason) => Err(StoreError::Unavailable {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ContentStore for MemoryDagStore {
    async fn stat(&self, hash: &ContentHash) -> Result<ObjectStat, StoreError> {
        let inner = self.inner.read();
        inner.check_online()?;
        let data_size = inner.node(hash)?.data.len() as u64;
        let cumulative_size = inner.cumulative_size(hash)?;
        Ok(ObjectStat {
            data_size,
            cumulative_size,
        })
    }

    async fn refs(
        &self,
        hash: &ContentHash,
        recursive: bool,
        unique: bool,
    ) -> Result<Vec<ContentHash>, StoreError> {
        let inner = self.inner.read();
        inner.check_online()?;
        let mut out = Vec::new();
        if unique {
            let mut seen = HashSet::new();
            inner.walk(hash, recursive, Some(&mut seen), &mut out)?;
        } else {
            inner.walk(hash, recursive, None, &mut out)?;
        }
        Ok(out)
    }

    async fn dag_put(
        &self,
        object: &CanonicalBytes,
        codec: DagCodec,
    ) -> Result<ContentHash, StoreError> {
        let hash = sha256_digest(object).to_content_hash();
        let mut inner = self.inner.write();
        Self::check_writable(&inner)?;
        inner.nodes.entry(hash.clone()).or_insert_with(|| Node {
            data: object.as_bytes().to_vec(),
            links: BTreeMap::new(),
            codec: Some(codec),
        });
        tracing::debug!(%hash, %codec, bytes = object.len(), "stored dag object");
        Ok(hash)
    }

    async fn dag_get(&self, hash: &ContentHash) -> Result<Vec<u8>, StoreError> {
        let inner = self.inner.read();
        inner.check_online()?;
        Ok(inner.node(hash)?.data.clone())
    }

    async fn pin(&self, hash: &ContentHash) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        Self::check_writable(&inner)?;
        inner.node(hash)?;
        inner.pins.insert(hash.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn raw_object_stat_has_equal_sizes() {
        let store = MemoryDagStore::new();
        let h = store.add_raw(vec![7u8; 6171]).unwrap();
        let stat = store.stat(&h).await.unwrap();
        assert_eq!(stat.data_size, 6171);
        assert_eq!(stat.cumulative_size, 6171);
        assert!(store.refs(&h, true, true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn patch_link_produces_new_root_with_refs() {
        let store = MemoryDagStore::new();
        let leaf = store.add_raw(vec![1u8; 100]).unwrap();
        let dir = store.new_unixfs_dir().unwrap();
        let root = store.patch_link(&leaf, "hello", &dir).unwrap();
        assert_ne!(root, leaf);

        let refs = store.refs(&root, true, true).await.unwrap();
        assert_eq!(refs, vec![dir.clone()]);

        let stat = store.stat(&root).await.unwrap();
        assert_eq!(stat.data_size, 100);
        assert_eq!(stat.cumulative_size, 102);
        assert_eq!(store.stat(&dir).await.unwrap().data_size, 2);
    }

    #[tokio::test]
    async fn unique_refs_collapse_shared_children() {
        let store = MemoryDagStore::new();
        let shared = store.add_raw(b"shared".to_vec()).unwrap();
        let a = store.add_node(b"a".to_vec(), [("s", shared.clone())]).unwrap();
        let b = store.add_node(b"b".to_vec(), [("s", shared.clone())]).unwrap();
        let top = store
            .add_node(Vec::new(), [("a", a.clone()), ("b", b.clone())])
            .unwrap();

        let all = store.refs(&top, true, false).await.unwrap();
        assert_eq!(all.len(), 4);
        let unique = store.refs(&top, true, true).await.unwrap();
        assert_eq!(unique.len(), 3);
        assert!(unique.contains(&shared));

        let direct = store.refs(&top, false, true).await.unwrap();
        assert_eq!(direct, vec![a, b]);
    }

    #[tokio::test]
    async fn dag_put_is_idempotent_and_digest_addressed() {
        let store = MemoryDagStore::new();
        let obj = CanonicalBytes::new(&serde_json::json!({"b": [], "a": []})).unwrap();
        let h1 = store.dag_put(&obj, DagCodec::DagCbor).await.unwrap();
        let h2 = store.dag_put(&obj, DagCodec::DagCbor).await.unwrap();
        assert_eq!(h1, h2);
        assert_eq!(h1, sha256_digest(&obj).to_content_hash());
        assert_eq!(store.dag_get(&h1).await.unwrap(), obj.as_bytes());
        assert_eq!(store.codec_of(&h1), Some(DagCodec::DagCbor));
    }

    #[tokio::test]
    async fn raw_objects_have_no_codec() {
        let store = MemoryDagStore::new();
        let raw = store.add_raw(vec![3u8; 4]).unwrap();
        assert_eq!(store.codec_of(&raw), None);
    }

    #[tokio::test]
    async fn missing_objects_are_not_found() {
        let store = MemoryDagStore::new();
        let ghost = ContentHash::new("QmGhost").unwrap();
        assert!(matches!(
            store.stat(&ghost).await,
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            store.pin(&ghost).await,
            Err(StoreError::NotFound { .. })
        ));
        assert!(store.add_node(Vec::new(), [("x", ghost)]).is_err());
    }

    #[tokio::test]
    async fn offline_and_failing_writes() {
        let store = MemoryDagStore::new();
        let h = store.add_raw(b"x".to_vec()).unwrap();
        store.set_offline(Some("maintenance"));
        assert!(matches!(
            store.stat(&h).await,
            Err(StoreError::Unavailable { .. })
        ));
        store.set_offline(None);

        store.set_failing_writes(Some("disk full"));
        assert!(store.stat(&h).await.is_ok());
        let obj = CanonicalBytes::new(&serde_json::json!({})).unwrap();
        assert!(store.dag_put(&obj, DagCodec::DagJson).await.is_err());
        assert!(store.pin(&h).await.is_err());
        store.set_failing_writes(None);
        store.pin(&h).await.unwrap();
        assert!(store.is_pinned(&h));
    }
}
