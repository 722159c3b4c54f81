//! # tally-store — Content Store Interface and Adapters
//!
//! The accounting engine never walks a DAG itself. Everything it needs from
//! the object graph goes through the [`ContentStore`] trait:
//!
//! - `stat`: a node's own payload size and its cumulative closure size
//! - `refs`: the flattened closure of hashes reachable from a node
//! - `dag_put` / `dag_get`: structured objects (ledgers) by content address
//! - `pin`: keep a written ledger from being garbage collected
//!
//! ## Adapters
//!
//! - [`MemoryDagStore`]: in-memory DAG for tests and local development.
//! - [`IpfsHttpStore`]: typed client for an IPFS (kubo) HTTP API.

pub mod config;
pub mod error;
pub mod ipfs;
pub mod memory;
pub mod store;

pub use config::IpfsConfig;
pub use error::StoreError;
pub use ipfs::IpfsHttpStore;
pub use memory::MemoryDagStore;
pub use store::{ContentStore, DagCodec, ObjectStat};
