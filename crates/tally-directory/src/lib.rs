//! # tally-directory — User Ledger Pointers
//!
//! Maps each [`Username`](tally_core::Username) to the content hash of that
//! user's current dedup ledger. The directory owns nothing else: ledger bytes
//! live in the content store, and billing data lives elsewhere.
//!
//! ## Entry States
//!
//! | `find` result | Meaning |
//! |---------------|---------|
//! | `None` | user has never been registered |
//! | `Some(entry)` with `ledger: None` | registered, no upload billed yet |
//! | `Some(entry)` with `ledger: Some(h)` | current ledger is `h` |
//!
//! ## Crate Policy
//!
//! - Pointer writes are compare-and-swap. A writer names the pointer it read,
//!   and the write fails with [`DirectoryError::Conflict`] if another writer
//!   got there first.
//! - Entries are never deleted.

pub mod directory;
pub mod error;
pub mod file;
pub mod memory;
pub mod postgres;

pub use directory::{DirectoryEntry, UserDirectory};
pub use error::DirectoryError;
pub use file::JsonFileDirectory;
pub use memory::MemoryDirectory;
pub use postgres::PgDirectory;
