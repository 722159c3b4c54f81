//! # tally-ledger — Dedup Ledger and Accountant
//!
//! A user's [`Ledger`] records every root hash and every descendant hash
//! they have ever been billed for. The [`DedupAccountant`] consults it to
//! answer two questions:
//!
//! - **quote**: how many bytes would uploading `hash` newly cost this user?
//! - **update**: commit `hash` into the ledger, returning the new ledger's
//!   address or `None` when the ledger already covers it.
//!
//! Both take a [`CallContext`] carrying a deadline and a cancellation token;
//! every store and directory call is bounded by it.
//!
//! ## Crate Policy
//!
//! - A hash that is in a user's ledger is never billed to that user again.
//! - Ledgers only grow. No operation removes a member.
//! - Ledger bytes that fail to decode are an error, never an empty ledger.
//! - Graph traversal is delegated to the content store's `refs`.

pub mod accountant;
pub mod context;
pub mod error;
pub mod ledger;

pub use accountant::{Assessment, DedupAccountant};
pub use context::{CallContext, Interruption};
pub use error::AccountingError;
pub use ledger::{Ledger, EMPTY_LEDGER_DIGEST};
