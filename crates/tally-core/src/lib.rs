//! # tally-core — Foundational Types for Tally
//!
//! Every other crate in the workspace depends on `tally-core`; it depends on
//! nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `Username` and `ContentHash` have
//!    validated constructors. A username can never be passed where a content
//!    address is expected.
//!
//! 2. **`CanonicalBytes` newtype.** Every object that is hashed or written to a
//!    content store flows through `CanonicalBytes::new()`. Two values with the
//!    same logical content always produce the same bytes, so a ledger's
//!    identity depends only on its membership.
//!
//! 3. **`sha256_digest()` accepts only `&CanonicalBytes`.** Digests over
//!    non-canonical bytes are unrepresentable.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `tally-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;

pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, ContentDigest};
pub use error::{CanonicalizationError, ValidationError};
pub use identity::{ContentHash, Username};
