//! # Content Digest
//!
//! SHA-256 digests over `CanonicalBytes`. A digest renders as
//! `sha256:<64 hex chars>`, which is also the address format used by stores
//! that key objects by their canonical digest (see `tally-store`'s
//! in-memory DAG).

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::canonical::CanonicalBytes;
use crate::error::ValidationError;
use crate::identity::ContentHash;

/// Prefix of the textual digest form.
pub const SHA256_PREFIX: &str = "sha256:";

/// A SHA-256 content digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentDigest([u8; 32]);

impl ContentDigest {
    /// Wrap a raw 32-byte digest.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex rendering, without prefix.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Parse `sha256:<hex>` back into a digest.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let invalid = |reason: &str| ValidationError::InvalidContentHash {
            value: s.to_string(),
            reason: reason.to_string(),
        };
        let hex = s
            .strip_prefix(SHA256_PREFIX)
            .ok_or_else(|| invalid("missing sha256: prefix"))?;
        if hex.len() != 64 {
            return Err(invalid("digest must be 64 hex chars"));
        }
        let mut bytes = [0u8; 32];
        for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
            let pair = std::str::from_utf8(chunk).map_err(|_| invalid("non-ascii digest"))?;
            bytes[i] = u8::from_str_radix(pair, 16).map_err(|_| invalid("non-hex digest"))?;
        }
        Ok(Self(bytes))
    }

    /// The digest as a content address.
    pub fn to_content_hash(&self) -> ContentHash {
        ContentHash::from_digest(self)
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{SHA256_PREFIX}{}", self.to_hex())
    }
}

/// Compute the SHA-256 digest of canonical bytes.
pub fn sha256_digest(data: &CanonicalBytes) -> ContentDigest {
    ContentDigest(Sha256::digest(data.as_bytes()).into())
}
