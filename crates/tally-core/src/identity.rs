//! # Identifier Newtypes
//!
//! `Username` and `ContentHash` are validated at construction and at
//! deserialization (`serde(try_from = "String")`), so a ledger read back from
//! a store cannot smuggle in an empty or whitespace-laden hash.

use serde::{Deserialize, Serialize};

use crate::digest::ContentDigest;
use crate::error::ValidationError;

/// Maximum username length, matching the directory's `varchar(255)` column.
pub const MAX_USERNAME_LEN: usize = 255;

/// An account name in the user directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    /// Validate and wrap a username. Surrounding whitespace is trimmed.
    pub fn new(s: impl AsRef<str>) -> Result<Self, ValidationError> {
        let raw = s.as_ref();
        let trimmed = raw.trim();
        let invalid = |reason: &str| ValidationError::InvalidUsername {
            value: raw.to_string(),
            reason: reason.to_string(),
        };
        if trimmed.is_empty() {
            return Err(invalid("must not be empty"));
        }
        if trimmed.chars().count() > MAX_USERNAME_LEN {
            return Err(invalid("longer than 255 characters"));
        }
        if trimmed.chars().any(char::is_control) {
            return Err(invalid("contains control characters"));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The username as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Username {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Username> for String {
    fn from(value: Username) -> Self {
        value.0
    }
}

impl std::fmt::Display for Username {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An opaque content address: an IPFS CID, or `sha256:<hex>` for stores that
/// address objects by canonical digest.
///
/// `Ord` is plain string order, which is what makes `BTreeSet<ContentHash>`
/// serialize deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentHash(String);

impl ContentHash {
    /// Validate and wrap a content address.
    pub fn new(s: impl AsRef<str>) -> Result<Self, ValidationError> {
        let raw = s.as_ref();
        let invalid = |reason: &str| ValidationError::InvalidContentHash {
            value: raw.to_string(),
            reason: reason.to_string(),
        };
        if raw.is_empty() {
            return Err(invalid("must not be empty"));
        }
        if raw.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(invalid("contains whitespace or control characters"));
        }
        Ok(Self(raw.to_string()))
    }

    /// The content address of a canonical digest.
    pub fn from_digest(digest: &ContentDigest) -> Self {
        Self(digest.to_string())
    }

    /// The address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ContentHash {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ContentHash> for String {
    fn from(value: ContentHash) -> Self {
        value.0
    }
}

impl std::str::FromStr for ContentHash {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl std::str::FromStr for Username {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_is_trimmed() {
        let u = Username::new("  testuser ").unwrap();
        assert_eq!(u.as_str(), "testuser");
    }

    #[test]
    fn username_rejects_empty_and_control() {
        assert!(Username::new("   ").is_err());
        assert!(Username::new("bad\nname").is_err());
        assert!(Username::new("x".repeat(256)).is_err());
        assert!(Username::new("x".repeat(255)).is_ok());
    }

    #[test]
    fn content_hash_rejects_whitespace() {
        assert!(ContentHash::new("").is_err());
        assert!(ContentHash::new("Qm abc").is_err());
        assert!(ContentHash::new("QmS4ustL54uo8FzR9455qaxZwuMiUhyvMcX9Ba8nUH4uVv").is_ok());
    }

    #[test]
    fn deserialization_validates() {
        let ok: ContentHash = serde_json::from_str("\"bafyabc\"").unwrap();
        assert_eq!(ok.as_str(), "bafyabc");
        assert!(serde_json::from_str::<ContentHash>("\"\"").is_err());
        assert!(serde_json::from_str::<Username>("\"  \"").is_err());
    }

    #[test]
    fn serializes_as_plain_string() {
        let h = ContentHash::new("QmRoot").unwrap();
        assert_eq!(serde_json::to_string(&h).unwrap(), "\"QmRoot\"");
    }
}
