//! # CLI Configuration
//!
//! Loaded from an optional YAML file, then overridden from the environment:
//!
//! ```yaml
//! ipfs:
//!   api_url: http://127.0.0.1:5001
//!   timeout_secs: 30
//! directory:
//!   postgres: postgres://tally@localhost/tally
//! tiers:
//!   alice: plus
//!   bob: free
//! default_tier: light
//! ledger_codec: dag-cbor
//! timeout_secs: 60
//! ```
//!
//! `directory` takes exactly one key, `postgres` (a connection URL) or
//! `file` (a path). Without it, pointers live in `tally-users.json`.
//!
//! | Variable | Overrides |
//! |----------|-----------|
//! | `TALLY_IPFS_API_URL` | `ipfs.api_url` |
//! | `TALLY_IPFS_TIMEOUT_SECS` | `ipfs.timeout_secs` |
//! | `DATABASE_URL` | `directory` (switches to Postgres) |

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tally_billing::StaticTierTable;
use tally_core::Username;
use tally_store::config::{API_URL_VAR, TIMEOUT_VAR};
use tally_store::{DagCodec, IpfsConfig};

/// Default per-operation timeout in seconds.
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 60;

/// Default location of the file-backed directory.
pub const DEFAULT_DIRECTORY_FILE: &str = "tally-users.json";

/// Where ledger pointers are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectoryConfig {
    /// Postgres connection URL.
    Postgres(String),
    /// JSON file path.
    File(PathBuf),
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self::File(PathBuf::from(DEFAULT_DIRECTORY_FILE))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TallyConfig {
    /// IPFS API settings; the local daemon when absent.
    #[serde(default)]
    pub ipfs: Option<IpfsConfig>,
    #[serde(default, with = "serde_yaml::with::singleton_map")]
    pub directory: DirectoryConfig,
    /// Username → tier name.
    #[serde(default)]
    pub tiers: BTreeMap<String, String>,
    /// Tier for users missing from `tiers`.
    #[serde(default)]
    pub default_tier: Option<String>,
    /// Codec new ledgers are written with.
    #[serde(default)]
    pub ledger_codec: DagCodec,
    /// Deadline for one whole command, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_OPERATION_TIMEOUT_SECS
}

impl Default for TallyConfig {
    fn default() -> Self {
        Self {
            ipfs: None,
            directory: DirectoryConfig::default(),
            tiers: BTreeMap::new(),
            default_tier: None,
            ledger_codec: DagCodec::default(),
            timeout_secs: DEFAULT_OPERATION_TIMEOUT_SECS,
        }
    }
}

impl TallyConfig {
    /// Read `path` if given, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("failed to parse config: {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Effective IPFS settings.
    pub fn ipfs_config(&self) -> Result<IpfsConfig> {
        match &self.ipfs {
            Some(ipfs) => Ok(ipfs.clone()),
            None => Ok(IpfsConfig::local_daemon()?),
        }
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if lookup(API_URL_VAR).is_some() || lookup(TIMEOUT_VAR).is_some() {
            let mut ipfs = self.ipfs_config()?;
            ipfs.apply_overrides(&lookup)?;
            self.ipfs = Some(ipfs);
        }
        if let Some(url) = lookup("DATABASE_URL") {
            self.directory = DirectoryConfig::Postgres(url);
        }
        Ok(())
    }

    /// Tier table built from `tiers` and `default_tier`.
    pub fn tier_table(&self) -> Result<StaticTierTable> {
        let mut table = StaticTierTable::new();
        if let Some(default) = &self.default_tier {
            table = table.with_default(default.clone());
        }
        for (user, tier) in &self.tiers {
            let username =
                Username::new(user).with_context(|| format!("invalid username in tiers: {user}"))?;
            table.set(username, tier.clone());
        }
        Ok(table)
    }
}
