//! Construction of the store, directory, and accountant from configuration.

use std::sync::Arc;

use anyhow::{Context, Result};
use tally_directory::{JsonFileDirectory, PgDirectory, UserDirectory};
use tally_ledger::DedupAccountant;
use tally_store::IpfsHttpStore;

use crate::config::{DirectoryConfig, TallyConfig};

pub type SharedDirectory = Arc<dyn UserDirectory>;

pub type Accountant = DedupAccountant<IpfsHttpStore, SharedDirectory>;

/// Open the configured directory. Postgres migrations run on connect.
pub async fn open_directory(config: &TallyConfig) -> Result<SharedDirectory> {
    match &config.directory {
        DirectoryConfig::Postgres(url) => {
            let dir = PgDirectory::connect(url)
                .await
                .context("failed to open Postgres directory")?;
            Ok(Arc::new(dir))
        }
        DirectoryConfig::File(path) => {
            tracing::debug!(path = %path.display(), "using file directory");
            Ok(Arc::new(JsonFileDirectory::new(path)))
        }
    }
}

pub fn open_store(config: &TallyConfig) -> Result<IpfsHttpStore> {
    let ipfs = config.ipfs_config()?;
    tracing::debug!(api_url = %ipfs.api_url, "using IPFS HTTP API");
    IpfsHttpStore::new(&ipfs).context("failed to build IPFS client")
}

pub async fn open_accountant(config: &TallyConfig) -> Result<Accountant> {
    let store = open_store(config)?;
    let directory = open_directory(config).await?;
    Ok(DedupAccountant::new(store, directory).with_codec(config.ledger_codec))
}
