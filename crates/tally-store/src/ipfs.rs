//! # IPFS HTTP API client
//!
//! Implements [`ContentStore`] against a kubo-compatible HTTP API. All calls
//! are `POST {api_url}/api/v0/{command}` with arguments in the query string:
//!
//! | Trait method | Command |
//! |--------------|---------|
//! | `stat`       | `object/stat?arg=<hash>` |
//! | `refs`       | `refs?arg=<hash>&recursive=<b>&unique=<b>` (NDJSON) |
//! | `dag_put`    | `dag/put?store-codec=<c>&input-codec=dag-json` (multipart) |
//! | `dag_get`    | `dag/get?arg=<hash>` |
//! | `pin`        | `pin/add?arg=<hash>` |
//!
//! No request is retried here.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tally_core::{CanonicalBytes, ContentHash};
use url::Url;

use crate::config::IpfsConfig;
use crate::error::StoreError;
use crate::store::{ContentStore, DagCodec, ObjectStat};

/// Content store backed by an IPFS node's HTTP API.
#[derive(Debug, Clone)]
pub struct IpfsHttpStore {
    http: reqwest::Client,
    api_url: Url,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StatResponse {
    data_size: u64,
    cumulative_size: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RefLine {
    #[serde(rename = "Ref")]
    reference: String,
    #[serde(default)]
    err: String,
}

#[derive(Deserialize)]
struct CidLink {
    #[serde(rename = "/")]
    cid: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DagPutResponse {
    cid: CidLink,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiErrorBody {
    message: String,
}

impl IpfsHttpStore {
    /// Build a client from configuration.
    pub fn new(config: &IpfsConfig) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StoreError::Transport {
                endpoint: "client_init".into(),
                source: e,
            })?;
        Ok(Self {
            http,
            api_url: config.api_url.clone(),
        })
    }

    fn command_url(&self, command: &str) -> Result<Url, StoreError> {
        self.api_url
            .join(&format!("api/v0/{command}"))
            .map_err(|e| StoreError::Malformed {
                endpoint: command.to_string(),
                reason: format!("cannot build URL from {}: {e}", self.api_url),
            })
    }

    /// Send a request and return the successful response, mapping non-2xx
    /// statuses to [`StoreError::Backend`] (or `NotFound` when the daemon
    /// reports a missing block).
    async fn send(
        &self,
        endpoint: &str,
        request: reqwest::RequestBuilder,
        hash: Option<&ContentHash>,
    ) -> Result<reqwest::Response, StoreError> {
        let resp = request.send().await.map_err(|e| StoreError::Transport {
            endpoint: endpoint.to_string(),
            source: e,
        })?;
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|b| b.message)
            .unwrap_or(body);
        if let Some(hash) = hash {
            if message.contains("not found") {
                return Err(StoreError::NotFound {
                    hash: hash.to_string(),
                });
            }
        }
        Err(StoreError::Backend {
            endpoint: endpoint.to_string(),
            status,
            message,
        })
    }

    fn malformed(endpoint: &str, reason: impl std::fmt::Display) -> StoreError {
        StoreError::Malformed {
            endpoint: endpoint.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl ContentStore for IpfsHttpStore {
    async fn stat(&self, hash: &ContentHash) -> Result<ObjectStat, StoreError> {
        let endpoint = "POST /api/v0/object/stat";
        let url = self.command_url("object/stat")?;
        let req = self.http.post(url).query(&[("arg", hash.as_str())]);
        let resp = self.send(endpoint, req, Some(hash)).await?;
        let stat: StatResponse = resp
            .json()
            .await
            .map_err(|e| Self::malformed(endpoint, e))?;
        Ok(ObjectStat {
            data_size: stat.data_size,
            cumulative_size: stat.cumulative_size,
        })
    }

    async fn refs(
        &self,
        hash: &ContentHash,
        recursive: bool,
        unique: bool,
    ) -> Result<Vec<ContentHash>, StoreError> {
        let endpoint = "POST /api/v0/refs";
        let url = self.command_url("refs")?;
        let req = self.http.post(url).query(&[
            ("arg", hash.as_str()),
            ("recursive", if recursive { "true" } else { "false" }),
            ("unique", if unique { "true" } else { "false" }),
        ]);
        let body = self
            .send(endpoint, req, Some(hash))
            .await?
            .text()
            .await
            .map_err(|e| Self::malformed(endpoint, e))?;

        let mut refs = Vec::new();
        for line in body.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let parsed: RefLine =
                serde_json::from_str(line).map_err(|e| Self::malformed(endpoint, e))?;
            if !parsed.err.is_empty() {
                return Err(StoreError::Backend {
                    endpoint: endpoint.to_string(),
                    status: 200,
                    message: parsed.err,
                });
            }
            refs.push(
                ContentHash::new(&parsed.reference).map_err(|e| Self::malformed(endpoint, e))?,
            );
        }
        tracing::debug!(%hash, count = refs.len(), "fetched refs");
        Ok(refs)
    }

    async fn dag_put(
        &self,
        object: &CanonicalBytes,
        codec: DagCodec,
    ) -> Result<ContentHash, StoreError> {
        let endpoint = "POST /api/v0/dag/put";
        let url = self.command_url("dag/put")?;
        let part = reqwest::multipart::Part::bytes(object.as_bytes().to_vec())
            .file_name("object.json")
            .mime_str("application/json")
            .map_err(|e| StoreError::Transport {
                endpoint: endpoint.to_string(),
                source: e,
            })?;
        let form = reqwest::multipart::Form::new().part("file", part);
        let req = self
            .http
            .post(url)
            .query(&[
                ("store-codec", codec.as_str()),
                ("input-codec", "dag-json"),
                ("pin", "false"),
            ])
            .multipart(form);
        let resp: DagPutResponse = self
            .send(endpoint, req, None)
            .await?
            .json()
            .await
            .map_err(|e| Self::malformed(endpoint, e))?;
        ContentHash::new(&resp.cid.cid).map_err(|e| Self::malformed(endpoint, e))
    }

    async fn dag_get(&self, hash: &ContentHash) -> Result<Vec<u8>, StoreError> {
        let endpoint = "POST /api/v0/dag/get";
        let url = self.command_url("dag/get")?;
        let req = self.http.post(url).query(&[("arg", hash.as_str())]);
        let bytes = self
            .send(endpoint, req, Some(hash))
            .await?
            .bytes()
            .await
            .map_err(|e| Self::malformed(endpoint, e))?;
        Ok(bytes.to_vec())
    }

    async fn pin(&self, hash: &ContentHash) -> Result<(), StoreError> {
        let endpoint = "POST /api/v0/pin/add";
        let url = self.command_url("pin/add")?;
        let req = self.http.post(url).query(&[("arg", hash.as_str())]);
        self.send(endpoint, req, Some(hash)).await?;
        Ok(())
    }
}
