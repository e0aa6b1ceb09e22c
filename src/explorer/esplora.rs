use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{BlockExplorer, BlockSummary, ExplorerError, TxStatus};
use crate::config::ExplorerConfig;

/// REST client for Esplora-compatible explorers (Blockstream, mempool.space).
#[derive(Clone, Debug)]
pub struct EsploraClient {
    inner: Client,
    base: Url,
}

impl EsploraClient {
    pub fn from_config(config: &ExplorerConfig) -> Result<Self, ExplorerError> {
        Self::from_endpoint(
            &config.base_url,
            config.connect_timeout(),
            config.read_timeout(),
        )
    }

    /// Builds a client from a string base URL such as `https://blockstream.info/api`.
    pub fn from_endpoint(
        endpoint: &str,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Result<Self, ExplorerError> {
        let url =
            Url::parse(endpoint).map_err(|err| ExplorerError::InvalidEndpoint(err.to_string()))?;
        Self::from_url(url, connect_timeout, read_timeout)
    }

    pub fn from_url(
        url: Url,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Result<Self, ExplorerError> {
        if url.cannot_be_a_base() {
            return Err(ExplorerError::InvalidEndpoint(url.to_string()));
        }
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .read_timeout(read_timeout)
            .build()?;
        Ok(Self {
            inner: client,
            base: url,
        })
    }

    /// Returns the base URL used by the client.
    pub fn endpoint(&self) -> &Url {
        &self.base
    }

    fn url_for(&self, segments: &[&str]) -> Result<Url, ExplorerError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ExplorerError::InvalidEndpoint(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get(&self, segments: &[&str]) -> Result<Response, ExplorerError> {
        let url = self.url_for(segments)?;
        debug!(%url, "querying block explorer");
        let response = self.inner.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ExplorerError::HttpStatus(response.status()));
        }
        Ok(response)
    }

    async fn get_json<R: DeserializeOwned>(&self, segments: &[&str]) -> Result<R, ExplorerError> {
        let body = self.get(segments).await?.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl BlockExplorer for EsploraClient {
    async fn tx_status(&self, txid: &str) -> Result<TxStatus, ExplorerError> {
        self.get_json(&["tx", txid, "status"]).await
    }

    async fn block(&self, block_hash: &str) -> Result<BlockSummary, ExplorerError> {
        self.get_json(&["block", block_hash]).await
    }

    async fn block_hash_at_height(&self, height: u64) -> Result<String, ExplorerError> {
        let height = height.to_string();
        let body = self.get(&["block-height", &height]).await?.text().await?;
        let hash = body.trim();
        if hash.len() != 64 || !hash.bytes().all(|byte| byte.is_ascii_hexdigit()) {
            return Err(ExplorerError::Malformed(format!(
                "expected a 64-hex block hash, got {} bytes",
                hash.len()
            )));
        }
        Ok(hash.to_ascii_lowercase())
    }
}
