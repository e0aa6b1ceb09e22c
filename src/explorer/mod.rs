//! Block explorer lookups used to enrich verification results.

pub mod esplora;

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use self::esplora::EsploraClient;

/// Confirmation status of a transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxStatus {
    #[serde(default)]
    pub confirmed: bool,
    pub block_height: Option<u64>,
    pub block_hash: Option<String>,
    /// Block timestamp in epoch seconds.
    pub block_time: Option<i64>,
}

/// Subset of a block header returned by the explorer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSummary {
    pub id: String,
    pub height: Option<u64>,
    /// Block timestamp in epoch seconds.
    #[serde(alias = "time")]
    pub timestamp: i64,
}

/// The three logical queries the block resolver relies on.
#[async_trait]
pub trait BlockExplorer: Send + Sync {
    async fn tx_status(&self, txid: &str) -> Result<TxStatus, ExplorerError>;

    async fn block(&self, block_hash: &str) -> Result<BlockSummary, ExplorerError>;

    async fn block_hash_at_height(&self, height: u64) -> Result<String, ExplorerError>;
}

#[async_trait]
impl<T: BlockExplorer + ?Sized> BlockExplorer for Arc<T> {
    async fn tx_status(&self, txid: &str) -> Result<TxStatus, ExplorerError> {
        (**self).tx_status(txid).await
    }

    async fn block(&self, block_hash: &str) -> Result<BlockSummary, ExplorerError> {
        (**self).block(block_hash).await
    }

    async fn block_hash_at_height(&self, height: u64) -> Result<String, ExplorerError> {
        (**self).block_hash_at_height(height).await
    }
}

/// Errors produced by [`BlockExplorer`] implementations.
#[derive(Debug, Error)]
pub enum ExplorerError {
    #[error("invalid explorer endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("explorer transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("explorer returned HTTP status {0}")]
    HttpStatus(StatusCode),
    #[error("explorer JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("explorer returned a malformed body: {0}")]
    Malformed(String),
}
