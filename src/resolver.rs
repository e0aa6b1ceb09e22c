//! Best-effort resolution of partial block metadata.
//!
//! Steps run in a fixed priority order and only fill fields that are still
//! absent. A failing lookup is recorded in the [`Resolution`] trace and leaves
//! its field empty; it never aborts the remaining steps.

use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::explorer::{BlockExplorer, BlockSummary, ExplorerError};

/// Lookup steps in priority order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupStep {
    /// txid → block time (and block hash).
    TxStatus,
    /// height → block hash.
    HashByHeight,
    /// block hash → block time.
    TimeByHash,
    /// height → block hash → block time.
    TimeByHeight,
}

impl LookupStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            LookupStep::TxStatus => "tx_status",
            LookupStep::HashByHeight => "hash_by_height",
            LookupStep::TimeByHash => "time_by_hash",
            LookupStep::TimeByHeight => "time_by_height",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum LookupOutcome {
    /// The step filled at least one field.
    Resolved,
    /// The explorer answered but had nothing usable (e.g. unconfirmed tx).
    Missing,
    /// Transport, status or decoding failure.
    Failed(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LookupTrace {
    pub step: LookupStep,
    pub outcome: LookupOutcome,
}

/// Result of a resolution run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub block_hash: Option<String>,
    pub block_height: Option<u64>,
    /// ISO-8601 UTC instant, e.g. `2024-01-15T10:30:00Z`.
    pub block_time: Option<String>,
    pub trace: Vec<LookupTrace>,
}

impl Resolution {
    /// Returns `true` when `step` was executed.
    pub fn attempted(&self, step: LookupStep) -> bool {
        self.trace.iter().any(|entry| entry.step == step)
    }

    pub fn outcome(&self, step: LookupStep) -> Option<&LookupOutcome> {
        self.trace
            .iter()
            .find(|entry| entry.step == step)
            .map(|entry| &entry.outcome)
    }

    fn record(&mut self, step: LookupStep, outcome: LookupOutcome) {
        match &outcome {
            LookupOutcome::Failed(reason) => {
                warn!(step = step.as_str(), %reason, "block explorer lookup failed")
            }
            _ => debug!(step = step.as_str(), ?outcome, "block explorer lookup finished"),
        }
        self.trace.push(LookupTrace { step, outcome });
    }

    fn fill_hash(&mut self, hash: Option<String>) -> bool {
        if self.block_hash.is_none() && hash.is_some() {
            self.block_hash = hash;
            return true;
        }
        false
    }

    fn fill_height(&mut self, height: Option<u64>) {
        if self.block_height.is_none() {
            self.block_height = height;
        }
    }

    fn fill_time(&mut self, epoch: Option<i64>) -> Result<bool, String> {
        if self.block_time.is_some() {
            return Ok(false);
        }
        match epoch {
            Some(epoch) => {
                self.block_time = Some(iso8601(epoch)?);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Renders epoch seconds as an ISO-8601 UTC instant.
pub fn iso8601(epoch: i64) -> Result<String, String> {
    OffsetDateTime::from_unix_timestamp(epoch)
        .map_err(|err| format!("timestamp {epoch} out of range: {err}"))?
        .format(&Rfc3339)
        .map_err(|err| format!("unable to format timestamp {epoch}: {err}"))
}

/// Fills block hash, height and time from whatever partial metadata is known.
#[derive(Clone, Debug)]
pub struct BlockResolver<X> {
    explorer: X,
}

impl<X: BlockExplorer> BlockResolver<X> {
    pub fn new(explorer: X) -> Self {
        Self { explorer }
    }

    pub fn explorer(&self) -> &X {
        &self.explorer
    }

    /// Runs the lookup chain. Never fails; see [`Resolution::trace`] for what
    /// was attempted.
    pub async fn resolve(
        &self,
        txid: Option<&str>,
        block_hash: Option<&str>,
        block_height: Option<u64>,
    ) -> Resolution {
        let mut resolution = Resolution {
            block_hash: block_hash.map(str::to_owned),
            block_height,
            ..Resolution::default()
        };

        if let Some(txid) = txid {
            let outcome = self.time_from_tx(txid, &mut resolution).await;
            resolution.record(LookupStep::TxStatus, outcome);
        }

        if resolution.block_hash.is_none() && resolution.block_time.is_none() {
            if let Some(height) = resolution.block_height {
                let outcome = match self.explorer.block_hash_at_height(height).await {
                    Ok(hash) => {
                        resolution.fill_hash(Some(hash));
                        LookupOutcome::Resolved
                    }
                    Err(err) => failed(err),
                };
                resolution.record(LookupStep::HashByHeight, outcome);
            }
        }

        if resolution.block_time.is_none() {
            if let Some(hash) = resolution.block_hash.clone() {
                let outcome = match self.explorer.block(&hash).await {
                    Ok(block) => apply_block(&mut resolution, &block),
                    Err(err) => failed(err),
                };
                resolution.record(LookupStep::TimeByHash, outcome);
            }
        }

        if resolution.block_time.is_none() {
            if let Some(height) = resolution.block_height {
                let outcome = self.time_from_height(height, &mut resolution).await;
                resolution.record(LookupStep::TimeByHeight, outcome);
            }
        }

        resolution
    }

    async fn time_from_tx(&self, txid: &str, resolution: &mut Resolution) -> LookupOutcome {
        let status = match self.explorer.tx_status(txid).await {
            Ok(status) => status,
            Err(err) => return failed(err),
        };
        if !status.confirmed && status.block_hash.is_none() {
            return LookupOutcome::Missing;
        }
        resolution.fill_height(status.block_height);
        let filled_hash = resolution.fill_hash(status.block_hash);
        match resolution.fill_time(status.block_time) {
            Ok(true) => LookupOutcome::Resolved,
            Ok(false) if filled_hash => LookupOutcome::Resolved,
            Ok(false) => LookupOutcome::Missing,
            Err(reason) => LookupOutcome::Failed(reason),
        }
    }

    async fn time_from_height(&self, height: u64, resolution: &mut Resolution) -> LookupOutcome {
        let hash = match self.explorer.block_hash_at_height(height).await {
            Ok(hash) => hash,
            Err(err) => return failed(err),
        };
        match self.explorer.block(&hash).await {
            Ok(block) => {
                resolution.fill_hash(Some(hash));
                apply_block(resolution, &block)
            }
            Err(err) => failed(err),
        }
    }
}

fn apply_block(resolution: &mut Resolution, block: &BlockSummary) -> LookupOutcome {
    resolution.fill_height(block.height);
    match resolution.fill_time(Some(block.timestamp)) {
        Ok(_) => LookupOutcome::Resolved,
        Err(reason) => LookupOutcome::Failed(reason),
    }
}

fn failed(err: ExplorerError) -> LookupOutcome {
    LookupOutcome::Failed(err.to_string())
}
