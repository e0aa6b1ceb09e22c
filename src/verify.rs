use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::engine::{ProofEngine, RawEvidence};
use crate::errors::{LifecycleError, LifecycleResult};
use crate::explorer::BlockExplorer;
use crate::extract::{extract_with_fallback, ExtractedMetadata};
use crate::resolver::{BlockResolver, Resolution};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum VerificationStatus {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "FAIL")]
    Fail,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Ok => "OK",
            VerificationStatus::Fail => "FAIL",
        }
    }
}

/// Structured outcome of verifying a proof against its document.
///
/// `status` is `OK` exactly when the engine returned at least one piece of
/// evidence. Missing block metadata never affects it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VerificationRecord {
    status: VerificationStatus,
    #[serde(rename = "info")]
    description: Option<String>,
    txid: Option<String>,
    block_hash: Option<String>,
    block_height: Option<u64>,
    block_time: Option<String>,
    #[serde(rename = "rawVerifyResults")]
    raw_evidence: RawEvidence,
}

impl VerificationRecord {
    pub fn assemble(
        description: Option<String>,
        extracted: ExtractedMetadata,
        resolution: Resolution,
        raw_evidence: RawEvidence,
    ) -> Self {
        let status = if raw_evidence.is_empty() {
            VerificationStatus::Fail
        } else {
            VerificationStatus::Ok
        };
        Self {
            status,
            description,
            txid: extracted.txid,
            block_hash: resolution.block_hash,
            block_height: resolution.block_height.or(extracted.block_height),
            block_time: resolution.block_time,
            raw_evidence,
        }
    }

    pub fn status(&self) -> VerificationStatus {
        self.status
    }

    pub fn is_verified(&self) -> bool {
        self.status == VerificationStatus::Ok
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn txid(&self) -> Option<&str> {
        self.txid.as_deref()
    }

    pub fn block_hash(&self) -> Option<&str> {
        self.block_hash.as_deref()
    }

    pub fn block_height(&self) -> Option<u64> {
        self.block_height
    }

    pub fn block_time(&self) -> Option<&str> {
        self.block_time.as_deref()
    }

    pub fn raw_evidence(&self) -> &RawEvidence {
        &self.raw_evidence
    }
}

/// Verification pipeline: engine verify, description, extraction, block
/// resolution. Nothing is cached between calls.
pub struct Verifier<E, X> {
    engine: Arc<E>,
    resolver: BlockResolver<X>,
}

impl<E, X> Verifier<E, X>
where
    E: ProofEngine,
    X: BlockExplorer,
{
    pub fn new(engine: Arc<E>, explorer: X) -> Self {
        Self {
            engine,
            resolver: BlockResolver::new(explorer),
        }
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    pub fn resolver(&self) -> &BlockResolver<X> {
        &self.resolver
    }

    /// Verifies `proof` against `document` and enriches the result with block
    /// metadata. Engine verification errors propagate; everything after that
    /// is best-effort.
    pub async fn verify_and_enrich(
        &self,
        proof: &E::Proof,
        document: &[u8],
    ) -> LifecycleResult<VerificationRecord> {
        if document.is_empty() {
            return Err(LifecycleError::MissingDocument);
        }

        let evidence = self.engine.verify(proof, document).await?;
        let description = match self.engine.describe(proof) {
            Ok(text) => Some(text),
            Err(err) => {
                warn!(error = %err, "proof description unavailable");
                None
            }
        };

        let extracted = extract_with_fallback(description.as_deref(), &evidence);
        debug!(
            evidence = evidence.len(),
            txid = extracted.txid.as_deref(),
            block_height = extracted.block_height,
            "extracted block metadata"
        );
        let resolution = self
            .resolver
            .resolve(extracted.txid.as_deref(), None, extracted.block_height)
            .await;

        Ok(VerificationRecord::assemble(
            description,
            extracted,
            resolution,
            evidence,
        ))
    }
}
