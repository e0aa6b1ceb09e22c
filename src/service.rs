//! Proof lifecycle facade: stamp, upgrade, inspect and verify serialized
//! proofs without exposing the engine's proof type to callers.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::config::LifecycleConfig;
use crate::engine::ProofEngine;
use crate::errors::{LifecycleError, LifecycleResult};
use crate::explorer::{BlockExplorer, EsploraClient};
use crate::record::StampRecord;
use crate::store::ProofStore;
use crate::upgrade::{RetryPolicy, RetryReport, UpgradeLoop, UpgradeOutcome};
use crate::verify::{VerificationRecord, Verifier};

pub struct TimestampService<E, X> {
    verifier: Verifier<E, X>,
    policy: RetryPolicy,
}

impl<E: ProofEngine> TimestampService<E, EsploraClient> {
    /// Builds a service talking to the Esplora endpoint named in `config`.
    pub fn from_config(engine: Arc<E>, config: &LifecycleConfig) -> LifecycleResult<Self> {
        let explorer = EsploraClient::from_config(&config.explorer)
            .map_err(|err| LifecycleError::Config(err.to_string()))?;
        Ok(Self::new(engine, explorer, config.retry.policy()))
    }
}

impl<E, X> TimestampService<E, X>
where
    E: ProofEngine,
    X: BlockExplorer,
{
    pub fn new(engine: Arc<E>, explorer: X, policy: RetryPolicy) -> Self {
        Self {
            verifier: Verifier::new(engine, explorer),
            policy,
        }
    }

    pub fn engine(&self) -> &Arc<E> {
        self.verifier.engine()
    }

    pub fn verifier(&self) -> &Verifier<E, X> {
        &self.verifier
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Creates a proof for `document` and returns its serialized form.
    pub async fn stamp(&self, document: &[u8]) -> LifecycleResult<Vec<u8>> {
        if document.is_empty() {
            return Err(LifecycleError::MissingDocument);
        }
        let proof = self.engine().create_proof(document).await?;
        let bytes = self.engine().serialize(&proof)?;
        info!(size = bytes.len(), "document stamped");
        Ok(bytes)
    }

    /// Stamps `document` and wraps the proof in a fresh [`StampRecord`].
    pub async fn stamp_record(
        &self,
        original_file_name: &str,
        document: &[u8],
    ) -> LifecycleResult<StampRecord> {
        let proof = self.stamp(document).await?;
        Ok(StampRecord::new(original_file_name, document, proof))
    }

    /// Single upgrade attempt on serialized proof bytes.
    pub async fn upgrade(&self, proof_bytes: &[u8]) -> LifecycleResult<UpgradeOutcome> {
        let mut proof = self.decode(proof_bytes)?;
        if !self.engine().upgrade(&mut proof).await? {
            debug!("no new attestations");
            return Ok(UpgradeOutcome::Pending);
        }
        let bytes = self.engine().serialize(&proof)?;
        info!(size = bytes.len(), "proof upgraded");
        Ok(UpgradeOutcome::Upgraded(bytes))
    }

    pub fn info(&self, proof_bytes: &[u8]) -> LifecycleResult<String> {
        let proof = self.decode(proof_bytes)?;
        self.engine().describe(&proof)
    }

    /// Returns whether the engine confirmed at least one attestation.
    pub async fn verify(&self, proof_bytes: &[u8], document: &[u8]) -> LifecycleResult<bool> {
        if document.is_empty() {
            return Err(LifecycleError::MissingDocument);
        }
        let proof = self.decode(proof_bytes)?;
        let evidence = self.engine().verify(&proof, document).await?;
        Ok(!evidence.is_empty())
    }

    pub async fn verify_and_enrich(
        &self,
        proof_bytes: &[u8],
        document: &[u8],
    ) -> LifecycleResult<VerificationRecord> {
        let proof = self.decode(proof_bytes)?;
        self.verifier.verify_and_enrich(&proof, document).await
    }

    /// Runs the bounded upgrade loop against `store` with this service's
    /// retry policy.
    pub async fn upgrade_with_retries<S: ProofStore>(
        &self,
        store: &mut S,
        document: &[u8],
        shutdown: watch::Receiver<bool>,
    ) -> LifecycleResult<RetryReport> {
        UpgradeLoop::new(&self.verifier, self.policy)
            .run(store, document, shutdown)
            .await
    }

    fn decode(&self, proof_bytes: &[u8]) -> LifecycleResult<E::Proof> {
        if proof_bytes.is_empty() {
            return Err(LifecycleError::MissingProof);
        }
        self.engine().deserialize(proof_bytes)
    }
}
