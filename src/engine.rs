//! Boundary to the cryptographic proof engine.
//!
//! The lifecycle services never look inside a proof. Everything they need is
//! reached through [`ProofEngine`], which owns the proof format, the calendar
//! transport and the hash-chain verification.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::errors::LifecycleResult;

/// Verification output: attestation reference mapped to its confirmation
/// evidence, both rendered as text by the engine.
pub type RawEvidence = BTreeMap<String, String>;

/// Capabilities the lifecycle services consume from a proof engine.
///
/// `deserialize` must fail with [`LifecycleError::ProofFormat`] on malformed
/// bytes.
///
/// [`LifecycleError::ProofFormat`]: crate::errors::LifecycleError::ProofFormat
#[async_trait]
pub trait ProofEngine: Send + Sync {
    /// Opaque proof handle. Only the engine mutates it.
    type Proof: Send + Sync;

    /// Builds a fresh proof for `document` and submits it to the calendars.
    async fn create_proof(&self, document: &[u8]) -> LifecycleResult<Self::Proof>;

    fn serialize(&self, proof: &Self::Proof) -> LifecycleResult<Vec<u8>>;

    fn deserialize(&self, bytes: &[u8]) -> LifecycleResult<Self::Proof>;

    /// Queries for newer attestations, mutating `proof` in place. Returns
    /// whether the proof changed.
    async fn upgrade(&self, proof: &mut Self::Proof) -> LifecycleResult<bool>;

    /// Verifies `proof` against `document`. An empty map means no attestation
    /// could be confirmed yet.
    async fn verify(&self, proof: &Self::Proof, document: &[u8]) -> LifecycleResult<RawEvidence>;

    /// Human-readable description of the proof's operations and attestations.
    fn describe(&self, proof: &Self::Proof) -> LifecycleResult<String>;
}
