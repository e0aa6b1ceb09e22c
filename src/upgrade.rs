//! Bounded polling loop that upgrades a pending proof until it verifies.
//!
//! Each attempt reloads the proof from its [`ProofStore`], asks the engine for
//! newer attestations and, when the proof changed, persists it and runs the
//! verification pipeline. Attempt failures are logged and retried; only an
//! explicit cancellation during the inter-attempt wait ends the loop early
//! with an error.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::time;
use tracing::{info, warn};

use crate::engine::ProofEngine;
use crate::errors::{LifecycleError, LifecycleResult};
use crate::explorer::BlockExplorer;
use crate::store::ProofStore;
use crate::verify::{VerificationRecord, Verifier};

const DEFAULT_MAX_ATTEMPTS: u32 = 6;
const DEFAULT_INTERVAL: Duration = Duration::from_secs(600);

/// Attempt budget and inter-attempt delay.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    interval: Duration,
}

impl RetryPolicy {
    /// A zero attempt budget is raised to one.
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_INTERVAL)
    }
}

/// Result of a single upgrade call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UpgradeOutcome {
    /// New attestations were found; carries the re-serialized proof.
    Upgraded(Vec<u8>),
    /// Nothing new yet.
    Pending,
}

impl UpgradeOutcome {
    pub fn changed(&self) -> bool {
        matches!(self, UpgradeOutcome::Upgraded(_))
    }

    pub fn proof_bytes(&self) -> Option<&[u8]> {
        match self {
            UpgradeOutcome::Upgraded(bytes) => Some(bytes),
            UpgradeOutcome::Pending => None,
        }
    }

    pub fn into_proof_bytes(self) -> Option<Vec<u8>> {
        match self {
            UpgradeOutcome::Upgraded(bytes) => Some(bytes),
            UpgradeOutcome::Pending => None,
        }
    }

    /// Structured signal returned to clients when there is nothing to hand back.
    pub fn pending_notice(&self) -> Option<PendingUpgradeNotice> {
        match self {
            UpgradeOutcome::Upgraded(_) => None,
            UpgradeOutcome::Pending => Some(PendingUpgradeNotice::default()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PendingUpgradeNotice {
    pub status: &'static str,
    pub message: String,
}

impl Default for PendingUpgradeNotice {
    fn default() -> Self {
        Self {
            status: "NO_UPGRADE",
            message: "the proof has not received any new attestation yet".to_string(),
        }
    }
}

/// What happened during one attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Upgrade reported no change; verification was skipped.
    Unchanged,
    /// Loading, upgrading or persisting the proof failed.
    UpgradeFailed(String),
    /// Upgraded, but verification produced no evidence yet.
    Pending,
    /// Upgraded, but the verification pipeline errored.
    VerifyFailed(String),
    /// Upgraded and verified.
    Verified,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopOutcome {
    Verified,
    Exhausted,
}

/// Summary of a completed loop.
#[derive(Clone, Debug)]
pub struct RetryReport {
    pub outcome: LoopOutcome,
    pub attempts: u32,
    pub waits: u32,
    pub history: Vec<AttemptOutcome>,
    /// Latest verification record produced by the loop, if any attempt got
    /// that far.
    pub record: Option<VerificationRecord>,
}

impl RetryReport {
    pub fn verified(&self) -> bool {
        self.outcome == LoopOutcome::Verified
    }
}

/// Drives upgrade attempts for one proof.
pub struct UpgradeLoop<'a, E, X> {
    verifier: &'a Verifier<E, X>,
    policy: RetryPolicy,
}

impl<'a, E, X> UpgradeLoop<'a, E, X>
where
    E: ProofEngine,
    X: BlockExplorer,
{
    pub fn new(verifier: &'a Verifier<E, X>, policy: RetryPolicy) -> Self {
        Self { verifier, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Runs the loop to completion.
    ///
    /// Setting `shutdown` to `true` cancels the loop at the next wait, or
    /// immediately if a wait is in progress; the in-flight attempt is never
    /// interrupted. The stored bytes are decoded once before the first attempt
    /// so malformed proofs fail fast.
    pub async fn run<S: ProofStore>(
        &self,
        store: &mut S,
        document: &[u8],
        mut shutdown: watch::Receiver<bool>,
    ) -> LifecycleResult<RetryReport> {
        if document.is_empty() {
            return Err(LifecycleError::MissingDocument);
        }
        let initial = store.load()?;
        if initial.is_empty() {
            return Err(LifecycleError::MissingProof);
        }
        self.verifier.engine().deserialize(&initial)?;
        drop(initial);

        let max_attempts = self.policy.max_attempts;
        let mut report = RetryReport {
            outcome: LoopOutcome::Exhausted,
            attempts: 0,
            waits: 0,
            history: Vec::new(),
            record: None,
        };

        for attempt in 1..=max_attempts {
            report.attempts = attempt;
            info!(attempt, max_attempts, "attempting proof upgrade");

            let (outcome, record) = self.attempt(store, document).await;
            match &outcome {
                AttemptOutcome::Verified => {
                    info!(attempt, "proof upgraded and verified");
                }
                AttemptOutcome::Unchanged => {
                    info!(attempt, "no new attestations yet");
                }
                AttemptOutcome::Pending => {
                    info!(attempt, "proof upgraded but verification still pending");
                }
                AttemptOutcome::UpgradeFailed(error) => {
                    warn!(attempt, %error, "upgrade attempt failed");
                }
                AttemptOutcome::VerifyFailed(error) => {
                    warn!(attempt, %error, "verification after upgrade failed");
                }
            }
            if record.is_some() {
                report.record = record;
            }
            let verified = outcome == AttemptOutcome::Verified;
            report.history.push(outcome);
            if verified {
                report.outcome = LoopOutcome::Verified;
                return Ok(report);
            }

            if attempt < max_attempts {
                info!(
                    attempt,
                    interval_secs = self.policy.interval.as_secs(),
                    "waiting before next upgrade attempt"
                );
                if wait_or_cancel(self.policy.interval, &mut shutdown).await {
                    warn!(attempt, "upgrade loop cancelled while waiting");
                    return Err(LifecycleError::Cancelled { attempt });
                }
                report.waits += 1;
            }
        }

        warn!(max_attempts, "retry budget exhausted without a verified proof");
        Ok(report)
    }

    async fn attempt<S: ProofStore>(
        &self,
        store: &mut S,
        document: &[u8],
    ) -> (AttemptOutcome, Option<VerificationRecord>) {
        let engine = self.verifier.engine();
        let mut proof = match store.load().and_then(|bytes| engine.deserialize(&bytes)) {
            Ok(proof) => proof,
            Err(err) => return (AttemptOutcome::UpgradeFailed(err.to_string()), None),
        };

        match engine.upgrade(&mut proof).await {
            Ok(true) => {}
            Ok(false) => return (AttemptOutcome::Unchanged, None),
            Err(err) => return (AttemptOutcome::UpgradeFailed(err.to_string()), None),
        }

        if let Err(err) = engine
            .serialize(&proof)
            .and_then(|bytes| store.store(&bytes))
        {
            return (AttemptOutcome::UpgradeFailed(err.to_string()), None);
        }

        match self.verifier.verify_and_enrich(&proof, document).await {
            Ok(record) if record.is_verified() => (AttemptOutcome::Verified, Some(record)),
            Ok(record) => (AttemptOutcome::Pending, Some(record)),
            Err(err) => (AttemptOutcome::VerifyFailed(err.to_string()), None),
        }
    }
}

/// Sleeps for `interval` unless `shutdown` is (or becomes) `true`. Returns
/// whether the wait was cancelled. A dropped sender can no longer cancel.
pub async fn wait_or_cancel(interval: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    if *shutdown.borrow_and_update() {
        return true;
    }
    let sleep = time::sleep(interval);
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            _ = &mut sleep => return false,
            changed = shutdown.changed() => match changed {
                Ok(()) => {
                    if *shutdown.borrow_and_update() {
                        return true;
                    }
                }
                Err(_) => {
                    (&mut sleep).await;
                    return false;
                }
            },
        }
    }
}
