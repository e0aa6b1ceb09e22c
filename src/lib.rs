//! Lifecycle services for OpenTimestamps-style document proofs.
//!
//! A proof is created for a document, polled for new attestations until the
//! Bitcoin anchor lands, and finally verified. Verification output is
//! enriched with block metadata: a transaction id and block height are
//! scraped from the engine's textual description, then a block explorer is
//! asked for the matching block hash and time.
//!
//! The cryptographic work lives behind [`engine::ProofEngine`]. Block lookups
//! go through [`explorer::BlockExplorer`], with [`explorer::EsploraClient`]
//! as the HTTP implementation. [`service::TimestampService`] ties both
//! together for callers that only handle serialized proof bytes.

pub mod config;
pub mod engine;
pub mod errors;
pub mod explorer;
pub mod extract;
pub mod record;
pub mod resolver;
pub mod service;
pub mod store;
pub mod upgrade;
pub mod verify;

pub use config::LifecycleConfig;
pub use engine::{ProofEngine, RawEvidence};
pub use errors::{LifecycleError, LifecycleResult};
pub use explorer::{BlockExplorer, EsploraClient, ExplorerError};
pub use extract::ExtractedMetadata;
pub use record::{document_digest, StampRecord, StampStatus};
pub use resolver::{BlockResolver, Resolution};
pub use service::TimestampService;
pub use store::{FileProofStore, MemoryProofStore, ProofStore};
pub use upgrade::{RetryPolicy, RetryReport, UpgradeLoop, UpgradeOutcome};
pub use verify::{VerificationRecord, VerificationStatus, Verifier};
