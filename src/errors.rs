use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("malformed proof: {0}")]
    ProofFormat(String),
    #[error("proof engine error: {0}")]
    Engine(String),
    #[error("document is missing or empty")]
    MissingDocument,
    #[error("proof bytes are missing or empty")]
    MissingProof,
    #[error("upgrade loop cancelled while waiting after attempt {attempt}")]
    Cancelled { attempt: u32 },
    #[error("configuration error: {0}")]
    Config(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl LifecycleError {
    /// Returns `true` when the error was raised by an explicit cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, LifecycleError::Cancelled { .. })
    }
}

pub type LifecycleResult<T> = Result<T, LifecycleError>;
