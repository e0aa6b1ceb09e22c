//! Storage for serialized proofs that the upgrade loop reads and rewrites.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::errors::{LifecycleError, LifecycleResult};

/// Source of truth for a proof's serialized bytes.
///
/// Callers must not run two upgrade loops against the same store
/// concurrently; the store itself does no locking.
pub trait ProofStore: Send {
    fn load(&self) -> LifecycleResult<Vec<u8>>;

    fn store(&mut self, bytes: &[u8]) -> LifecycleResult<()>;
}

/// Proof kept in a file on disk, replaced atomically on every write.
#[derive(Clone, Debug)]
pub struct FileProofStore {
    path: PathBuf,
}

impl FileProofStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProofStore for FileProofStore {
    fn load(&self) -> LifecycleResult<Vec<u8>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Err(LifecycleError::MissingProof),
            Err(err) => Err(err.into()),
        }
    }

    fn store(&mut self, bytes: &[u8]) -> LifecycleResult<()> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut staged = NamedTempFile::new_in(parent)?;
        staged.write_all(bytes)?;
        staged.as_file().sync_all()?;
        staged.persist(&self.path).map_err(|err| err.error)?;
        debug!(path = %self.path.display(), size = bytes.len(), "rewrote proof file");
        Ok(())
    }
}

/// In-memory proof store.
#[derive(Clone, Debug, Default)]
pub struct MemoryProofStore {
    bytes: Vec<u8>,
    writes: usize,
}

impl MemoryProofStore {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes, writes: 0 }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of times the proof was rewritten.
    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl ProofStore for MemoryProofStore {
    fn load(&self) -> LifecycleResult<Vec<u8>> {
        Ok(self.bytes.clone())
    }

    fn store(&mut self, bytes: &[u8]) -> LifecycleResult<()> {
        self.bytes = bytes.to_vec();
        self.writes += 1;
        Ok(())
    }
}
