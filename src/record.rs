//! Bookkeeping record for a stamped document.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::upgrade::UpgradeOutcome;
use crate::verify::VerificationRecord;

/// Hex-encoded SHA-256 of a document.
pub fn document_digest(document: &[u8]) -> String {
    hex::encode(Sha256::digest(document))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StampStatus {
    /// Submitted to the calendars, no final attestation yet.
    Pending,
    /// Upgraded at least once but not verified.
    Upgraded,
    Verified,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StampRecord {
    pub id: Uuid,
    pub original_file_name: String,
    pub file_hash: String,
    #[serde(with = "hex_bytes")]
    pub proof: Vec<u8>,
    pub status: StampStatus,
    pub txid: Option<String>,
    pub block_hash: Option<String>,
    pub block_height: Option<u64>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub block_time: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl StampRecord {
    pub fn new(original_file_name: impl Into<String>, document: &[u8], proof: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4(),
            original_file_name: original_file_name.into(),
            file_hash: document_digest(document),
            proof,
            status: StampStatus::Pending,
            txid: None,
            block_hash: None,
            block_height: None,
            block_time: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    /// Returns `true` when `document` hashes to the recorded digest.
    pub fn matches_document(&self, document: &[u8]) -> bool {
        self.file_hash == document_digest(document)
    }

    pub fn apply_upgrade(&mut self, outcome: &UpgradeOutcome) {
        if let Some(bytes) = outcome.proof_bytes() {
            self.proof = bytes.to_vec();
            if self.status == StampStatus::Pending {
                self.status = StampStatus::Upgraded;
            }
        }
    }

    /// Copies any metadata the verification found. Fields the record already
    /// holds are kept when the verification left them empty.
    pub fn apply_verification(&mut self, record: &VerificationRecord) {
        if record.is_verified() {
            self.status = StampStatus::Verified;
        }
        if let Some(txid) = record.txid() {
            self.txid = Some(txid.to_owned());
        }
        if let Some(hash) = record.block_hash() {
            self.block_hash = Some(hash.to_owned());
        }
        if let Some(height) = record.block_height() {
            self.block_height = Some(height);
        }
        if let Some(time) = record
            .block_time()
            .and_then(|value| OffsetDateTime::parse(value, &Rfc3339).ok())
        {
            self.block_time = Some(time);
        }
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        hex::decode(encoded).map_err(serde::de::Error::custom)
    }
}
