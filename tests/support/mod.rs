#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use ots_lifecycle::engine::{ProofEngine, RawEvidence};
use ots_lifecycle::errors::{LifecycleError, LifecycleResult};
use ots_lifecycle::explorer::EsploraClient;

pub const TXID: &str = "9f0c2c6c1d5a4b3e8f7a6b5c4d3e2f1a0b9c8d7e6f5a4b3c2d1e0f9a8b7c6d5e";
pub const BLOCK_HASH: &str = "00000000000000000002a7c4c1e48d76c5a37902165a270156b7a8d72728a054";
pub const BLOCK_HEIGHT: u64 = 820001;
pub const BLOCK_TIME: i64 = 1_700_000_000;
pub const BLOCK_TIME_ISO: &str = "2023-11-14T22:13:20Z";

const PROOF_MAGIC: &str = "scripted-proof:";

/// Proof handle of [`ScriptedEngine`]; `version` counts successful upgrades.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptedProof {
    pub version: u32,
}

pub fn encode_proof(version: u32) -> Vec<u8> {
    format!("{PROOF_MAGIC}{version}").into_bytes()
}

/// Engine whose upgrade and verify results are queued up front. An exhausted
/// upgrade queue answers "unchanged"; an exhausted evidence queue answers
/// with no evidence.
#[derive(Default)]
pub struct ScriptedEngine {
    upgrades: Mutex<VecDeque<Result<bool, String>>>,
    evidence: Mutex<VecDeque<Result<RawEvidence, String>>>,
    description: Mutex<Option<Result<String, String>>>,
    upgrade_calls: AtomicUsize,
    verify_calls: AtomicUsize,
    describe_calls: AtomicUsize,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_upgrades(self, upgrades: impl IntoIterator<Item = Result<bool, String>>) -> Self {
        self.upgrades
            .lock()
            .expect("upgrade script lock")
            .extend(upgrades);
        self
    }

    pub fn with_evidence(
        self,
        evidence: impl IntoIterator<Item = Result<RawEvidence, String>>,
    ) -> Self {
        self.evidence
            .lock()
            .expect("evidence script lock")
            .extend(evidence);
        self
    }

    pub fn with_description(self, description: Result<String, String>) -> Self {
        *self.description.lock().expect("description lock") = Some(description);
        self
    }

    pub fn upgrade_calls(&self) -> usize {
        self.upgrade_calls.load(Ordering::SeqCst)
    }

    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }

    pub fn describe_calls(&self) -> usize {
        self.describe_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProofEngine for ScriptedEngine {
    type Proof = ScriptedProof;

    async fn create_proof(&self, document: &[u8]) -> LifecycleResult<ScriptedProof> {
        if document.is_empty() {
            return Err(LifecycleError::MissingDocument);
        }
        Ok(ScriptedProof { version: 0 })
    }

    fn serialize(&self, proof: &ScriptedProof) -> LifecycleResult<Vec<u8>> {
        Ok(encode_proof(proof.version))
    }

    fn deserialize(&self, bytes: &[u8]) -> LifecycleResult<ScriptedProof> {
        let text = std::str::from_utf8(bytes)
            .map_err(|err| LifecycleError::ProofFormat(err.to_string()))?;
        let version = text
            .strip_prefix(PROOF_MAGIC)
            .and_then(|version| version.parse().ok())
            .ok_or_else(|| LifecycleError::ProofFormat("missing scripted proof header".into()))?;
        Ok(ScriptedProof { version })
    }

    async fn upgrade(&self, proof: &mut ScriptedProof) -> LifecycleResult<bool> {
        self.upgrade_calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .upgrades
            .lock()
            .expect("upgrade script lock")
            .pop_front()
            .unwrap_or(Ok(false));
        match next {
            Ok(true) => {
                proof.version += 1;
                Ok(true)
            }
            Ok(false) => Ok(false),
            Err(message) => Err(LifecycleError::Engine(message)),
        }
    }

    async fn verify(&self, _proof: &ScriptedProof, _document: &[u8]) -> LifecycleResult<RawEvidence> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        self.evidence
            .lock()
            .expect("evidence script lock")
            .pop_front()
            .unwrap_or_else(|| Ok(RawEvidence::new()))
            .map_err(LifecycleError::Engine)
    }

    fn describe(&self, proof: &ScriptedProof) -> LifecycleResult<String> {
        self.describe_calls.fetch_add(1, Ordering::SeqCst);
        match self.description.lock().expect("description lock").clone() {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(LifecycleError::Engine(message)),
            None => Ok(format!("scripted proof v{}, pending attestation", proof.version)),
        }
    }
}

pub fn evidence(entries: &[(&str, &str)]) -> RawEvidence {
    entries
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

/// Canned responses keyed by the request path below `/api`.
#[derive(Clone, Default)]
pub struct ChainFixture {
    responses: Arc<Mutex<HashMap<String, (StatusCode, String)>>>,
    hits: Arc<Mutex<Vec<String>>>,
}

impl ChainFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw(self, path: impl Into<String>, status: StatusCode, body: impl Into<String>) -> Self {
        self.responses
            .lock()
            .expect("fixture lock")
            .insert(path.into(), (status, body.into()));
        self
    }

    pub fn confirmed_tx(self, txid: &str, height: u64, hash: &str, time: i64) -> Self {
        let body = json!({
            "confirmed": true,
            "block_height": height,
            "block_hash": hash,
            "block_time": time,
        });
        self.raw(format!("tx/{txid}/status"), StatusCode::OK, body.to_string())
    }

    pub fn unconfirmed_tx(self, txid: &str) -> Self {
        let body = json!({ "confirmed": false });
        self.raw(format!("tx/{txid}/status"), StatusCode::OK, body.to_string())
    }

    pub fn block(self, hash: &str, height: u64, timestamp: i64) -> Self {
        let body = json!({
            "id": hash,
            "height": height,
            "timestamp": timestamp,
            "tx_count": 3120,
        });
        self.raw(format!("block/{hash}"), StatusCode::OK, body.to_string())
    }

    pub fn height(self, height: u64, hash: &str) -> Self {
        self.raw(format!("block-height/{height}"), StatusCode::OK, hash.to_string())
    }

    /// Paths requested so far, in order.
    pub fn hits(&self) -> Vec<String> {
        self.hits.lock().expect("hits lock").clone()
    }

    fn respond(&self, path: String) -> Response {
        self.hits.lock().expect("hits lock").push(path.clone());
        let canned = self
            .responses
            .lock()
            .expect("fixture lock")
            .get(&path)
            .cloned();
        match canned {
            Some((status, body)) => (status, body).into_response(),
            None => (StatusCode::NOT_FOUND, "not found").into_response(),
        }
    }
}

async fn tx_status(State(fixture): State<ChainFixture>, Path(txid): Path<String>) -> Response {
    fixture.respond(format!("tx/{txid}/status"))
}

async fn block(State(fixture): State<ChainFixture>, Path(hash): Path<String>) -> Response {
    fixture.respond(format!("block/{hash}"))
}

async fn block_height(State(fixture): State<ChainFixture>, Path(height): Path<String>) -> Response {
    fixture.respond(format!("block-height/{height}"))
}

/// Esplora-shaped HTTP stub bound to an ephemeral local port.
pub struct StubEsplora {
    addr: SocketAddr,
    fixture: ChainFixture,
    shutdown: Option<oneshot::Sender<()>>,
}

impl StubEsplora {
    pub async fn spawn(fixture: ChainFixture) -> Self {
        let router = Router::new()
            .route("/api/tx/{txid}/status", get(tx_status))
            .route("/api/block/{hash}", get(block))
            .route("/api/block-height/{height}", get(block_height))
            .with_state(fixture.clone());
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind esplora stub");
        let addr = listener.local_addr().expect("stub address");
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let server = axum::serve(listener, router).with_graceful_shutdown(async move {
                let _ = rx.await;
            });
            if let Err(err) = server.await {
                eprintln!("esplora stub error: {err}");
            }
        });
        Self {
            addr,
            fixture,
            shutdown: Some(tx),
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    pub fn client(&self) -> EsploraClient {
        EsploraClient::from_endpoint(
            &self.base_url(),
            Duration::from_secs(2),
            Duration::from_secs(2),
        )
        .expect("stub client")
    }

    pub fn hits(&self) -> Vec<String> {
        self.fixture.hits()
    }
}

impl Drop for StubEsplora {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Fixture for a block confirmed at [`BLOCK_HEIGHT`] containing [`TXID`].
pub fn anchored_chain() -> ChainFixture {
    ChainFixture::new()
        .confirmed_tx(TXID, BLOCK_HEIGHT, BLOCK_HASH, BLOCK_TIME)
        .block(BLOCK_HASH, BLOCK_HEIGHT, BLOCK_TIME)
        .height(BLOCK_HEIGHT, BLOCK_HASH)
}
