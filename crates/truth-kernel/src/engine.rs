//! The Engine: local store, peer registry and sync, bundled.
//!
//! An engine owns exactly one store and one registry. It has no notion of
//! being freed; [`EngineHandle`](crate::EngineHandle) layers that on top.

use std::sync::Arc;

use tracing::{debug, info};

use truth_kernel_core::{
    canonical, decode_key_text, Blake3Hash, Ed25519Verifier, LogicalClock, RecordId,
    SignedEnvelope,
};
use truth_kernel_store::{MemoryStore, MergeOutcome, Origin, Store, StoredRecord};
use truth_kernel_sync::{
    encode_records, store_digest, HttpTransport, PeerInfo, PeerRegistry, PeerTransport,
    RoundSummary, SyncEngine,
};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};

/// Result of ingesting one local document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ingested {
    /// The content-derived id of the record.
    pub id: RecordId,
    /// What the store did with it.
    pub outcome: MergeOutcome,
}

/// The main Engine struct.
///
/// Provides a unified API for:
/// - Ingesting and normalizing records
/// - Querying accepted records
/// - Syncing with peers
pub struct Engine {
    store: Arc<MemoryStore>,
    registry: Arc<PeerRegistry>,
    clock: Arc<LogicalClock>,
    sync: SyncEngine<MemoryStore, dyn PeerTransport>,
    config: EngineConfig,
}

impl Engine {
    /// Create an engine that talks HTTP to its peers.
    pub fn new(config: EngineConfig) -> Self {
        let transport = HttpTransport::new(&config.sync.records_path, &config.sync.user_agent);
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create an engine over a custom transport.
    pub fn with_transport(config: EngineConfig, transport: Arc<dyn PeerTransport>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let registry = Arc::new(PeerRegistry::new());
        let clock = Arc::new(LogicalClock::new());
        let sync = SyncEngine::new(
            Arc::clone(&store),
            Arc::clone(&registry),
            transport,
            Arc::clone(&clock),
            config.sync.clone(),
        );
        Self {
            store,
            registry,
            clock,
            sync,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Get the store reference.
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Sync Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Run one sync round against a peer.
    pub async fn sync_with_peer(&self, peer_url: &str) -> Result<RoundSummary> {
        Ok(self.sync.sync_with(peer_url).await?)
    }

    /// Peers that have been contacted at least once, successfully or not.
    pub fn peer_count(&self) -> usize {
        self.registry.known_count()
    }

    /// Snapshot of the peer registry.
    pub fn peers(&self) -> Vec<PeerInfo> {
        self.registry.snapshot()
    }

    pub fn peer(&self, url: &str) -> Option<PeerInfo> {
        self.registry.get(url.trim())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Record Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Parse, verify and merge a locally submitted document.
    ///
    /// A document that parses but fails verification is not an error: the
    /// outcome is `Rejected` and the store is unchanged.
    pub async fn ingest_json(&self, text: &[u8]) -> Result<Ingested> {
        let record = canonical::parse(text)?;
        let envelope = SignedEnvelope::new(record).verify(&Ed25519Verifier);
        let id = envelope.id();
        let status = envelope.status().clone();

        let outcome = self.store.merge(envelope, Origin::Local, &self.clock).await?;
        match &outcome {
            MergeOutcome::Inserted => info!(record_id = %id, "record ingested"),
            MergeOutcome::Duplicate => debug!(record_id = %id, "record already known"),
            MergeOutcome::Rejected(reason) => {
                info!(record_id = %id, ?status, %reason, "record rejected")
            }
        }
        Ok(Ingested { id, outcome })
    }

    /// Get an accepted record by id.
    pub async fn record(&self, id: &RecordId) -> Result<Option<StoredRecord>> {
        Ok(self.store.get(id).await?)
    }

    /// All accepted records signed by the given key (hex or base64 text).
    pub async fn records_by_signer(&self, public_key: &str) -> Result<Vec<StoredRecord>> {
        let key = decode_key_text(public_key)
            .map_err(|e| EngineError::InvalidArgument(e.to_string()))?;
        Ok(self.store.by_signer(&key).await?)
    }

    /// Number of accepted records.
    pub async fn record_count(&self) -> Result<usize> {
        Ok(self.store.count().await?)
    }

    /// The store's records as a peer response body.
    pub async fn export_records(&self) -> Result<Vec<u8>> {
        let stored = self.store.records().await?;
        Ok(encode_records(stored.iter().map(|s| &s.record)))
    }

    /// Digest of the accepted record set.
    pub async fn digest(&self) -> Result<Blake3Hash> {
        Ok(store_digest(self.store.as_ref()).await?)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
