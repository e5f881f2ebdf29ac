//! Sync round state machine.
//!
//! One round pulls one peer's records into the local store:
//!
//! ```text
//! Idle -> Fetching -> Verifying -> Merging -> Completed
//!            |            |           |
//!            +------------+-----------+----> Failed(reason)
//! ```
//!
//! The store is touched only in `Merging`, in a single batch. A round that
//! fails before that point leaves the store exactly as it was.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use truth_kernel_core::{
    canonical, Ed25519Verifier, LogicalClock, SignatureVerifier, SignedEnvelope,
};
use truth_kernel_store::{MergeOutcome, Origin, Store};

use crate::error::{Result, SyncError};
use crate::messages::{limits, split_documents, DEFAULT_RECORDS_PATH};
use crate::peers::PeerRegistry;
use crate::transport::PeerTransport;

/// Configuration for sync behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Upper bound on one fetch, in milliseconds.
    pub fetch_timeout_ms: u64,
    /// Max bytes accepted in one response body.
    pub max_response_bytes: usize,
    /// Max documents accepted in one response.
    pub max_records_per_response: usize,
    /// Path below the peer URL that serves records.
    pub records_path: String,
    /// User agent sent by the HTTP transport.
    pub user_agent: String,
}

impl SyncConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: 10_000,
            max_response_bytes: limits::MAX_RESPONSE_BYTES,
            max_records_per_response: limits::MAX_RECORDS_PER_RESPONSE,
            records_path: DEFAULT_RECORDS_PATH.to_string(),
            user_agent: concat!("truth-kernel/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Phases of a round, used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    Idle,
    Fetching,
    Verifying,
    Merging,
    Completed,
    Failed,
}

impl fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RoundPhase::Idle => "idle",
            RoundPhase::Fetching => "fetching",
            RoundPhase::Verifying => "verifying",
            RoundPhase::Merging => "merging",
            RoundPhase::Completed => "completed",
            RoundPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Counters for one completed round.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoundSummary {
    /// The peer URL the round ran against.
    pub peer: String,
    /// Documents in the response.
    pub fetched: usize,
    /// Documents that did not parse as records.
    pub skipped_malformed: usize,
    /// Records whose signature did not verify.
    pub skipped_invalid: usize,
    /// Records new to the store.
    pub inserted: usize,
    /// Records the store already held.
    pub duplicate: usize,
    /// Records the store refused.
    pub rejected: usize,
}

/// Runs sync rounds against peers on behalf of one engine.
///
/// Cloning is cheap: all state is shared. Rounds against different peers may
/// run concurrently; their merge steps serialize on the store lock.
pub struct SyncEngine<S: Store + ?Sized, T: PeerTransport + ?Sized> {
    store: Arc<S>,
    registry: Arc<PeerRegistry>,
    transport: Arc<T>,
    clock: Arc<LogicalClock>,
    verifier: Arc<dyn SignatureVerifier>,
    config: SyncConfig,
}

impl<S: Store + ?Sized, T: PeerTransport + ?Sized> Clone for SyncEngine<S, T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            registry: Arc::clone(&self.registry),
            transport: Arc::clone(&self.transport),
            clock: Arc::clone(&self.clock),
            verifier: Arc::clone(&self.verifier),
            config: self.config.clone(),
        }
    }
}

impl<S: Store + ?Sized, T: PeerTransport + ?Sized> SyncEngine<S, T> {
    /// Create a sync engine verifying with Ed25519.
    pub fn new(
        store: Arc<S>,
        registry: Arc<PeerRegistry>,
        transport: Arc<T>,
        clock: Arc<LogicalClock>,
        config: SyncConfig,
    ) -> Self {
        Self {
            store,
            registry,
            transport,
            clock,
            verifier: Arc::new(Ed25519Verifier),
            config,
        }
    }

    /// Replace the signature verifier.
    pub fn with_verifier(mut self, verifier: Arc<dyn SignatureVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn registry(&self) -> &PeerRegistry {
        &self.registry
    }

    /// Run one round against `peer_url`.
    ///
    /// No retries. On a peer fault the peer is marked unreachable; a local
    /// fault leaves the peer entry alone. Either way the store is untouched.
    /// On success the peer is marked reachable.
    pub async fn sync_with(&self, peer_url: &str) -> Result<RoundSummary> {
        let peer = peer_url.trim();
        if peer.is_empty() {
            return Err(SyncError::InvalidPeerUrl(peer_url.to_string()));
        }

        let known = self.registry.register(peer);
        debug!(%peer, state = ?known.state, phase = %RoundPhase::Idle, "round requested");

        match self.run(peer).await {
            Ok(summary) => {
                let at = self.clock.tick();
                self.registry.record_success(peer, at);
                info!(
                    %peer,
                    phase = %RoundPhase::Completed,
                    fetched = summary.fetched,
                    inserted = summary.inserted,
                    duplicate = summary.duplicate,
                    skipped_malformed = summary.skipped_malformed,
                    skipped_invalid = summary.skipped_invalid,
                    "sync round completed"
                );
                Ok(summary)
            }
            Err(error) if error.is_peer_fault() => {
                self.registry.record_failure(peer, error.to_string());
                warn!(%peer, phase = %RoundPhase::Failed, %error, "sync round failed");
                Err(error)
            }
            Err(error) => {
                // Local fault: the peer's record stays as it was.
                error!(%peer, phase = %RoundPhase::Failed, %error, "sync round failed locally");
                Err(error)
            }
        }
    }

    async fn run(&self, peer: &str) -> Result<RoundSummary> {
        let mut summary = RoundSummary {
            peer: peer.to_string(),
            ..RoundSummary::default()
        };

        // Fetching
        debug!(%peer, phase = %RoundPhase::Fetching, "fetching records");
        let fetch = self
            .transport
            .fetch_records(peer, self.config.max_response_bytes);
        let body = tokio::time::timeout(self.config.fetch_timeout(), fetch)
            .await
            .map_err(|_| SyncError::Timeout(self.config.fetch_timeout_ms))??;

        let documents = split_documents(&body, self.config.max_records_per_response)?;
        summary.fetched = documents.len();

        // Verifying
        debug!(%peer, phase = %RoundPhase::Verifying, documents = documents.len(), "verifying records");
        let mut verified = Vec::with_capacity(documents.len());
        for (index, document) in documents.iter().enumerate() {
            let record = match canonical::parse(document.get().as_bytes()) {
                Ok(record) => record,
                Err(e) => {
                    summary.skipped_malformed += 1;
                    warn!(%peer, index, kind = e.kind(), error = %e, "skipping malformed record");
                    continue;
                }
            };

            let envelope = SignedEnvelope::new(record).verify(self.verifier.as_ref());
            if envelope.is_valid() {
                verified.push(envelope);
            } else {
                summary.skipped_invalid += 1;
                warn!(
                    %peer,
                    record_id = %envelope.id(),
                    status = ?envelope.status(),
                    "skipping record with invalid signature"
                );
            }
        }

        // Merging
        debug!(%peer, phase = %RoundPhase::Merging, records = verified.len(), "merging records");
        let outcomes = self
            .store
            .merge_batch(verified, Origin::Peer(peer.to_string()), &self.clock)
            .await?;
        for outcome in outcomes {
            match outcome {
                MergeOutcome::Inserted => summary.inserted += 1,
                MergeOutcome::Duplicate => summary.duplicate += 1,
                MergeOutcome::Rejected(_) => summary.rejected += 1,
            }
        }

        Ok(summary)
    }
}
