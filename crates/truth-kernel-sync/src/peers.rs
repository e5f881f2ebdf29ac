//! Peer registry: known peer endpoints and their liveness.
//!
//! Entries are created on the first sync attempt and only mutated by the
//! sync round. Nothing removes an entry while the registry is alive.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use truth_kernel_core::LogicalTime;

/// Liveness of a peer as last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerState {
    /// Registered, no round has finished yet.
    Unknown,
    /// The last round completed.
    Reachable,
    /// The last round failed.
    Unreachable,
}

/// What the engine knows about one peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeerInfo {
    pub url: String,
    /// Logical time of the last completed round.
    pub last_sync_at: Option<LogicalTime>,
    /// Failed rounds since the last completed one.
    pub consecutive_failures: u32,
    pub state: PeerState,
    pub last_error: Option<String>,
}

impl PeerInfo {
    fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            last_sync_at: None,
            consecutive_failures: 0,
            state: PeerState::Unknown,
            last_error: None,
        }
    }
}

/// Thread-safe map of peer URL to [`PeerInfo`].
#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: RwLock<BTreeMap<String, PeerInfo>>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // Poisoning is ignored: every update leaves entries consistent.
    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, PeerInfo>> {
        self.peers.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, PeerInfo>> {
        self.peers.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Look up a peer, registering it as `Unknown` if new.
    pub fn register(&self, url: &str) -> PeerInfo {
        self.write()
            .entry(url.to_string())
            .or_insert_with(|| PeerInfo::new(url))
            .clone()
    }

    /// Mark a completed round.
    pub fn record_success(&self, url: &str, at: LogicalTime) {
        let mut peers = self.write();
        let info = peers
            .entry(url.to_string())
            .or_insert_with(|| PeerInfo::new(url));
        info.last_sync_at = Some(at);
        info.consecutive_failures = 0;
        info.state = PeerState::Reachable;
        info.last_error = None;
    }

    /// Mark a failed round.
    pub fn record_failure(&self, url: &str, error: impl Into<String>) {
        let mut peers = self.write();
        let info = peers
            .entry(url.to_string())
            .or_insert_with(|| PeerInfo::new(url));
        info.consecutive_failures = info.consecutive_failures.saturating_add(1);
        info.state = PeerState::Unreachable;
        info.last_error = Some(error.into());
    }

    pub fn get(&self, url: &str) -> Option<PeerInfo> {
        self.read().get(url).cloned()
    }

    /// Snapshot of all peers, ordered by URL.
    pub fn snapshot(&self) -> Vec<PeerInfo> {
        self.read().values().cloned().collect()
    }

    /// Number of peers whose state is no longer `Unknown`.
    pub fn known_count(&self) -> usize {
        self.read()
            .values()
            .filter(|p| p.state != PeerState::Unknown)
            .count()
    }

    /// Total number of registered peers.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}
