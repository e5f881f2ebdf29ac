//! Error types for the sync module.

use thiserror::Error;

/// Errors produced by a [`PeerTransport`](crate::PeerTransport).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The peer could not be contacted at all.
    #[error("peer unreachable: {0}")]
    Unreachable(String),

    /// The transport gave up waiting.
    #[error("transport timed out")]
    Timeout,

    /// The peer answered with a non-success status.
    #[error("peer answered with status {0}")]
    Status(u16),

    /// The response body exceeded the byte limit.
    #[error("response larger than {limit} bytes")]
    Oversized { limit: usize },

    /// The connection failed mid-response or the request could not be built.
    #[error("transport i/o error: {0}")]
    Io(String),
}

/// Errors that abort a sync round.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The peer URL was empty.
    #[error("invalid peer url: {0:?}")]
    InvalidPeerUrl(String),

    /// The fetch failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The fetch did not complete within the configured timeout.
    #[error("fetch timed out after {0} ms")]
    Timeout(u64),

    /// The response body is not a JSON array of documents.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The response holds more documents than allowed.
    #[error("response holds {got} documents, limit is {limit}")]
    Oversized { limit: usize, got: usize },

    /// Store operation failed.
    #[error("store error: {0}")]
    Store(#[from] truth_kernel_store::StoreError),
}

impl SyncError {
    /// Whether the failure is attributable to the peer rather than to this
    /// engine. Only peer faults count against a peer's liveness.
    pub fn is_peer_fault(&self) -> bool {
        match self {
            SyncError::Transport(_)
            | SyncError::Timeout(_)
            | SyncError::MalformedResponse(_)
            | SyncError::Oversized { .. } => true,
            SyncError::InvalidPeerUrl(_) | SyncError::Store(_) => false,
        }
    }
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
