//! Error types for the engine.

use std::fmt;

use thiserror::Error;
use truth_kernel_core::ParseError;
use truth_kernel_store::StoreError;
use truth_kernel_sync::{SyncError, TransportError};

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Input text is not a valid record.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// A sync round failed.
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// The handle was freed or never existed.
    #[error("invalid engine handle")]
    InvalidHandle,

    /// A caller-supplied argument is unusable.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration could not be read.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Coarse classification of an [`EngineError`], stable across the C ABI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Parse,
    NetworkError,
    Timeout,
    InvalidHandle,
    PeerUnreachable,
    InvalidArgument,
    Internal,
}

impl ErrorKind {
    /// Status code returned by the C ABI.
    pub const fn status_code(self) -> i32 {
        match self {
            ErrorKind::NetworkError => -1,
            ErrorKind::Timeout => -2,
            ErrorKind::InvalidHandle => -3,
            ErrorKind::PeerUnreachable => -4,
            ErrorKind::InvalidArgument => -5,
            ErrorKind::Parse => -6,
            ErrorKind::Internal => -7,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Parse => "parse",
            ErrorKind::NetworkError => "network_error",
            ErrorKind::Timeout => "timeout",
            ErrorKind::InvalidHandle => "invalid_handle",
            ErrorKind::PeerUnreachable => "peer_unreachable",
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Parse(_) => ErrorKind::Parse,
            EngineError::Sync(e) => sync_kind(e),
            EngineError::Store(_) => ErrorKind::Internal,
            EngineError::InvalidHandle => ErrorKind::InvalidHandle,
            EngineError::InvalidArgument(_) | EngineError::Config(_) => ErrorKind::InvalidArgument,
        }
    }

    /// Shorthand for `self.kind().status_code()`.
    pub fn status_code(&self) -> i32 {
        self.kind().status_code()
    }

    /// The error as the JSON object returned across the C ABI.
    pub fn to_json(&self) -> serde_json::Value {
        let detail = match self {
            EngineError::Parse(e) => e.to_string(),
            other => other.to_string(),
        };
        let mut body = serde_json::json!({
            "kind": self.kind().as_str(),
            "detail": detail,
        });
        if let EngineError::Parse(e) = self {
            body["reason"] = serde_json::Value::from(e.kind());
        }
        serde_json::json!({ "error": body })
    }
}

fn sync_kind(error: &SyncError) -> ErrorKind {
    match error {
        SyncError::InvalidPeerUrl(_) => ErrorKind::InvalidArgument,
        SyncError::Transport(TransportError::Unreachable(_)) => ErrorKind::PeerUnreachable,
        SyncError::Transport(TransportError::Timeout) | SyncError::Timeout(_) => ErrorKind::Timeout,
        SyncError::Transport(_) | SyncError::MalformedResponse(_) | SyncError::Oversized { .. } => {
            ErrorKind::NetworkError
        }
        SyncError::Store(_) => ErrorKind::Internal,
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
