//! # Truth Kernel
//!
//! The unified API for the Truth Kernel: a local store of signed truth
//! records that converges with peers by pulling their records over HTTP.
//!
//! ## Overview
//!
//! - **Records**: A payload, a logical timestamp, a signer key and a signature
//! - **Canonicalization**: One byte encoding per record regardless of spelling
//! - **Verification**: Records enter the store only with a valid signature
//! - **Sync**: Atomic pull rounds against peers, tracked in a peer registry
//!
//! ## Usage
//!
//! ```rust,no_run
//! use truth_kernel::{EngineConfig, EngineHandle};
//!
//! async fn example() {
//!     let handle = EngineHandle::init(EngineConfig::default());
//!
//!     let summary = handle.sync_with_peer("https://peer.example").await.unwrap();
//!     println!("inserted {} records", summary.inserted);
//!     assert_eq!(handle.peer_count().unwrap(), 1);
//!
//!     handle.free();
//! }
//! ```
//!
//! Normalization and signature checks need no engine:
//!
//! ```rust
//! let a = truth_kernel::process_json(
//!     br#"{"payload":{"b":1,"a":2},"created_at":1,"signer_public_key":"00","signature":"00"}"#,
//! ).unwrap();
//! let b = truth_kernel::process_json(
//!     br#"{ "signature":"00", "created_at":1, "signer_public_key":"00", "payload":{"a":2.0,"b":1} }"#,
//! ).unwrap();
//! assert_eq!(a, b);
//! ```
//!
//! ## C ABI
//!
//! The `truth_core_*` functions in [`ffi`] expose the same operations to C.
//!
//! ## Re-exports
//!
//! - `truth_kernel::core` - Records, canonical JSON, verification
//! - `truth_kernel::store` - Store abstraction and the in-memory store
//! - `truth_kernel::sync` - Peer registry, transports and sync rounds

pub mod config;
pub mod engine;
pub mod error;
pub mod ffi;
pub mod handle;
pub mod logging;

// Re-export component crates
pub use truth_kernel_core as core;
pub use truth_kernel_store as store;
pub use truth_kernel_sync as sync;

// Re-export main types for convenience
pub use config::EngineConfig;
pub use engine::{Engine, Ingested};
pub use error::{EngineError, ErrorKind, Result};
pub use handle::{process_json, verify_signature, EngineHandle};

// Re-export commonly used types
pub use truth_kernel_core::{Keypair, Record, RecordId, SignedEnvelope, Timestamp};
pub use truth_kernel_store::{MergeOutcome, Origin, StoredRecord};
pub use truth_kernel_sync::{PeerInfo, PeerState, RoundSummary};
