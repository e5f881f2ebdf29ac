//! # Truth Kernel Sync
//!
//! Pull-based synchronization of record sets between engines.
//!
//! ## Overview
//!
//! A sync round fetches a peer's records over a [`PeerTransport`], verifies
//! each one independently and merges the valid ones into the local store in
//! a single batch. Peer liveness is tracked in a [`PeerRegistry`].
//!
//! ## Key Properties
//!
//! - **Idempotent**: re-running a round only yields duplicates
//! - **Commutative**: arrival order does not affect the final record set
//! - **Atomic**: a failed round leaves the store untouched
//! - **Tolerant**: a bad record is counted and skipped, never fatal
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use truth_kernel_core::LogicalClock;
//! use truth_kernel_store::MemoryStore;
//! use truth_kernel_sync::{HttpTransport, PeerRegistry, SyncConfig, SyncEngine};
//!
//! async fn example() {
//!     let config = SyncConfig::default();
//!     let transport = HttpTransport::new(&config.records_path, &config.user_agent);
//!     let engine = SyncEngine::new(
//!         Arc::new(MemoryStore::new()),
//!         Arc::new(PeerRegistry::new()),
//!         Arc::new(transport),
//!         Arc::new(LogicalClock::new()),
//!         config,
//!     );
//!
//!     let summary = engine.sync_with("https://peer.example").await.unwrap();
//!     println!("inserted {} records", summary.inserted);
//! }
//! ```
//!
//! ## Round Flow
//!
//! ```text
//! Engine                              Peer
//!   |-------- GET /records ----------->|
//!   |<------- [record, record, ...] ---|
//!   |  parse + verify each             |
//!   |  merge valid batch               |
//! ```

pub mod convergence;
pub mod error;
pub mod messages;
pub mod peers;
pub mod round;
pub mod transport;

pub use convergence::{digest_ids, store_digest, verify_convergence, ConvergenceResult};
pub use error::{Result, SyncError, TransportError};
pub use messages::{encode_records, limits, records_url, split_documents, DEFAULT_RECORDS_PATH};
pub use peers::{PeerInfo, PeerRegistry, PeerState};
pub use round::{RoundPhase, RoundSummary, SyncConfig, SyncEngine};
pub use transport::{memory::MemoryTransport, memory::Response, HttpTransport, PeerTransport};
