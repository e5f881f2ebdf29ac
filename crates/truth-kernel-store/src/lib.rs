//! # Truth Kernel Store
//!
//! The engine's authoritative set of accepted records.
//!
//! ## Overview
//!
//! The store module abstracts record storage behind the [`Store`] trait,
//! allowing the engine to be storage-agnostic. [`MemoryStore`] is the
//! in-memory implementation used by the engine.
//!
//! ## Key Types
//!
//! - [`Store`] - The async trait for all storage operations
//! - [`MemoryStore`] - In-memory storage guarded by a read-write lock
//! - [`MergeOutcome`] - Result of merging an envelope
//! - [`StoredRecord`] - An accepted record plus its provenance
//!
//! ## Usage
//!
//! ```rust,no_run
//! use truth_kernel_core::{canonical, Ed25519Verifier, LogicalClock, SignedEnvelope};
//! use truth_kernel_store::{MemoryStore, MergeOutcome, Origin, Store};
//!
//! async fn example(text: &[u8]) {
//!     let store = MemoryStore::new();
//!     let clock = LogicalClock::new();
//!
//!     let record = canonical::parse(text).unwrap();
//!     let envelope = SignedEnvelope::new(record).verify(&Ed25519Verifier);
//!
//!     match store.merge(envelope, Origin::Local, &clock).await.unwrap() {
//!         MergeOutcome::Inserted => println!("new record"),
//!         MergeOutcome::Duplicate => println!("already known"),
//!         MergeOutcome::Rejected(reason) => println!("rejected: {reason}"),
//!     }
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Valid only**: envelopes that did not verify are rejected, never stored
//! - **Idempotent merges**: merging the same record twice returns `Duplicate`
//! - **No conflicts**: ids are content-derived, so two different payloads
//!   never share an id
//! - **Atomic batches**: `merge_batch` applies a whole batch under one lock

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use traits::{MergeOutcome, Origin, RejectReason, Store, StoredRecord};
