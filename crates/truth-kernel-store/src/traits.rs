//! Store trait: the abstract interface for the accepted record set.
//!
//! The engine talks to storage only through this trait, so a persistent
//! backend can be slotted in without touching the sync layer.

use std::fmt;

use async_trait::async_trait;
use truth_kernel_core::{LogicalClock, LogicalTime, Record, RecordId, SignedEnvelope};

use crate::error::Result;

/// Result of merging one envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The record was new and is now stored.
    Inserted,
    /// A record with this id is already stored (idempotent, not an error).
    Duplicate,
    /// The envelope was not admitted.
    Rejected(RejectReason),
}

impl MergeOutcome {
    pub fn is_inserted(&self) -> bool {
        matches!(self, MergeOutcome::Inserted)
    }
}

/// Why an envelope was not admitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// The envelope's status was not `Valid`.
    NotVerified,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::NotVerified => f.write_str("envelope not verified"),
        }
    }
}

/// Where an accepted record came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Origin {
    /// Ingested through the local processing path.
    Local,
    /// Fetched from the peer at this URL.
    Peer(String),
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Local => f.write_str("local"),
            Origin::Peer(url) => write!(f, "peer {url}"),
        }
    }
}

/// An accepted record plus its provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub record: Record,
    /// Where the first copy of this record came from.
    pub origin: Origin,
    /// Logical time of insertion.
    pub inserted_at: LogicalTime,
}

/// The Store trait: async interface over the set of accepted records.
///
/// # Design Notes
///
/// - **Valid only**: only envelopes with status `Valid` are admitted.
/// - **Idempotent merges**: merging a known id returns `Duplicate` and leaves
///   the stored record and its provenance untouched.
/// - **Batch atomicity**: concurrent readers observe either none or all of a
///   batch passed to `merge_batch`.
#[async_trait]
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Merge Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Merge one envelope.
    ///
    /// The clock is ticked only when the record is actually inserted.
    async fn merge(
        &self,
        envelope: SignedEnvelope,
        origin: Origin,
        clock: &LogicalClock,
    ) -> Result<MergeOutcome>;

    /// Merge a batch of envelopes as one atomic step.
    ///
    /// Returns one outcome per envelope, in input order. Repeated ids inside
    /// the batch yield `Inserted` for the first and `Duplicate` afterwards.
    async fn merge_batch(
        &self,
        envelopes: Vec<SignedEnvelope>,
        origin: Origin,
        clock: &LogicalClock,
    ) -> Result<Vec<MergeOutcome>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// Get a record and its provenance by id.
    async fn get(&self, id: &RecordId) -> Result<Option<StoredRecord>>;

    /// Check if a record exists by id.
    async fn contains(&self, id: &RecordId) -> Result<bool>;

    /// All records signed by the given public key bytes, ordered by id.
    async fn by_signer(&self, public_key: &[u8]) -> Result<Vec<StoredRecord>>;

    /// All stored ids, in ascending order.
    async fn ids(&self) -> Result<Vec<RecordId>>;

    /// All stored records, ordered by id.
    async fn records(&self) -> Result<Vec<StoredRecord>>;

    /// Number of stored records.
    async fn count(&self) -> Result<usize>;
}
