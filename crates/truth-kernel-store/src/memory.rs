//! In-memory implementation of the Store trait.
//!
//! Records live in an ordered map behind a single `RwLock`. Batches are
//! applied under one write guard, so readers never see half a batch.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tracing::{debug, trace};

use truth_kernel_core::{LogicalClock, RecordId, SignedEnvelope};

use crate::error::{Result, StoreError};
use crate::traits::{MergeOutcome, Origin, RejectReason, Store, StoredRecord};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Records indexed by id.
    records: BTreeMap<RecordId, StoredRecord>,

    /// Signer index: decoded public key bytes -> ids.
    signers: HashMap<Vec<u8>, BTreeSet<RecordId>>,
}

impl MemoryStoreInner {
    fn merge_one(
        &mut self,
        envelope: SignedEnvelope,
        origin: &Origin,
        clock: &LogicalClock,
    ) -> MergeOutcome {
        if !envelope.is_valid() {
            trace!(id = %envelope.id(), status = ?envelope.status(), "rejecting envelope");
            return MergeOutcome::Rejected(RejectReason::NotVerified);
        }

        let id = envelope.id();
        if self.records.contains_key(&id) {
            return MergeOutcome::Duplicate;
        }

        let record = envelope.into_record();
        if let Ok(key) = record.signer_public_key().decode() {
            self.signers.entry(key).or_default().insert(id);
        }

        let inserted_at = clock.tick();
        debug!(%id, %origin, %inserted_at, "record inserted");
        self.records.insert(
            id,
            StoredRecord {
                record,
                origin: origin.clone(),
                inserted_at,
            },
        );
        MergeOutcome::Inserted
    }
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner.write().map_err(|_| StoreError::LockPoisoned)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn merge(
        &self,
        envelope: SignedEnvelope,
        origin: Origin,
        clock: &LogicalClock,
    ) -> Result<MergeOutcome> {
        let mut inner = self.write()?;
        Ok(inner.merge_one(envelope, &origin, clock))
    }

    async fn merge_batch(
        &self,
        envelopes: Vec<SignedEnvelope>,
        origin: Origin,
        clock: &LogicalClock,
    ) -> Result<Vec<MergeOutcome>> {
        let mut inner = self.write()?;
        let outcomes = envelopes
            .into_iter()
            .map(|envelope| inner.merge_one(envelope, &origin, clock))
            .collect();
        Ok(outcomes)
    }

    async fn get(&self, id: &RecordId) -> Result<Option<StoredRecord>> {
        let inner = self.read()?;
        Ok(inner.records.get(id).cloned())
    }

    async fn contains(&self, id: &RecordId) -> Result<bool> {
        let inner = self.read()?;
        Ok(inner.records.contains_key(id))
    }

    async fn by_signer(&self, public_key: &[u8]) -> Result<Vec<StoredRecord>> {
        let inner = self.read()?;
        let Some(ids) = inner.signers.get(public_key) else {
            return Ok(Vec::new());
        };
        Ok(ids
            .iter()
            .filter_map(|id| inner.records.get(id).cloned())
            .collect())
    }

    async fn ids(&self) -> Result<Vec<RecordId>> {
        let inner = self.read()?;
        Ok(inner.records.keys().copied().collect())
    }

    async fn records(&self) -> Result<Vec<StoredRecord>> {
        let inner = self.read()?;
        Ok(inner.records.values().cloned().collect())
    }

    async fn count(&self) -> Result<usize> {
        let inner = self.read()?;
        Ok(inner.records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use truth_kernel_core::{
        Ed25519Verifier, Keypair, LogicalTime, Record, RecordBuilder, Timestamp,
    };

    fn valid(keypair: &Keypair, claim: &str) -> SignedEnvelope {
        let record = RecordBuilder::new(Timestamp::Logical(1))
            .field("claim", claim)
            .sign(keypair);
        SignedEnvelope::new(record).verify(&Ed25519Verifier)
    }

    fn forged(keypair: &Keypair, claim: &str) -> SignedEnvelope {
        let good = valid(keypair, claim).into_record();
        let other = Keypair::from_seed(&[0xee; 32]);
        let record = Record::new(
            good.payload().clone(),
            good.created_at().clone(),
            other.public_key().to_material(),
            good.signature().clone(),
        );
        SignedEnvelope::new(record).verify(&Ed25519Verifier)
    }

    #[tokio::test]
    async fn test_memory_store_basic() {
        let store = MemoryStore::new();
        let clock = LogicalClock::new();
        let kp = Keypair::from_seed(&[1; 32]);
        let envelope = valid(&kp, "water is wet");
        let id = envelope.id();

        let outcome = store.merge(envelope, Origin::Local, &clock).await.unwrap();
        assert_eq!(outcome, MergeOutcome::Inserted);
        assert!(store.contains(&id).await.unwrap());

        let stored = store.get(&id).await.unwrap().unwrap();
        assert_eq!(stored.record.id(), id);
        assert_eq!(stored.origin, Origin::Local);
        assert_eq!(stored.inserted_at, LogicalTime(1));
    }

    #[tokio::test]
    async fn test_memory_store_idempotent() {
        let store = MemoryStore::new();
        let clock = LogicalClock::new();
        let kp = Keypair::from_seed(&[1; 32]);

        let first = store
            .merge(valid(&kp, "a"), Origin::Peer("http://a".into()), &clock)
            .await
            .unwrap();
        let second = store
            .merge(valid(&kp, "a"), Origin::Local, &clock)
            .await
            .unwrap();

        assert_eq!(first, MergeOutcome::Inserted);
        assert_eq!(second, MergeOutcome::Duplicate);
        assert_eq!(store.count().await.unwrap(), 1);

        // Provenance of the first copy is kept.
        let id = valid(&kp, "a").id();
        let stored = store.get(&id).await.unwrap().unwrap();
        assert_eq!(stored.origin, Origin::Peer("http://a".into()));
        assert_eq!(clock.now(), LogicalTime(1));
    }

    #[tokio::test]
    async fn test_rejects_unverified_and_invalid() {
        let store = MemoryStore::new();
        let clock = LogicalClock::new();
        let kp = Keypair::from_seed(&[1; 32]);

        let unverified = SignedEnvelope::new(valid(&kp, "x").into_record());
        let outcome = store.merge(unverified, Origin::Local, &clock).await.unwrap();
        assert_eq!(outcome, MergeOutcome::Rejected(RejectReason::NotVerified));

        let outcome = store
            .merge(forged(&kp, "y"), Origin::Local, &clock)
            .await
            .unwrap();
        assert_eq!(outcome, MergeOutcome::Rejected(RejectReason::NotVerified));

        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_merge_batch_outcomes_in_order() {
        let store = MemoryStore::new();
        let clock = LogicalClock::new();
        let kp = Keypair::from_seed(&[2; 32]);

        let batch = vec![
            valid(&kp, "one"),
            forged(&kp, "two"),
            valid(&kp, "one"),
            valid(&kp, "three"),
        ];
        let outcomes = store
            .merge_batch(batch, Origin::Peer("http://peer".into()), &clock)
            .await
            .unwrap();

        assert_eq!(
            outcomes,
            vec![
                MergeOutcome::Inserted,
                MergeOutcome::Rejected(RejectReason::NotVerified),
                MergeOutcome::Duplicate,
                MergeOutcome::Inserted,
            ]
        );
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_by_signer_and_ordering() {
        let store = MemoryStore::new();
        let clock = LogicalClock::new();
        let alice = Keypair::from_seed(&[3; 32]);
        let bob = Keypair::from_seed(&[4; 32]);

        for claim in ["a", "b", "c"] {
            store
                .merge(valid(&alice, claim), Origin::Local, &clock)
                .await
                .unwrap();
        }
        store
            .merge(valid(&bob, "d"), Origin::Local, &clock)
            .await
            .unwrap();

        let by_alice = store.by_signer(&alice.public_key().0).await.unwrap();
        assert_eq!(by_alice.len(), 3);
        let by_bob = store.by_signer(&bob.public_key().0).await.unwrap();
        assert_eq!(by_bob.len(), 1);
        assert!(store.by_signer(&[0u8; 32]).await.unwrap().is_empty());

        let ids = store.ids().await.unwrap();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);

        let records = store.records().await.unwrap();
        let record_ids: Vec<_> = records.iter().map(|r| r.record.id()).collect();
        assert_eq!(record_ids, ids);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_batch_is_observed_whole() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(LogicalClock::new());
        let kp = Keypair::from_seed(&[5; 32]);
        let batch: Vec<_> = (0..200).map(|i| valid(&kp, &format!("c{i}"))).collect();

        let reader = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                for _ in 0..500 {
                    let n = store.count().await.unwrap();
                    assert!(n == 0 || n == 200, "observed partial batch: {n}");
                    tokio::task::yield_now().await;
                }
            })
        };

        store
            .merge_batch(batch, Origin::Local, &clock)
            .await
            .unwrap();
        reader.await.unwrap();
        assert_eq!(store.count().await.unwrap(), 200);
    }

    proptest::proptest! {
        #[test]
        fn test_merge_order_does_not_matter(
            claims in proptest::collection::vec("[a-z]{1,6}", 1..12),
            seed in proptest::prelude::any::<u64>(),
        ) {
            use proptest::prelude::*;

            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let kp = Keypair::from_seed(&[6; 32]);
            let forward: Vec<_> = claims.iter().map(|c| valid(&kp, c)).collect();
            let mut shuffled = forward.clone();
            let len = shuffled.len();
            for i in 0..len {
                let j = (seed as usize).wrapping_add(i * 7) % len;
                shuffled.swap(i, j);
            }

            let (a, b) = rt.block_on(async {
                let a = MemoryStore::new();
                let b = MemoryStore::new();
                let clock = LogicalClock::new();
                a.merge_batch(forward, Origin::Local, &clock).await.unwrap();
                for envelope in shuffled {
                    b.merge(envelope, Origin::Local, &clock).await.unwrap();
                }
                (a.ids().await.unwrap(), b.ids().await.unwrap())
            });
            prop_assert_eq!(a, b);
        }
    }
}
