//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: signed records, the JSON
//! documents peers serve, and deliberately broken variants of both.

use std::collections::BTreeMap;

use truth_kernel_core::{
    canonical_json, Ed25519PublicKey, Ed25519Verifier, Keypair, LogicalClock, Record,
    RecordBuilder, SignedEnvelope, Timestamp, Value, MAX_DEPTH,
};
use truth_kernel_store::{MemoryStore, MergeOutcome, Origin, Store};

/// A test fixture with a deterministic keypair and memory store.
pub struct TestFixture {
    pub keypair: Keypair,
    pub store: MemoryStore,
    pub clock: LogicalClock,
}

impl TestFixture {
    /// Create with a deterministic keypair from seed.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self::from_keypair(Keypair::from_seed(&seed))
    }

    fn from_keypair(keypair: Keypair) -> Self {
        Self {
            keypair,
            store: MemoryStore::new(),
            clock: LogicalClock::new(),
        }
    }

    /// Get the keypair's public key.
    pub fn public_key(&self) -> Ed25519PublicKey {
        self.keypair.public_key()
    }

    /// A signed record with a single `claim` field.
    pub fn record(&self, claim: &str) -> Record {
        RecordBuilder::new(Timestamp::Logical(1))
            .field("claim", claim)
            .sign(&self.keypair)
    }

    /// A signed record over an arbitrary JSON object payload.
    ///
    /// Panics if `payload` is not a JSON object.
    pub fn record_with(&self, payload: serde_json::Value, created_at: Timestamp) -> Record {
        let value = Value::from_json(&payload, 2, MAX_DEPTH).expect("payload within limits");
        let Value::Mapping(map) = value else {
            panic!("payload must be a JSON object");
        };
        RecordBuilder::new(created_at).payload(map).sign(&self.keypair)
    }

    /// A verified envelope with a single `claim` field.
    pub fn envelope(&self, claim: &str) -> SignedEnvelope {
        SignedEnvelope::new(self.record(claim)).verify(&Ed25519Verifier)
    }

    /// The ingest document for a signed `claim` record.
    pub fn document(&self, claim: &str) -> String {
        input_document(&self.record(claim))
    }

    /// A document whose payload was altered after signing.
    pub fn tampered_document(&self, claim: &str) -> String {
        let good = self.record(claim);
        let mut payload = good.payload().clone();
        payload.insert("claim".to_string(), Value::from(format!("{claim} (edited)")));
        let tampered = Record::new(
            payload,
            good.created_at().clone(),
            good.signer_public_key().clone(),
            good.signature().clone(),
        );
        input_document(&tampered)
    }

    /// A document signed by this fixture but claiming another signer.
    pub fn foreign_key_document(&self, claim: &str) -> String {
        let good = self.record(claim);
        let other = Keypair::from_seed(&[0xee; 32]);
        let forged = Record::new(
            good.payload().clone(),
            good.created_at().clone(),
            other.public_key().to_material(),
            good.signature().clone(),
        );
        input_document(&forged)
    }

    /// Merge a `claim` record into the fixture's own store.
    pub async fn merge_claim(&self, claim: &str) -> MergeOutcome {
        self.store
            .merge(self.envelope(claim), Origin::Local, &self.clock)
            .await
            .expect("memory store merge")
    }
}

/// Render a record in the ingest format, keys deliberately out of order and
/// spaced, without an `id` field.
pub fn input_document(record: &Record) -> String {
    let payload = canonical_json(&Value::Mapping(record.payload().clone()));
    let created_at = canonical_json(&record.created_at().to_value());
    format!(
        r#"{{ "signature": "{}", "payload": {}, "signer_public_key": "{}", "created_at": {} }}"#,
        record.signature().as_str(),
        String::from_utf8_lossy(&payload),
        record.signer_public_key().as_str(),
        String::from_utf8_lossy(&created_at),
    )
}

/// Join documents into a peer response body.
pub fn response_body<S: AsRef<str>>(documents: &[S]) -> String {
    let joined: Vec<&str> = documents.iter().map(AsRef::as_ref).collect();
    format!("[{}]", joined.join(","))
}

/// Build a payload map from `(key, value)` pairs.
pub fn payload<const N: usize>(fields: [(&str, Value); N]) -> BTreeMap<String, Value> {
    fields
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// Create multiple fixtures for multi-party testing.
pub fn multi_party_fixtures(count: usize) -> Vec<TestFixture> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[0] = i as u8;
            seed[1] = (i >> 8) as u8;
            TestFixture::with_seed(seed)
        })
        .collect()
}
