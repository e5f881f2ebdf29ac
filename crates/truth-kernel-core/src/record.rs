//! Record: the unit of fact held by the kernel.
//!
//! A record is an immutable, signed payload. Its id is derived from the
//! canonical payload bytes at construction and can never be set from outside.

use std::collections::BTreeMap;
use std::fmt;

use crate::canonical::{canonical_json, canonical_mapping};
use crate::crypto::{KeyMaterial, Keypair};
use crate::types::RecordId;
use crate::value::{Number, Value};
use crate::verify::SignatureVerifier;

/// The `created_at` of a record: a logical timestamp.
///
/// Either a non-negative counter value or an opaque non-empty label
/// assigned by the author.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Timestamp {
    Logical(u64),
    Label(String),
}

impl Timestamp {
    pub fn to_value(&self) -> Value {
        match self {
            Timestamp::Logical(n) => Value::Number(Number::from_u64(*n)),
            Timestamp::Label(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timestamp::Logical(n) => write!(f, "{n}"),
            Timestamp::Label(s) => f.write_str(s),
        }
    }
}

/// A truth record: payload, logical timestamp, signer key and signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    id: RecordId,
    payload: BTreeMap<String, Value>,
    canonical_payload: Vec<u8>,
    created_at: Timestamp,
    signer_public_key: KeyMaterial,
    signature: KeyMaterial,
}

impl Record {
    /// Build a record, deriving its id from the canonical payload.
    pub fn new(
        payload: BTreeMap<String, Value>,
        created_at: Timestamp,
        signer_public_key: KeyMaterial,
        signature: KeyMaterial,
    ) -> Self {
        let canonical_payload = canonical_mapping(&payload);
        let id = RecordId::derive(&canonical_payload);
        Self {
            id,
            payload,
            canonical_payload,
            created_at,
            signer_public_key,
            signature,
        }
    }

    /// The content-derived id.
    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn payload(&self) -> &BTreeMap<String, Value> {
        &self.payload
    }

    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    pub fn signer_public_key(&self) -> &KeyMaterial {
        &self.signer_public_key
    }

    pub fn signature(&self) -> &KeyMaterial {
        &self.signature
    }

    /// The message the signature is checked against: the canonical payload.
    pub fn signed_message(&self) -> &[u8] {
        &self.canonical_payload
    }

    /// The normalized JSON encoding of the whole record.
    ///
    /// Keys sorted, no whitespace, `id` included as hex. Parsing this output
    /// yields an equal record.
    pub fn to_canonical_json(&self) -> Vec<u8> {
        let mut top = BTreeMap::new();
        top.insert("created_at".to_string(), self.created_at.to_value());
        top.insert("id".to_string(), Value::String(self.id.to_hex()));
        top.insert("payload".to_string(), Value::Mapping(self.payload.clone()));
        top.insert(
            "signature".to_string(),
            Value::String(self.signature.as_str().to_string()),
        );
        top.insert(
            "signer_public_key".to_string(),
            Value::String(self.signer_public_key.as_str().to_string()),
        );
        canonical_json(&Value::Mapping(top))
    }
}

/// Builder for creating signed records.
pub struct RecordBuilder {
    payload: BTreeMap<String, Value>,
    created_at: Timestamp,
}

impl RecordBuilder {
    pub fn new(created_at: Timestamp) -> Self {
        Self {
            payload: BTreeMap::new(),
            created_at,
        }
    }

    /// Set one payload field.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(name.into(), value.into());
        self
    }

    /// Replace the whole payload.
    pub fn payload(mut self, payload: BTreeMap<String, Value>) -> Self {
        self.payload = payload;
        self
    }

    /// Sign the canonical payload and build the record.
    pub fn sign(self, keypair: &Keypair) -> Record {
        let message = canonical_mapping(&self.payload);
        let signature = keypair.sign(&message);
        Record::new(
            self.payload,
            self.created_at,
            keypair.public_key().to_material(),
            signature.to_material(),
        )
    }
}

/// Why an envelope failed verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidReason {
    /// The public key text does not decode.
    UndecodableKey,
    /// The signature text does not decode.
    UndecodableSignature,
    /// The signature does not verify against the canonical payload.
    SignatureMismatch,
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidReason::UndecodableKey => f.write_str("undecodable public key"),
            InvalidReason::UndecodableSignature => f.write_str("undecodable signature"),
            InvalidReason::SignatureMismatch => f.write_str("signature mismatch"),
        }
    }
}

/// Verification status of an envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationStatus {
    Unverified,
    Valid,
    Invalid(InvalidReason),
}

/// A record plus its verification status.
///
/// The status moves from `Unverified` to `Valid` or `Invalid` exactly once,
/// through [`SignedEnvelope::verify`]. There is no way to mark an envelope
/// valid without running the verifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedEnvelope {
    record: Record,
    status: VerificationStatus,
}

impl SignedEnvelope {
    /// Wrap a freshly parsed record.
    pub fn new(record: Record) -> Self {
        Self {
            record,
            status: VerificationStatus::Unverified,
        }
    }

    /// Decide the envelope's status. A no-op if already decided.
    pub fn verify(mut self, verifier: &dyn SignatureVerifier) -> Self {
        if self.status != VerificationStatus::Unverified {
            return self;
        }

        self.status = match (
            self.record.signer_public_key.decode(),
            self.record.signature.decode(),
        ) {
            (Err(_), _) => VerificationStatus::Invalid(InvalidReason::UndecodableKey),
            (_, Err(_)) => VerificationStatus::Invalid(InvalidReason::UndecodableSignature),
            (Ok(key), Ok(sig)) => {
                if verifier.verify(self.record.signed_message(), &sig, &key) {
                    VerificationStatus::Valid
                } else {
                    VerificationStatus::Invalid(InvalidReason::SignatureMismatch)
                }
            }
        };
        self
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn into_record(self) -> Record {
        self.record
    }

    pub fn status(&self) -> &VerificationStatus {
        &self.status
    }

    pub fn is_valid(&self) -> bool {
        self.status == VerificationStatus::Valid
    }

    pub fn id(&self) -> RecordId {
        self.record.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::Ed25519Verifier;

    fn signed(keypair: &Keypair) -> Record {
        RecordBuilder::new(Timestamp::Logical(7))
            .field("claim", "earth is round")
            .field("confidence", 95i64)
            .sign(keypair)
    }

    #[test]
    fn test_id_depends_on_payload_only() {
        let kp1 = Keypair::from_seed(&[1; 32]);
        let kp2 = Keypair::from_seed(&[2; 32]);
        let r1 = signed(&kp1);
        let r2 = signed(&kp2);
        assert_eq!(r1.id(), r2.id());

        let r3 = RecordBuilder::new(Timestamp::Logical(7))
            .field("claim", "earth is flat")
            .sign(&kp1);
        assert_ne!(r1.id(), r3.id());
    }

    #[test]
    fn test_envelope_valid() {
        let kp = Keypair::from_seed(&[3; 32]);
        let envelope = SignedEnvelope::new(signed(&kp)).verify(&Ed25519Verifier);
        assert!(envelope.is_valid());
    }

    #[test]
    fn test_envelope_signature_mismatch() {
        let kp = Keypair::from_seed(&[3; 32]);
        let other = Keypair::from_seed(&[4; 32]);
        let good = signed(&kp);
        let forged = Record::new(
            good.payload().clone(),
            good.created_at().clone(),
            other.public_key().to_material(),
            good.signature().clone(),
        );
        let envelope = SignedEnvelope::new(forged).verify(&Ed25519Verifier);
        assert_eq!(
            envelope.status(),
            &VerificationStatus::Invalid(InvalidReason::SignatureMismatch)
        );
    }

    #[test]
    fn test_envelope_undecodable_material() {
        let record = Record::new(
            BTreeMap::new(),
            Timestamp::Label("t".into()),
            KeyMaterial::new("k"),
            KeyMaterial::new("s"),
        );
        let envelope = SignedEnvelope::new(record).verify(&Ed25519Verifier);
        assert_eq!(
            envelope.status(),
            &VerificationStatus::Invalid(InvalidReason::UndecodableKey)
        );
    }

    #[test]
    fn test_status_decided_once() {
        struct AlwaysTrue;
        impl SignatureVerifier for AlwaysTrue {
            fn verify(&self, _: &[u8], _: &[u8], _: &[u8]) -> bool {
                true
            }
        }

        let kp = Keypair::from_seed(&[3; 32]);
        let other = Keypair::from_seed(&[4; 32]);
        let good = signed(&kp);
        let forged = Record::new(
            good.payload().clone(),
            good.created_at().clone(),
            other.public_key().to_material(),
            good.signature().clone(),
        );
        let rejected = SignedEnvelope::new(forged).verify(&Ed25519Verifier);
        let again = rejected.verify(&AlwaysTrue);
        assert!(!again.is_valid());
    }

    #[test]
    fn test_canonical_json_includes_id_and_sorted_keys() {
        let record = Record::new(
            BTreeMap::from([("b".to_string(), Value::from(1i64))]),
            Timestamp::Label("t".into()),
            KeyMaterial::new("k"),
            KeyMaterial::new("s"),
        );
        let json = String::from_utf8(record.to_canonical_json()).unwrap();
        let expected = format!(
            r#"{{"created_at":"t","id":"{}","payload":{{"b":1}},"signature":"s","signer_public_key":"k"}}"#,
            record.id().to_hex()
        );
        assert_eq!(json, expected);
    }
}
