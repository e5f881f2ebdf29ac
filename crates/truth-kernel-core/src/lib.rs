//! # Truth Kernel Core
//!
//! Pure primitives for the Truth Kernel: truth records, JSON canonicalization,
//! and signature verification.
//!
//! This crate contains no I/O, no storage, no networking. It is pure computation
//! over records and their signatures.
//!
//! ## Key Types
//!
//! - [`Record`] - A structured fact with a content-derived identity
//! - [`RecordId`] - Content-addressed identifier (Blake3 of the canonical payload)
//! - [`SignedEnvelope`] - A record plus its one-shot verification status
//! - [`Value`] - Tagged JSON value used for payloads
//!
//! ## Canonicalization
//!
//! Incoming JSON is parsed with [`canonical::parse`] and re-encoded with sorted
//! keys, no whitespace and fixed decimal numbers. The canonical payload bytes
//! are the message that signatures are checked against. See [`canonical`].

pub mod canonical;
pub mod crypto;
pub mod error;
pub mod record;
pub mod types;
pub mod value;
pub mod verify;

pub use canonical::{canonical_json, canonical_mapping, parse, MAX_DEPTH};
pub use crypto::{
    decode_key_text, Blake3Hash, Ed25519PublicKey, Ed25519Signature, KeyMaterial, Keypair,
};
pub use error::{CoreError, ParseError};
pub use record::{
    InvalidReason, Record, RecordBuilder, SignedEnvelope, Timestamp, VerificationStatus,
};
pub use types::{LogicalClock, LogicalTime, RecordId};
pub use value::{Number, Value};
pub use verify::{verify, Ed25519Verifier, SignatureVerifier};
