//! Signature verification.
//!
//! Verification failure is data, not an exceptional condition: every path
//! here returns `false` rather than an error, including malformed key and
//! signature bytes.

use ed25519_dalek::{Signature, VerifyingKey};

/// A pluggable `verify(message, signature, public_key) -> bool` primitive.
///
/// Implementations must be pure and reentrant so that records of one round
/// can be checked in parallel without locking.
pub trait SignatureVerifier: Send + Sync {
    fn verify(&self, message: &[u8], signature: &[u8], public_key: &[u8]) -> bool;
}

/// Ed25519 verification (RFC 8032, strict mode).
///
/// Strict mode rejects small-order keys and non-canonical signature
/// encodings. Point and scalar comparisons inside ed25519-dalek do not
/// short-circuit on early mismatching bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Verifier;

impl SignatureVerifier for Ed25519Verifier {
    fn verify(&self, message: &[u8], signature: &[u8], public_key: &[u8]) -> bool {
        let Ok(key_bytes) = <[u8; 32]>::try_from(public_key) else {
            return false;
        };
        let Ok(sig_bytes) = <[u8; 64]>::try_from(signature) else {
            return false;
        };
        let Ok(verifying_key) = VerifyingKey::from_bytes(&key_bytes) else {
            return false;
        };
        let sig = Signature::from_bytes(&sig_bytes);
        verifying_key.verify_strict(message, &sig).is_ok()
    }
}

/// Verify an Ed25519 signature over `message`.
pub fn verify(message: &[u8], signature: &[u8], public_key: &[u8]) -> bool {
    Ed25519Verifier.verify(message, signature, public_key)
}
