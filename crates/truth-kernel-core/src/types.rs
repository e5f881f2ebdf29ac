//! Strong type definitions for the Truth Kernel.
//!
//! All identifiers are newtypes to prevent misuse at compile time.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

/// Domain separation prefix for record IDs.
pub const ID_DOMAIN: &[u8] = b"truth-kernel/record-id/v1";

/// A 32-byte record identifier, computed as Blake3(ID_DOMAIN || canonical payload).
///
/// This is the content-address of a record. Two records with the same
/// canonical payload have the same RecordId, whatever their signer.
/// Equality is checked in constant time.
#[derive(Clone, Copy, Serialize, Deserialize)]
pub struct RecordId(pub [u8; 32]);

impl RecordId {
    /// Derive the id of a canonical payload encoding.
    pub fn derive(canonical_payload: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(ID_DOMAIN);
        hasher.update(canonical_payload);
        Self(*hasher.finalize().as_bytes())
    }

    /// Create a new RecordId from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl PartialEq for RecordId {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for RecordId {}

impl Hash for RecordId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl PartialOrd for RecordId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RecordId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for RecordId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for RecordId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// A point on the engine's logical clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LogicalTime(pub u64);

impl LogicalTime {
    /// The origin of the clock. No event ever carries it.
    pub const ZERO: Self = Self(0);

    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for LogicalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Monotonic logical clock shared by an engine.
///
/// Every call to [`tick`](LogicalClock::tick) returns a strictly greater time
/// than any previous call, across threads.
#[derive(Debug, Default)]
pub struct LogicalClock {
    counter: AtomicU64,
}

impl LogicalClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the clock and return the new time.
    pub fn tick(&self) -> LogicalTime {
        LogicalTime(self.counter.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// The latest time handed out (ZERO if none yet).
    pub fn now(&self) -> LogicalTime {
        LogicalTime(self.counter.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_hex_roundtrip() {
        let id = RecordId::from_bytes([0x42; 32]);
        let hex = id.to_hex();
        let recovered = RecordId::from_hex(&hex).unwrap();
        assert_eq!(id, recovered);
    }

    #[test]
    fn test_record_id_display() {
        let id = RecordId::from_bytes([0xab; 32]);
        assert_eq!(format!("{}", id), "abababababababab");
        assert!(format!("{:?}", id).starts_with("RecordId("));
    }

    #[test]
    fn test_record_id_derive_is_domain_separated() {
        let payload = br#"{"a":1}"#;
        let id = RecordId::derive(payload);
        assert_eq!(id, RecordId::derive(payload));
        assert_ne!(id.0, *blake3::hash(payload).as_bytes());
    }

    #[test]
    fn test_logical_clock_is_monotonic() {
        let clock = LogicalClock::new();
        assert_eq!(clock.now(), LogicalTime::ZERO);
        let t1 = clock.tick();
        let t2 = clock.tick();
        assert!(t2 > t1);
        assert_eq!(clock.now(), t2);
    }
}
