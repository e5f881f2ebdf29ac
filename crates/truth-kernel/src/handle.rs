//! Engine handle: the lifetime boundary around an [`Engine`].
//!
//! A handle is live from [`EngineHandle::init`] until [`EngineHandle::free`].
//! Freeing drops the handle's reference to the engine, so every later call
//! fails with `InvalidHandle` instead of touching released state. A round
//! already in flight keeps its own reference and finishes normally.

use std::sync::{Arc, RwLock, RwLockReadGuard};

use tracing::debug;
use truth_kernel_core::{canonical, decode_key_text, verify};
use truth_kernel_sync::RoundSummary;

use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::error::{EngineError, Result};

/// Opaque root object of the public API.
pub struct EngineHandle {
    engine: RwLock<Option<Arc<Engine>>>,
}

impl EngineHandle {
    /// Create a live handle over a fresh engine. Never fails.
    pub fn init(config: EngineConfig) -> Self {
        Self::with_engine(Engine::new(config))
    }

    /// Wrap an existing engine.
    pub fn with_engine(engine: Engine) -> Self {
        Self {
            engine: RwLock::new(Some(Arc::new(engine))),
        }
    }

    /// Release the engine. Returns `false` if it was already released.
    pub fn free(&self) -> bool {
        let released = self
            .engine
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .is_some();
        if released {
            debug!("engine handle freed");
        }
        released
    }

    pub fn is_live(&self) -> bool {
        self.read().is_some()
    }

    /// The engine behind this handle, if still live.
    pub fn engine(&self) -> Result<Arc<Engine>> {
        self.read().clone().ok_or(EngineError::InvalidHandle)
    }

    // The slot is a single `Option`, so a poisoned lock still holds a
    // consistent value.
    fn read(&self) -> RwLockReadGuard<'_, Option<Arc<Engine>>> {
        self.engine.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Run one sync round against `peer_url`.
    pub async fn sync_with_peer(&self, peer_url: &str) -> Result<RoundSummary> {
        let engine = self.engine()?;
        engine.sync_with_peer(peer_url).await
    }

    /// Peers whose state is no longer unknown.
    pub fn peer_count(&self) -> Result<usize> {
        Ok(self.engine()?.peer_count())
    }

    /// Normalize a record document. Does not touch any engine state.
    pub fn process_json(text: &[u8]) -> Result<Vec<u8>> {
        process_json(text)
    }

    /// Check a signature given as hex or base64 text.
    pub fn verify_signature(message: &[u8], signature: &str, public_key: &str) -> bool {
        verify_signature(message, signature, public_key)
    }
}

/// Parse a record document and return its normalized JSON encoding.
///
/// Two documents that differ only in key order, whitespace or number
/// spelling produce identical bytes.
pub fn process_json(text: &[u8]) -> Result<Vec<u8>> {
    let record = canonical::parse(text)?;
    Ok(record.to_canonical_json())
}

/// Verify `signature` over `message` with `public_key`, both as hex or
/// base64 text. Undecodable text yields `false`.
pub fn verify_signature(message: &[u8], signature: &str, public_key: &str) -> bool {
    let (Ok(signature), Ok(public_key)) = (decode_key_text(signature), decode_key_text(public_key))
    else {
        return false;
    };
    verify(message, &signature, &public_key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use truth_kernel_core::{KeyMaterial, Keypair};
    use truth_kernel_sync::MemoryTransport;

    fn handle() -> EngineHandle {
        EngineHandle::with_engine(Engine::with_transport(
            EngineConfig::default(),
            Arc::new(MemoryTransport::new()),
        ))
    }

    #[tokio::test]
    async fn test_free_invalidates() {
        let handle = handle();
        assert!(handle.is_live());
        assert_eq!(handle.peer_count().unwrap(), 0);

        assert!(handle.free());
        assert!(!handle.free());
        assert!(!handle.is_live());

        let err = handle.sync_with_peer("http://a").await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidHandle));
        assert!(matches!(handle.peer_count(), Err(EngineError::InvalidHandle)));
    }

    #[tokio::test]
    async fn test_engine_reference_outlives_free() {
        let handle = handle();
        let engine = handle.engine().unwrap();
        handle.free();
        engine.sync_with_peer("http://a").await.unwrap_err();
        assert_eq!(engine.peer_count(), 1);
    }

    #[test]
    fn test_poisoned_lock_keeps_handle_usable() {
        let handle = handle();
        std::thread::scope(|scope| {
            let poisoner = scope.spawn(|| {
                let _guard = handle.engine.write().unwrap();
                panic!("poison the handle lock");
            });
            assert!(poisoner.join().is_err());
        });
        assert!(handle.engine.is_poisoned());

        assert!(handle.is_live());
        assert!(handle.engine().is_ok());
        assert_eq!(handle.peer_count().unwrap(), 0);

        assert!(handle.free());
        assert!(!handle.is_live());
        assert!(matches!(handle.engine(), Err(EngineError::InvalidHandle)));
    }

    #[test]
    fn test_process_json_key_order_irrelevant() {
        let a = process_json(br#"{"payload":{"b":1,"a":2},"created_at":"t","signer_public_key":"k","signature":"s"}"#)
            .unwrap();
        let b = process_json(br#"{"signature":"s","signer_public_key":"k","created_at":"t","payload":{"a":2,"b":1}}"#)
            .unwrap();
        assert_eq!(a, b);
        assert!(String::from_utf8(a).unwrap().starts_with(r#"{"created_at":"t","id":""#));
    }

    #[test]
    fn test_process_json_errors() {
        assert!(matches!(process_json(b"{"), Err(EngineError::Parse(_))));
        assert!(matches!(process_json(b"{}"), Err(EngineError::Parse(_))));
    }

    #[test]
    fn test_verify_signature_text_forms() {
        let kp = Keypair::from_seed(&[9; 32]);
        let sig = kp.sign(b"hello");
        let pk = kp.public_key();

        assert!(verify_signature(b"hello", &sig.to_hex(), &pk.to_hex()));
        assert!(verify_signature(
            b"hello",
            KeyMaterial::from_bytes_base64(&sig.0).as_str(),
            KeyMaterial::from_bytes_base64(&pk.0).as_str()
        ));
        assert!(!verify_signature(b"hellp", &sig.to_hex(), &pk.to_hex()));
        assert!(!verify_signature(b"hello", "zz", &pk.to_hex()));
        assert!(!verify_signature(b"hello", &sig.to_hex(), ""));
    }
}
