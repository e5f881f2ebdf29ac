//! Transport abstraction for pulling records from a peer.
//!
//! A transport turns a peer URL into the raw response body, or fails. It
//! never parses records; that happens in the round.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use reqwest::header::ACCEPT;
use tracing::{debug, warn};

use crate::error::TransportError;
use crate::messages::records_url;

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Transport trait for fetching a peer's records.
///
/// Implementations must be thread-safe (Send + Sync). A body is returned only
/// once it was received completely.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Fetch the records body served by `peer_url`, at most `max_bytes` long.
    async fn fetch_records(&self, peer_url: &str, max_bytes: usize) -> Result<Bytes>;
}

/// HTTP transport backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    records_path: String,
}

impl HttpTransport {
    /// Create a transport that requests `records_path` below each peer URL.
    pub fn new(records_path: impl Into<String>, user_agent: &str) -> Self {
        let client = match reqwest::Client::builder().user_agent(user_agent).build() {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, "falling back to default http client");
                reqwest::Client::new()
            }
        };
        Self {
            client,
            records_path: records_path.into(),
        }
    }

    fn classify(error: reqwest::Error) -> TransportError {
        if error.is_timeout() {
            TransportError::Timeout
        } else if error.is_connect() {
            TransportError::Unreachable(error.to_string())
        } else {
            TransportError::Io(error.to_string())
        }
    }
}

#[async_trait]
impl PeerTransport for HttpTransport {
    async fn fetch_records(&self, peer_url: &str, max_bytes: usize) -> Result<Bytes> {
        let url = records_url(peer_url, &self.records_path);
        debug!(%url, "GET records");

        let mut response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(Self::classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        if let Some(len) = response.content_length() {
            if len > max_bytes as u64 {
                return Err(TransportError::Oversized { limit: max_bytes });
            }
        }

        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await.map_err(Self::classify)? {
            if body.len() + chunk.len() > max_bytes {
                return Err(TransportError::Oversized { limit: max_bytes });
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body.freeze())
    }
}

/// A scripted in-memory transport for testing.
///
/// Each peer URL maps to a canned [`Response`]. Unknown URLs are unreachable.
pub mod memory {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;
    use tokio::sync::RwLock;

    /// What a scripted peer answers.
    #[derive(Debug, Clone)]
    pub enum Response {
        /// Answer with this body.
        Body(Bytes),
        /// Fail with this error.
        Fail(TransportError),
        /// Wait, then answer.
        Delayed(Duration, Box<Response>),
    }

    impl Response {
        pub fn body(body: impl Into<Bytes>) -> Self {
            Response::Body(body.into())
        }

        pub fn delayed(delay: Duration, then: Response) -> Self {
            Response::Delayed(delay, Box::new(then))
        }
    }

    /// In-memory transport implementation.
    #[derive(Debug, Default)]
    pub struct MemoryTransport {
        responses: RwLock<HashMap<String, Response>>,
        fetches: RwLock<HashMap<String, usize>>,
    }

    impl MemoryTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Script the answer for a peer URL, replacing any previous one.
        pub async fn respond(&self, peer_url: &str, response: Response) {
            self.responses
                .write()
                .await
                .insert(peer_url.to_string(), response);
        }

        /// Number of fetches made against a peer URL.
        pub async fn fetch_count(&self, peer_url: &str) -> usize {
            self.fetches
                .read()
                .await
                .get(peer_url)
                .copied()
                .unwrap_or(0)
        }
    }

    #[async_trait]
    impl PeerTransport for MemoryTransport {
        async fn fetch_records(&self, peer_url: &str, max_bytes: usize) -> Result<Bytes> {
            *self
                .fetches
                .write()
                .await
                .entry(peer_url.to_string())
                .or_insert(0) += 1;

            let scripted = self.responses.read().await.get(peer_url).cloned();
            let mut response = scripted.ok_or_else(|| {
                TransportError::Unreachable(format!("no route to {peer_url}"))
            })?;

            loop {
                match response {
                    Response::Body(body) if body.len() > max_bytes => {
                        return Err(TransportError::Oversized { limit: max_bytes });
                    }
                    Response::Body(body) => return Ok(body),
                    Response::Fail(error) => return Err(error),
                    Response::Delayed(delay, then) => {
                        tokio::time::sleep(delay).await;
                        response = *then;
                    }
                }
            }
        }
    }
}
