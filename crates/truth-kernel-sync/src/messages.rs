//! Wire format for record exchange.
//!
//! Sync is pull-only. A peer serves `GET {peer_url}{records_path}` with a
//! JSON array whose elements are record documents in the ingest format:
//!
//! ```text
//! [
//!   {"payload": {...}, "created_at": 7, "signer_public_key": "..", "signature": ".."},
//!   ...
//! ]
//! ```
//!
//! Each element is handed to the canonicalizer as its own document, so one
//! bad element never spoils its neighbours.

use serde_json::value::RawValue;
use truth_kernel_core::Record;

use crate::error::{Result, SyncError};

/// Default path, relative to the peer URL, that serves records.
pub const DEFAULT_RECORDS_PATH: &str = "/records";

/// Wire size limits.
pub mod limits {
    /// Max bytes in one response body.
    pub const MAX_RESPONSE_BYTES: usize = 4 * 1024 * 1024;
    /// Max documents in one response.
    pub const MAX_RECORDS_PER_RESPONSE: usize = 10_000;
}

/// Join a peer URL and the records path with exactly one slash.
pub fn records_url(peer_url: &str, records_path: &str) -> String {
    let base = peer_url.trim_end_matches('/');
    let path = records_path.trim_start_matches('/');
    if path.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{path}")
    }
}

/// Split a response body into per-record documents.
///
/// Only the outer array is checked here. Element contents are left raw.
pub fn split_documents(body: &[u8], max_documents: usize) -> Result<Vec<Box<RawValue>>> {
    let documents: Vec<Box<RawValue>> = serde_json::from_slice(body)
        .map_err(|e| SyncError::MalformedResponse(e.to_string()))?;

    if documents.len() > max_documents {
        return Err(SyncError::Oversized {
            limit: max_documents,
            got: documents.len(),
        });
    }
    Ok(documents)
}

/// Encode records as a response body, each in normalized form.
pub fn encode_records<'a>(records: impl IntoIterator<Item = &'a Record>) -> Vec<u8> {
    let mut body = vec![b'['];
    for (i, record) in records.into_iter().enumerate() {
        if i > 0 {
            body.push(b',');
        }
        body.extend_from_slice(&record.to_canonical_json());
    }
    body.push(b']');
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use truth_kernel_core::{canonical, Keypair, RecordBuilder, Timestamp};

    #[test]
    fn test_records_url() {
        assert_eq!(records_url("http://a", "/records"), "http://a/records");
        assert_eq!(records_url("http://a/", "records"), "http://a/records");
        assert_eq!(records_url("http://a//", "/v1/records"), "http://a/v1/records");
        assert_eq!(records_url("http://a/", ""), "http://a");
    }

    #[test]
    fn test_split_keeps_bad_elements_raw() {
        let body = br#"[{"payload":{}}, 7, "x", {"a": [1, 2]}]"#;
        let docs = split_documents(body, 10).unwrap();
        assert_eq!(docs.len(), 4);
        assert_eq!(docs[1].get(), "7");
        assert_eq!(docs[3].get(), r#"{"a": [1, 2]}"#);
    }

    #[test]
    fn test_split_rejects_non_array() {
        for body in [&b"{}"[..], b"", b"[1,", b"null", b"\"records\""] {
            assert!(matches!(
                split_documents(body, 10),
                Err(SyncError::MalformedResponse(_))
            ));
        }
    }

    #[test]
    fn test_split_enforces_document_limit() {
        let err = split_documents(b"[1,2,3]", 2).unwrap_err();
        assert!(matches!(err, SyncError::Oversized { limit: 2, got: 3 }));
        assert_eq!(split_documents(b"[]", 0).unwrap().len(), 0);
    }

    #[test]
    fn test_encoded_records_parse_back() {
        let kp = Keypair::from_seed(&[8; 32]);
        let records: Vec<_> = ["a", "b"]
            .iter()
            .map(|c| {
                RecordBuilder::new(Timestamp::Logical(1))
                    .field("claim", *c)
                    .sign(&kp)
            })
            .collect();

        let body = encode_records(&records);
        let docs = split_documents(&body, 10).unwrap();
        assert_eq!(docs.len(), 2);
        for (doc, original) in docs.iter().zip(&records) {
            let parsed = canonical::parse(doc.get().as_bytes()).unwrap();
            assert_eq!(&parsed, original);
        }
        assert_eq!(encode_records(std::iter::empty()), b"[]");
    }
}
