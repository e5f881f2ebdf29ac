//! Canonical JSON for truth records.
//!
//! This module turns incoming JSON text into a [`Record`] and defines the
//! deterministic byte encoding records are signed over:
//! - Object keys sorted by byte value
//! - No insignificant whitespace
//! - Numbers in fixed decimal form (see [`Number`](crate::Number))
//! - Strings escaped minimally: `"`, `\` and control characters only
//!
//! Two documents that differ only in key order, whitespace or number
//! spelling produce the same canonical bytes, and therefore the same id and
//! the same signed message.
//!
//! **CRITICAL**: This encoding is FROZEN. Changes break all existing signatures.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer};

use crate::crypto::KeyMaterial;
use crate::error::ParseError;
use crate::record::{Record, Timestamp};
use crate::value::{mapping_from_json, Value};

/// Maximum nesting depth of a record document, top-level object included.
pub const MAX_DEPTH: usize = 64;

/// Record field names.
mod fields {
    pub const PAYLOAD: &str = "payload";
    pub const CREATED_AT: &str = "created_at";
    pub const SIGNER_PUBLIC_KEY: &str = "signer_public_key";
    pub const SIGNATURE: &str = "signature";
    /// Tolerated on input and discarded; ids are always recomputed.
    pub const ID: &str = "id";

    pub const REQUIRED: [&str; 4] = [PAYLOAD, CREATED_AT, SIGNER_PUBLIC_KEY, SIGNATURE];
}

/// Parse JSON text into a record.
///
/// The top level must be an object holding exactly `payload` (an object),
/// `created_at`, `signer_public_key` and `signature`, plus optionally `id`
/// which is ignored. The record id is derived from the canonical payload.
pub fn parse(text: &[u8]) -> Result<Record, ParseError> {
    let text = std::str::from_utf8(text)
        .map_err(|e| ParseError::Malformed(format!("invalid UTF-8: {e}")))?;

    serde_json::from_str::<UniqueKeys>(text).map_err(|e| ParseError::Malformed(e.to_string()))?;
    let document: serde_json::Value =
        serde_json::from_str(text).map_err(|e| ParseError::Malformed(e.to_string()))?;

    let serde_json::Value::Object(top) = document else {
        return Err(ParseError::Malformed("record must be a JSON object".into()));
    };

    if let Some(unexpected) = top
        .keys()
        .find(|k| !fields::REQUIRED.contains(&k.as_str()) && k.as_str() != fields::ID)
    {
        return Err(ParseError::UnexpectedField(unexpected.clone()));
    }

    if let Some(missing) = fields::REQUIRED.iter().find(|f| !top.contains_key(**f)) {
        return Err(ParseError::MissingField((*missing).to_string()));
    }

    let payload = match &top[fields::PAYLOAD] {
        serde_json::Value::Object(map) => mapping_from_json(map, 2, MAX_DEPTH)?,
        _ => return Err(ParseError::Malformed("payload must be a JSON object".into())),
    };

    let created_at = parse_timestamp(&top[fields::CREATED_AT])?;
    let signer_public_key = key_material(&top, fields::SIGNER_PUBLIC_KEY)?;
    let signature = key_material(&top, fields::SIGNATURE)?;

    Ok(Record::new(payload, created_at, signer_public_key, signature))
}

/// Validation pass that rejects any object repeating a key.
///
/// `serde_json::Value` keeps the last occurrence of a repeated key, which
/// would let two parsers of the same text disagree on what was signed.
struct UniqueKeys;

impl<'de> Deserialize<'de> for UniqueKeys {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(UniqueKeysVisitor)
    }
}

struct UniqueKeysVisitor;

impl<'de> Visitor<'de> for UniqueKeysVisitor {
    type Value = UniqueKeys;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON value")
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<UniqueKeys, E> {
        Ok(UniqueKeys)
    }

    fn visit_i64<E: de::Error>(self, _: i64) -> Result<UniqueKeys, E> {
        Ok(UniqueKeys)
    }

    fn visit_u64<E: de::Error>(self, _: u64) -> Result<UniqueKeys, E> {
        Ok(UniqueKeys)
    }

    fn visit_f64<E: de::Error>(self, _: f64) -> Result<UniqueKeys, E> {
        Ok(UniqueKeys)
    }

    fn visit_str<E: de::Error>(self, _: &str) -> Result<UniqueKeys, E> {
        Ok(UniqueKeys)
    }

    fn visit_unit<E: de::Error>(self) -> Result<UniqueKeys, E> {
        Ok(UniqueKeys)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<UniqueKeys, A::Error> {
        while seq.next_element::<UniqueKeys>()?.is_some() {}
        Ok(UniqueKeys)
    }

    // Arbitrary-precision numbers also arrive here, as a one-entry map.
    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<UniqueKeys, A::Error> {
        let mut seen = HashSet::new();
        while let Some(key) = map.next_key::<String>()? {
            map.next_value::<UniqueKeys>()?;
            if !seen.insert(key.clone()) {
                return Err(de::Error::custom(format!("duplicate key `{key}`")));
            }
        }
        Ok(UniqueKeys)
    }
}

fn parse_timestamp(value: &serde_json::Value) -> Result<Timestamp, ParseError> {
    match value {
        serde_json::Value::Number(n) => {
            let number =
                crate::value::Number::parse(&n.to_string()).map_err(|_| ParseError::InvalidTimestamp)?;
            number
                .as_u64()
                .map(Timestamp::Logical)
                .ok_or(ParseError::InvalidTimestamp)
        }
        serde_json::Value::String(s) if !s.is_empty() => Ok(Timestamp::Label(s.clone())),
        _ => Err(ParseError::InvalidTimestamp),
    }
}

fn key_material(
    top: &serde_json::Map<String, serde_json::Value>,
    field: &str,
) -> Result<KeyMaterial, ParseError> {
    match &top[field] {
        serde_json::Value::String(s) => Ok(KeyMaterial::new(s.clone())),
        _ => Err(ParseError::Malformed(format!("{field} must be a string"))),
    }
}

/// Encode a value to canonical bytes.
pub fn canonical_json(value: &Value) -> Vec<u8> {
    let mut buf = Vec::new();
    write_canonical(&mut buf, value);
    buf
}

/// Encode a mapping to canonical bytes.
pub fn canonical_mapping(map: &BTreeMap<String, Value>) -> Vec<u8> {
    let mut buf = Vec::new();
    write_mapping(&mut buf, map);
    buf
}

/// Recursively encode a value.
pub fn write_canonical(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Null => buf.extend_from_slice(b"null"),
        Value::Bool(true) => buf.extend_from_slice(b"true"),
        Value::Bool(false) => buf.extend_from_slice(b"false"),
        Value::Number(n) => buf.extend_from_slice(n.as_str().as_bytes()),
        Value::String(s) => write_string(buf, s),
        Value::Sequence(items) => {
            buf.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    buf.push(b',');
                }
                write_canonical(buf, item);
            }
            buf.push(b']');
        }
        Value::Mapping(map) => write_mapping(buf, map),
    }
}

/// Encode a mapping. `BTreeMap<String, _>` iterates in byte order of the
/// UTF-8 keys, which is exactly the canonical key order.
fn write_mapping(buf: &mut Vec<u8>, map: &BTreeMap<String, Value>) {
    buf.push(b'{');
    for (i, (key, value)) in map.iter().enumerate() {
        if i > 0 {
            buf.push(b',');
        }
        write_string(buf, key);
        buf.push(b':');
        write_canonical(buf, value);
    }
    buf.push(b'}');
}

/// Encode a string with minimal escaping.
fn write_string(buf: &mut Vec<u8>, s: &str) {
    const HEX: &[u8; 16] = b"0123456789abcdef";

    buf.push(b'"');
    for &byte in s.as_bytes() {
        match byte {
            b'"' => buf.extend_from_slice(b"\\\""),
            b'\\' => buf.extend_from_slice(b"\\\\"),
            0x08 => buf.extend_from_slice(b"\\b"),
            0x0c => buf.extend_from_slice(b"\\f"),
            b'\n' => buf.extend_from_slice(b"\\n"),
            b'\r' => buf.extend_from_slice(b"\\r"),
            b'\t' => buf.extend_from_slice(b"\\t"),
            0x00..=0x1f => {
                buf.extend_from_slice(b"\\u00");
                buf.push(HEX[(byte >> 4) as usize]);
                buf.push(HEX[(byte & 0x0f) as usize]);
            }
            // Multi-byte UTF-8 sequences pass through untouched.
            _ => buf.push(byte),
        }
    }
    buf.push(b'"');
}
