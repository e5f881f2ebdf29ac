//! Golden test vectors for deterministic canonicalization.
//!
//! Each vector pairs an input payload spelling with the exact canonical
//! bytes every implementation must produce for it. Signatures made on one
//! platform only verify on another if these agree byte for byte.

use truth_kernel_core::{canonical, Keypair, Record, RecordBuilder, RecordId, Timestamp, Value};

use crate::fixtures::payload;
use crate::generators::document;

/// A golden canonicalization vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Payload JSON as a client might send it.
    pub input: &'static str,
    /// Expected canonical payload bytes.
    pub canonical: &'static str,
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "empty payload",
            input: "{}",
            canonical: "{}",
        },
        GoldenVector {
            name: "keys sorted",
            input: r#"{"b":1,"a":2}"#,
            canonical: r#"{"a":2,"b":1}"#,
        },
        GoldenVector {
            name: "whitespace removed",
            input: "{ \"a\" : [ 1 ,\n 2 ] ,\t\"b\" : { } }",
            canonical: r#"{"a":[1,2],"b":{}}"#,
        },
        GoldenVector {
            name: "nested objects sorted, arrays kept in order",
            input: r#"{"z":{"y":[3,{"b":true,"a":null}],"x":"-"},"a":"x"}"#,
            canonical: r#"{"a":"x","z":{"x":"-","y":[3,{"a":null,"b":true}]}}"#,
        },
        GoldenVector {
            name: "number spellings",
            input: r#"{"n":[1.0,10e-1,1E0,-0,0.50,1e3,-2.5e-3,100,2.5E+2]}"#,
            canonical: r#"{"n":[1,1,1,0,0.5,1000,-0.0025,100,250]}"#,
        },
        GoldenVector {
            name: "integers beyond 64 bits kept exact",
            input: r#"{"big":123456789012345678901234567890,"neg":-18446744073709551617}"#,
            canonical: r#"{"big":123456789012345678901234567890,"neg":-18446744073709551617}"#,
        },
        GoldenVector {
            name: "string escapes minimal",
            input: r#"{"s":"tab\there \"q\" \\ \u0001 \u00e9 \/ \u001F"}"#,
            canonical: "{\"s\":\"tab\\there \\\"q\\\" \\\\ \\u0001 \u{e9} / \\u001f\"}",
        },
        GoldenVector {
            name: "keys ordered by byte value",
            input: r#"{"é":1,"z":2,"Z":3,"":4}"#,
            canonical: r#"{"":4,"Z":3,"z":2,"é":1}"#,
        },
        GoldenVector {
            name: "literals",
            input: r#"{"t":true,"f":false,"n":null}"#,
            canonical: r#"{"f":false,"n":null,"t":true}"#,
        },
    ]
}

/// The seed used to sign vector records.
pub const VECTOR_SEED: [u8; 32] = [0x42; 32];

/// Build the signed ingest document for a vector.
pub fn vector_document(vector: &GoldenVector) -> String {
    let keypair = Keypair::from_seed(&VECTOR_SEED);
    let message = canonicalize_payload(vector.input);
    let signature = keypair.sign(&message);
    document(
        vector.input,
        &Timestamp::Logical(1),
        &keypair.public_key().to_hex(),
        &signature.to_hex(),
    )
}

/// Canonical payload bytes for a payload text.
///
/// Panics if the text is not a valid payload object.
pub fn canonicalize_payload(input: &str) -> Vec<u8> {
    let text = document(input, &Timestamp::Logical(1), "k", "s");
    canonical::parse(text.as_bytes())
        .expect("vector input is a valid payload")
        .signed_message()
        .to_vec()
}

/// A fixed record used to pin down the id derivation.
pub fn reference_record() -> Record {
    RecordBuilder::new(Timestamp::Logical(1))
        .payload(payload([
            ("claim", Value::from("the sky is blue")),
            ("confidence", Value::from(95i64)),
        ]))
        .sign(&Keypair::from_seed(&VECTOR_SEED))
}

/// Verify all golden vectors.
///
/// Returns `(name, matches, actual canonical text)` per vector.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    all_vectors()
        .iter()
        .map(|v| {
            let actual = String::from_utf8_lossy(&canonicalize_payload(v.input)).into_owned();
            (v.name.to_string(), actual == v.canonical, actual)
        })
        .collect()
}

/// The id of the canonical payload text of a vector.
pub fn vector_id(vector: &GoldenVector) -> RecordId {
    RecordId::derive(vector.canonical.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use truth_kernel_core::{Ed25519Verifier, SignedEnvelope};

    #[test]
    fn test_all_vectors_match() {
        for (name, matches, actual) in verify_all_vectors() {
            assert!(matches, "vector '{name}' produced {actual}");
        }
    }

    #[test]
    fn test_vector_documents_verify() {
        for vector in all_vectors() {
            let record = canonical::parse(vector_document(&vector).as_bytes()).unwrap();
            assert_eq!(record.id(), vector_id(&vector), "{}", vector.name);
            let envelope = SignedEnvelope::new(record).verify(&Ed25519Verifier);
            assert!(envelope.is_valid(), "{}", vector.name);
        }
    }

    #[test]
    fn test_reference_record_id_is_payload_hash() {
        let record = reference_record();
        assert_eq!(
            record.signed_message(),
            br#"{"claim":"the sky is blue","confidence":95}"#
        );
        assert_eq!(
            record.id(),
            RecordId::derive(br#"{"claim":"the sky is blue","confidence":95}"#)
        );
        // Signing is deterministic, so the whole normalized record is too.
        assert_eq!(
            reference_record().to_canonical_json(),
            record.to_canonical_json()
        );
    }
}
