//! Proptest generators for property-based testing.
//!
//! Payloads are generated as a [`JsonTree`] and then rendered to text in
//! different but equivalent spellings (key order, whitespace, number form),
//! which is exactly the freedom the canonicalizer must erase.

use proptest::prelude::*;

use truth_kernel_core::{Keypair, Timestamp};

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate a `created_at` value.
pub fn timestamp() -> impl Strategy<Value = Timestamp> {
    prop_oneof![
        any::<u64>().prop_map(Timestamp::Logical),
        "[a-z0-9:-]{1,24}".prop_map(Timestamp::Label),
    ]
}

/// A JSON document shape, independent of its spelling.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonTree {
    Null,
    Bool(bool),
    Int(i64),
    /// `units / 10^scale`.
    Decimal { units: i64, scale: u8 },
    Str(String),
    Array(Vec<JsonTree>),
    /// Keys are unique.
    Object(Vec<(String, JsonTree)>),
}

/// How to spell a [`JsonTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Style {
    /// Emit object members in reverse order.
    pub reverse_keys: bool,
    /// Pad with spaces and newlines.
    pub spaced: bool,
    /// Write numbers with an exponent.
    pub exponent: bool,
    /// Append redundant fractional zeros.
    pub trailing_zeros: bool,
}

impl Style {
    /// The tightest spelling, members in generation order.
    pub const COMPACT: Style = Style {
        reverse_keys: false,
        spaced: false,
        exponent: false,
        trailing_zeros: false,
    };
}

/// Generate a rendering style.
pub fn style() -> impl Strategy<Value = Style> {
    (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
        |(reverse_keys, spaced, exponent, trailing_zeros)| Style {
            reverse_keys,
            spaced,
            exponent,
            trailing_zeros,
        },
    )
}

/// Generate an object key, including non-ASCII and escapable characters.
pub fn key() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_ é\"\\\\\n]{0,6}"
}

fn leaf() -> impl Strategy<Value = JsonTree> {
    prop_oneof![
        Just(JsonTree::Null),
        any::<bool>().prop_map(JsonTree::Bool),
        any::<i64>().prop_map(JsonTree::Int),
        (any::<i64>(), 0u8..8).prop_map(|(units, scale)| JsonTree::Decimal { units, scale }),
        "\\PC{0,12}".prop_map(JsonTree::Str),
    ]
}

fn members(inner: impl Strategy<Value = JsonTree>) -> impl Strategy<Value = Vec<(String, JsonTree)>> {
    prop::collection::vec((key(), inner), 0..6).prop_map(|pairs| {
        let mut seen = std::collections::BTreeSet::new();
        pairs
            .into_iter()
            .filter(|(k, _)| seen.insert(k.clone()))
            .collect()
    })
}

/// Generate an arbitrary JSON tree of bounded depth.
pub fn json_tree() -> impl Strategy<Value = JsonTree> {
    leaf().prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(JsonTree::Array),
            members(inner).prop_map(JsonTree::Object),
        ]
    })
}

/// Generate a JSON object, as record payloads must be.
pub fn payload_tree() -> impl Strategy<Value = JsonTree> {
    members(json_tree()).prop_map(JsonTree::Object)
}

/// Render a tree as JSON text in the given style.
pub fn render(tree: &JsonTree, style: Style) -> String {
    let mut out = String::new();
    write_tree(&mut out, tree, style);
    out
}

fn write_tree(out: &mut String, tree: &JsonTree, style: Style) {
    let gap = if style.spaced { " \n " } else { "" };
    match tree {
        JsonTree::Null => out.push_str("null"),
        JsonTree::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        JsonTree::Int(n) => {
            out.push_str(&n.to_string());
            if style.exponent {
                out.push_str("E0");
            } else if style.trailing_zeros {
                out.push_str(".00");
            }
        }
        JsonTree::Decimal { units, scale } => write_decimal(out, *units, *scale, style),
        JsonTree::Str(s) => out.push_str(&quote(s)),
        JsonTree::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(gap);
                write_tree(out, item, style);
            }
            out.push_str(gap);
            out.push(']');
        }
        JsonTree::Object(members) => {
            out.push('{');
            let ordered: Vec<_> = if style.reverse_keys {
                members.iter().rev().collect()
            } else {
                members.iter().collect()
            };
            for (i, (k, v)) in ordered.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(gap);
                out.push_str(&quote(k));
                out.push_str(gap);
                out.push(':');
                out.push_str(gap);
                write_tree(out, v, style);
            }
            out.push_str(gap);
            out.push('}');
        }
    }
}

fn write_decimal(out: &mut String, units: i64, scale: u8, style: Style) {
    if style.exponent {
        out.push_str(&format!("{units}e-{scale}"));
        return;
    }

    let digits = units.unsigned_abs().to_string();
    let scale = scale as usize;
    let padded = format!("{digits:0>width$}", width = scale + 1);
    let (int_part, frac_part) = padded.split_at(padded.len() - scale);

    if units < 0 {
        out.push('-');
    }
    out.push_str(int_part);
    if scale > 0 || style.trailing_zeros {
        out.push('.');
        out.push_str(frac_part);
        if style.trailing_zeros || frac_part.is_empty() {
            out.push('0');
        }
    }
}

fn quote(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

/// Wrap a payload text into a full ingest document.
pub fn document(payload: &str, created_at: &Timestamp, key: &str, signature: &str) -> String {
    let created_at = match created_at {
        Timestamp::Logical(n) => n.to_string(),
        Timestamp::Label(s) => quote(s),
    };
    format!(
        r#"{{"payload":{payload},"created_at":{created_at},"signer_public_key":{},"signature":{}}}"#,
        quote(key),
        quote(signature)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use truth_kernel_core::{canonical, verify, Ed25519Verifier, SignedEnvelope};

    proptest! {
        #[test]
        fn test_canonical_payload_independent_of_spelling(
            tree in payload_tree(),
            a in style(),
            b in style(),
        ) {
            let ra = canonical::parse(document(&render(&tree, a), &Timestamp::Logical(1), "k", "s").as_bytes()).unwrap();
            let rb = canonical::parse(document(&render(&tree, b), &Timestamp::Logical(1), "k", "s").as_bytes()).unwrap();

            prop_assert_eq!(ra.signed_message(), rb.signed_message());
            prop_assert_eq!(ra.id(), rb.id());
            prop_assert_eq!(ra.to_canonical_json(), rb.to_canonical_json());
        }

        #[test]
        fn test_normalized_output_is_a_fixed_point(tree in payload_tree(), ts in timestamp()) {
            let text = document(&render(&tree, Style::COMPACT), &ts, "k", "s");
            let once = canonical::parse(text.as_bytes()).unwrap().to_canonical_json();
            let twice = canonical::parse(&once).unwrap().to_canonical_json();
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn test_sign_then_verify_any_payload(tree in payload_tree(), kp in keypair(), spelling in style()) {
            let compact = render(&tree, Style::COMPACT);
            let message = canonical::parse(document(&compact, &Timestamp::Logical(0), "k", "s").as_bytes())
                .unwrap()
                .signed_message()
                .to_vec();
            let signature = kp.sign(&message);

            let text = document(
                &render(&tree, spelling),
                &Timestamp::Logical(0),
                &kp.public_key().to_hex(),
                &signature.to_hex(),
            );
            let record = canonical::parse(text.as_bytes()).unwrap();
            prop_assert!(verify(record.signed_message(), &signature.0, &kp.public_key().0));
            prop_assert!(SignedEnvelope::new(record).verify(&Ed25519Verifier).is_valid());
        }
    }

    #[test]
    fn test_decimal_spellings() {
        let tree = JsonTree::Decimal { units: -1205, scale: 3 };
        assert_eq!(render(&tree, Style::COMPACT), "-1.205");
        let zeros = Style { trailing_zeros: true, ..Style::COMPACT };
        assert_eq!(render(&tree, zeros), "-1.2050");
        let exp = Style { exponent: true, ..Style::COMPACT };
        assert_eq!(render(&tree, exp), "-1205e-3");

        let small = JsonTree::Decimal { units: 5, scale: 2 };
        assert_eq!(render(&small, Style::COMPACT), "0.05");
        let whole = JsonTree::Decimal { units: 7, scale: 0 };
        assert_eq!(render(&whole, Style::COMPACT), "7");
        assert_eq!(render(&whole, zeros), "7.0");
    }
}
