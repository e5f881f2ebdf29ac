//! Tagged JSON values for record payloads.
//!
//! Payload values are held as a closed variant type rather than a dynamic
//! document. Numbers keep an exact decimal text form so that canonical bytes
//! never depend on floating point formatting.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::ParseError;

/// Largest number of characters normalization may add to a number.
///
/// Only an exponent can grow the fixed decimal form past the input text
/// (`1e400` expands to 401 digits, `1e999999999` to a billion). Plain
/// integers and fractions never grow, whatever their length.
pub const MAX_DECIMAL_SHIFT: i64 = 1024;

/// A JSON number in canonical fixed decimal form.
///
/// No exponent, no leading zeros, no trailing fractional zeros, and no
/// negative zero. `1`, `1.0`, `10e-1` and `1E0` all normalize to `1`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Number(String);

impl Number {
    /// Parse and normalize JSON number text.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        normalize_decimal(text).map(Self)
    }

    pub fn from_i64(n: i64) -> Self {
        Self(n.to_string())
    }

    pub fn from_u64(n: u64) -> Self {
        Self(n.to_string())
    }

    /// The canonical decimal text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The value as a `u64`, if it is a non-negative integer in range.
    pub fn as_u64(&self) -> Option<u64> {
        self.0.parse().ok()
    }

    /// The value as an `i64`, if it is an integer in range.
    pub fn as_i64(&self) -> Option<i64> {
        self.0.parse().ok()
    }

    pub fn is_integer(&self) -> bool {
        !self.0.contains('.')
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A payload value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Sequence(Vec<Value>),
    Mapping(BTreeMap<String, Value>),
}

impl Value {
    /// Convert a parsed JSON document, enforcing the nesting limit.
    ///
    /// `depth` is the depth of `json` itself; the top-level document is 1.
    pub fn from_json(json: &serde_json::Value, depth: usize, max_depth: usize) -> Result<Self, ParseError> {
        if depth > max_depth {
            return Err(ParseError::Malformed(format!(
                "nesting deeper than {max_depth} levels"
            )));
        }

        Ok(match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(Number::parse(&n.to_string())?),
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => Value::Sequence(
                items
                    .iter()
                    .map(|item| Value::from_json(item, depth + 1, max_depth))
                    .collect::<Result<_, _>>()?,
            ),
            serde_json::Value::Object(map) => Value::Mapping(mapping_from_json(map, depth, max_depth)?),
        })
    }

    pub fn as_mapping(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Convert the members of a JSON object at `depth`.
pub(crate) fn mapping_from_json(
    map: &serde_json::Map<String, serde_json::Value>,
    depth: usize,
    max_depth: usize,
) -> Result<BTreeMap<String, Value>, ParseError> {
    map.iter()
        .map(|(k, v)| Ok((k.clone(), Value::from_json(v, depth + 1, max_depth)?)))
        .collect()
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(Number::from_i64(n))
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Number(Number::from_u64(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Sequence(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Mapping(map)
    }
}

/// Rewrite JSON number text into fixed decimal form.
///
/// The text must follow the JSON number grammar
/// `-?(0|[1-9][0-9]*)(\.[0-9]+)?([eE][+-]?[0-9]+)?`.
fn normalize_decimal(text: &str) -> Result<String, ParseError> {
    let malformed = || ParseError::Malformed(format!("invalid number: {text}"));

    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };

    let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
        Some(pos) => (&unsigned[..pos], Some(&unsigned[pos + 1..])),
        None => (unsigned, None),
    };

    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((i, f)) => (i, f),
        None => (mantissa, ""),
    };

    if int_part.is_empty()
        || !int_part.bytes().all(|b| b.is_ascii_digit())
        || !frac_part.bytes().all(|b| b.is_ascii_digit())
        || (mantissa.contains('.') && frac_part.is_empty())
    {
        return Err(malformed());
    }

    let mut digits: Vec<u8> = int_part.bytes().chain(frac_part.bytes()).collect();
    // Position of the decimal point, counted in digits from the left.
    let mut point = int_part.len() as i64;

    if let Some(exp) = exponent {
        let exp_digits = exp.strip_prefix(['+', '-']).unwrap_or(exp);
        if exp_digits.is_empty() || !exp_digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        let trimmed = exp_digits.trim_start_matches('0');
        // Any exponent this long is far outside the bound, but only matters
        // if the mantissa is nonzero.
        let magnitude: i64 = if trimmed.len() > 9 {
            i64::MAX / 2
        } else if trimmed.is_empty() {
            0
        } else {
            trimmed.parse().map_err(|_| malformed())?
        };
        if exp.starts_with('-') {
            point -= magnitude;
        } else {
            point += magnitude;
        }
    }

    let leading = digits.iter().take_while(|&&d| d == b'0').count();
    digits.drain(..leading);
    point -= leading as i64;
    while digits.last() == Some(&b'0') {
        digits.pop();
    }

    if digits.is_empty() {
        return Ok("0".to_string());
    }

    let len = digits.len() as i64;
    let fixed_len = if point <= 0 {
        2 - point + len
    } else if point >= len {
        point
    } else {
        len + 1
    };
    if fixed_len - text.len() as i64 > MAX_DECIMAL_SHIFT {
        return Err(ParseError::Malformed(format!(
            "number out of range for fixed decimal form: {text}"
        )));
    }

    let mut out = String::with_capacity(digits.len() + point.unsigned_abs() as usize + 3);
    if negative {
        out.push('-');
    }
    if point <= 0 {
        out.push_str("0.");
        out.extend(std::iter::repeat('0').take((-point) as usize));
        out.extend(digits.iter().map(|&d| d as char));
    } else if point >= len {
        out.extend(digits.iter().map(|&d| d as char));
        out.extend(std::iter::repeat('0').take((point - len) as usize));
    } else {
        let split = point as usize;
        out.extend(digits[..split].iter().map(|&d| d as char));
        out.push('.');
        out.extend(digits[split..].iter().map(|&d| d as char));
    }
    Ok(out)
}
