//! Deterministic encodings used for signing sidechain messages.

use serde::Serialize;
use serde_json::Value;

/// Serializes `value` as JSON with every object's keys sorted, recursively.
///
/// This is the canonical sign-bytes encoding of every sidechain message and of
/// the transaction sign document.
pub fn sorted_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let value = serde_json::to_value(value)?;
    serde_json::to_vec(&sort_keys(value))
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries = map.into_iter().collect::<Vec<_>>();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(entries.into_iter().map(|(k, v)| (k, sort_keys(v))).collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// Concatenates every part left-padded to a 32 byte word.
///
/// Empty parts and parts longer than 32 bytes are skipped.
pub fn append_bytes32(parts: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::with_capacity(parts.len() * 32);
    for part in parts.iter().filter(|p| !p.is_empty() && p.len() <= 32) {
        let mut word = [0u8; 32];
        word[32 - part.len()..].copy_from_slice(part);
        out.extend_from_slice(&word);
    }
    out
}

/// Big-endian bytes of `value` without leading zeros. Zero encodes as no bytes.
pub fn trimmed_be_bytes(value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    bytes[first..].to_vec()
}

/// Deserializes a `u64` encoded either as a JSON number or as a decimal string.
///
/// The sidechain REST server quotes 64 bit integers.
pub mod u64_or_string {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(u64),
        Text(String),
    }

    /// Serializes as a plain JSON number.
    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(*value)
    }

    /// Accepts a JSON number or a decimal string.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(n) => Ok(n),
            Repr::Text(s) => s.parse().map_err(D::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize)]
    struct Unsorted {
        zeta: u8,
        alpha: Nested,
    }

    #[derive(Serialize)]
    struct Nested {
        y: u8,
        b: u8,
    }

    #[test]
    fn test_sorted_json_orders_nested_keys() {
        let value = Unsorted { zeta: 1, alpha: Nested { y: 2, b: 3 } };
        let bytes = sorted_json(&value).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), r#"{"alpha":{"b":3,"y":2},"zeta":1}"#);
    }

    #[test]
    fn test_append_bytes32_pads_and_skips() {
        let out = append_bytes32(&[&[0x01], &[], &[0xff; 33], &[0xaa, 0xbb]]);
        assert_eq!(out.len(), 64);
        assert_eq!(out[31], 0x01);
        assert!(out[..31].iter().all(|b| *b == 0));
        assert_eq!(&out[62..], &[0xaa, 0xbb]);
    }

    #[test]
    fn test_trimmed_be_bytes() {
        assert!(trimmed_be_bytes(0).is_empty());
        assert_eq!(trimmed_be_bytes(1), vec![1]);
        assert_eq!(trimmed_be_bytes(0x0102_0304), vec![1, 2, 3, 4]);
    }

    #[derive(Deserialize)]
    struct Quoted {
        #[serde(with = "u64_or_string")]
        value: u64,
    }

    #[test]
    fn test_u64_or_string() {
        let a: Quoted = serde_json::from_str(r#"{"value":"42"}"#).unwrap();
        let b: Quoted = serde_json::from_str(r#"{"value":42}"#).unwrap();
        assert_eq!(a.value, 42);
        assert_eq!(b.value, 42);
        assert!(serde_json::from_str::<Quoted>(r#"{"value":"x"}"#).is_err());
    }
}
