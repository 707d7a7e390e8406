//! Canonical serialization and content digests
//!
//! Every hash in the system is computed over the byte form produced here.
//! Structurally equal values must canonicalize to identical bytes: mapping
//! keys are sorted, there is no whitespace, and numbers and strings use one
//! fixed encoding. Any nondeterminism in this module invalidates every
//! downstream guarantee, so the functions are pure and total.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Serialize a JSON value into its canonical byte form.
///
/// Object keys are emitted in lexicographic order regardless of insertion
/// order, so two structurally equal values always produce identical bytes.
pub fn canonicalize(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    write_value(&mut out, value);
    out
}

/// SHA-256 digest of a value's canonical bytes, as lowercase hex.
pub fn digest(value: &Value) -> String {
    digest_bytes(&canonicalize(value))
}

/// SHA-256 digest of raw bytes, as lowercase hex.
pub fn digest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn write_value(out: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Null => out.extend_from_slice(b"null"),
        Value::Bool(true) => out.extend_from_slice(b"true"),
        Value::Bool(false) => out.extend_from_slice(b"false"),
        // serde_json renders integers via itoa and floats via ryu, both
        // deterministic for a given Number.
        Value::Number(n) => out.extend_from_slice(n.to_string().as_bytes()),
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_value(out, item);
            }
            out.push(b']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push(b'{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_string(out, key);
                out.push(b':');
                // Key came from the map, so the entry exists.
                if let Some(item) = map.get(*key) {
                    write_value(out, item);
                }
            }
            out.push(b'}');
        }
    }
}

fn write_string(out: &mut Vec<u8>, s: &str) {
    out.push(b'"');
    for c in s.chars() {
        match c {
            '"' => out.extend_from_slice(b"\\\""),
            '\\' => out.extend_from_slice(b"\\\\"),
            '\n' => out.extend_from_slice(b"\\n"),
            '\r' => out.extend_from_slice(b"\\r"),
            '\t' => out.extend_from_slice(b"\\t"),
            c if (c as u32) < 0x20 => {
                out.extend_from_slice(format!("\\u{:04x}", c as u32).as_bytes());
            }
            c => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
    out.push(b'"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_order_is_irrelevant() {
        let mut a = serde_json::Map::new();
        a.insert("zulu".to_string(), json!(1));
        a.insert("alpha".to_string(), json!(2));

        let mut b = serde_json::Map::new();
        b.insert("alpha".to_string(), json!(2));
        b.insert("zulu".to_string(), json!(1));

        assert_eq!(
            canonicalize(&Value::Object(a)),
            canonicalize(&Value::Object(b))
        );
    }

    #[test]
    fn test_digest_is_stable() {
        let value = json!({
            "name": "harvest",
            "steps": ["gather", "sort"],
            "count": 3,
        });
        assert_eq!(digest(&value), digest(&value));
        assert_eq!(digest(&value).len(), 64);
    }

    #[test]
    fn test_scalars() {
        assert_eq!(canonicalize(&json!(null)), b"null");
        assert_eq!(canonicalize(&json!(true)), b"true");
        assert_eq!(canonicalize(&json!(false)), b"false");
        assert_eq!(canonicalize(&json!(42)), b"42");
        assert_eq!(canonicalize(&json!(-7)), b"-7");
        assert_eq!(canonicalize(&json!("hi")), b"\"hi\"");
    }

    #[test]
    fn test_no_incidental_formatting() {
        let value = json!({"a": [1, 2], "b": {"c": null}});
        let bytes = canonicalize(&value);
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"a":[1,2],"b":{"c":null}}"#
        );
    }

    #[test]
    fn test_empty_containers_are_distinct() {
        assert_ne!(canonicalize(&json!({})), canonicalize(&json!([])));
    }

    #[test]
    fn test_string_escaping() {
        let bytes = canonicalize(&json!("line\none\t\"quoted\" \\ \u{0001}"));
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "\"line\\none\\t\\\"quoted\\\" \\\\ \\u0001\""
        );
    }

    #[test]
    fn test_nested_objects_sort_at_every_level() {
        let value: Value =
            serde_json::from_str(r#"{"outer": {"z": 1, "a": {"y": 2, "b": 3}}}"#).unwrap();
        let bytes = canonicalize(&value);
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"outer":{"a":{"b":3,"y":2},"z":1}}"#
        );
    }
}
