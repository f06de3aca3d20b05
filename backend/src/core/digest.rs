//! Canonical hashing
//!
//! SHA-256 over canonical JSON (object keys sorted recursively). Used to
//! fingerprint configurations and allocation vectors so two runs can be
//! compared without diffing every field.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Hex-encoded SHA-256 of `value`'s canonical JSON form.
///
/// # Example
/// ```
/// use market_rationing_core_rs::core::digest::canonical_digest;
/// use std::collections::HashMap;
///
/// let mut a = HashMap::new();
/// a.insert("x", 1);
/// a.insert("y", 2);
/// let mut b = HashMap::new();
/// b.insert("y", 2);
/// b.insert("x", 1);
///
/// assert_eq!(canonical_digest(&a).unwrap(), canonical_digest(&b).unwrap());
/// ```
pub fn canonical_digest<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let canonical = canonicalize(serde_json::to_value(value)?);
    let json = serde_json::to_string(&canonical)?;

    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> =
                map.into_iter().map(|(k, v)| (k, canonicalize(v))).collect();
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(arr) => Value::Array(arr.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_digest_is_hex_sha256() {
        let digest = canonical_digest(&json!({"a": 1})).unwrap();
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_digest_sensitive_to_values() {
        let a = canonical_digest(&json!([1.0, 2.0])).unwrap();
        let b = canonical_digest(&json!([1.0, 2.0000000001])).unwrap();
        assert_ne!(a, b);
    }
}
