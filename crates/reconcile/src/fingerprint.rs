//! Canonical form and fingerprint of a descriptor
//!
//! Two descriptors are the same registration iff their canonical JSON is
//! byte-identical: object keys sorted at every level, and empty objects,
//! empty arrays and nulls dropped as if the field were absent.

use crate::types::Descriptor;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fmt::Write;

/// Canonical JSON text of a descriptor
pub fn canonical_json(descriptor: &Descriptor) -> String {
    // Serializing a closed enum of strings and string collections cannot fail.
    let value = serde_json::to_value(descriptor).unwrap_or(Value::Null);
    canonicalize(value).to_string()
}

/// Hex-encoded SHA-256 of the canonical JSON
pub fn fingerprint(descriptor: &Descriptor) -> String {
    let digest = Sha256::digest(canonical_json(descriptor).as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(&mut out, "{byte:02x}");
    }
    out
}

/// Semantic equality of two descriptors
pub fn same_registration(a: &Descriptor, b: &Descriptor) -> bool {
    canonical_json(a) == canonical_json(b)
}

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map
                .into_iter()
                .map(|(k, v)| (k, canonicalize(v)))
                .filter(|(_, v)| !is_vacant(v))
                .collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            // Insert in sorted order so the result is sorted even when
            // serde_json keeps insertion order.
            let mut sorted = Map::new();
            for (k, v) in entries {
                sorted.insert(k, v);
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

fn is_vacant(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(m) => m.is_empty(),
        Value::Array(a) => a.is_empty(),
        _ => false,
    }
}
