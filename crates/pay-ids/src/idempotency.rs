//! Idempotency keys.
//!
//! A key is the lowercase hex SHA-256 of the canonical JSON of whatever the
//! caller designates as the identity of a write (usually an id struct). Keys
//! are not reversible and are never parsed back.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::canonical::to_canonical_bytes;

/// Fallible form of [`idempotency_key`].
pub fn try_idempotency_key<T: Serialize + ?Sized>(v: &T) -> Result<String, serde_json::Error> {
    let bytes = to_canonical_bytes(v)?;
    Ok(sha256_hex(&bytes))
}

/// Deterministic digest of the canonical encoding of `v`.
///
/// # Panics
/// Panics if `v` cannot be serialized to JSON (e.g. a map with non-string
/// keys). Callers pass identifier structs, for which this cannot happen.
pub fn idempotency_key<T: Serialize + ?Sized>(v: &T) -> String {
    match try_idempotency_key(v) {
        Ok(k) => k,
        Err(e) => panic!("idempotency key serialization failed: {e}"),
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_is_64_hex_chars() {
        let k = idempotency_key(&json!({"reference": "p1"}));
        assert_eq!(k.len(), 64);
        assert!(k.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn map_key_order_does_not_change_key() {
        let a = json!({"reference": "p1", "connector": "c1"});
        let b = json!({"connector": "c1", "reference": "p1"});
        assert_eq!(idempotency_key(&a), idempotency_key(&b));
    }

    #[test]
    fn differing_field_changes_key() {
        let a = json!({"reference": "p1", "status": "PENDING"});
        let b = json!({"reference": "p1", "status": "SUCCEEDED"});
        assert_ne!(idempotency_key(&a), idempotency_key(&b));
    }
}
