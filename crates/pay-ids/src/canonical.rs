//! Canonical JSON encoding.
//!
//! Object keys are sorted recursively and the output is compact, so two
//! structurally equal values always produce the same bytes regardless of the
//! field or map-key order they were built with.
//!
//! `serde_json::Map` is only sorted when the `preserve_order` feature is off,
//! and that feature can be switched on by any crate in the build graph.
//! Sorting here keeps the encoding independent of feature unification.

use serde::Serialize;
use serde_json::{Map, Value};

/// Serialize `v` to canonical JSON (sorted keys, no whitespace).
pub fn to_canonical_json<T: Serialize + ?Sized>(v: &T) -> Result<String, serde_json::Error> {
    let raw = serde_json::to_value(v)?;
    serde_json::to_string(&sort_keys(&raw))
}

/// Same as [`to_canonical_json`] but returns the UTF-8 bytes.
pub fn to_canonical_bytes<T: Serialize + ?Sized>(v: &T) -> Result<Vec<u8>, serde_json::Error> {
    to_canonical_json(v).map(String::into_bytes)
}

pub(crate) fn sort_keys(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::new();
            for k in keys {
                sorted.insert(k.clone(), sort_keys(&map[k]));
            }
            Value::Object(sorted)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys).collect()),
        _ => v.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn nested_keys_are_sorted() {
        let v = json!({"b": {"z": 1, "a": 2}, "a": [ {"y": 1, "x": 2} ]});
        assert_eq!(
            to_canonical_json(&v).unwrap(),
            r#"{"a":[{"x":2,"y":1}],"b":{"a":2,"z":1}}"#
        );
    }

    #[test]
    fn hashmap_insertion_order_does_not_matter() {
        let mut a = HashMap::new();
        a.insert("one", 1);
        a.insert("two", 2);
        a.insert("three", 3);

        let mut b = HashMap::new();
        b.insert("three", 3);
        b.insert("one", 1);
        b.insert("two", 2);

        assert_eq!(to_canonical_json(&a).unwrap(), to_canonical_json(&b).unwrap());
    }

    #[test]
    fn array_order_is_preserved() {
        let a = to_canonical_json(&vec![1, 2, 3]).unwrap();
        let b = to_canonical_json(&vec![3, 2, 1]).unwrap();
        assert_ne!(a, b);
    }
}
