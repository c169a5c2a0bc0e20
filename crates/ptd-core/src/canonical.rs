//! # Canonical Serialization
//!
//! Every byte sequence that is signed or verified in the workspace is a
//! `CanonicalBytes` value.
//!
//! ## Security Invariant
//!
//! The `CanonicalBytes` newtype has a private inner field. It can only be
//! built through [`CanonicalBytes::new()`] or [`CanonicalBytes::from_value()`],
//! both of which serialize with RFC 8785 (JSON Canonicalization Scheme):
//!
//! 1. **Sorted keys**: every object, including free-form vendor extension
//!    maps and open entity payloads, is emitted in lexicographic key order
//!    regardless of insertion order.
//! 2. **Compact separators**: no insignificant whitespace.
//! 3. **Fixed number formatting**: numbers use the ECMAScript shortest
//!    round-trip form, so `1.50` and `1.5` produce the same bytes.
//! 4. **Timestamps**: carried as [`Timestamp`](crate::Timestamp), which
//!    always renders UTC `YYYY-MM-DDTHH:MM:SSZ`.
//!
//! Signature handling lives one level up: a [`Signable`](crate::Signable)
//! document removes its unsigned fields from the JSON tree before handing
//! the tree to [`CanonicalBytes::from_value()`].

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Bytes produced exclusively by JCS canonicalization.
///
/// # Invariants
///
/// - The only constructors are `CanonicalBytes::new()` and `CanonicalBytes::from_value()`.
/// - Object keys are sorted; separators are compact (RFC 8785).
/// - Identical logical content yields identical bytes across calls and processes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Construct canonical bytes from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns `CanonicalizationError::SerializationFailed` if the value
    /// cannot be represented as JSON (e.g. a map with non-string keys).
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        Self::from_value(value)
    }

    /// Construct canonical bytes from an already-built JSON tree.
    ///
    /// Used by signable documents after they strip unsigned fields.
    pub fn from_value(value: Value) -> Result<Self, CanonicalizationError> {
        let s = serde_jcs::to_string(&value)?;
        Ok(Self(s.into_bytes()))
    }

    /// Access the canonical bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, HashMap};

    fn as_str(cb: &CanonicalBytes) -> &str {
        std::str::from_utf8(cb.as_bytes()).unwrap()
    }

    #[test]
    fn keys_sorted_without_whitespace() {
        let data = serde_json::json!({"b": 2, "a": 1, "c": "hello"});
        let cb = CanonicalBytes::new(&data).unwrap();
        assert_eq!(as_str(&cb), r#"{"a":1,"b":2,"c":"hello"}"#);
    }

    #[test]
    fn nested_objects_sorted_arrays_kept() {
        let data = serde_json::json!({
            "outer": {"b": 2, "a": 1},
            "list": [3, 2, 1]
        });
        let cb = CanonicalBytes::new(&data).unwrap();
        // Arrays keep their order; nested objects are sorted.
        assert_eq!(as_str(&cb), r#"{"list":[3,2,1],"outer":{"a":1,"b":2}}"#);
    }

    #[test]
    fn hash_map_insertion_order_irrelevant() {
        let mut first = HashMap::new();
        let mut second = HashMap::new();
        for (k, v) in [("zeta", 1), ("alpha", 2), ("mid", 3)] {
            first.insert(k.to_string(), v);
        }
        for (k, v) in [("mid", 3), ("zeta", 1), ("alpha", 2)] {
            second.insert(k.to_string(), v);
        }
        let a = CanonicalBytes::new(&first).unwrap();
        let b = CanonicalBytes::new(&second).unwrap();
        assert_eq!(a, b);
        assert_eq!(as_str(&a), r#"{"alpha":2,"mid":3,"zeta":1}"#);
    }

    #[test]
    fn float_formatting_is_stable() {
        let a = CanonicalBytes::new(&serde_json::json!({"amount": 1.50})).unwrap();
        let b = CanonicalBytes::new(&serde_json::json!({"amount": 1.5})).unwrap();
        assert_eq!(a, b);
        assert_eq!(as_str(&a), r#"{"amount":1.5}"#);
    }

    #[test]
    fn integral_float_renders_as_integer() {
        let cb = CanonicalBytes::new(&serde_json::json!({"v": 3.0})).unwrap();
        assert_eq!(as_str(&cb), r#"{"v":3}"#);
    }

    #[test]
    fn non_string_map_keys_rejected() {
        let mut data: BTreeMap<(u8, u8), u8> = BTreeMap::new();
        data.insert((1, 2), 3);
        assert!(matches!(
            CanonicalBytes::new(&data),
            Err(CanonicalizationError::SerializationFailed(_))
        ));
    }

    #[test]
    fn null_and_bool_kept() {
        let data = serde_json::json!({"key": null, "flag": true});
        let cb = CanonicalBytes::new(&data).unwrap();
        assert_eq!(as_str(&cb), r#"{"flag":true,"key":null}"#);
    }

    #[test]
    fn empty_object() {
        let cb = CanonicalBytes::new(&serde_json::json!({})).unwrap();
        assert_eq!(cb.as_bytes(), b"{}");
        assert!(!cb.is_empty());
        assert_eq!(cb.len(), 2);
    }

    #[test]
    fn non_ascii_kept_verbatim() {
        let data = serde_json::json!({"name": "\u{00e9}t\u{00e9}"});
        let cb = CanonicalBytes::new(&data).unwrap();
        assert!(as_str(&cb).contains('\u{00e9}'));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn json_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| serde_json::json!(n)),
            "[a-zA-Z0-9_ ]{0,40}".prop_map(Value::String),
        ];
        leaf.prop_recursive(4, 64, 8, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..8).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,10}", inner, 0..8).prop_map(|m| {
                    let map: serde_json::Map<String, Value> = m.into_iter().collect();
                    Value::Object(map)
                }),
            ]
        })
    }

    proptest! {
        #[test]
        fn canonical_bytes_deterministic(value in json_value()) {
            let a = CanonicalBytes::new(&value).unwrap();
            let b = CanonicalBytes::new(&value).unwrap();
            prop_assert_eq!(a.as_bytes(), b.as_bytes());
        }

        #[test]
        fn canonical_bytes_reparse_to_same_bytes(value in json_value()) {
            let cb = CanonicalBytes::new(&value).unwrap();
            let reparsed: Value = serde_json::from_slice(cb.as_bytes()).unwrap();
            let again = CanonicalBytes::from_value(reparsed).unwrap();
            prop_assert_eq!(cb, again);
        }

        #[test]
        fn key_insertion_order_irrelevant(
            entries in prop::collection::btree_map("[a-z]{1,8}", any::<i32>(), 1..10)
        ) {
            let forward: serde_json::Map<String, Value> = entries
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::json!(v)))
                .collect();
            let mut reversed = serde_json::Map::new();
            for (k, v) in entries.iter().rev() {
                reversed.insert(k.clone(), serde_json::json!(v));
            }
            let a = CanonicalBytes::from_value(Value::Object(forward)).unwrap();
            let b = CanonicalBytes::from_value(Value::Object(reversed)).unwrap();
            prop_assert_eq!(a, b);
        }
    }
}
