//! Deterministic cache keys.
//!
//! A key is `"{scope}:{payload}"` where the payload is rendered as canonical
//! JSON: object members sorted by key at every depth, `null` members dropped.
//! Two payloads that differ only in field order or in absent optional fields
//! therefore share a key.

use std::borrow::Borrow;
use std::fmt::{self, Write as _};

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

/// Key of a cached query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Wrap an already-built key string.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the key starts with the literal `prefix`.
    #[must_use]
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for CacheKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<String> for CacheKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CacheKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Build the cache key for `payload` under `scope`.
///
/// Never fails: a payload `serde_json` cannot represent (for example a map
/// with non-string keys) is keyed by its `Debug` rendering instead. That
/// rendering is only as stable as the payload's iteration order, so such
/// payloads should use ordered maps (`BTreeMap`); a `HashMap` may produce a
/// different key on every call and miss the cache.
pub fn build_key<P>(scope: &str, payload: &P) -> CacheKey
where
    P: Serialize + fmt::Debug + ?Sized,
{
    let rendered = match serde_json::to_value(payload) {
        Ok(value) => stable_json(&value),
        Err(err) => {
            warn!(scope, error = %err, "Cache payload is not JSON-representable, keying by Debug");
            format!("~{payload:?}")
        }
    };
    CacheKey(format!("{scope}:{rendered}"))
}

/// Render `value` as canonical JSON.
#[must_use]
pub fn stable_json(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => {
            let _ = write!(out, "{n}");
        }
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> =
                map.iter().filter(|(_, v)| !v.is_null()).collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));

            out.push('{');
            for (i, (k, v)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(out, k);
                out.push(':');
                write_value(out, v);
            }
            out.push('}');
        }
    }
}

fn write_string(out: &mut String, s: &str) {
    // Serializing a &str cannot fail.
    match serde_json::to_string(s) {
        Ok(quoted) => out.push_str(&quoted),
        Err(_) => {
            let _ = write!(out, "{s:?}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::{BTreeMap, HashMap};

    #[test]
    fn property_order_does_not_matter() {
        let a = json!({"b": 1, "a": {"y": true, "x": [1, 2]}});
        let b = json!({"a": {"x": [1, 2], "y": true}, "b": 1});
        assert_eq!(build_key("orders:list", &a), build_key("orders:list", &b));
    }

    #[test]
    fn null_members_are_dropped() {
        let a = json!({"search": "alice", "dateFrom": null});
        let b = json!({"search": "alice"});
        assert_eq!(build_key("s", &a), build_key("s", &b));
    }

    #[test]
    fn array_order_is_significant() {
        let a = json!({"ids": [1, 2]});
        let b = json!({"ids": [2, 1]});
        assert_ne!(build_key("s", &a), build_key("s", &b));
    }

    #[test]
    fn nulls_inside_arrays_are_kept() {
        let a = json!([null, 1]);
        let b = json!([1]);
        assert_ne!(build_key("s", &a), build_key("s", &b));
    }

    #[test]
    fn scope_separates_identical_payloads() {
        let payload = json!({"search": "x"});
        assert_ne!(
            build_key("orders:list", &payload),
            build_key("deliveries:list", &payload)
        );
    }

    #[test]
    fn string_and_number_do_not_collide() {
        assert_ne!(build_key("s", &json!({"a": 1})), build_key("s", &json!({"a": "1"})));
    }

    #[test]
    fn rendering_matches_expected_shape() {
        let key = build_key("orders:list", &json!({"search": "a\"b", "dateFilter": "OrderDate"}));
        assert_eq!(
            key.as_str(),
            r#"orders:list:{"dateFilter":"OrderDate","search":"a\"b"}"#
        );
    }

    #[test]
    fn unit_payload_renders_null() {
        assert_eq!(build_key("drivers", &()).as_str(), "drivers:null");
    }

    #[test]
    fn non_string_map_keys_fall_back_to_debug() {
        let mut payload = HashMap::new();
        payload.insert((1, 2), "x");
        let key = build_key("s", &payload);
        assert!(key.as_str().starts_with("s:~"));
    }

    #[test]
    fn ordered_fallback_payloads_key_identically() {
        let forward: BTreeMap<(u8, u8), &str> = [((1, 2), "a"), ((3, 4), "b")].into_iter().collect();
        let backward: BTreeMap<(u8, u8), &str> = [((3, 4), "b"), ((1, 2), "a")].into_iter().collect();

        let key = build_key("s", &forward);
        assert!(key.as_str().starts_with("s:~"));
        assert_eq!(key, build_key("s", &backward));
    }

    #[test]
    fn has_prefix_is_literal() {
        let key = CacheKey::from("orders:list:{}");
        assert!(key.has_prefix("orders:list:"));
        assert!(!key.has_prefix("deliveries:list:"));
    }
}
