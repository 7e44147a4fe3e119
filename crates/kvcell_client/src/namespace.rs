//! Namespace prefixing over a namespace-unaware engine.
//!
//! The engine stores raw string keys with no partitioning of its own.
//! Namespacing is a pure prefixing scheme applied above the boundary:
//! a key `k` in namespace `ns` is stored as `ns:k`.
//!
//! This module is the single home of that scheme; both the [`crate::KvClient`]
//! facade and higher layers go through these functions rather than
//! reimplementing the prefix logic.
//!
//! # Separator ambiguity
//!
//! Keys or namespaces containing the literal separator `:` are not rejected.
//! A raw key `"a:b"` written without a namespace is indistinguishable from key
//! `"b"` written in namespace `"a"` when enumerating. Escaping the separator
//! would change the stored key format of existing stores, so the ambiguity is
//! documented instead of guarded against.

/// Separator between a namespace and the raw key.
pub const SEPARATOR: char = ':';

/// Treats a missing or empty namespace as "no namespace".
fn effective(namespace: Option<&str>) -> Option<&str> {
    namespace.filter(|ns| !ns.is_empty())
}

/// Maps a raw key to the key stored in the engine.
///
/// With no namespace (or an empty one) the raw key is stored as-is.
///
/// # Example
///
/// ```
/// use kvcell_client::namespace::storage_key;
///
/// assert_eq!(storage_key("theme", Some("settings")), "settings:theme");
/// assert_eq!(storage_key("theme", None), "theme");
/// assert_eq!(storage_key("theme", Some("")), "theme");
/// ```
#[must_use]
pub fn storage_key(key: &str, namespace: Option<&str>) -> String {
    match effective(namespace) {
        Some(ns) => format!("{ns}{SEPARATOR}{key}"),
        None => key.to_string(),
    }
}

/// Strips a known namespace prefix from a stored key.
///
/// Returns `None` when the stored key does not belong to the namespace.
/// With no namespace every key belongs and is returned unchanged.
///
/// # Example
///
/// ```
/// use kvcell_client::namespace::strip_key;
///
/// assert_eq!(strip_key("settings:theme", Some("settings")), Some("theme"));
/// assert_eq!(strip_key("other:theme", Some("settings")), None);
/// assert_eq!(strip_key("theme", None), Some("theme"));
/// ```
#[must_use]
pub fn strip_key<'a>(stored: &'a str, namespace: Option<&str>) -> Option<&'a str> {
    match effective(namespace) {
        Some(ns) => stored
            .strip_prefix(ns)
            .and_then(|rest| rest.strip_prefix(SEPARATOR)),
        None => Some(stored),
    }
}

/// Filters an enumeration of stored keys down to a namespace, stripping the
/// prefix and preserving the original order.
#[must_use]
pub fn filter_keys(stored: &[String], namespace: Option<&str>) -> Vec<String> {
    stored
        .iter()
        .filter_map(|key| strip_key(key, namespace).map(str::to_string))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn storage_key_prefixes() {
        assert_eq!(storage_key("k", Some("ns")), "ns:k");
        assert_eq!(storage_key("k", None), "k");
    }

    #[test]
    fn empty_namespace_is_no_namespace() {
        assert_eq!(storage_key("k", Some("")), "k");
        assert_eq!(strip_key("k", Some("")), Some("k"));
    }

    #[test]
    fn strip_rejects_foreign_namespace() {
        assert_eq!(strip_key("other:k", Some("ns")), None);
        assert_eq!(strip_key("k", Some("ns")), None);
    }

    #[test]
    fn strip_requires_full_namespace_match() {
        // "nsx:k" starts with "ns" but the separator is missing after it.
        assert_eq!(strip_key("nsx:k", Some("ns")), None);
    }

    #[test]
    fn filter_preserves_order() {
        let stored = vec![
            "ns:b".to_string(),
            "other:x".to_string(),
            "ns:a".to_string(),
            "plain".to_string(),
        ];
        assert_eq!(filter_keys(&stored, Some("ns")), vec!["b", "a"]);
        assert_eq!(filter_keys(&stored, None), stored);
    }

    #[test]
    fn separator_in_raw_key_is_ambiguous() {
        // A raw key containing ':' looks like a namespaced key on the way out.
        let stored = vec!["ns:inner".to_string()];
        assert_eq!(storage_key("ns:inner", None), "ns:inner");
        assert_eq!(filter_keys(&stored, Some("ns")), vec!["inner"]);
    }

    proptest! {
        #[test]
        fn roundtrip(key in ".*", ns in ".*") {
            let stored = storage_key(&key, Some(&ns));
            prop_assert_eq!(strip_key(&stored, Some(&ns)), Some(key.as_str()));
        }

        #[test]
        fn roundtrip_without_namespace(key in ".*") {
            let stored = storage_key(&key, None);
            prop_assert_eq!(strip_key(&stored, None), Some(key.as_str()));
        }

        #[test]
        fn filter_matches_roundtrip(keys in proptest::collection::vec(".*", 0..8), ns in ".+") {
            let stored: Vec<String> = keys.iter().map(|k| storage_key(k, Some(&ns))).collect();
            prop_assert_eq!(filter_keys(&stored, Some(&ns)), keys);
        }
    }
}
