//! Map comparisons
//!
//! Kubernetes objects carry most of their operator-authored state in
//! `BTreeMap<String, V>` fields (ConfigMap data, Secret data, selectors,
//! annotations). A missing map and an empty map are treated as equal.

use std::collections::BTreeMap;

/// Key-level delta between two maps.
///
/// All three lists are sorted because the inputs are ordered maps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyDelta {
    /// Keys present only in the new map
    pub added: Vec<String>,
    /// Keys present only in the old map
    pub removed: Vec<String>,
    /// Keys present in both maps whose values differ
    pub modified: Vec<String>,
}

impl KeyDelta {
    /// True when the two maps were identical.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }
}

/// Computes the key delta between `old` and `new`.
pub fn diff_keys<V: PartialEq>(
    old: Option<&BTreeMap<String, V>>,
    new: Option<&BTreeMap<String, V>>,
) -> KeyDelta {
    let empty = BTreeMap::new();
    let old = old.unwrap_or(&empty);
    let new = new.unwrap_or(&empty);

    let mut delta = KeyDelta::default();

    for (key, new_value) in new {
        match old.get(key) {
            None => delta.added.push(key.clone()),
            Some(old_value) if old_value != new_value => delta.modified.push(key.clone()),
            Some(_) => {}
        }
    }

    delta.removed = old
        .keys()
        .filter(|key| !new.contains_key(*key))
        .cloned()
        .collect();

    delta
}

/// Structural equality of two optional maps, with `None` equal to empty.
pub fn maps_equal<V: PartialEq>(
    old: Option<&BTreeMap<String, V>>,
    new: Option<&BTreeMap<String, V>>,
) -> bool {
    diff_keys(old, new).is_empty()
}

/// Renders a string map as `k1=v1,k2=v2`, or `<none>` when empty.
pub fn format_map(map: Option<&BTreeMap<String, String>>) -> String {
    match map {
        Some(map) if !map.is_empty() => map
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(","),
        _ => "<none>".to_string(),
    }
}

/// Returns the sorted key names of an optional map.
pub fn key_names<V>(map: Option<&BTreeMap<String, V>>) -> Vec<String> {
    map.map(|m| m.keys().cloned().collect()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_diff_keys_reports_added_removed_and_modified() {
        let old = map(&[("keep", "1"), ("change", "old"), ("drop", "x")]);
        let new = map(&[("keep", "1"), ("change", "new"), ("fresh", "y")]);

        let delta = diff_keys(Some(&old), Some(&new));

        assert_eq!(delta.added, vec!["fresh"]);
        assert_eq!(delta.removed, vec!["drop"]);
        assert_eq!(delta.modified, vec!["change"]);
    }

    #[test]
    fn test_missing_map_equals_empty_map() {
        let empty: BTreeMap<String, String> = BTreeMap::new();
        assert!(maps_equal(None, Some(&empty)));
        assert!(maps_equal::<String>(None, None));
        assert!(!maps_equal(None, Some(&map(&[("a", "b")]))));
    }

    #[test]
    fn test_identical_maps_produce_empty_delta() {
        let m = map(&[("app", "web"), ("tier", "frontend")]);
        let delta = diff_keys(Some(&m), Some(&m.clone()));
        assert!(delta.is_empty());
    }

    #[test]
    fn test_format_map() {
        assert_eq!(format_map(None), "<none>");
        assert_eq!(format_map(Some(&map(&[("b", "2"), ("a", "1")]))), "a=1,b=2");
    }
}
