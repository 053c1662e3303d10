//! Attribute-level diff of two item images.
//!
//! Nested maps are compared recursively and every changed leaf reports its
//! own dotted path as well as the path of each ancestor map. Arrays are
//! compared as whole values and are never diffed element by element.

use serde_json::{Number, Value};

use cdc_types::Image;

use crate::error::{DiffError, DiffResult};

/// Maximum nesting the engine will follow before giving up.
///
/// The upstream store caps item nesting at 32 levels.
pub const MAX_DEPTH: usize = 64;

/// The result of comparing two images.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ItemDiff {
    /// Changed attribute paths in traversal order, without duplicates.
    pub changed: Vec<String>,
    /// Old values of the changed branches.
    pub before: Image,
    /// New values of the changed branches.
    pub after: Image,
}

impl ItemDiff {
    /// Create an empty diff.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if nothing changed.
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }

    /// Number of changed paths.
    pub fn len(&self) -> usize {
        self.changed.len()
    }

    /// Whether the given dotted path is among the changed paths.
    pub fn contains(&self, path: &str) -> bool {
        self.changed.iter().any(|p| p == path)
    }

    /// Changed paths that name a top-level attribute.
    pub fn top_level_paths(&self) -> impl Iterator<Item = &str> {
        self.changed
            .iter()
            .map(String::as_str)
            .filter(|p| !p.contains('.'))
    }

    fn record(&mut self, path: String, key: &str, old: Option<&Value>, new: Option<&Value>) {
        if let Some(old) = old {
            self.before.insert(key.to_string(), old.clone());
        }
        if let Some(new) = new {
            self.after.insert(key.to_string(), new.clone());
        }
        self.changed.push(path);
    }
}

/// Compare two optional images. An absent image behaves as an empty one.
pub fn diff_images(new: Option<&Image>, old: Option<&Image>) -> DiffResult<ItemDiff> {
    let empty = Image::new();
    diff(new.unwrap_or(&empty), old.unwrap_or(&empty), "")
}

/// Compare `new` against `old`, prefixing every reported path with `prefix`.
///
/// Keys only in `new` are reported first, then keys only in `old`, then
/// changed keys present in both. Within each group the order is the order
/// of the image the keys were taken from.
pub fn diff(new: &Image, old: &Image, prefix: &str) -> DiffResult<ItemDiff> {
    diff_level(new, old, prefix, 0)
}

fn diff_level(new: &Image, old: &Image, prefix: &str, depth: usize) -> DiffResult<ItemDiff> {
    if depth > MAX_DEPTH {
        return Err(DiffError::DepthExceeded {
            path: prefix.trim_end_matches('.').to_string(),
            limit: MAX_DEPTH,
        });
    }

    let mut out = ItemDiff::new();

    // Added keys.
    for (key, value) in new {
        if !old.contains_key(key) {
            out.record(format!("{prefix}{key}"), key, None, Some(value));
        }
    }

    // Removed keys.
    for (key, value) in old {
        if !new.contains_key(key) {
            out.record(format!("{prefix}{key}"), key, Some(value), None);
        }
    }

    // Keys on both sides.
    for (key, new_val) in new {
        let Some(old_val) = old.get(key) else {
            continue;
        };

        match (new_val, old_val) {
            (Value::Object(new_map), Value::Object(old_map)) => {
                let nested =
                    diff_level(new_map, old_map, &format!("{prefix}{key}."), depth + 1)?;
                if !nested.is_empty() {
                    out.before.insert(key.clone(), Value::Object(nested.before));
                    out.after.insert(key.clone(), Value::Object(nested.after));
                    out.changed.push(format!("{prefix}{key}"));
                    out.changed.extend(nested.changed);
                }
            }
            (Value::Array(_), Value::Array(_)) => {
                if !same_content(new_val, old_val)? {
                    out.record(format!("{prefix}{key}"), key, Some(old_val), Some(new_val));
                }
            }
            _ => {
                if !scalars_equal(new_val, old_val) {
                    out.record(format!("{prefix}{key}"), key, Some(old_val), Some(new_val));
                }
            }
        }
    }

    Ok(out)
}

/// Arrays are equal when their serialized forms are byte-identical.
///
/// Unlike top-level scalars, numbers inside an array compare by their text,
/// so `[1]` and `[1.0]` differ while `1` and `1.0` do not.
fn same_content(a: &Value, b: &Value) -> DiffResult<bool> {
    let a = serde_json::to_vec(a).map_err(|e| DiffError::Serialization(e.to_string()))?;
    let b = serde_json::to_vec(b).map_err(|e| DiffError::Serialization(e.to_string()))?;
    Ok(a == b)
}

fn scalars_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        _ => a == b,
    }
}

/// Numeric equality across representations, so `1` equals `1.0`.
fn numbers_equal(x: &Number, y: &Number) -> bool {
    if let (Some(a), Some(b)) = (x.as_i64(), y.as_i64()) {
        return a == b;
    }
    if let (Some(a), Some(b)) = (x.as_u64(), y.as_u64()) {
        return a == b;
    }
    match (x.as_f64(), y.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn image(value: Value) -> Image {
        value.as_object().cloned().unwrap_or_default()
    }

    fn paths(diff: &ItemDiff) -> Vec<&str> {
        diff.changed.iter().map(String::as_str).collect()
    }

    #[test]
    fn identical_images_no_diff() {
        let img = image(json!({"a": 1, "b": {"c": [1, 2]}, "d": null}));
        let diff = diff_images(Some(&img), Some(&img)).unwrap();
        assert!(diff.is_empty());
        assert!(diff.before.is_empty());
        assert!(diff.after.is_empty());
    }

    #[test]
    fn insert_reports_every_attribute() {
        let new = image(json!({"pk": "p", "name": "Ada"}));
        let diff = diff_images(Some(&new), None).unwrap();
        assert_eq!(paths(&diff), vec!["pk", "name"]);
        assert_eq!(Value::Object(diff.after), json!({"pk": "p", "name": "Ada"}));
        assert!(diff.before.is_empty());
    }

    #[test]
    fn remove_reports_every_attribute() {
        let old = image(json!({"pk": "p", "name": "Ada"}));
        let diff = diff_images(None, Some(&old)).unwrap();
        assert_eq!(paths(&diff), vec!["pk", "name"]);
        assert_eq!(Value::Object(diff.before), json!({"pk": "p", "name": "Ada"}));
        assert!(diff.after.is_empty());
    }

    #[test]
    fn single_scalar_change() {
        let old = image(json!({"pk": "t#1", "status": "open", "title": "bug"}));
        let new = image(json!({"pk": "t#1", "status": "closed", "title": "bug"}));
        let diff = diff_images(Some(&new), Some(&old)).unwrap();
        assert_eq!(paths(&diff), vec!["status"]);
        assert_eq!(Value::Object(diff.before), json!({"status": "open"}));
        assert_eq!(Value::Object(diff.after), json!({"status": "closed"}));
    }

    #[test]
    fn added_then_removed_then_modified() {
        let old = image(json!({"keep": 1, "gone": true, "edit": "x"}));
        let new = image(json!({"edit": "y", "keep": 1, "fresh": [1]}));
        let diff = diff_images(Some(&new), Some(&old)).unwrap();
        assert_eq!(paths(&diff), vec!["fresh", "gone", "edit"]);
    }

    #[test]
    fn deep_leaf_change_reports_ancestors() {
        let old = image(json!({"a": {"b": {"c": 1, "same": 0}, "other": 2}, "top": 3}));
        let new = image(json!({"a": {"b": {"c": 2, "same": 0}, "other": 2}, "top": 3}));
        let diff = diff_images(Some(&new), Some(&old)).unwrap();
        assert_eq!(paths(&diff), vec!["a", "a.b", "a.b.c"]);
        assert_eq!(Value::Object(diff.before), json!({"a": {"b": {"c": 1}}}));
        assert_eq!(Value::Object(diff.after), json!({"a": {"b": {"c": 2}}}));
    }

    #[test]
    fn nested_addition_and_removal() {
        let old = image(json!({"address": {"city": "Paris", "zip": "75001"}}));
        let new = image(json!({"address": {"city": "Paris", "street": "Rue"}}));
        let diff = diff_images(Some(&new), Some(&old)).unwrap();
        assert_eq!(paths(&diff), vec!["address", "address.street", "address.zip"]);
        assert_eq!(Value::Object(diff.before), json!({"address": {"zip": "75001"}}));
        assert_eq!(Value::Object(diff.after), json!({"address": {"street": "Rue"}}));
    }

    #[test]
    fn unchanged_nested_map_is_pruned() {
        let old = image(json!({"meta": {"v": 1}, "n": 1}));
        let new = image(json!({"meta": {"v": 1}, "n": 2}));
        let diff = diff_images(Some(&new), Some(&old)).unwrap();
        assert_eq!(paths(&diff), vec!["n"]);
        assert!(!diff.before.contains_key("meta"));
        assert!(!diff.after.contains_key("meta"));
    }

    #[test]
    fn arrays_replaced_wholesale() {
        let old = image(json!({"a": [1, 2]}));
        let new = image(json!({"a": [1, 3]}));
        let diff = diff_images(Some(&new), Some(&old)).unwrap();
        assert_eq!(paths(&diff), vec!["a"]);
        assert_eq!(diff.before["a"], json!([1, 2]));
        assert_eq!(diff.after["a"], json!([1, 3]));
    }

    #[test]
    fn arrays_of_maps_are_not_recursed() {
        let old = image(json!({"items": [{"id": 1, "qty": 1}]}));
        let new = image(json!({"items": [{"id": 1, "qty": 2}]}));
        let diff = diff_images(Some(&new), Some(&old)).unwrap();
        assert_eq!(paths(&diff), vec!["items"]);
    }

    #[test]
    fn equal_arrays_are_unchanged() {
        let img = image(json!({"tags": ["a", "b"]}));
        let diff = diff_images(Some(&img), Some(&img.clone())).unwrap();
        assert!(diff.is_empty());
    }

    #[test]
    fn type_change_is_a_scalar_change() {
        let old = image(json!({"v": {"x": 1}}));
        let new = image(json!({"v": [1]}));
        let diff = diff_images(Some(&new), Some(&old)).unwrap();
        assert_eq!(paths(&diff), vec!["v"]);
        assert_eq!(diff.before["v"], json!({"x": 1}));
        assert_eq!(diff.after["v"], json!([1]));
    }

    #[test]
    fn null_to_map_is_a_single_change() {
        let old = image(json!({"v": null}));
        let new = image(json!({"v": {"x": 1}}));
        let diff = diff_images(Some(&new), Some(&old)).unwrap();
        assert_eq!(paths(&diff), vec!["v"]);
    }

    #[test]
    fn integer_and_float_forms_compare_numerically() {
        let old = image(json!({"n": 1}));
        let new = image(json!({"n": 1.0}));
        assert!(diff_images(Some(&new), Some(&old)).unwrap().is_empty());

        let new = image(json!({"n": 1.5}));
        assert_eq!(
            paths(&diff_images(Some(&new), Some(&old)).unwrap()),
            vec!["n"]
        );
    }

    #[test]
    fn numbers_inside_arrays_compare_by_text() {
        let old = image(json!({"n": [1]}));
        let new = image(json!({"n": [1.0]}));
        let diff = diff_images(Some(&new), Some(&old)).unwrap();
        assert_eq!(paths(&diff), vec!["n"]);
        assert_eq!(diff.after["n"], json!([1.0]));
    }

    #[test]
    fn prefix_is_applied_to_every_path() {
        let old = image(json!({"x": {"y": 1}}));
        let new = image(json!({"x": {"y": 2}}));
        let diff = diff(&new, &old, "root.").unwrap();
        assert_eq!(paths(&diff), vec!["root.x", "root.x.y"]);
    }

    #[test]
    fn both_absent_is_empty() {
        assert!(diff_images(None, None).unwrap().is_empty());
    }

    #[test]
    fn excessive_nesting_fails() {
        let mut old = json!(0);
        let mut new = json!(1);
        for _ in 0..(MAX_DEPTH + 2) {
            old = json!({ "n": old });
            new = json!({ "n": new });
        }
        let err = diff_images(Some(&image(new)), Some(&image(old))).unwrap_err();
        assert!(matches!(err, DiffError::DepthExceeded { limit: MAX_DEPTH, .. }));
    }

    #[test]
    fn query_helpers() {
        let old = image(json!({"a": {"b": 1}, "c": 1}));
        let new = image(json!({"a": {"b": 2}, "c": 2}));
        let diff = diff_images(Some(&new), Some(&old)).unwrap();
        assert_eq!(diff.len(), 3);
        assert!(diff.contains("a.b"));
        assert!(!diff.contains("b"));
        assert_eq!(diff.top_level_paths().collect::<Vec<_>>(), vec!["a", "c"]);
    }

    // -----------------------------------------------------------------------
    // Property tests
    // -----------------------------------------------------------------------

    fn leaf() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::from),
            "[a-z0-9 ]{0,8}".prop_map(Value::String),
        ]
    }

    fn tree() -> impl Strategy<Value = Value> {
        leaf().prop_recursive(4, 32, 5, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,4}", inner, 0..5)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    fn image_with_prefix(prefix: &'static str) -> impl Strategy<Value = Image> {
        prop::collection::btree_map("[a-z]{1,6}", tree(), 0..8).prop_map(move |m| {
            m.into_iter()
                .map(|(k, v)| (format!("{prefix}{k}"), v))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn identical_images_never_differ(a in image_with_prefix("")) {
            let diff = diff_images(Some(&a), Some(&a)).unwrap();
            prop_assert!(diff.is_empty());
            prop_assert!(diff.before.is_empty());
            prop_assert!(diff.after.is_empty());
        }

        #[test]
        fn disjoint_images_report_every_key_new_first(
            a in image_with_prefix("a_"),
            b in image_with_prefix("b_"),
        ) {
            let diff = diff_images(Some(&a), Some(&b)).unwrap();
            prop_assert_eq!(diff.len(), a.len() + b.len());
            let expected: Vec<String> = a.keys().chain(b.keys()).cloned().collect();
            prop_assert_eq!(diff.changed, expected);
        }

        #[test]
        fn pruned_keys_are_reported_paths(
            a in image_with_prefix(""),
            b in image_with_prefix(""),
        ) {
            let diff = diff_images(Some(&a), Some(&b)).unwrap();
            for key in diff.before.keys().chain(diff.after.keys()) {
                prop_assert!(diff.contains(key), "key {} not reported", key);
            }
            let mut seen = std::collections::HashSet::new();
            for path in &diff.changed {
                prop_assert!(seen.insert(path.clone()), "duplicate path {}", path);
            }
        }
    }
}
