//! JSON tree helpers shared by the store backends.

use super::{StoreError, StorePath, StoreResult};
use duochat_messaging::is_valid_segment;
use serde_json::{Map, Value};

/// Reject object keys that could not be addressed as path segments.
pub(crate) fn validate(value: &Value) -> StoreResult<()> {
    if let Value::Object(object) = value {
        for (key, child) in object {
            if !is_valid_segment(key) {
                return Err(StoreError::InvalidPath(key.clone()));
            }
            validate(child)?;
        }
    }
    Ok(())
}

/// Drop null children and empty objects; an object left empty becomes null.
pub(crate) fn normalize(value: Value) -> Value {
    match value {
        Value::Object(object) => {
            let pruned: Map<String, Value> = object
                .into_iter()
                .map(|(k, v)| (k, normalize(v)))
                .filter(|(_, v)| !v.is_null())
                .collect();
            if pruned.is_empty() {
                Value::Null
            } else {
                Value::Object(pruned)
            }
        }
        other => other,
    }
}

pub(crate) fn value_at<'a>(root: &'a Value, path: &StorePath) -> Option<&'a Value> {
    path.segments()
        .iter()
        .try_fold(root, |node, segment| node.get(segment.as_str()))
}

/// Replace the subtree at `segments` and prune parents left empty.
pub(crate) fn write_at(node: &mut Value, segments: &[String], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *node = value;
        return;
    };

    if !node.is_object() {
        if value.is_null() {
            return;
        }
        *node = Value::Object(Map::new());
    }
    let Value::Object(object) = node else {
        return;
    };

    let child = object.entry(head.clone()).or_insert(Value::Null);
    write_at(child, rest, value);
    if child.is_null() {
        object.remove(head);
    }
    if object.is_empty() {
        *node = Value::Null;
    }
}

/// Flatten a normalized value into `(relative path, leaf)` pairs.
pub(crate) fn flatten(value: &Value) -> Vec<(Vec<String>, Value)> {
    let mut leaves = Vec::new();
    collect_leaves(value, &mut Vec::new(), &mut leaves);
    leaves
}

fn collect_leaves(value: &Value, prefix: &mut Vec<String>, out: &mut Vec<(Vec<String>, Value)>) {
    match value {
        Value::Null => {}
        Value::Object(object) => {
            for (key, child) in object {
                prefix.push(key.clone());
                collect_leaves(child, prefix, out);
                prefix.pop();
            }
        }
        leaf => out.push((prefix.clone(), leaf.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn segments(raw: &str) -> Vec<String> {
        raw.split('/').map(str::to_owned).collect()
    }

    #[test]
    fn write_replaces_and_prunes() {
        let mut root = Value::Null;
        write_at(&mut root, &segments("c/k/typing/7"), json!(true));
        write_at(&mut root, &segments("c/k/-A"), json!({"body": "hi"}));
        assert_eq!(root, json!({"c": {"k": {"typing": {"7": true}, "-A": {"body": "hi"}}}}));

        write_at(&mut root, &segments("c/k/typing/7"), Value::Null);
        assert_eq!(root, json!({"c": {"k": {"-A": {"body": "hi"}}}}));

        write_at(&mut root, &segments("c/k/-A"), Value::Null);
        assert_eq!(root, Value::Null);
    }

    #[test]
    fn writing_below_a_leaf_replaces_it() {
        let mut root = json!({"flag": true});
        write_at(&mut root, &segments("flag/nested"), json!(1));
        assert_eq!(root, json!({"flag": {"nested": 1}}));
    }

    #[test]
    fn normalize_and_flatten() {
        let value = normalize(json!({"a": {"b": null, "c": {}}, "d": 1, "e": {"f": "x"}}));
        assert_eq!(value, json!({"d": 1, "e": {"f": "x"}}));

        let leaves = flatten(&value);
        assert_eq!(
            leaves,
            vec![
                (segments("d"), json!(1)),
                (segments("e/f"), json!("x")),
            ]
        );
    }

    #[test]
    fn validate_rejects_bad_keys() {
        assert!(validate(&json!({"ok": {"also-ok": 1}})).is_ok());
        assert!(validate(&json!({"ok": {"no.dots": 1}})).is_err());
    }
}
