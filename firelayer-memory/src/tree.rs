//! The JSON tree behind [`InMemoryStore`](crate::InMemoryStore).
//!
//! The tree follows the store's write semantics: `null` members are never stored, writing
//! `null` or an empty object deletes the location, and parents left without children are
//! removed.

use serde_json::{Map, Value};

/// Removes `null` members and empty objects from `value`. Returns `None` when nothing is
/// left to store.
pub(crate) fn normalize(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Object(members) => {
            let members = members
                .into_iter()
                .filter_map(|(key, member)| normalize(member).map(|member| (key, member)))
                .collect::<Map<_, _>>();

            (!members.is_empty()).then_some(Value::Object(members))
        }
        Value::Array(items) if items.is_empty() => None,
        other => Some(other),
    }
}

/// Returns the value at `segments` below `root`.
pub(crate) fn get<'a>(root: &'a Map<String, Value>, segments: &[&str]) -> Option<&'a Value> {
    let (last, parents) = segments.split_last()?;

    let mut node = root;
    for segment in parents {
        node = node.get(*segment)?.as_object()?;
    }

    node.get(*last)
}

/// Returns the children of the object at `segments`, or `None` if the location holds no
/// object.
pub(crate) fn children<'a>(
    root: &'a Map<String, Value>,
    segments: &[&str],
) -> Option<&'a Map<String, Value>> {
    if segments.is_empty() {
        return Some(root);
    }

    get(root, segments)?.as_object()
}

/// Writes `value` at `segments` below `node`, or deletes the location when `value` is
/// `None`. Scalars on the way are replaced by objects; emptied parents are pruned.
pub(crate) fn set(node: &mut Map<String, Value>, segments: &[&str], value: Option<Value>) {
    let Some((head, rest)) = segments.split_first() else {
        return;
    };

    if rest.is_empty() {
        match value.and_then(normalize) {
            Some(value) => {
                node.insert(head.to_string(), value);
            }
            None => {
                node.remove(*head);
            }
        }
        return;
    }

    if value.is_none() && !node.get(*head).is_some_and(Value::is_object) {
        return;
    }

    let child = node
        .entry(head.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !child.is_object() {
        *child = Value::Object(Map::new());
    }

    let emptied = match child {
        Value::Object(members) => {
            set(members, rest, value);
            members.is_empty()
        }
        _ => false,
    };

    if emptied {
        node.remove(*head);
    }
}

/// Whether `value` equals `expected` the way the store's equality index compares:
/// numbers by numeric value, everything else structurally.
pub(crate) fn same_value(value: &Value, expected: &Value) -> bool {
    match (value, expected) {
        (Value::Number(left), Value::Number(right)) => left.as_f64() == right.as_f64(),
        _ => value == expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tree(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn normalization_drops_nulls_and_empty_objects() {
        assert_eq!(
            normalize(json!({ "a": 1, "b": null, "c": { "d": null }, "e": [] })),
            Some(json!({ "a": 1 }))
        );
        assert_eq!(normalize(json!({ "b": null })), None);
        assert_eq!(normalize(json!("x")), Some(json!("x")));
    }

    #[test]
    fn writes_create_intermediate_objects() {
        let mut root = Map::new();
        set(&mut root, &["shop", "orders", "k1"], Some(json!({ "total": 3 })));

        assert_eq!(Value::Object(root.clone()), json!({ "shop": { "orders": { "k1": { "total": 3 } } } }));
        assert_eq!(get(&root, &["shop", "orders", "k1", "total"]), Some(&json!(3)));
        assert_eq!(get(&root, &["shop", "missing"]), None);
    }

    #[test]
    fn deletes_prune_emptied_parents() {
        let mut root = tree(json!({ "c": { "k1": { "name": "A" } }, "other": 1 }));

        set(&mut root, &["c", "k1", "name"], None);
        assert_eq!(Value::Object(root.clone()), json!({ "other": 1 }));

        set(&mut root, &["nothing", "here"], None);
        assert_eq!(Value::Object(root), json!({ "other": 1 }));
    }

    #[test]
    fn null_writes_delete() {
        let mut root = tree(json!({ "c": { "k1": { "name": "A" }, "k2": { "name": "B" } } }));

        set(&mut root, &["c", "k1"], Some(Value::Null));
        assert_eq!(Value::Object(root), json!({ "c": { "k2": { "name": "B" } } }));
    }

    #[test]
    fn numbers_compare_by_value() {
        assert!(same_value(&json!(28), &json!(28.0)));
        assert!(!same_value(&json!(28), &json!("28")));
        assert!(same_value(&json!({ "a": [1] }), &json!({ "a": [1] })));
    }
}
