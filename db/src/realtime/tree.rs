//! Pure helpers over the JSON tree both store implementations keep.

use serde_json::{Map, Value};

/// Value under `segments`, treating `null` as absent.
pub fn get_at<'a>(node: &'a Value, segments: &[String]) -> Option<&'a Value> {
    let mut current = node;
    for seg in segments {
        current = current.as_object()?.get(seg)?;
    }
    if current.is_null() { None } else { Some(current) }
}

/// Owned copy of the value under `segments`.
pub fn read_at(node: &Value, segments: &[String]) -> Option<Value> {
    get_at(node, segments).cloned()
}

/// Drop nulls and empty objects recursively. Returns `None` when nothing is left.
pub fn normalize(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Object(map) => {
            let cleaned: Map<String, Value> = map
                .into_iter()
                .filter_map(|(k, v)| normalize(v).map(|v| (k, v)))
                .collect();
            if cleaned.is_empty() {
                None
            } else {
                Some(Value::Object(cleaned))
            }
        }
        other => Some(other),
    }
}

/// Write `value` under `segments`, creating intermediate objects as needed.
///
/// `None` (or a value that normalizes to nothing) removes the node; parents
/// left empty by the removal are removed too. A non-object found on the way
/// is replaced by an object.
pub fn write_at(node: &mut Value, segments: &[String], value: Option<Value>) {
    let value = value.and_then(normalize);
    write_normalized(node, segments, value);
}

fn write_normalized(node: &mut Value, segments: &[String], value: Option<Value>) {
    let Some((head, rest)) = segments.split_first() else {
        *node = value.unwrap_or(Value::Null);
        return;
    };

    if !node.is_object() {
        if value.is_none() {
            return;
        }
        *node = Value::Object(Map::new());
    }

    if let Value::Object(map) = node {
        let child = map.entry(head.clone()).or_insert(Value::Null);
        write_normalized(child, rest, value);
        if child.is_null() {
            map.remove(head);
        }
        if map.is_empty() {
            *node = Value::Null;
        }
    }
}
