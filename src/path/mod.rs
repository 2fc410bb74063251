//! Dotted/indexed field-path resolution over nested record values.
//!
//! Paths use `.` as the segment separator. A segment that parses as a
//! non-negative integer indexes into a sequence (`allergies.0.code`); any
//! segment that does not resolve makes the whole path absent. Resolution is
//! total: malformed or missing paths return `None`, never an error.

use std::collections::BTreeSet;

use serde_json::Value;

/// Resolve a dotted path against a nested record. Returns `None` when any
/// segment does not resolve.
pub fn get_field_value<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = record;

    for segment in path.split('.') {
        match current {
            Value::Object(map) => {
                current = map.get(segment)?;
            }
            Value::Array(items) => {
                let index: usize = segment.parse().ok()?;
                current = items.get(index)?;
            }
            _ => return None,
        }
    }

    Some(current)
}

/// Enumerate every key path present in a nested mapping. Mapping elements of
/// sequences are expanded with numeric-index segments; scalar sequence
/// elements are not expanded further.
pub fn extract_all_field_paths(record: &Value) -> BTreeSet<String> {
    let mut paths = BTreeSet::new();
    if let Value::Object(map) = record {
        for (key, value) in map {
            collect_paths(key.clone(), value, &mut paths);
        }
    }
    paths
}

fn collect_paths(prefix: String, value: &Value, paths: &mut BTreeSet<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                collect_paths(format!("{prefix}.{key}"), child, paths);
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                if let Value::Object(map) = item {
                    for (key, child) in map {
                        collect_paths(format!("{prefix}.{index}.{key}"), child, paths);
                    }
                }
            }
        }
        _ => {}
    }
    paths.insert(prefix);
}
