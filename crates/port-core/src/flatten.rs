use indexmap::IndexMap;
use serde_json::Value;

/// Separator placed between path segments of a denested key.
pub const SEPARATOR: char = '-';

/// A nested structure flattened to `path -> scalar`, in pre-order walk order.
pub type DenestedRecord = IndexMap<String, Value>;

/// Denests a JSON object/array into a single-level record keyed by dash-joined
/// paths, e.g. `{"a": {"c": [2, 3]}}` becomes `{"a-c-0": 2, "a-c-1": 3}`.
///
/// Map keys are visited in document order and list elements by index. When two
/// paths collapse onto the same key (keys that themselves contain `-`), the
/// value visited last wins.
pub fn denest(input: &Value) -> DenestedRecord {
    let mut out = DenestedRecord::new();
    denest_into(input, &mut out, "");
    out
}

pub fn denest_into(input: &Value, out: &mut DenestedRecord, path: &str) {
    match input {
        Value::Object(map) => {
            for (key, value) in map {
                denest_into(value, out, &format!("{path}{SEPARATOR}{key}"));
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                denest_into(item, out, &format!("{path}{SEPARATOR}{index}"));
            }
        }
        scalar => {
            let key = path.strip_prefix(SEPARATOR).unwrap_or(path);
            out.insert(key.to_string(), scalar.clone());
        }
    }
}

/// Returns the value of the least nested key containing `key_to_match`.
///
/// Depth is the number of separators in the key; on equal depth the first key
/// in walk order wins. Strings are returned verbatim and other scalars in their
/// JSON form. An empty string means nothing matched.
///
/// ```text
/// asd-asd-asd: 1
/// asd-asd: 2
/// qwe: 3
/// ```
/// matching `asd` returns `2`.
pub fn find_least_nested(record: &DenestedRecord, key_to_match: &str) -> String {
    let mut best: Option<(usize, &Value)> = None;

    for (key, value) in record {
        if !key.contains(key_to_match) {
            continue;
        }
        let depth = key.matches(SEPARATOR).count();
        if best.map_or(true, |(best_depth, _)| depth < best_depth) {
            best = Some((depth, value));
        }
    }

    best.map(|(_, value)| scalar_to_string(value))
        .unwrap_or_default()
}

pub fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
