//! Layered record merge for template contexts.
//!
//! Pages are rendered from a single flat JSON object built out of several
//! layers: site configuration, then page-level data (episode record, index
//! metadata, store data). Layers are applied left to right and **later
//! layers win** on key collision:
//!
//! ```text
//! episode page: merge_layers([site, episode])
//! index page:   merge_layers([site, index, {"episodes": [...]}])
//! store page:   merge_layers([site, index, store])
//! ```
//!
//! The merge is shallow: a key present in a later layer replaces the whole
//! value from earlier layers, objects included.

use serde_json::{Map, Value};

/// Merge JSON objects left to right; the rightmost value for each key wins.
///
/// Non-object layers are ignored.
pub fn merge_layers<'a>(layers: impl IntoIterator<Item = &'a Value>) -> Value {
    let mut merged = Map::new();
    for layer in layers {
        if let Value::Object(fields) = layer {
            for (key, value) in fields {
                merged.insert(key.clone(), value.clone());
            }
        }
    }
    Value::Object(merged)
}

/// Set `key` on `target` only when it is absent, null, or an empty string.
pub fn fill_default(target: &mut Value, key: &str, default: Value) {
    if let Value::Object(fields) = target {
        let missing = match fields.get(key) {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.is_empty(),
            Some(_) => false,
        };
        if missing {
            fields.insert(key.to_string(), default);
        }
    }
}
