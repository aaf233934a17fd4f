//! Bracket-notation encoding of nested parameters.
//!
//! `{"rules": [{"id": "a", "recurrence": {"count": 1}}]}` becomes
//! `rules[][id]=a` and `rules[][recurrence][count]=1`.

use serde_json::{Map, Value};

pub fn to_pairs(params: &Map<String, Value>) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (key, value) in params {
        push_value(&mut pairs, key.clone(), value);
    }
    pairs
}

fn push_value(pairs: &mut Vec<(String, String)>, key: String, value: &Value) {
    match value {
        Value::Object(map) => {
            for (child, v) in map {
                push_value(pairs, format!("{}[{}]", key, child), v);
            }
        }
        Value::Array(items) if items.is_empty() => pairs.push((format!("{}[]", key), String::new())),
        Value::Array(items) => {
            for item in items {
                push_value(pairs, format!("{}[]", key), item);
            }
        }
        Value::Null => pairs.push((key, String::new())),
        Value::String(s) => pairs.push((key, s.clone())),
        Value::Bool(b) => pairs.push((key, b.to_string())),
        Value::Number(n) => pairs.push((key, n.to_string())),
    }
}
