use serde_json::Value;

use super::format_number;

/// Fields tried in order, at the top of the result and one level down.
const PRIORITY_KEYS: [&str; 5] = ["sharpe", "total_return", "p_value", "hedge_ratio", "tickers"];

/// Print just the key answer value from the output.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);
    println!("{}", minimal_value(result_obj));
}

fn minimal_value(result: &Value) -> String {
    let Value::Object(map) = result else {
        return format_minimal("", result);
    };

    for key in PRIORITY_KEYS {
        if let Some(val) = find_key(map, key) {
            return format_minimal(key, val);
        }
    }

    match map.iter().next() {
        Some((key, val)) => format!("{}: {}", key, format_minimal(key, val)),
        None => String::new(),
    }
}

fn find_key<'a>(map: &'a serde_json::Map<String, Value>, key: &str) -> Option<&'a Value> {
    if let Some(v) = map.get(key).filter(|v| !v.is_null()) {
        return Some(v);
    }
    map.values()
        .filter_map(Value::as_object)
        .find_map(|inner| inner.get(key).filter(|v| !v.is_null()))
}

fn format_minimal(key: &str, value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(_) => format_number(key, value),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(arr) => arr
            .iter()
            .map(|v| format_minimal(key, v))
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
