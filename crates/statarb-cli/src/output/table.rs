use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::format_number;

/// Arrays longer than this are summarised by length.
const MAX_INLINE_ITEMS: usize = 6;

/// Format output as a table using the tabled crate.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_result_table(result, map);
            } else {
                print_flat_object(map);
            }
        }
        Value::Array(arr) => print_array_table(arr),
        _ => println!("{}", value),
    }
}

fn print_result_table(result: &Value, envelope: &Map<String, Value>) {
    let Value::Object(res_map) = result else {
        print_flat_object(envelope);
        return;
    };
    print_flat_object(res_map);

    for (key, val) in res_map {
        if let Value::Array(items) = val {
            if items.first().is_some_and(Value::is_object) {
                println!("\n{}:", key);
                print_array_table(items);
            }
        }
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

/// Two-column table; nested objects become dotted rows.
fn print_flat_object(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    push_rows(&mut builder, "", map);
    println!("{}", Table::from(builder));
}

fn push_rows(builder: &mut Builder, prefix: &str, map: &Map<String, Value>) {
    for (key, val) in map {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match val {
            Value::Object(inner) => push_rows(builder, &name, inner),
            _ => builder.push_record([name, format_value(key, val)]),
        }
    }
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(|v| format_value(h, v)).unwrap_or_default())
                    .collect();
                builder.push_record(row);
            }
        }

        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", format_value("", item));
        }
    }
}

fn format_value(key: &str, value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(_) => format_number(key, value),
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        Value::Array(arr) if arr.len() > MAX_INLINE_ITEMS => format!("[{} values]", arr.len()),
        Value::Array(arr) => arr
            .iter()
            .map(|v| format_value(key, v))
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_long_series_summarised() {
        let v = json!([1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(format_value("pnl", &v), "[8 values]");
        assert_eq!(format_value("tickers", &json!(["A", "B"])), "A, B");
        assert_eq!(format_value("half_life", &Value::Null), "-");
    }
}
