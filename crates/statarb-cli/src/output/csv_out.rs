use serde_json::{Map, Value};
use std::io;

/// Write output as CSV to stdout.
///
/// A result carrying a `dates` series is written one row per period with
/// every parallel series as a column; anything else is a field/value listing.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    match value {
        Value::Object(map) => match map.get("result") {
            Some(Value::Object(result)) if result.contains_key("dates") => {
                write_series_csv(&mut wtr, result);
            }
            Some(Value::Object(result)) => write_fields(&mut wtr, result),
            _ => write_fields(&mut wtr, map),
        },
        Value::Array(arr) => {
            for item in arr {
                let _ = wtr.write_record([format_csv_value(item)]);
            }
        }
        _ => {
            let _ = wtr.write_record([format_csv_value(value)]);
        }
    }

    let _ = wtr.flush();
}

fn write_fields<W: io::Write>(wtr: &mut csv::Writer<W>, map: &Map<String, Value>) {
    let _ = wtr.write_record(["field", "value"]);
    for (key, val) in map {
        let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
    }
}

/// Per-period rows: `dates` first, then every array of the same length.
pub fn write_series_csv<W: io::Write>(wtr: &mut csv::Writer<W>, result: &Map<String, Value>) {
    let Some(Value::Array(dates)) = result.get("dates") else {
        return;
    };
    let columns: Vec<(&str, &Vec<Value>)> = result
        .iter()
        .filter(|(k, _)| k.as_str() != "dates")
        .filter_map(|(k, v)| match v {
            Value::Array(a) if a.len() == dates.len() && !a.iter().any(Value::is_object) => {
                Some((k.as_str(), a))
            }
            _ => None,
        })
        .collect();

    let mut header = vec!["date"];
    header.extend(columns.iter().map(|(k, _)| *k));
    let _ = wtr.write_record(&header);

    for (t, date) in dates.iter().enumerate() {
        let mut row = vec![format_csv_value(date)];
        row.extend(columns.iter().map(|(_, a)| format_csv_value(&a[t])));
        let _ = wtr.write_record(&row);
    }
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
