use serde_json::Value;
use statarb_core::config::config_summary;

pub fn run_config(data_path: &str) -> Result<Value, Box<dyn std::error::Error>> {
    let mut summary = serde_json::to_value(config_summary())?;
    if let Value::Object(map) = &mut summary {
        map.insert("data_path".into(), Value::String(data_path.to_string()));
    }
    Ok(serde_json::json!({ "result": summary }))
}
