pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use rust_decimal::Decimal;
use serde_json::Value;

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// Decimal places used when a named scalar is shown to a human.
fn display_places(key: &str) -> Option<u32> {
    match key {
        "sharpe" => Some(2),
        "total_return" | "return_pct" | "max_drawdown" | "hit_rate" | "hedge_ratio" | "beta"
        | "p_value" => Some(4),
        "zscore" | "entry_z" | "exit_z" | "test_statistic" => Some(3),
        _ => None,
    }
}

/// Render a number, rounded if `key` has a display precision.
pub fn format_number(key: &str, value: &Value) -> String {
    let Value::Number(n) = value else {
        return value.to_string();
    };
    match (display_places(key), n.as_f64()) {
        (Some(dp), Some(f)) => match Decimal::from_f64_retain(f) {
            Some(d) => d.round_dp(dp).to_string(),
            None => n.to_string(),
        },
        _ => n.to_string(),
    }
}
