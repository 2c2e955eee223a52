use clap::Args;
use serde::Serialize;
use serde_json::Value;

use crate::input::prices::load_prices;

/// Arguments for listing the tickers in a price file
#[derive(Args)]
pub struct PairsArgs {
    /// Only list tickers with at least this many observations
    #[arg(long, default_value_t = 0)]
    pub min_obs: usize,
}

#[derive(Debug, Serialize)]
struct TickerSummary {
    ticker: String,
    observations: usize,
    first_date: Option<String>,
    last_date: Option<String>,
}

#[derive(Debug, Serialize)]
struct PairsOutput {
    source: String,
    tickers: Vec<String>,
    details: Vec<TickerSummary>,
}

pub fn run_pairs(args: PairsArgs, data_path: &str) -> Result<Value, Box<dyn std::error::Error>> {
    let frame = load_prices(data_path)?;

    let mut details = Vec::new();
    for ticker in frame.list_tickers() {
        let column = frame.column(ticker).unwrap_or_default();
        let observed: Vec<usize> = column
            .iter()
            .enumerate()
            .filter_map(|(t, v)| v.map(|_| t))
            .collect();
        if observed.len() < args.min_obs {
            continue;
        }
        details.push(TickerSummary {
            ticker: ticker.clone(),
            observations: observed.len(),
            first_date: observed.first().map(|t| frame.dates[*t].to_string()),
            last_date: observed.last().map(|t| frame.dates[*t].to_string()),
        });
    }

    let output = PairsOutput {
        source: frame.source.clone(),
        tickers: details.iter().map(|d| d.ticker.clone()).collect(),
        details,
    };
    Ok(serde_json::json!({ "result": output }))
}
