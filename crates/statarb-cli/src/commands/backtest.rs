use clap::Args;
use serde_json::Value;
use statarb_core::backtest::ReturnKind;
use statarb_core::cointegration::{
    CointegrationConfig, CointegrationGate, CointegrationPolicy, LagSelection,
};
use statarb_core::config::{
    DEFAULT_ADF_MAX_LAG, DEFAULT_ENTRY_Z, DEFAULT_EXIT_Z, DEFAULT_NOTIONAL, DEFAULT_SIGNIFICANCE,
    DEFAULT_WINDOW,
};
use statarb_core::pipeline::{self, BacktestRequest, HedgeSample};
use statarb_core::types::PriceTransform;
use std::time::Instant;
use tracing::info;

use crate::input;
use crate::input::prices::{align_pair, load_prices};

/// Arguments for a pairs backtest
#[derive(Args)]
pub struct BacktestArgs {
    /// Path to a JSON backtest request (overrides the flags below)
    #[arg(long)]
    pub input: Option<String>,

    /// Two tickers X,Y; Y is regressed on X (e.g. "GDX,GLD")
    #[arg(long, value_delimiter = ',')]
    pub tickers: Option<Vec<String>>,

    /// Rolling z-score window in periods
    #[arg(long, env = "STATARB_DEFAULT_WINDOW", default_value_t = DEFAULT_WINDOW)]
    pub window: usize,

    /// |z| at which a position is opened
    #[arg(long, env = "STATARB_DEFAULT_ENTRY_Z", default_value_t = DEFAULT_ENTRY_Z)]
    pub entry_z: f64,

    /// |z| at which an open position is closed
    #[arg(long, env = "STATARB_DEFAULT_EXIT_Z", default_value_t = DEFAULT_EXIT_Z)]
    pub exit_z: f64,

    /// Capital scale for monetary P&L
    #[arg(long, default_value_t = DEFAULT_NOTIONAL)]
    pub notional: f64,

    /// Transaction cost per leg in basis points
    #[arg(long, default_value_t = 0.0)]
    pub cost_bps: f64,

    /// Estimate the hedge ratio and spread on log prices
    #[arg(long)]
    pub log_prices: bool,

    /// Use log returns instead of simple returns
    #[arg(long)]
    pub log_returns: bool,

    /// Fit the hedge ratio on the first N periods only
    #[arg(long)]
    pub train_periods: Option<usize>,

    /// Gate entries on a rolling cointegration test over this many periods
    #[arg(long)]
    pub gate_window: Option<usize>,

    /// Maximum rolling p-value that allows an entry
    #[arg(long, default_value_t = DEFAULT_SIGNIFICANCE)]
    pub gate_p_value: f64,

    /// Stay flat unless the full-sample test finds cointegration
    #[arg(long)]
    pub require_cointegration: bool,

    /// Significance level of the cointegration test
    #[arg(long, default_value_t = DEFAULT_SIGNIFICANCE)]
    pub significance: f64,

    /// Maximum augmentation lag for the unit-root test (chosen by AIC)
    #[arg(long, default_value_t = DEFAULT_ADF_MAX_LAG)]
    pub max_lag: usize,

    /// Close any position held for this many periods
    #[arg(long)]
    pub max_holding: Option<usize>,
}

pub fn run_backtest(args: BacktestArgs, data_path: &str) -> Result<Value, Box<dyn std::error::Error>> {
    let request: BacktestRequest = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if args.tickers.is_some() {
        request_from_args(&args)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        return Err("--tickers X,Y, --input <request.json> or stdin required for backtest".into());
    };

    let start = Instant::now();
    let frame = load_prices(data_path)?;
    let [x, y] = request.normalized_tickers();
    let pair = align_pair(&frame, &x, &y)?;
    info!(
        x = %x,
        y = %y,
        window = request.window,
        entry_z = request.entry_z,
        exit_z = request.exit_z,
        rows = pair.len(),
        "running backtest"
    );

    let result = pipeline::run_backtest(&request, &pair)?;
    info!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        warnings = result.warnings.len(),
        "backtest finished"
    );
    Ok(serde_json::to_value(result)?)
}

/// Build a request from command-line flags.
pub fn request_from_args(args: &BacktestArgs) -> Result<BacktestRequest, Box<dyn std::error::Error>> {
    let tickers: Vec<String> = args
        .tickers
        .iter()
        .flatten()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    let [x, y] = <[String; 2]>::try_from(tickers)
        .map_err(|_| "exactly two tickers are required, e.g. --tickers GDX,GLD")?;

    Ok(BacktestRequest {
        tickers: [x, y],
        window: args.window,
        entry_z: args.entry_z,
        exit_z: args.exit_z,
        notional: args.notional,
        cost_bps: args.cost_bps,
        price_transform: if args.log_prices {
            PriceTransform::Log
        } else {
            PriceTransform::Raw
        },
        return_kind: if args.log_returns {
            ReturnKind::Log
        } else {
            ReturnKind::Simple
        },
        hedge_sample: match args.train_periods {
            Some(periods) => HedgeSample::Training { periods },
            None => HedgeSample::FullSample,
        },
        cointegration: CointegrationConfig {
            significance: args.significance,
            lags: LagSelection::Aic {
                max_lag: args.max_lag,
            },
            ..CointegrationConfig::default()
        },
        gate: match args.gate_window {
            Some(window) => CointegrationGate::Rolling {
                window,
                max_p_value: args.gate_p_value,
            },
            None => CointegrationGate::Off,
        },
        policy: if args.require_cointegration {
            CointegrationPolicy::Require
        } else {
            CointegrationPolicy::Informational
        },
        max_holding_periods: args.max_holding,
    })
}
