use clap::{Args, ValueEnum};
use serde_json::Value;
use statarb_core::cointegration::{analyze_pair, CointegrationConfig, CriticalSurface, LagSelection};
use statarb_core::config::{DEFAULT_ADF_MAX_LAG, DEFAULT_SIGNIFICANCE};
use statarb_core::regression::BetaFilter;
use statarb_core::types::{normalize_ticker, PriceTransform};

use crate::input::prices::{align_pair, load_prices};

#[derive(Clone, Copy, Debug, PartialEq, ValueEnum)]
pub enum FilterKind {
    Rls,
    Kalman,
}

/// Arguments for a cointegration diagnostic
#[derive(Args)]
pub struct CointArgs {
    /// Two tickers X,Y; Y is regressed on X
    #[arg(long, value_delimiter = ',', required = true)]
    pub tickers: Vec<String>,

    /// Test on log prices
    #[arg(long)]
    pub log_prices: bool,

    /// Significance level for the cointegration decision
    #[arg(long, default_value_t = DEFAULT_SIGNIFICANCE)]
    pub significance: f64,

    /// Maximum augmentation lag (chosen by AIC)
    #[arg(long, default_value_t = DEFAULT_ADF_MAX_LAG)]
    pub max_lag: usize,

    /// Use the two-variable Engle-Granger critical surface instead of plain ADF
    #[arg(long)]
    pub engle_granger_surface: bool,

    /// Also report a rolling hedge ratio over this many periods
    #[arg(long)]
    pub rolling_window: Option<usize>,

    /// Also report a recursively filtered hedge ratio
    #[arg(long, value_enum)]
    pub beta_filter: Option<FilterKind>,

    /// RLS forgetting factor in (0, 1]
    #[arg(long, default_value_t = 0.99)]
    pub forgetting: f64,

    /// Kalman process noise
    #[arg(long, default_value_t = 1e-5)]
    pub kalman_q: f64,

    /// Kalman observation noise as a fraction of Var(ΔY)
    #[arg(long, default_value_t = 1e-2)]
    pub kalman_r_scale: f64,
}

fn beta_filter(args: &CointArgs) -> Option<BetaFilter> {
    args.beta_filter.map(|kind| match kind {
        FilterKind::Rls => BetaFilter::Rls {
            forgetting: args.forgetting,
        },
        FilterKind::Kalman => BetaFilter::Kalman {
            q: args.kalman_q,
            r_scale: args.kalman_r_scale,
        },
    })
}

pub fn run_coint(args: CointArgs, data_path: &str) -> Result<Value, Box<dyn std::error::Error>> {
    let tickers: Vec<String> = args.tickers.iter().map(|t| normalize_ticker(t)).collect();
    let [x, y] = tickers.as_slice() else {
        return Err("exactly two tickers are required, e.g. --tickers GDX,GLD".into());
    };
    if x == y {
        return Err(format!("a pair needs two distinct tickers, got {} twice", x).into());
    }

    let frame = load_prices(data_path)?;
    let pair = align_pair(&frame, x, y)?;
    let transform = if args.log_prices {
        PriceTransform::Log
    } else {
        PriceTransform::Raw
    };
    let (px, py) = pair.transformed(transform);

    let config = CointegrationConfig {
        significance: args.significance,
        lags: LagSelection::Aic {
            max_lag: args.max_lag,
        },
        surface: if args.engle_granger_surface {
            CriticalSurface::EngleGranger
        } else {
            CriticalSurface::Adf
        },
    };
    let filter = beta_filter(&args);
    let result = analyze_pair(&px, &py, &config, args.rolling_window, filter.as_ref())?;
    Ok(serde_json::to_value(result)?)
}
