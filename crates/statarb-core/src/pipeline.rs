//! End-to-end backtest of one pair: hedge ratio, cointegration, spread,
//! signal, simulation and metrics.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

use crate::backtest::{simulate, ReturnKind, SimulationConfig};
use crate::cointegration::{
    half_life, residuals, test_cointegration, CointegrationConfig, CointegrationGate,
    CointegrationPolicy,
};
use crate::config::{
    DEFAULT_ENTRY_Z, DEFAULT_EXIT_Z, DEFAULT_NOTIONAL, DEFAULT_WINDOW, MAX_ENTRY_Z, MAX_WINDOW,
    MIN_WINDOW, PERIODS_PER_YEAR,
};
use crate::error::StatArbError;
use crate::regression::estimate_hedge_ratio;
use crate::signal::{generate_positions, spread_series, SignalConfig};
use crate::types::{
    normalize_ticker, with_metadata, CointegrationResult, ComputationOutput, Metrics, PairTrade,
    Position, PricePair, PriceTransform,
};
use crate::StatArbResult;

// ---------------------------------------------------------------------------
// Request / report
// ---------------------------------------------------------------------------

/// Which observations the hedge ratio is fitted on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum HedgeSample {
    #[default]
    FullSample,
    /// Fit on the first `periods` observations and apply the fixed β throughout.
    Training { periods: usize },
}

/// Parameters of a single backtest run. Missing fields take engine defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestRequest {
    /// `[x, y]`: Y is regressed on X.
    pub tickers: [String; 2],
    pub window: usize,
    pub entry_z: f64,
    pub exit_z: f64,
    pub notional: f64,
    pub cost_bps: f64,
    pub price_transform: PriceTransform,
    pub return_kind: ReturnKind,
    pub hedge_sample: HedgeSample,
    pub cointegration: CointegrationConfig,
    pub gate: CointegrationGate,
    pub policy: CointegrationPolicy,
    /// Close any position held this many periods, whatever the z-score.
    pub max_holding_periods: Option<usize>,
}

impl Default for BacktestRequest {
    fn default() -> Self {
        Self {
            tickers: [String::new(), String::new()],
            window: DEFAULT_WINDOW,
            entry_z: DEFAULT_ENTRY_Z,
            exit_z: DEFAULT_EXIT_Z,
            notional: DEFAULT_NOTIONAL,
            cost_bps: 0.0,
            price_transform: PriceTransform::default(),
            return_kind: ReturnKind::default(),
            hedge_sample: HedgeSample::default(),
            cointegration: CointegrationConfig::default(),
            gate: CointegrationGate::default(),
            policy: CointegrationPolicy::default(),
            max_holding_periods: None,
        }
    }
}

impl BacktestRequest {
    pub fn new(x: impl Into<String>, y: impl Into<String>) -> Self {
        Self {
            tickers: [x.into(), y.into()],
            ..Self::default()
        }
    }

    /// Tickers in the canonical form used for validation and reporting.
    pub fn normalized_tickers(&self) -> [String; 2] {
        [normalize_ticker(&self.tickers[0]), normalize_ticker(&self.tickers[1])]
    }
}

/// Per-period series and summary of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    /// Normalized `[x, y]` symbols.
    pub tickers: [String; 2],
    pub dates: Vec<NaiveDate>,
    pub price_y: Vec<f64>,
    pub price_x: Vec<f64>,
    pub spread: Vec<f64>,
    /// `null` during warm-up.
    pub zscore: Vec<Option<f64>>,
    pub position: Vec<Position>,
    pub cost: Vec<f64>,
    pub pnl: Vec<f64>,
    pub pnl_notional: Vec<f64>,
    pub equity: Vec<f64>,
    pub metrics: Metrics,
    pub hedge_ratio: f64,
    pub intercept: f64,
    pub residual_std: f64,
    /// `None` when the test could not be run on this sample.
    pub cointegration: Option<CointegrationResult>,
    pub half_life: Option<f64>,
    pub trades: Vec<PairTrade>,
    pub ruined_at: Option<usize>,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Reject parameter sets the engine cannot run. `nobs` is the aligned sample size.
pub fn validate_request(request: &BacktestRequest, nobs: usize) -> StatArbResult<()> {
    let [x, y] = request.normalized_tickers();
    if x.is_empty() || y.is_empty() {
        return Err(StatArbError::invalid("tickers", "two ticker symbols are required"));
    }
    if x == y {
        return Err(StatArbError::invalid(
            "tickers",
            format!("a pair needs two distinct tickers, got {} twice", x),
        ));
    }
    if request.window < MIN_WINDOW || request.window > MAX_WINDOW {
        return Err(StatArbError::invalid(
            "window",
            format!(
                "must lie in [{}, {}], got {}",
                MIN_WINDOW, MAX_WINDOW, request.window
            ),
        ));
    }
    if !request.entry_z.is_finite() || request.entry_z <= 0.0 || request.entry_z > MAX_ENTRY_Z {
        return Err(StatArbError::invalid(
            "entry_z",
            format!("must lie in (0, {}], got {}", MAX_ENTRY_Z, request.entry_z),
        ));
    }
    if !request.exit_z.is_finite() || request.exit_z < 0.0 || request.exit_z >= request.entry_z {
        return Err(StatArbError::invalid(
            "exit_z",
            format!(
                "must satisfy 0 <= exit_z < entry_z ({}), got {}",
                request.entry_z, request.exit_z
            ),
        ));
    }
    if !request.notional.is_finite() || request.notional <= 0.0 {
        return Err(StatArbError::invalid(
            "notional",
            format!("must be positive, got {}", request.notional),
        ));
    }
    if !request.cost_bps.is_finite() || request.cost_bps < 0.0 {
        return Err(StatArbError::invalid(
            "cost_bps",
            format!("must be non-negative, got {}", request.cost_bps),
        ));
    }
    if request.max_holding_periods == Some(0) {
        return Err(StatArbError::invalid(
            "max_holding_periods",
            "must be at least 1 period when set",
        ));
    }
    request.gate.validate()?;
    if let HedgeSample::Training { periods } = request.hedge_sample {
        if periods < 2 || periods > nobs {
            return Err(StatArbError::invalid(
                "hedge_sample.periods",
                format!("must lie in [2, {}], got {}", nobs, periods),
            ));
        }
    }
    if nobs < request.window + 1 {
        return Err(StatArbError::insufficient("backtest", request.window + 1, nobs));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Run the full backtest for an aligned price pair.
///
/// The full-sample cointegration test is informational unless the request's
/// policy is `Require`, in which case a pair that fails it is never traded.
pub fn run_backtest(
    request: &BacktestRequest,
    pair: &PricePair,
) -> StatArbResult<ComputationOutput<BacktestReport>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let n = pair.len();
    validate_request(request, n)?;
    let mut signal = SignalConfig::new(request.entry_z, request.exit_z)?;
    if let Some(limit) = request.max_holding_periods {
        signal = signal.with_max_holding(limit)?;
    }
    let tickers = request.normalized_tickers();

    let (x, y) = pair.transformed(request.price_transform);

    // --- Hedge ratio ---
    let fit_len = match request.hedge_sample {
        HedgeSample::FullSample => n,
        HedgeSample::Training { periods } => periods,
    };
    let hedge = estimate_hedge_ratio(&x[..fit_len], &y[..fit_len])?;
    debug!(
        beta = hedge.beta,
        intercept = hedge.intercept,
        nobs = hedge.nobs,
        "hedge ratio estimated"
    );

    // --- Cointegration (on the estimation sample) ---
    let fit_residuals = residuals(&x[..fit_len], &y[..fit_len], &hedge);
    let cointegration = match test_cointegration(&fit_residuals, &request.cointegration) {
        Ok(c) => Some(c),
        Err(e @ StatArbError::InvalidParameter { .. }) => return Err(e),
        Err(e) => {
            warn!(error = %e, "cointegration test skipped");
            warnings.push(format!("Cointegration test not available: {}", e));
            None
        }
    };
    if fit_len < 3 * request.window {
        warnings.push(format!(
            "Cointegration test uses {} observations; at least {} (3x window) recommended",
            fit_len,
            3 * request.window
        ));
    }
    if let Some(c) = &cointegration {
        if !c.is_cointegrated {
            warn!(p_value = c.p_value, significance = c.significance, "pair not cointegrated");
            warnings.push(format!(
                "Pair not cointegrated at {:.0}% (p-value {:.4})",
                c.significance * 100.0,
                c.p_value
            ));
        }
    }

    // --- Spread and signal ---
    let spread = spread_series(&x, &y, &hedge, request.window)?;
    let half_life = half_life(&spread.spread);

    let blocked = request.policy == CointegrationPolicy::Require
        && !cointegration.as_ref().is_some_and(|c| c.is_cointegrated);
    let positions = if blocked {
        warnings.push("Cointegration required but not established; all positions flat".into());
        vec![Position::Flat; n]
    } else {
        let mask = request.gate.entry_mask(&x, &y, &request.cointegration)?;
        generate_positions(&spread.zscore, &signal, mask.as_deref())?
    };

    // --- Simulation ---
    let sim = SimulationConfig {
        beta: hedge.beta,
        cost_bps: request.cost_bps,
        notional: request.notional,
        returns: request.return_kind,
        periods_per_year: PERIODS_PER_YEAR,
    };
    let result = simulate(pair, spread, positions, &sim)?;

    if let Some(t) = result.ruined_at {
        warnings.push(format!(
            "Equity wiped out on {} (period {}); equity held at zero afterwards",
            pair.dates[t], t
        ));
    }
    if result.metrics.turnover == 0 {
        warnings.push("No trades were generated".into());
    }
    debug!(
        sharpe = result.metrics.sharpe,
        total_return = result.metrics.total_return,
        transitions = result.metrics.turnover,
        trades = result.trades.len(),
        "backtest complete"
    );

    let report = BacktestReport {
        tickers: tickers.clone(),
        dates: pair.dates.clone(),
        price_y: pair.price_y.clone(),
        price_x: pair.price_x.clone(),
        spread: result.spread.spread,
        zscore: result.spread.zscore,
        position: result.positions,
        cost: result.cost,
        pnl: result.pnl,
        pnl_notional: result.pnl_notional,
        equity: result.equity,
        metrics: result.metrics,
        hedge_ratio: hedge.beta,
        intercept: hedge.intercept,
        residual_std: hedge.residual_std,
        cointegration,
        half_life,
        trades: result.trades,
        ruined_at: result.ruined_at,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Pairs trading: OLS hedge ratio, Engle-Granger cointegration, rolling z-score with entry/exit hysteresis, lagged-position simulation",
        &serde_json::json!({
            "tickers": tickers,
            "window": request.window,
            "entry_z": request.entry_z,
            "exit_z": request.exit_z,
            "notional": request.notional,
            "cost_bps": request.cost_bps,
            "price_transform": request.price_transform,
            "return_kind": request.return_kind,
            "hedge_sample": request.hedge_sample,
            "gate": request.gate,
            "policy": request.policy,
            "max_holding_periods": request.max_holding_periods,
            "spread": "y - beta*x - intercept",
            "zscore_std": "population",
            "sharpe_std": "sample",
            "periods_per_year": PERIODS_PER_YEAR,
        }),
        warnings,
        elapsed,
        report,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> BacktestRequest {
        BacktestRequest::new("AAA", "BBB")
    }

    fn field_of(err: StatArbError) -> String {
        match err {
            StatArbError::InvalidParameter { field, .. } => field,
            other => panic!("expected InvalidParameter, got {:?}", other),
        }
    }

    #[test]
    fn test_default_request_is_valid() {
        assert!(validate_request(&request(), 500).is_ok());
    }

    #[test]
    fn test_identical_tickers_rejected() {
        let r = BacktestRequest::new("AAA", "AAA");
        assert_eq!(field_of(validate_request(&r, 500).unwrap_err()), "tickers");
        let r = BacktestRequest::new("gld", " GLD");
        assert_eq!(field_of(validate_request(&r, 500).unwrap_err()), "tickers");
        let r = BacktestRequest::new(" ", "GLD");
        assert_eq!(field_of(validate_request(&r, 500).unwrap_err()), "tickers");
    }

    #[test]
    fn test_tickers_normalized() {
        let r = BacktestRequest::new(" gdx", "Gld ");
        assert_eq!(r.normalized_tickers(), ["GDX".to_string(), "GLD".to_string()]);
    }

    #[test]
    fn test_zero_time_stop_rejected() {
        let r = BacktestRequest {
            max_holding_periods: Some(0),
            ..request()
        };
        assert_eq!(
            field_of(validate_request(&r, 500).unwrap_err()),
            "max_holding_periods"
        );
        let r = BacktestRequest {
            max_holding_periods: Some(5),
            ..request()
        };
        assert!(validate_request(&r, 500).is_ok());
    }

    #[test]
    fn test_window_bounds() {
        for w in [MIN_WINDOW - 1, MAX_WINDOW + 1] {
            let r = BacktestRequest {
                window: w,
                ..request()
            };
            assert_eq!(field_of(validate_request(&r, 500).unwrap_err()), "window");
        }
    }

    #[test]
    fn test_threshold_rules() {
        let cases = [
            (0.0, 0.0, "entry_z"),
            (MAX_ENTRY_Z + 0.1, 0.5, "entry_z"),
            (f64::NAN, 0.5, "entry_z"),
            (2.0, 2.0, "exit_z"),
            (2.0, -0.1, "exit_z"),
        ];
        for (entry_z, exit_z, field) in cases {
            let r = BacktestRequest {
                entry_z,
                exit_z,
                ..request()
            };
            assert_eq!(field_of(validate_request(&r, 500).unwrap_err()), field);
        }
    }

    #[test]
    fn test_entry_below_recommended_floor_accepted() {
        let r = BacktestRequest {
            entry_z: crate::config::RECOMMENDED_MIN_ENTRY_Z / 2.0,
            exit_z: 0.0,
            ..request()
        };
        assert!(validate_request(&r, 500).is_ok());
    }

    #[test]
    fn test_money_rules() {
        let r = BacktestRequest {
            notional: 0.0,
            ..request()
        };
        assert_eq!(field_of(validate_request(&r, 500).unwrap_err()), "notional");
        let r = BacktestRequest {
            cost_bps: -1.0,
            ..request()
        };
        assert_eq!(field_of(validate_request(&r, 500).unwrap_err()), "cost_bps");
    }

    #[test]
    fn test_too_few_observations() {
        let err = validate_request(&request(), DEFAULT_WINDOW).unwrap_err();
        assert!(matches!(err, StatArbError::InsufficientData { required: 61, actual: 60, .. }));
        assert!(validate_request(&request(), DEFAULT_WINDOW + 1).is_ok());
    }

    #[test]
    fn test_training_sample_bounds() {
        let r = BacktestRequest {
            hedge_sample: HedgeSample::Training { periods: 600 },
            ..request()
        };
        assert_eq!(
            field_of(validate_request(&r, 500).unwrap_err()),
            "hedge_sample.periods"
        );
    }

    #[test]
    fn test_request_defaults_from_partial_json() {
        let r: BacktestRequest =
            serde_json::from_str(r#"{"tickers":["GLD","GDX"],"window":30}"#).unwrap();
        assert_eq!(r.window, 30);
        assert_eq!(r.entry_z, DEFAULT_ENTRY_Z);
        assert_eq!(r.exit_z, DEFAULT_EXIT_Z);
        assert_eq!(r.notional, DEFAULT_NOTIONAL);
        assert_eq!(r.gate, CointegrationGate::Off);
    }
}
