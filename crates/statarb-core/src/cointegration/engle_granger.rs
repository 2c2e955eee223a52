use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use super::adf::{adf_test, CriticalSurface, LagSelection};
use crate::config::{DEFAULT_SIGNIFICANCE, MIN_COINTEGRATION_OBS};
use crate::error::StatArbError;
use crate::regression::ols::ols_line;
use crate::regression::{estimate_hedge_ratio, filtered_hedge_ratio, pearson_correlation, BetaFilter};
use crate::types::{with_metadata, CointegrationResult, ComputationOutput, HedgeRatioResult};
use crate::StatArbResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CointegrationConfig {
    /// p-value threshold for `is_cointegrated`.
    pub significance: f64,
    pub lags: LagSelection,
    pub surface: CriticalSurface,
}

impl Default for CointegrationConfig {
    fn default() -> Self {
        Self {
            significance: DEFAULT_SIGNIFICANCE,
            lags: LagSelection::default(),
            surface: CriticalSurface::default(),
        }
    }
}

/// Full-sample diagnostics for a candidate pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CointegrationReport {
    pub hedge: HedgeRatioResult,
    pub cointegration: CointegrationResult,
    pub correlation: f64,
    pub half_life: Option<f64>,
    /// Trailing-window OLS slopes, present when a rolling window was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rolling_hedge_ratio: Option<Vec<Option<f64>>>,
    /// Recursive (RLS or Kalman) slope path, present when a filter was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filtered_hedge_ratio: Option<Vec<f64>>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Unit-root test on regression residuals (or a raw spread).
///
/// Requires at least `MIN_COINTEGRATION_OBS` observations; the residuals are
/// stationary, hence the pair cointegrated, when the p-value falls below the
/// configured significance.
pub fn test_cointegration(
    residuals: &[f64],
    config: &CointegrationConfig,
) -> StatArbResult<CointegrationResult> {
    if residuals.len() < MIN_COINTEGRATION_OBS {
        return Err(StatArbError::insufficient(
            "cointegration test",
            MIN_COINTEGRATION_OBS,
            residuals.len(),
        ));
    }
    if !(config.significance > 0.0 && config.significance < 1.0) {
        return Err(StatArbError::invalid(
            "significance",
            format!("must lie in (0, 1), got {}", config.significance),
        ));
    }

    let adf = adf_test(residuals, config.lags, config.surface)?;
    debug!(
        statistic = adf.statistic,
        p_value = adf.p_value,
        lags = adf.lags_used,
        "unit-root test on spread"
    );

    Ok(CointegrationResult {
        test_statistic: adf.statistic,
        p_value: adf.p_value,
        is_cointegrated: adf.p_value < config.significance,
        significance: config.significance,
        lags_used: adf.lags_used,
        nobs: adf.nobs,
        critical_values: adf.critical_values,
    })
}

/// Engle–Granger two-step: regress Y on X, then test the residuals.
pub fn engle_granger(
    x: &[f64],
    y: &[f64],
    config: &CointegrationConfig,
) -> StatArbResult<(HedgeRatioResult, CointegrationResult)> {
    let hedge = estimate_hedge_ratio(x, y)?;
    let residuals = residuals(x, y, &hedge);
    let coint = test_cointegration(&residuals, config)?;
    Ok((hedge, coint))
}

/// Engle–Granger diagnostics with correlation, half-life and, optionally, a
/// rolling or filtered hedge ratio.
pub fn analyze_pair(
    x: &[f64],
    y: &[f64],
    config: &CointegrationConfig,
    rolling_window: Option<usize>,
    beta_filter: Option<&BetaFilter>,
) -> StatArbResult<ComputationOutput<CointegrationReport>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let (hedge, cointegration) = engle_granger(x, y, config)?;
    let correlation = pearson_correlation(x, y)?;
    let half_life = half_life(&residuals(x, y, &hedge));

    if !cointegration.is_cointegrated {
        warnings.push(format!(
            "Residuals not stationary at {:.0}% (p-value {:.4}); spread may not mean-revert",
            config.significance * 100.0,
            cointegration.p_value
        ));
    }
    if half_life.is_none() {
        warnings.push("No mean reversion detected in AR(1) fit; half-life undefined".into());
    }

    let rolling_hedge_ratio = match rolling_window {
        Some(w) => Some(crate::regression::rolling_hedge_ratio(x, y, w)?),
        None => None,
    };
    let filtered_hedge_ratio = match beta_filter {
        Some(filter) => Some(filtered_hedge_ratio(x, y, filter)?),
        None => None,
    };

    let report = CointegrationReport {
        hedge,
        cointegration,
        correlation,
        half_life,
        rolling_hedge_ratio,
        filtered_hedge_ratio,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Engle-Granger cointegration (OLS + augmented Dickey-Fuller, MacKinnon p-values)",
        &serde_json::json!({
            "nobs": x.len(),
            "significance": config.significance,
            "lags": config.lags,
            "surface": config.surface,
            "rolling_window": rolling_window,
            "beta_filter": beta_filter,
        }),
        warnings,
        elapsed,
        report,
    ))
}

/// `y - beta*x - intercept`.
pub fn residuals(x: &[f64], y: &[f64], hedge: &HedgeRatioResult) -> Vec<f64> {
    x.iter()
        .zip(y)
        .map(|(xi, yi)| yi - hedge.beta * xi - hedge.intercept)
        .collect()
}

/// Mean-reversion half-life in periods from `Δs[t] = c + φ·s[t-1]`.
///
/// `None` when `φ >= 0` (no reversion) or fewer than three observations.
pub fn half_life(spread: &[f64]) -> Option<f64> {
    if spread.len() < 3 {
        return None;
    }
    let lagged = &spread[..spread.len() - 1];
    let diffs: Vec<f64> = spread.windows(2).map(|w| w[1] - w[0]).collect();
    let (phi, _) = ols_line(lagged, &diffs)?;
    if phi >= 0.0 {
        return None;
    }
    Some(-std::f64::consts::LN_2 / phi)
}

/// Engle–Granger p-value over each strictly-past window `[t-window, t)`.
///
/// Entries are `None` before `window` observations exist and where the
/// window is degenerate or too short for the test.
pub fn rolling_cointegration_pvalues(
    x: &[f64],
    y: &[f64],
    window: usize,
    config: &CointegrationConfig,
) -> StatArbResult<Vec<Option<f64>>> {
    if x.len() != y.len() {
        return Err(StatArbError::invalid(
            "series",
            format!("X has {} observations but Y has {}", x.len(), y.len()),
        ));
    }
    if window < MIN_COINTEGRATION_OBS {
        return Err(StatArbError::invalid(
            "gate_window",
            format!(
                "rolling cointegration window must be >= {}, got {}",
                MIN_COINTEGRATION_OBS, window
            ),
        ));
    }

    let n = x.len();
    let mut out = vec![None; n];
    for (t, slot) in out.iter_mut().enumerate().skip(window) {
        let (xs, ys) = (&x[t - window..t], &y[t - window..t]);
        *slot = engle_granger(xs, ys, config).ok().map(|(_, c)| c.p_value);
    }
    Ok(out)
}
