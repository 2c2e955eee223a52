use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use statrs::function::erf::erfc;

use crate::error::StatArbError;
use crate::regression::{least_squares, LeastSquaresFit};
use crate::types::CriticalValues;
use crate::StatArbResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// How many lagged differences enter the augmented regression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "method")]
pub enum LagSelection {
    Fixed { lags: usize },
    /// Lowest AIC over `0..=max_lag`, compared on a common sample.
    Aic { max_lag: usize },
}

impl Default for LagSelection {
    fn default() -> Self {
        LagSelection::Aic {
            max_lag: crate::config::DEFAULT_ADF_MAX_LAG,
        }
    }
}

impl LagSelection {
    fn max_lag(&self) -> usize {
        match *self {
            LagSelection::Fixed { lags } => lags,
            LagSelection::Aic { max_lag } => max_lag,
        }
    }
}

/// Which MacKinnon response surface maps the statistic to a p-value.
///
/// `Adf` is the single-series surface (residuals treated as observed data);
/// `EngleGranger` accounts for the residuals coming from an estimated
/// two-variable cointegrating regression and is more conservative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriticalSurface {
    #[default]
    Adf,
    EngleGranger,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdfResult {
    pub statistic: f64,
    pub p_value: f64,
    pub lags_used: usize,
    pub nobs: usize,
    pub critical_values: CriticalValues,
}

// ---------------------------------------------------------------------------
// MacKinnon tables (constant, no trend)
// ---------------------------------------------------------------------------

struct Surface {
    tau_min: f64,
    tau_max: f64,
    tau_star: f64,
    small_p: [f64; 3],
    large_p: [f64; 4],
    /// Finite-sample critical value polynomials in 1/nobs for 1%, 5%, 10%.
    crit: [[f64; 4]; 3],
}

// MacKinnon (1994) p-value surfaces and MacKinnon (2010) critical values.
const SURFACE_N1: Surface = Surface {
    tau_min: -18.83,
    tau_max: 2.74,
    tau_star: -1.61,
    small_p: [2.1659, 1.4412, 0.038269],
    large_p: [1.7339, 0.93202, -0.12745, -0.010368],
    crit: [
        [-3.43035, -6.5393, -16.786, -79.433],
        [-2.86154, -2.8903, -4.234, -40.040],
        [-2.56677, -1.5384, -2.809, 0.0],
    ],
};

const SURFACE_N2: Surface = Surface {
    tau_min: -18.86,
    tau_max: 0.92,
    tau_star: -2.62,
    small_p: [2.92, 1.5012, 0.039796],
    large_p: [2.1945, 0.64695, -0.29198, -0.042377],
    crit: [
        [-3.89644, -10.9519, -33.527, 0.0],
        [-3.33613, -6.1101, -6.823, 0.0],
        [-3.04445, -4.2412, -2.720, 0.0],
    ],
};

impl CriticalSurface {
    fn table(&self) -> &'static Surface {
        match self {
            CriticalSurface::Adf => &SURFACE_N1,
            CriticalSurface::EngleGranger => &SURFACE_N2,
        }
    }
}

/// Approximate asymptotic p-value of a unit-root t-statistic.
pub fn mackinnon_p_value(statistic: f64, surface: CriticalSurface) -> f64 {
    let s = surface.table();
    if statistic.is_nan() {
        return 1.0;
    }
    if statistic > s.tau_max {
        return 1.0;
    }
    if statistic < s.tau_min {
        return 0.0;
    }
    let z = if statistic <= s.tau_star {
        polyval(&s.small_p, statistic)
    } else {
        polyval(&s.large_p, statistic)
    };
    standard_normal_cdf(z)
}

/// Finite-sample 1%, 5% and 10% critical values.
pub fn mackinnon_critical_values(nobs: usize, surface: CriticalSurface) -> CriticalValues {
    let inv = 1.0 / nobs.max(1) as f64;
    let cv = |c: &[f64; 4]| c[0] + c[1] * inv + c[2] * inv * inv + c[3] * inv * inv * inv;
    let s = surface.table();
    CriticalValues {
        one_pct: cv(&s.crit[0]),
        five_pct: cv(&s.crit[1]),
        ten_pct: cv(&s.crit[2]),
    }
}

fn polyval(coefs: &[f64], x: f64) -> f64 {
    coefs.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

fn standard_normal_cdf(z: f64) -> f64 {
    0.5 * erfc(-z / std::f64::consts::SQRT_2)
}

// ---------------------------------------------------------------------------
// Test
// ---------------------------------------------------------------------------

/// Augmented Dickey–Fuller test with a constant:
/// `Δe[t] = α + γ·e[t-1] + Σ φ_i·Δe[t-i] + ε`, statistic `γ / se(γ)`.
pub fn adf_test(
    series: &[f64],
    lags: LagSelection,
    surface: CriticalSurface,
) -> StatArbResult<AdfResult> {
    let max_lag = lags.max_lag();
    let required = max_lag.saturating_mul(2).saturating_add(4);
    if series.len() < required {
        return Err(StatArbError::insufficient("unit-root test", required, series.len()));
    }
    if series.iter().any(|v| !v.is_finite()) {
        return Err(StatArbError::invalid("series", "unit-root input must be finite"));
    }
    let mean = series.iter().sum::<f64>() / series.len() as f64;
    let var = series.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / series.len() as f64;
    if var <= 1e-20 * (1.0 + mean * mean) {
        return Err(StatArbError::degenerate("unit-root test: series is constant"));
    }

    let diffs: Vec<f64> = series.windows(2).map(|w| w[1] - w[0]).collect();

    let lags_used = match lags {
        LagSelection::Fixed { lags } => lags,
        LagSelection::Aic { max_lag } => {
            let mut best = (f64::INFINITY, 0);
            for p in 0..=max_lag {
                let fit = fit_augmented(series, &diffs, p, max_lag)?;
                let aic = fit.aic();
                if aic < best.0 {
                    best = (aic, p);
                }
            }
            best.1
        }
    };

    let fit = fit_augmented(series, &diffs, lags_used, lags_used)?;
    let (gamma, se) = (fit.params[1], fit.std_errors[1]);
    if !(se > 0.0) || !se.is_finite() {
        return Err(StatArbError::degenerate("unit-root test: perfect fit"));
    }
    let statistic = gamma / se;

    Ok(AdfResult {
        statistic,
        p_value: mackinnon_p_value(statistic, surface),
        lags_used,
        nobs: fit.nobs,
        critical_values: mackinnon_critical_values(fit.nobs, surface),
    })
}

/// Regress `Δe[t]` on `[1, e[t-1], Δe[t-1..=t-lags]]` using rows `start..` of the
/// difference series, where `start >= lags` fixes the estimation sample.
fn fit_augmented(
    levels: &[f64],
    diffs: &[f64],
    lags: usize,
    start: usize,
) -> StatArbResult<LeastSquaresFit> {
    let rows = diffs.len() - start;
    let design = DMatrix::from_fn(rows, lags + 2, |r, c| {
        let t = start + r;
        match c {
            0 => 1.0,
            1 => levels[t],
            k => diffs[t - (k - 1)],
        }
    });
    let response = DVector::from_fn(rows, |r, _| diffs[start + r]);
    least_squares(&design, &response)
}
