use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::StatArbError;
use crate::types::HedgeRatioResult;
use crate::StatArbResult;

/// Relative variance floor below which a regressor is treated as constant.
const VARIANCE_FLOOR: f64 = 1e-20;

// ---------------------------------------------------------------------------
// Hedge ratio
// ---------------------------------------------------------------------------

/// Fit `y ≈ beta * x + intercept` by ordinary least squares over the full sample.
///
/// beta = cov(x, y) / var(x), intercept = mean(y) - beta * mean(x). The residual
/// dispersion is the population standard deviation of `y - beta*x - intercept`.
pub fn estimate_hedge_ratio(x: &[f64], y: &[f64]) -> StatArbResult<HedgeRatioResult> {
    check_paired(x, y)?;
    let n = x.len();
    if n < 2 {
        return Err(StatArbError::insufficient("hedge ratio regression", 2, n));
    }

    let (beta, intercept) = ols_line(x, y).ok_or_else(|| {
        StatArbError::degenerate("hedge ratio regression: X has zero variance")
    })?;

    let ss_resid: f64 = x
        .iter()
        .zip(y)
        .map(|(xi, yi)| {
            let e = yi - beta * xi - intercept;
            e * e
        })
        .sum();

    Ok(HedgeRatioResult {
        beta,
        intercept,
        residual_std: (ss_resid / n as f64).sqrt(),
        nobs: n,
    })
}

/// OLS slope over each trailing window `[t-window+1, t]`.
///
/// `None` during warm-up and wherever X is constant inside the window.
pub fn rolling_hedge_ratio(x: &[f64], y: &[f64], window: usize) -> StatArbResult<Vec<Option<f64>>> {
    check_paired(x, y)?;
    if window < 2 {
        return Err(StatArbError::invalid(
            "window",
            format!("rolling hedge window must be >= 2, got {}", window),
        ));
    }
    let n = x.len();
    let mut out = vec![None; n];
    for t in window.saturating_sub(1)..n {
        let start = t + 1 - window;
        out[t] = ols_line(&x[start..=t], &y[start..=t]).map(|(beta, _)| beta);
    }
    Ok(out)
}

/// Pearson correlation coefficient between two series.
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> StatArbResult<f64> {
    check_paired(x, y)?;
    let n = x.len();
    if n < 2 {
        return Err(StatArbError::insufficient("correlation", 2, n));
    }
    let mean_x = mean(x);
    let mean_y = mean(y);

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let nf = n as f64;
    if is_constant(var_x / nf, mean_x) || is_constant(var_y / nf, mean_y) {
        return Err(StatArbError::degenerate("correlation: zero variance"));
    }
    Ok(cov / (var_x.sqrt() * var_y.sqrt()))
}

// ---------------------------------------------------------------------------
// General least squares
// ---------------------------------------------------------------------------

/// Coefficients and classical standard errors of a multi-regressor OLS fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeastSquaresFit {
    pub params: Vec<f64>,
    pub std_errors: Vec<f64>,
    /// Sum of squared residuals.
    pub ssr: f64,
    pub nobs: usize,
}

impl LeastSquaresFit {
    /// Gaussian log-likelihood at the fitted parameters.
    pub fn log_likelihood(&self) -> f64 {
        let n = self.nobs as f64;
        -n / 2.0 * ((2.0 * std::f64::consts::PI).ln() + (self.ssr / n).ln() + 1.0)
    }

    pub fn aic(&self) -> f64 {
        -2.0 * self.log_likelihood() + 2.0 * self.params.len() as f64
    }
}

/// Solve `y = X b + e` through the normal equations.
pub fn least_squares(design: &DMatrix<f64>, y: &DVector<f64>) -> StatArbResult<LeastSquaresFit> {
    let (n, k) = design.shape();
    if y.len() != n {
        return Err(StatArbError::invalid(
            "design",
            format!("design has {} rows but response has {}", n, y.len()),
        ));
    }
    if n <= k {
        return Err(StatArbError::insufficient("least squares", k + 1, n));
    }

    let xt = design.transpose();
    let xtx_inv = (&xt * design).try_inverse().ok_or_else(|| {
        StatArbError::NumericalFailure("singular design matrix in least squares".into())
    })?;
    let params = &xtx_inv * (&xt * y);
    let resid = y - design * &params;
    let ssr = resid.dot(&resid);
    let sigma2 = ssr / (n - k) as f64;

    let std_errors = (0..k)
        .map(|i| (sigma2 * xtx_inv[(i, i)]).max(0.0).sqrt())
        .collect();

    Ok(LeastSquaresFit {
        params: params.iter().copied().collect(),
        std_errors,
        ssr,
        nobs: n,
    })
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn check_paired(x: &[f64], y: &[f64]) -> StatArbResult<()> {
    if x.len() != y.len() {
        return Err(StatArbError::invalid(
            "series",
            format!("X has {} observations but Y has {}: must be equal", x.len(), y.len()),
        ));
    }
    if x.iter().chain(y).any(|v| !v.is_finite()) {
        return Err(StatArbError::invalid("series", "observations must be finite"));
    }
    Ok(())
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn is_constant(variance: f64, mean: f64) -> bool {
    variance <= VARIANCE_FLOOR * (1.0 + mean * mean)
}

/// (slope, intercept), or `None` when x has no variance.
pub(crate) fn ols_line(x: &[f64], y: &[f64]) -> Option<(f64, f64)> {
    let mean_x = mean(x);
    let mean_y = mean(y);
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        sxy += dx * (yi - mean_y);
        sxx += dx * dx;
    }
    if is_constant(sxx / x.len() as f64, mean_x) {
        return None;
    }
    let beta = sxy / sxx;
    Some((beta, mean_y - beta * mean_x))
}
