//! Recursive estimators for a time-varying hedge ratio.
//!
//! Both track the state `θ[t] = [a[t], b[t]]` of `y[t] = a[t] + b[t]·x[t] + ε[t]`
//! one observation at a time. RLS slopes use data up to `t` only; the Kalman
//! observation noise is scaled from the variance of `Δy` over the whole sample.

use nalgebra::{Matrix2, Vector2};
use serde::{Deserialize, Serialize};

use crate::error::StatArbError;
use crate::StatArbResult;

/// Diffuse prior on the initial state covariance.
const PRIOR_VARIANCE: f64 = 1e6;
/// Observation noise used when the scaled variance of `Δy` is zero.
const FALLBACK_OBS_NOISE: f64 = 1e-3;

/// Which recursive estimator to run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "method")]
pub enum BetaFilter {
    /// Recursive least squares with exponential forgetting `λ ∈ (0, 1]`.
    Rls { forgetting: f64 },
    /// Random-walk state, `Q = q·I`, `R = r_scale·Var(Δy)`.
    Kalman { q: f64, r_scale: f64 },
}

impl Default for BetaFilter {
    fn default() -> Self {
        BetaFilter::Kalman {
            q: 1e-5,
            r_scale: 1e-2,
        }
    }
}

/// Exponentially weighted recursive least squares.
#[derive(Debug, Clone)]
pub struct RlsHedgeRatio {
    theta: Vector2<f64>,
    p: Matrix2<f64>,
    forgetting: f64,
}

impl RlsHedgeRatio {
    pub fn new(forgetting: f64) -> StatArbResult<Self> {
        if !(forgetting > 0.0 && forgetting <= 1.0) {
            return Err(StatArbError::invalid(
                "forgetting",
                format!("forgetting factor must lie in (0, 1], got {}", forgetting),
            ));
        }
        Ok(Self {
            theta: Vector2::zeros(),
            p: Matrix2::identity() * PRIOR_VARIANCE,
            forgetting,
        })
    }

    /// Absorb one observation and return the updated slope.
    pub fn update(&mut self, x: f64, y: f64) -> f64 {
        let phi = Vector2::new(1.0, x);
        let err = y - phi.dot(&self.theta);
        let p_phi = self.p * phi;
        let gain = p_phi / (self.forgetting + phi.dot(&p_phi));
        self.theta += gain * err;
        self.p = (self.p - gain * phi.transpose() * self.p) / self.forgetting;
        self.theta[1]
    }

    pub fn intercept(&self) -> f64 {
        self.theta[0]
    }
}

/// Kalman filter over intercept and slope with a random-walk transition.
#[derive(Debug, Clone)]
pub struct KalmanHedgeRatio {
    theta: Vector2<f64>,
    p: Matrix2<f64>,
    process_noise: Matrix2<f64>,
    obs_noise: f64,
}

impl KalmanHedgeRatio {
    pub fn new(q: f64, obs_noise: f64) -> StatArbResult<Self> {
        if !(q > 0.0) || !q.is_finite() {
            return Err(StatArbError::invalid(
                "q",
                format!("process noise must be positive, got {}", q),
            ));
        }
        if !(obs_noise > 0.0) || !obs_noise.is_finite() {
            return Err(StatArbError::invalid(
                "obs_noise",
                format!("observation noise must be positive, got {}", obs_noise),
            ));
        }
        Ok(Self {
            theta: Vector2::zeros(),
            p: Matrix2::identity() * PRIOR_VARIANCE,
            process_noise: Matrix2::identity() * q,
            obs_noise,
        })
    }

    /// Predict, then correct with `(x, y)`; returns the updated slope.
    pub fn update(&mut self, x: f64, y: f64) -> f64 {
        self.p += self.process_noise;
        let h = Vector2::new(1.0, x);
        let p_h = self.p * h;
        let s = h.dot(&p_h) + self.obs_noise;
        let gain = p_h / s;
        self.theta += gain * (y - h.dot(&self.theta));
        self.p = (Matrix2::identity() - gain * h.transpose()) * self.p;
        self.theta[1]
    }

    pub fn intercept(&self) -> f64 {
        self.theta[0]
    }
}

/// Slope path of the chosen filter run over the whole sample.
pub fn filtered_hedge_ratio(x: &[f64], y: &[f64], filter: &BetaFilter) -> StatArbResult<Vec<f64>> {
    if x.len() != y.len() {
        return Err(StatArbError::invalid(
            "series",
            format!("X has {} observations but Y has {}", x.len(), y.len()),
        ));
    }
    if x.iter().chain(y).any(|v| !v.is_finite()) {
        return Err(StatArbError::invalid("series", "prices must be finite"));
    }

    let pairs = x.iter().zip(y);
    match *filter {
        BetaFilter::Rls { forgetting } => {
            let mut rls = RlsHedgeRatio::new(forgetting)?;
            Ok(pairs.map(|(xi, yi)| rls.update(*xi, *yi)).collect())
        }
        BetaFilter::Kalman { q, r_scale } => {
            if !(r_scale > 0.0) || !r_scale.is_finite() {
                return Err(StatArbError::invalid(
                    "r_scale",
                    format!("observation noise scale must be positive, got {}", r_scale),
                ));
            }
            let mut kf = KalmanHedgeRatio::new(q, observation_noise(y, r_scale))?;
            Ok(pairs.map(|(xi, yi)| kf.update(*xi, *yi)).collect())
        }
    }
}

/// `r_scale` times the population variance of `Δy`.
fn observation_noise(y: &[f64], r_scale: f64) -> f64 {
    let diffs: Vec<f64> = y.windows(2).map(|w| w[1] - w[0]).collect();
    if diffs.is_empty() {
        return FALLBACK_OBS_NOISE;
    }
    let m = diffs.iter().sum::<f64>() / diffs.len() as f64;
    let var = diffs.iter().map(|d| (d - m) * (d - m)).sum::<f64>() / diffs.len() as f64;
    let r = var * r_scale;
    if r > 0.0 {
        r
    } else {
        FALLBACK_OBS_NOISE
    }
}
