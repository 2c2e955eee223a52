use crate::error::StatArbError;
use crate::types::{HedgeRatioResult, SpreadSeries};
use crate::StatArbResult;

/// Relative floor under which a window's dispersion counts as zero.
const STD_FLOOR: f64 = 1e-9;

/// `spread[t] = y[t] - beta*x[t] - intercept`.
pub fn compute_spread(x: &[f64], y: &[f64], hedge: &HedgeRatioResult) -> StatArbResult<Vec<f64>> {
    if x.len() != y.len() {
        return Err(StatArbError::invalid(
            "series",
            format!("X has {} observations but Y has {}", x.len(), y.len()),
        ));
    }
    Ok(x.iter()
        .zip(y)
        .map(|(xi, yi)| yi - hedge.beta * xi - hedge.intercept)
        .collect())
}

/// Sliding-window mean and population variance using Welford's add/remove updates.
///
/// A window holding a single repeated value reports exactly zero variance,
/// whatever rounding the remove steps left behind.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    capacity: usize,
    values: std::collections::VecDeque<f64>,
    mean: f64,
    m2: f64,
    /// Length of the trailing run of bit-identical values.
    run: usize,
}

impl RollingWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            values: std::collections::VecDeque::with_capacity(capacity + 1),
            mean: 0.0,
            m2: 0.0,
            run: 0,
        }
    }

    /// Push a value, evicting the oldest once the window is full.
    pub fn push(&mut self, value: f64) {
        self.run = match self.values.back() {
            Some(last) if last.to_bits() == value.to_bits() => self.run + 1,
            _ => 1,
        };
        self.values.push_back(value);
        let n = self.values.len() as f64;
        let delta = value - self.mean;
        self.mean += delta / n;
        self.m2 += delta * (value - self.mean);

        if self.values.len() > self.capacity {
            if let Some(old) = self.values.pop_front() {
                let n = self.values.len() as f64;
                let delta = old - self.mean;
                self.mean -= delta / n;
                self.m2 -= delta * (old - self.mean);
            }
        }
        if self.run >= self.values.len() {
            self.mean = value;
            self.m2 = 0.0;
        } else if self.m2 < 0.0 {
            self.m2 = 0.0;
        }
    }

    pub fn is_full(&self) -> bool {
        self.values.len() == self.capacity
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Population standard deviation (ddof = 0).
    pub fn std(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        (self.m2 / self.values.len() as f64).sqrt()
    }
}

/// Rolling z-score of `spread` over `window` periods.
///
/// The first `window - 1` entries are `None`. A window whose population
/// standard deviation is effectively zero yields `Some(0.0)`.
pub fn rolling_zscore(spread: &[f64], window: usize) -> StatArbResult<Vec<Option<f64>>> {
    if window < 2 {
        return Err(StatArbError::invalid(
            "window",
            format!("z-score window must be >= 2, got {}", window),
        ));
    }
    if spread.iter().any(|s| !s.is_finite()) {
        return Err(StatArbError::invalid("spread", "spread values must be finite"));
    }

    let mut acc = RollingWindow::new(window);
    let z = spread
        .iter()
        .map(|&s| {
            acc.push(s);
            if !acc.is_full() {
                return None;
            }
            let (mean, std) = (acc.mean(), acc.std());
            if std <= STD_FLOOR * (1.0 + mean.abs()) {
                Some(0.0)
            } else {
                Some((s - mean) / std)
            }
        })
        .collect();
    Ok(z)
}

/// Spread plus rolling z-score in one pass.
pub fn spread_series(
    x: &[f64],
    y: &[f64],
    hedge: &HedgeRatioResult,
    window: usize,
) -> StatArbResult<SpreadSeries> {
    let spread = compute_spread(x, y, hedge)?;
    let zscore = rolling_zscore(&spread, window)?;
    Ok(SpreadSeries {
        spread,
        zscore,
        window,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive_zscore(spread: &[f64], window: usize, t: usize) -> f64 {
        let w = &spread[t + 1 - window..=t];
        let m = w.iter().sum::<f64>() / window as f64;
        let sd = (w.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / window as f64).sqrt();
        (spread[t] - m) / sd
    }

    #[test]
    fn test_spread_includes_intercept() {
        let hedge = HedgeRatioResult {
            beta: 2.0,
            intercept: 1.0,
            residual_std: 0.0,
            nobs: 2,
        };
        let s = compute_spread(&[1.0, 2.0], &[4.0, 4.0], &hedge).unwrap();
        assert_eq!(s, vec![1.0, -1.0]);
    }

    #[test]
    fn test_warm_up_is_none() {
        let spread: Vec<f64> = (0..10).map(|i| (i as f64).sin()).collect();
        let z = rolling_zscore(&spread, 4).unwrap();
        assert!(z[..3].iter().all(|v| v.is_none()));
        assert!(z[3..].iter().all(|v| v.is_some()));
    }

    #[test]
    fn test_matches_naive_recomputation() {
        let spread: Vec<f64> = (0..300)
            .map(|i| 1000.0 + (i as f64 * 0.37).sin() * 5.0 + ((i * 13) % 7) as f64)
            .collect();
        let z = rolling_zscore(&spread, 20).unwrap();
        for t in 19..spread.len() {
            let expected = naive_zscore(&spread, 20, t);
            assert!(
                (z[t].unwrap() - expected).abs() < 1e-8,
                "t={} got {:?} expected {}",
                t,
                z[t],
                expected
            );
        }
    }

    #[test]
    fn test_constant_window_gives_zero() {
        let mut spread = vec![3.5; 30];
        spread.extend([4.0, 3.0, 5.0]);
        let z = rolling_zscore(&spread, 10).unwrap();
        for v in &z[9..30] {
            assert_eq!(*v, Some(0.0));
        }
        assert!(z[32].unwrap() > 0.0);
        assert!(z.iter().flatten().all(|v| v.is_finite()));
    }

    #[test]
    fn test_constant_tail_after_volatile_stretch_is_exactly_zero() {
        let mut spread: Vec<f64> = (0..500)
            .map(|i| 1000.0 + ((i * 37) % 101) as f64 * 9.7 - (i as f64 * 0.61).cos() * 250.0)
            .collect();
        spread.extend(std::iter::repeat(5.0).take(200));
        let z = rolling_zscore(&spread, 20).unwrap();
        for v in &z[519..] {
            assert_eq!(*v, Some(0.0));
        }
    }

    #[test]
    fn test_window_too_small() {
        assert!(rolling_zscore(&[1.0, 2.0], 1).is_err());
    }

    #[test]
    fn test_rolling_window_stats() {
        let mut w = RollingWindow::new(3);
        for v in [1.0, 2.0, 3.0, 10.0] {
            w.push(v);
        }
        // window now holds 2, 3, 10
        assert!(w.is_full());
        assert!((w.mean() - 5.0).abs() < 1e-12);
        let var = ((2.0f64 - 5.0).powi(2) + (3.0f64 - 5.0).powi(2) + (10.0f64 - 5.0).powi(2)) / 3.0;
        assert!((w.std() - var.sqrt()).abs() < 1e-12);
    }
}
