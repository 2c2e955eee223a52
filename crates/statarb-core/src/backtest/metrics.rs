use crate::types::{Metrics, Position};

/// Summary statistics of a simulated run.
///
/// `price_x_last`/`price_y_last` are the raw closing prices of the final period.
pub fn compute_metrics(
    pnl: &[f64],
    equity: &[f64],
    positions: &[Position],
    price_x_last: f64,
    price_y_last: f64,
    beta: f64,
    periods_per_year: f64,
) -> Metrics {
    Metrics {
        sharpe: sharpe_ratio(pnl, periods_per_year),
        total_return: total_return(equity),
        max_drawdown: max_drawdown(equity),
        hit_rate: hit_rate(pnl),
        turnover: turnover(positions),
        estimated_capital: price_y_last + beta.abs() * price_x_last,
    }
}

/// Annualized Sharpe with zero risk-free rate and sample standard deviation.
/// Zero when fewer than two periods or no dispersion.
pub fn sharpe_ratio(returns: &[f64], periods_per_year: f64) -> f64 {
    let n = returns.len();
    if n < 2 {
        return 0.0;
    }
    let mean = returns.iter().sum::<f64>() / n as f64;
    let var = returns.iter().map(|r| (r - mean) * (r - mean)).sum::<f64>() / (n - 1) as f64;
    let std = var.sqrt();
    if std == 0.0 || !std.is_finite() {
        return 0.0;
    }
    mean / std * periods_per_year.sqrt()
}

pub fn total_return(equity: &[f64]) -> f64 {
    match (equity.first(), equity.last()) {
        (Some(&first), Some(&last)) if first > 0.0 => last / first - 1.0,
        (Some(_), Some(_)) => -1.0,
        _ => 0.0,
    }
}

/// Worst peak-to-trough decline, as a non-positive fraction.
pub fn max_drawdown(equity: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for &e in equity {
        if e > peak {
            peak = e;
        }
        if peak > 0.0 {
            worst = worst.min(e / peak - 1.0);
        }
    }
    worst
}

/// Fraction of non-zero periods that were profitable.
pub fn hit_rate(returns: &[f64]) -> f64 {
    let active = returns.iter().filter(|r| **r != 0.0).count();
    if active == 0 {
        return 0.0;
    }
    let wins = returns.iter().filter(|r| **r > 0.0).count();
    wins as f64 / active as f64
}

/// Number of position changes.
pub fn turnover(positions: &[Position]) -> usize {
    positions.windows(2).filter(|w| w[0] != w[1]).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sharpe_all_zeros() {
        assert_eq!(sharpe_ratio(&[0.0; 30], 252.0), 0.0);
        assert_eq!(sharpe_ratio(&[0.01], 252.0), 0.0);
    }

    #[test]
    fn test_sharpe_known_value() {
        let r = [0.01, -0.01, 0.02, 0.0];
        // mean 0.005, sample variance 0.0005 / 3
        let expected = 0.005 / (0.0005f64 / 3.0).sqrt() * 252f64.sqrt();
        assert!((sharpe_ratio(&r, 252.0) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_max_drawdown_no_loss() {
        assert_eq!(max_drawdown(&[1.0, 1.01, 1.03, 1.03, 1.04]), 0.0);
    }

    #[test]
    fn test_max_drawdown_with_loss() {
        let dd = max_drawdown(&[1.0, 1.1, 0.88, 0.924]);
        assert!((dd - (-0.2)).abs() < 1e-12);
    }

    #[test]
    fn test_max_drawdown_after_ruin() {
        assert_eq!(max_drawdown(&[1.0, 1.2, 0.0, 0.0]), -1.0);
    }

    #[test]
    fn test_hit_rate() {
        assert_eq!(hit_rate(&[0.0, 0.0]), 0.0);
        assert_eq!(hit_rate(&[0.0, 0.1, -0.1, 0.2, 0.0]), 2.0 / 3.0);
    }

    #[test]
    fn test_turnover_counts_changes() {
        use Position::*;
        assert_eq!(turnover(&[Flat, LongSpread, LongSpread, Flat, ShortSpread]), 3);
        assert_eq!(turnover(&[]), 0);
    }

    #[test]
    fn test_total_return_and_capital() {
        let m = compute_metrics(
            &[0.0, 0.1],
            &[1.0, 1.1],
            &[Position::Flat, Position::Flat],
            50.0,
            120.0,
            -2.0,
            252.0,
        );
        assert!((m.total_return - 0.1).abs() < 1e-12);
        assert_eq!(m.estimated_capital, 220.0);
        assert_eq!(m.turnover, 0);
    }
}
