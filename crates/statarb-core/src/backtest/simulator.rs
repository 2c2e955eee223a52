use serde::{Deserialize, Serialize};
use tracing::warn;

use super::metrics::compute_metrics;
use crate::config::PERIODS_PER_YEAR;
use crate::error::StatArbError;
use crate::types::{BacktestResult, PairTrade, Position, PricePair, SpreadSeries};
use crate::StatArbResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Per-period return convention for the two legs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnKind {
    #[default]
    Simple,
    Log,
}

impl ReturnKind {
    /// Period returns with `r[0] = 0`.
    pub fn returns(&self, prices: &[f64]) -> Vec<f64> {
        let mut out = Vec::with_capacity(prices.len());
        if !prices.is_empty() {
            out.push(0.0);
        }
        out.extend(prices.windows(2).map(|w| match self {
            ReturnKind::Simple => w[1] / w[0] - 1.0,
            ReturnKind::Log => (w[1] / w[0]).ln(),
        }));
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub beta: f64,
    /// Transaction cost per leg, in basis points of traded notional.
    pub cost_bps: f64,
    /// Monetary scale applied to `pnl_notional`.
    pub notional: f64,
    pub returns: ReturnKind,
    pub periods_per_year: f64,
}

impl SimulationConfig {
    pub fn new(beta: f64) -> Self {
        Self {
            beta,
            cost_bps: 0.0,
            notional: 1.0,
            returns: ReturnKind::default(),
            periods_per_year: PERIODS_PER_YEAR,
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Simulate trading a position sequence.
///
/// The position held at `t-1` earns the relative return realized over
/// `[t-1, t]`: `raw[t] = sign(pos[t-1]) * (r_y[t] - beta * r_x[t])`. A change of
/// position at `t` costs `cost_rate * |Δpos| * (1 + |beta|)` in period `t`.
/// Equity compounds from 1.0; a period with `1 + pnl <= 0` ruins the run.
/// From then on equity stays at zero, later periods book no pnl or cost, and
/// trades opened after the ruin are left out of the ledger.
pub fn simulate(
    pair: &PricePair,
    spread: SpreadSeries,
    positions: Vec<Position>,
    config: &SimulationConfig,
) -> StatArbResult<BacktestResult> {
    let n = pair.len();
    if spread.len() != n || positions.len() != n {
        return Err(StatArbError::invalid(
            "series",
            format!(
                "lengths must match: prices have {} periods, spread {}, positions {}",
                n,
                spread.len(),
                positions.len()
            ),
        ));
    }
    if n == 0 {
        return Err(StatArbError::insufficient("backtest", 1, 0));
    }
    if !config.beta.is_finite() {
        return Err(StatArbError::invalid("beta", "hedge ratio must be finite"));
    }
    if !(config.cost_bps >= 0.0) || !config.cost_bps.is_finite() {
        return Err(StatArbError::invalid(
            "cost_bps",
            format!("transaction cost must be non-negative, got {}", config.cost_bps),
        ));
    }
    if !(config.notional > 0.0) || !config.notional.is_finite() {
        return Err(StatArbError::invalid(
            "notional",
            format!("notional must be positive, got {}", config.notional),
        ));
    }

    let beta = config.beta;
    let cost_rate = config.cost_bps / 10_000.0;
    let ret_x = config.returns.returns(&pair.price_x);
    let ret_y = config.returns.returns(&pair.price_y);

    let mut cost = Vec::with_capacity(n);
    let mut pnl = Vec::with_capacity(n);
    let mut equity = Vec::with_capacity(n);
    let mut ruined_at = None;
    let mut prev = Position::Flat;
    let mut level = 1.0;

    for t in 0..n {
        let pos = positions[t];
        let raw = prev.sign() * (ret_y[t] - beta * ret_x[t]);
        let c = match ruined_at {
            Some(_) => 0.0,
            None => cost_rate * (pos.sign() - prev.sign()).abs() * (1.0 + beta.abs()),
        };
        let p = if ruined_at.is_some() { 0.0 } else { raw - c };

        if ruined_at.is_none() && 1.0 + p <= 0.0 {
            warn!(period = t, pnl = p, "equity wiped out; remaining periods held at zero");
            ruined_at = Some(t);
        }
        level = if ruined_at.is_some() { 0.0 } else { level * (1.0 + p) };

        cost.push(c);
        pnl.push(p);
        equity.push(level);
        prev = pos;
    }

    let pnl_notional = pnl.iter().map(|p| p * config.notional).collect();
    let mut trades = extract_trades(&positions, &spread.zscore, &pnl);
    if let Some(r) = ruined_at {
        trades.retain(|trade| trade.entry_period <= r);
    }
    let metrics = compute_metrics(
        &pnl,
        &equity,
        &positions,
        pair.price_x[n - 1],
        pair.price_y[n - 1],
        beta,
        config.periods_per_year,
    );

    Ok(BacktestResult {
        spread,
        positions,
        cost,
        pnl,
        pnl_notional,
        equity,
        trades,
        ruined_at,
        metrics,
    })
}

/// Round trips in the position sequence. A trade's return compounds pnl from
/// its entry period through its exit period, so both costs are included.
pub fn extract_trades(positions: &[Position], zscore: &[Option<f64>], pnl: &[f64]) -> Vec<PairTrade> {
    let mut trades = Vec::new();
    let mut open: Option<OpenTrade> = None;
    let mut prev = Position::Flat;

    for (t, &pos) in positions.iter().enumerate() {
        if pos == prev {
            continue;
        }
        if let Some(trade) = open.take() {
            trades.push(trade.close(Some(t), zscore, pnl));
        }
        if !pos.is_flat() {
            // A direct flip books its cost on the trade being closed.
            let pnl_from = if prev.is_flat() { t } else { t + 1 };
            open = Some(OpenTrade {
                direction: pos,
                entry: t,
                pnl_from,
            });
        }
        prev = pos;
    }
    if let Some(trade) = open {
        trades.push(trade.close(None, zscore, pnl));
    }
    trades
}

struct OpenTrade {
    direction: Position,
    entry: usize,
    pnl_from: usize,
}

impl OpenTrade {
    fn close(self, exit: Option<usize>, zscore: &[Option<f64>], pnl: &[f64]) -> PairTrade {
        let last = exit.unwrap_or(pnl.len().saturating_sub(1));
        let growth = pnl
            .get(self.pnl_from..=last)
            .unwrap_or(&[])
            .iter()
            .fold(1.0, |acc, p| acc * (1.0 + p));
        PairTrade {
            direction: self.direction,
            entry_period: self.entry,
            exit_period: exit,
            holding_periods: last.saturating_sub(self.entry),
            entry_z: zscore.get(self.entry).copied().flatten(),
            exit_z: exit.and_then(|t| zscore.get(t).copied().flatten()),
            return_pct: growth - 1.0,
        }
    }
}
