use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::StatArbError;
use crate::StatArbResult;

/// Two date-aligned price series. `x` is the independent leg, `y` the dependent leg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePair {
    pub dates: Vec<NaiveDate>,
    pub price_x: Vec<f64>,
    pub price_y: Vec<f64>,
}

impl PricePair {
    /// Build a pair, checking the alignment invariants: equal lengths, strictly
    /// increasing dates, finite positive prices.
    pub fn new(dates: Vec<NaiveDate>, price_x: Vec<f64>, price_y: Vec<f64>) -> StatArbResult<Self> {
        if price_x.len() != dates.len() || price_y.len() != dates.len() {
            return Err(StatArbError::invalid(
                "prices",
                format!(
                    "{} dates, {} X prices and {} Y prices: lengths must be equal",
                    dates.len(),
                    price_x.len(),
                    price_y.len()
                ),
            ));
        }
        if let Some(w) = dates.windows(2).find(|w| w[1] <= w[0]) {
            return Err(StatArbError::invalid(
                "dates",
                format!("dates must be strictly increasing ({} then {})", w[0], w[1]),
            ));
        }
        for (leg, series) in [("price_x", &price_x), ("price_y", &price_y)] {
            if let Some((i, p)) = series
                .iter()
                .enumerate()
                .find(|(_, p)| !p.is_finite() || **p <= 0.0)
            {
                return Err(StatArbError::invalid(
                    leg,
                    format!("price at index {} is {}: prices must be finite and positive", i, p),
                ));
            }
        }
        Ok(Self {
            dates,
            price_x,
            price_y,
        })
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Series in the requested price space.
    pub fn transformed(&self, transform: PriceTransform) -> (Vec<f64>, Vec<f64>) {
        (
            transform.apply(&self.price_x),
            transform.apply(&self.price_y),
        )
    }
}

/// Canonical form of a ticker symbol: trimmed and upper-cased.
pub fn normalize_ticker(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// Price space used for hedge estimation and spread construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceTransform {
    #[default]
    Raw,
    Log,
}

impl PriceTransform {
    pub fn apply(&self, prices: &[f64]) -> Vec<f64> {
        match self {
            PriceTransform::Raw => prices.to_vec(),
            PriceTransform::Log => prices.iter().map(|p| p.ln()).collect(),
        }
    }
}

/// Held position in the spread. Encoded as -1 / 0 / 1 on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum Position {
    /// Short Y, long beta·X.
    ShortSpread,
    #[default]
    Flat,
    /// Long Y, short beta·X.
    LongSpread,
}

impl Position {
    pub fn sign(self) -> f64 {
        match self {
            Position::ShortSpread => -1.0,
            Position::Flat => 0.0,
            Position::LongSpread => 1.0,
        }
    }

    pub fn is_flat(self) -> bool {
        self == Position::Flat
    }
}

impl From<Position> for i8 {
    fn from(p: Position) -> i8 {
        match p {
            Position::ShortSpread => -1,
            Position::Flat => 0,
            Position::LongSpread => 1,
        }
    }
}

impl TryFrom<i8> for Position {
    type Error = String;

    fn try_from(v: i8) -> Result<Self, Self::Error> {
        match v {
            -1 => Ok(Position::ShortSpread),
            0 => Ok(Position::Flat),
            1 => Ok(Position::LongSpread),
            other => Err(format!("position must be -1, 0 or 1, got {}", other)),
        }
    }
}

/// OLS fit of `y ≈ beta * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HedgeRatioResult {
    pub beta: f64,
    pub intercept: f64,
    /// Population standard deviation of the regression residuals.
    pub residual_std: f64,
    pub nobs: usize,
}

/// MacKinnon critical values for the unit-root statistic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriticalValues {
    pub one_pct: f64,
    pub five_pct: f64,
    pub ten_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CointegrationResult {
    pub test_statistic: f64,
    pub p_value: f64,
    pub is_cointegrated: bool,
    pub significance: f64,
    pub lags_used: usize,
    pub nobs: usize,
    pub critical_values: CriticalValues,
}

/// Spread and its rolling z-score. `zscore[t]` is `None` while the window warms up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadSeries {
    pub spread: Vec<f64>,
    pub zscore: Vec<Option<f64>>,
    pub window: usize,
}

impl SpreadSeries {
    pub fn len(&self) -> usize {
        self.spread.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spread.is_empty()
    }
}

/// Summary statistics of one run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Annualized mean over sample std of per-period pnl; 0 when pnl is flat.
    pub sharpe: f64,
    /// `equity[last] / equity[first] - 1`.
    pub total_return: f64,
    /// Worst peak-to-trough equity decline, always <= 0.
    pub max_drawdown: f64,
    /// Share of non-zero pnl periods that were positive; 0 when none were.
    pub hit_rate: f64,
    /// Number of periods where the position changed.
    pub turnover: usize,
    /// Capital for one unit of spread at the last prices: `price_y + |beta| * price_x`.
    pub estimated_capital: f64,
}

/// One round trip of the spread position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairTrade {
    /// Side of the spread held; never `Flat`.
    pub direction: Position,
    /// Period whose signal opened the position.
    pub entry_period: usize,
    /// `None` when the position is still open at the last period.
    pub exit_period: Option<usize>,
    /// Periods the position was held (to the last period when still open).
    pub holding_periods: usize,
    /// Z-score at the entry period.
    pub entry_z: Option<f64>,
    /// Z-score at the exit period, `None` while open.
    pub exit_z: Option<f64>,
    /// Compounded return over the holding span, costs included.
    pub return_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub spread: SpreadSeries,
    /// Position decided at each period; it earns the next period's return.
    pub positions: Vec<Position>,
    /// Transaction cost booked per period, as a fraction of capital.
    pub cost: Vec<f64>,
    /// Net per-period return after costs.
    pub pnl: Vec<f64>,
    /// `pnl` scaled by the run's notional.
    pub pnl_notional: Vec<f64>,
    /// Compounded equity curve starting at 1.0.
    pub equity: Vec<f64>,
    pub trades: Vec<PairTrade>,
    /// First period where `1 + pnl` was not positive; equity is zero from there on.
    pub ruined_at: Option<usize>,
    pub metrics: Metrics,
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "ieee754_f64".to_string(),
        },
    }
}
