pub mod filters;
pub mod ols;

pub use filters::{filtered_hedge_ratio, BetaFilter, KalmanHedgeRatio, RlsHedgeRatio};
pub use ols::{estimate_hedge_ratio, least_squares, pearson_correlation, rolling_hedge_ratio, LeastSquaresFit};
