pub mod backtest;
pub mod cointegration;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod regression;
pub mod signal;
pub mod types;

pub use error::StatArbError;
pub use types::*;

/// Standard result type for all engine operations
pub type StatArbResult<T> = Result<T, StatArbError>;
