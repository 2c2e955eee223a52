pub mod backtest;
pub mod coint;
pub mod config;
pub mod pairs;
