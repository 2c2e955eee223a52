//! Engine defaults and validation bounds.

use serde::{Deserialize, Serialize};

// Signal generation
pub const DEFAULT_WINDOW: usize = 60;
pub const DEFAULT_ENTRY_Z: f64 = 2.0;
pub const DEFAULT_EXIT_Z: f64 = 0.5;

// Validation constraints
pub const MIN_WINDOW: usize = 20;
/// One trading year.
pub const MAX_WINDOW: usize = 252;
/// Advisory floor reported to callers; requests only need `entry_z > 0`.
pub const RECOMMENDED_MIN_ENTRY_Z: f64 = 0.5;
pub const MAX_ENTRY_Z: f64 = 5.0;
pub const MIN_EXIT_Z: f64 = 0.0;

// Backtesting
pub const DEFAULT_NOTIONAL: f64 = 1000.0;
pub const PERIODS_PER_YEAR: f64 = 252.0;

// Cointegration
pub const DEFAULT_SIGNIFICANCE: f64 = 0.05;
pub const MIN_COINTEGRATION_OBS: usize = 30;
pub const DEFAULT_ADF_MAX_LAG: usize = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultParams {
    pub window: usize,
    pub entry_z: f64,
    pub exit_z: f64,
    pub notional: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constraints {
    pub min_window: usize,
    pub max_window: usize,
    pub recommended_min_entry_z: f64,
    pub max_entry_z: f64,
    pub min_exit_z: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSummary {
    pub default_params: DefaultParams,
    pub constraints: Constraints,
    pub periods_per_year: f64,
    pub significance: f64,
    pub min_cointegration_obs: usize,
}

pub fn config_summary() -> ConfigSummary {
    ConfigSummary {
        default_params: DefaultParams {
            window: DEFAULT_WINDOW,
            entry_z: DEFAULT_ENTRY_Z,
            exit_z: DEFAULT_EXIT_Z,
            notional: DEFAULT_NOTIONAL,
        },
        constraints: Constraints {
            min_window: MIN_WINDOW,
            max_window: MAX_WINDOW,
            recommended_min_entry_z: RECOMMENDED_MIN_ENTRY_Z,
            max_entry_z: MAX_ENTRY_Z,
            min_exit_z: MIN_EXIT_Z,
        },
        periods_per_year: PERIODS_PER_YEAR,
        significance: DEFAULT_SIGNIFICANCE,
        min_cointegration_obs: MIN_COINTEGRATION_OBS,
    }
}
