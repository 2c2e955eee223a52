pub mod adf;
pub mod engle_granger;
pub mod gate;

pub use adf::{adf_test, mackinnon_critical_values, mackinnon_p_value, AdfResult, CriticalSurface, LagSelection};
pub use engle_granger::{
    analyze_pair, engle_granger, half_life, residuals, rolling_cointegration_pvalues,
    test_cointegration, CointegrationConfig, CointegrationReport,
};
pub use gate::{CointegrationGate, CointegrationPolicy};
