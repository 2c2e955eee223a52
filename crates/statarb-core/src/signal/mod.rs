pub mod spread;
pub mod state_machine;

pub use spread::{compute_spread, rolling_zscore, spread_series, RollingWindow};
pub use state_machine::{generate_positions, transition, SignalConfig};
