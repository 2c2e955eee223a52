pub mod metrics;
pub mod simulator;

pub use metrics::{compute_metrics, hit_rate, max_drawdown, sharpe_ratio, total_return, turnover};
pub use simulator::{extract_trades, simulate, ReturnKind, SimulationConfig};
