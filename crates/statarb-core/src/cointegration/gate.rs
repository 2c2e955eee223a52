use serde::{Deserialize, Serialize};

use super::engle_granger::{rolling_cointegration_pvalues, CointegrationConfig};
use crate::config::MIN_COINTEGRATION_OBS;
use crate::error::StatArbError;
use crate::StatArbResult;

/// Whether new entries require a recent cointegration p-value below a threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum CointegrationGate {
    #[default]
    Off,
    Rolling { window: usize, max_p_value: f64 },
}

/// What a failed full-sample test means for the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CointegrationPolicy {
    /// Report the result, trade regardless.
    #[default]
    Informational,
    /// Stay flat for the whole run unless the pair is cointegrated.
    Require,
}

impl CointegrationGate {
    pub fn validate(&self) -> StatArbResult<()> {
        if let CointegrationGate::Rolling {
            window,
            max_p_value,
        } = *self
        {
            if window < MIN_COINTEGRATION_OBS {
                return Err(StatArbError::invalid(
                    "gate.window",
                    format!("must be >= {}, got {}", MIN_COINTEGRATION_OBS, window),
                ));
            }
            if !(max_p_value > 0.0 && max_p_value <= 1.0) {
                return Err(StatArbError::invalid(
                    "gate.max_p_value",
                    format!("must lie in (0, 1], got {}", max_p_value),
                ));
            }
        }
        Ok(())
    }

    /// Per-period permission to open a position, or `None` when the gate is off.
    ///
    /// Periods without a p-value keep the gate closed.
    pub fn entry_mask(
        &self,
        x: &[f64],
        y: &[f64],
        config: &CointegrationConfig,
    ) -> StatArbResult<Option<Vec<bool>>> {
        match *self {
            CointegrationGate::Off => Ok(None),
            CointegrationGate::Rolling {
                window,
                max_p_value,
            } => {
                self.validate()?;
                let pvalues = rolling_cointegration_pvalues(x, y, window, config)?;
                Ok(Some(
                    pvalues
                        .into_iter()
                        .map(|p| p.is_some_and(|p| p <= max_p_value))
                        .collect(),
                ))
            }
        }
    }
}
