use serde::Serialize;

use crate::error::StatArbError;
use crate::types::Position;
use crate::StatArbResult;

/// Entry/exit thresholds. Construction enforces `0 <= exit_z < entry_z`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SignalConfig {
    entry_z: f64,
    exit_z: f64,
    /// Time stop: a position held this many periods is closed.
    max_holding: Option<usize>,
}

impl SignalConfig {
    pub fn new(entry_z: f64, exit_z: f64) -> StatArbResult<Self> {
        if !entry_z.is_finite() || !exit_z.is_finite() {
            return Err(StatArbError::invalid("thresholds", "z-score thresholds must be finite"));
        }
        if exit_z < 0.0 {
            return Err(StatArbError::invalid(
                "exit_z",
                format!("exit z-score must be non-negative, got {}", exit_z),
            ));
        }
        if exit_z >= entry_z {
            return Err(StatArbError::invalid(
                "exit_z",
                format!("exit z-score ({}) must be < entry z-score ({})", exit_z, entry_z),
            ));
        }
        Ok(Self {
            entry_z,
            exit_z,
            max_holding: None,
        })
    }

    /// Add a time stop of `periods` (at least 1) to the z-score exits.
    pub fn with_max_holding(self, periods: usize) -> StatArbResult<Self> {
        if periods == 0 {
            return Err(StatArbError::invalid(
                "max_holding_periods",
                "time stop must be at least 1 period",
            ));
        }
        Ok(Self {
            max_holding: Some(periods),
            ..self
        })
    }

    pub fn entry_z(&self) -> f64 {
        self.entry_z
    }

    pub fn exit_z(&self) -> f64 {
        self.exit_z
    }

    pub fn max_holding(&self) -> Option<usize> {
        self.max_holding
    }
}

/// One step of the position state machine.
///
/// An undefined z-score forces `Flat`. `may_enter = false` keeps a flat book
/// flat but never blocks an exit.
pub fn transition(state: Position, zscore: Option<f64>, config: &SignalConfig, may_enter: bool) -> Position {
    let Some(z) = zscore else {
        return Position::Flat;
    };
    match state {
        Position::Flat if !may_enter => Position::Flat,
        Position::Flat if z >= config.entry_z => Position::ShortSpread,
        Position::Flat if z <= -config.entry_z => Position::LongSpread,
        Position::Flat => Position::Flat,
        Position::LongSpread if z >= -config.exit_z => Position::Flat,
        Position::LongSpread => Position::LongSpread,
        Position::ShortSpread if z <= config.exit_z => Position::Flat,
        Position::ShortSpread => Position::ShortSpread,
    }
}

/// Left-to-right scan of the z-score sequence starting from `Flat`.
///
/// `entry_mask[t] == false` forbids opening a position at `t`. With a time
/// stop of `k`, a position opened at `t` is flat again by `t + k` at the latest.
pub fn generate_positions(
    zscore: &[Option<f64>],
    config: &SignalConfig,
    entry_mask: Option<&[bool]>,
) -> StatArbResult<Vec<Position>> {
    if let Some(mask) = entry_mask {
        if mask.len() != zscore.len() {
            return Err(StatArbError::invalid(
                "entry_mask",
                format!("mask has {} periods but z-score has {}", mask.len(), zscore.len()),
            ));
        }
    }

    let mut state = Position::Flat;
    let mut held = 0usize;
    let positions = zscore
        .iter()
        .enumerate()
        .map(|(t, z)| {
            let may_enter = entry_mask.map_or(true, |m| m[t]);
            let next = transition(state, *z, config, may_enter);
            held = if next.is_flat() || next != state { 0 } else { held + 1 };
            state = match config.max_holding {
                Some(limit) if held >= limit => {
                    held = 0;
                    Position::Flat
                }
                _ => next,
            };
            state
        })
        .collect();
    Ok(positions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> SignalConfig {
        SignalConfig::new(2.0, 0.5).unwrap()
    }

    #[test]
    fn test_rejects_inverted_thresholds() {
        let err = SignalConfig::new(1.0, 2.0).unwrap_err();
        assert!(matches!(err, StatArbError::InvalidParameter { .. }));
        assert!(SignalConfig::new(1.0, 1.0).is_err());
        assert!(SignalConfig::new(1.0, -0.1).is_err());
        assert!(SignalConfig::new(f64::NAN, 0.1).is_err());
        assert!(SignalConfig::new(1.0, 0.0).is_ok());
    }

    #[test]
    fn test_transition_table() {
        let c = cfg();
        use Position::*;
        let cases = [
            (Flat, 2.0, ShortSpread),
            (Flat, -2.0, LongSpread),
            (Flat, 1.99, Flat),
            (Flat, -1.99, Flat),
            (LongSpread, -0.5, Flat),
            (LongSpread, 3.0, Flat),
            (LongSpread, -0.51, LongSpread),
            (ShortSpread, 0.5, Flat),
            (ShortSpread, -3.0, Flat),
            (ShortSpread, 0.51, ShortSpread),
        ];
        for (state, z, expected) in cases {
            assert_eq!(transition(state, Some(z), &c, true), expected, "{:?} z={}", state, z);
        }
    }

    #[test]
    fn test_undefined_zscore_forces_flat() {
        let c = cfg();
        assert_eq!(transition(Position::LongSpread, None, &c, true), Position::Flat);
        assert_eq!(transition(Position::ShortSpread, None, &c, true), Position::Flat);
    }

    #[test]
    fn test_closed_gate_blocks_entry_not_exit() {
        let c = cfg();
        assert_eq!(transition(Position::Flat, Some(3.0), &c, false), Position::Flat);
        assert_eq!(transition(Position::ShortSpread, Some(0.0), &c, false), Position::Flat);
        assert_eq!(transition(Position::ShortSpread, Some(2.5), &c, false), Position::ShortSpread);
    }

    #[test]
    fn test_hysteresis_holds_through_band() {
        let z = [None, Some(0.0), Some(-2.1), Some(-1.0), Some(-0.6), Some(-0.5), Some(1.0)];
        let pos = generate_positions(&z, &cfg(), None).unwrap();
        use Position::*;
        assert_eq!(pos, vec![Flat, Flat, LongSpread, LongSpread, LongSpread, Flat, Flat]);
    }

    #[test]
    fn test_warm_up_gap_resets_state() {
        let z = [Some(2.5), None, Some(1.0)];
        let pos = generate_positions(&z, &cfg(), None).unwrap();
        assert_eq!(pos, vec![Position::ShortSpread, Position::Flat, Position::Flat]);
    }

    #[test]
    fn test_mask_length_checked() {
        assert!(generate_positions(&[Some(0.0)], &cfg(), Some(&[true, true])).is_err());
    }

    #[test]
    fn test_time_stop_closes_stale_position() {
        let c = cfg().with_max_holding(2).unwrap();
        assert_eq!(c.max_holding(), Some(2));
        let z = [Some(2.5), Some(1.5), Some(1.5), Some(1.5), Some(2.5), Some(0.0)];
        let pos = generate_positions(&z, &c, None).unwrap();
        use Position::*;
        // held for 2 periods, closed on the third, re-entered on the next signal
        assert_eq!(pos, vec![ShortSpread, ShortSpread, Flat, Flat, ShortSpread, Flat]);

        let without = generate_positions(&z, &cfg(), None).unwrap();
        assert_eq!(without[..5], [ShortSpread; 5]);
    }

    #[test]
    fn test_zero_time_stop_rejected() {
        assert!(cfg().with_max_holding(0).is_err());
    }

    #[test]
    fn test_mask_delays_entry() {
        let z = [Some(2.5), Some(2.5), Some(2.5)];
        let pos = generate_positions(&z, &cfg(), Some(&[false, true, false])).unwrap();
        assert_eq!(pos, vec![Position::Flat, Position::ShortSpread, Position::ShortSpread]);
    }
}
