//! Property-based checks of the engine's structural guarantees: warm-up,
//! hysteresis, causality and equity bounds.

use chrono::NaiveDate;
use proptest::prelude::*;
use statarb_core::backtest::{simulate, SimulationConfig};
use statarb_core::pipeline::{run_backtest, BacktestRequest, HedgeSample};
use statarb_core::signal::{generate_positions, rolling_zscore, SignalConfig};
use statarb_core::types::{Position, PricePair, SpreadSeries};

fn build_pair(ret_x: &[f64], ret_y: &[f64]) -> PricePair {
    let start = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
    let dates = (0..ret_x.len())
        .map(|i| start + chrono::Days::new(i as u64))
        .collect();
    let path = |rets: &[f64], p0: f64| {
        rets.iter()
            .scan(p0, |p, r| {
                *p *= r.exp();
                Some(*p)
            })
            .collect::<Vec<f64>>()
    };
    PricePair::new(dates, path(ret_x, 50.0), path(ret_y, 80.0)).unwrap()
}

fn position_strategy() -> impl Strategy<Value = Position> {
    prop_oneof![
        Just(Position::Flat),
        Just(Position::LongSpread),
        Just(Position::ShortSpread),
    ]
}

proptest! {
    /// No z-score, and therefore no position, before the window fills.
    #[test]
    fn warm_up_is_flat(
        spread in prop::collection::vec(-50.0f64..50.0, 40..120),
        window in 2usize..30,
    ) {
        let z = rolling_zscore(&spread, window).unwrap();
        let cfg = SignalConfig::new(1.0, 0.2).unwrap();
        let pos = generate_positions(&z, &cfg, None).unwrap();
        for t in 0..window - 1 {
            prop_assert!(z[t].is_none());
            prop_assert_eq!(pos[t], Position::Flat);
        }
        prop_assert!(z[window - 1..].iter().all(|v| v.map_or(false, f64::is_finite)));
    }

    /// Entries need |z| >= entry_z, holds need z beyond exit_z, and a position
    /// never flips sides within a single period.
    #[test]
    fn hysteresis_respected(
        z in prop::collection::vec(prop::option::weighted(0.9, -4.0f64..4.0), 1..200),
        entry in 0.6f64..3.0,
        exit_frac in 0.0f64..0.95,
    ) {
        let exit = entry * exit_frac;
        let cfg = SignalConfig::new(entry, exit).unwrap();
        let pos = generate_positions(&z, &cfg, None).unwrap();
        let mut prev = Position::Flat;
        for (t, &p) in pos.iter().enumerate() {
            match (prev, p, z[t]) {
                (_, Position::Flat, _) => {}
                (_, _, None) => prop_assert!(false, "position held with undefined z at {}", t),
                (Position::Flat, Position::ShortSpread, Some(v)) => prop_assert!(v >= entry),
                (Position::Flat, Position::LongSpread, Some(v)) => prop_assert!(v <= -entry),
                (Position::LongSpread, Position::LongSpread, Some(v)) => prop_assert!(v < -exit),
                (Position::ShortSpread, Position::ShortSpread, Some(v)) => prop_assert!(v > exit),
                (a, b, _) => prop_assert!(false, "direct flip {:?} -> {:?} at {}", a, b, t),
            }
            prev = p;
        }
    }

    /// Drawdown is never positive, equity never negative, hit rate in [0, 1].
    #[test]
    fn equity_and_metric_bounds(
        rets in prop::collection::vec((-0.1f64..0.1, -0.1f64..0.1), 2..150),
        positions in prop::collection::vec(position_strategy(), 150),
        beta in -3.0f64..3.0,
        cost_bps in 0.0f64..50.0,
    ) {
        let (rx, ry): (Vec<f64>, Vec<f64>) = rets.into_iter().unzip();
        let pair = build_pair(&rx, &ry);
        let n = pair.len();
        let spread = SpreadSeries { spread: vec![0.0; n], zscore: vec![Some(0.0); n], window: 2 };
        let cfg = SimulationConfig { cost_bps, ..SimulationConfig::new(beta) };
        let res = simulate(&pair, spread, positions[..n].to_vec(), &cfg).unwrap();

        prop_assert!(res.metrics.max_drawdown <= 0.0);
        prop_assert!(res.metrics.max_drawdown >= -1.0);
        prop_assert!(res.equity.iter().all(|e| *e >= 0.0));
        prop_assert!((0.0..=1.0).contains(&res.metrics.hit_rate));
        prop_assert!(res.metrics.total_return >= -1.0);
        match res.ruined_at {
            Some(t) => {
                prop_assert!(res.equity[..t].iter().all(|e| *e > 0.0));
                prop_assert!(res.equity[t..].iter().all(|e| *e == 0.0));
            }
            None => prop_assert!(res.equity.iter().all(|e| *e > 0.0)),
        }
    }

    /// With the hedge ratio fixed on a training prefix, changing prices after
    /// period `t0` cannot change anything decided up to `t0`.
    #[test]
    fn no_look_ahead(
        rets in prop::collection::vec((-0.02f64..0.02, -0.02f64..0.02), 100),
        t0 in 45usize..95,
        shock in 0.5f64..2.0,
    ) {
        let (rx, ry): (Vec<f64>, Vec<f64>) = rets.into_iter().unzip();
        let base = build_pair(&rx, &ry);
        let mut shocked = base.clone();
        for t in t0 + 1..shocked.len() {
            shocked.price_y[t] *= shock;
            shocked.price_x[t] /= shock;
        }

        let req = BacktestRequest {
            window: 20,
            entry_z: 1.5,
            exit_z: 0.3,
            hedge_sample: HedgeSample::Training { periods: 40 },
            ..BacktestRequest::new("AAA", "BBB")
        };
        let a = run_backtest(&req, &base);
        let b = run_backtest(&req, &shocked);
        prop_assume!(a.is_ok() && b.is_ok());
        let (a, b) = (a.unwrap().result, b.unwrap().result);

        prop_assert_eq!(a.hedge_ratio, b.hedge_ratio);
        prop_assert_eq!(&a.zscore[..=t0], &b.zscore[..=t0]);
        prop_assert_eq!(&a.position[..=t0], &b.position[..=t0]);
        prop_assert_eq!(&a.pnl[..=t0], &b.pnl[..=t0]);
        prop_assert_eq!(&a.equity[..=t0], &b.equity[..=t0]);
    }
}
