// Pit stop strategy simulation under linear tire degradation

use std::collections::BTreeMap;
use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::errors::PaddockError;
use crate::results::ResultsTable;
use crate::stats::mean;

/// Remaining laps above which a two-stop race is considered
const TWO_STOP_MIN_REMAINING: u32 = 20;
pub const DEFAULT_MAX_REMAINING_LAPS: u32 = 1_000;
pub const DEFAULT_DEGRADATION_RATE: f64 = 0.02;

/// Typical race pace: the mean valid fastest lap plus an offset, or the
/// configured default without usable results.
pub fn base_lap_estimate(results: Option<&ResultsTable>, config: &EngineConfig) -> f64 {
    results
        .and_then(|table| mean(table.fastest_laps()))
        .map(|fastest| fastest + config.base_lap_offset_seconds)
        .unwrap_or(config.default_base_lap_seconds)
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StrategyType {
    NoPit,
    OnePit,
    TwoPit,
}

impl fmt::Display for StrategyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyType::NoPit => write!(f, "no_pit"),
            StrategyType::OnePit => write!(f, "one_pit"),
            StrategyType::TwoPit => write!(f, "two_pit"),
        }
    }
}

/// One evaluated strategy.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StrategyOutcome {
    pub strategy_type: StrategyType,
    /// Absolute lap numbers of the stops
    pub pit_laps: Vec<u32>,
    pub total_time: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PitStopPlan {
    pub strategy_type: StrategyType,
    pub pit_laps: Vec<u32>,
    pub total_time: f64,
    /// Selected total minus the no-stop total
    pub time_loss: f64,
    /// Time saved over staying out, net of pit lane time
    pub time_gain: f64,
    /// Fractional tire wear per absolute lap, counted from the current lap
    pub degradation: BTreeMap<u32, f64>,
    pub reasoning: String,
    pub base_lap_time: f64,
    /// Every strategy that was evaluated, in evaluation order
    pub strategies: Vec<StrategyOutcome>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaceState {
    pub current_lap: u32,
    pub total_laps: u32,
    /// Fractional lap time penalty per lap of tire age
    pub degradation_rate: f64,
    pub base_lap_time: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitStopSimulator {
    pit_stop_seconds: f64,
    /// Longest remaining race that will be simulated
    max_remaining_laps: u32,
}

impl Default for PitStopSimulator {
    fn default() -> Self {
        Self::new(30., DEFAULT_MAX_REMAINING_LAPS)
    }
}

impl PitStopSimulator {
    pub fn new(pit_stop_seconds: f64, max_remaining_laps: u32) -> Self {
        Self {
            pit_stop_seconds,
            max_remaining_laps,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.pit_stop_seconds, config.max_remaining_laps)
    }

    /// Total time for `laps` laps with stops after the given lap offsets.
    ///
    /// Tire age resets to zero on the lap of each stop, every stop costs the
    /// pit lane time.
    pub fn simulate(
        &self,
        laps: u32,
        base_lap_time: f64,
        degradation_rate: f64,
        pit_offsets: &[u32],
    ) -> f64 {
        let mut last_stop = 0;
        let mut total = 0.;
        for lap in 0..laps {
            if pit_offsets.contains(&lap) {
                last_stop = lap;
            }
            let tire_age = (lap - last_stop) as f64;
            total += base_lap_time * (1. + degradation_rate * tire_age);
        }
        total + pit_offsets.len() as f64 * self.pit_stop_seconds
    }

    pub fn plan(&self, race: &RaceState) -> Result<PitStopPlan, PaddockError> {
        if race.current_lap > race.total_laps
            || race.total_laps - race.current_lap > self.max_remaining_laps
        {
            return Err(PaddockError::InvalidLapBounds {
                current_lap: race.current_lap,
                total_laps: race.total_laps,
            });
        }
        if !race.degradation_rate.is_finite() || race.degradation_rate < 0. {
            return Err(PaddockError::InvalidDegradationRate {
                rate: race.degradation_rate,
            });
        }

        let remaining = race.total_laps - race.current_lap;
        let mut candidates = vec![
            (StrategyType::NoPit, vec![]),
            (StrategyType::OnePit, vec![remaining / 2]),
        ];
        if remaining > TWO_STOP_MIN_REMAINING {
            let two_thirds = remaining / 3 * 2 + remaining % 3 * 2 / 3;
            candidates.push((StrategyType::TwoPit, vec![remaining / 3, two_thirds]));
        }

        let strategies: Vec<StrategyOutcome> = candidates
            .into_iter()
            .map(|(strategy_type, offsets)| StrategyOutcome {
                strategy_type,
                total_time: self.simulate(
                    remaining,
                    race.base_lap_time,
                    race.degradation_rate,
                    &offsets,
                ),
                pit_laps: offsets.iter().map(|o| race.current_lap + o).collect(),
            })
            .collect();

        let no_pit_time = strategies[0].total_time;
        // strict comparison keeps the earliest strategy on ties
        let best = strategies
            .iter()
            .skip(1)
            .fold(&strategies[0], |best, s| {
                if s.total_time < best.total_time { s } else { best }
            })
            .clone();

        let time_loss = best.total_time - no_pit_time;
        let time_gain =
            (no_pit_time - best.total_time) - best.pit_laps.len() as f64 * self.pit_stop_seconds;
        let degradation = (race.current_lap..=race.total_laps)
            .map(|lap| (lap, race.degradation_rate * (lap - race.current_lap) as f64))
            .collect();
        let reasoning = self.reasoning(&best, remaining, race.degradation_rate, time_gain);
        debug!(
            "Selected {} over {} strategies, total {:.1}s",
            best.strategy_type,
            strategies.len(),
            best.total_time
        );

        Ok(PitStopPlan {
            strategy_type: best.strategy_type,
            pit_laps: best.pit_laps,
            total_time: best.total_time,
            time_loss,
            time_gain,
            degradation,
            reasoning,
            base_lap_time: race.base_lap_time,
            strategies,
        })
    }

    fn reasoning(
        &self,
        strategy: &StrategyOutcome,
        remaining: u32,
        degradation_rate: f64,
        time_gain: f64,
    ) -> String {
        let degradation_pct = degradation_rate * 100.;
        match (strategy.strategy_type, strategy.pit_laps.as_slice()) {
            (StrategyType::NoPit, _) => format!(
                "No pit stop recommended. Remaining {remaining} laps manageable on current tires. Tire degradation ({degradation_pct:.1}% per lap) is acceptable."
            ),
            (StrategyType::OnePit, [pit_lap]) if time_gain > 0. => format!(
                "One pit stop at lap {pit_lap} recommended. Fresh tires will provide {:.1}s advantage over staying out, accounting for {:.0}s pit stop time.",
                time_gain.abs(),
                self.pit_stop_seconds
            ),
            (StrategyType::OnePit, [pit_lap]) => format!(
                "One pit stop at lap {pit_lap} considered, but time loss of {:.1}s suggests staying out may be better unless tires are critical.",
                time_gain.abs()
            ),
            (StrategyType::TwoPit, [first, second]) => format!(
                "Two pit stops recommended at laps {first} and {second}. With {remaining} laps remaining and {degradation_pct:.1}% degradation per lap, fresh tires will maintain optimal pace."
            ),
            _ => "Strategy analysis complete.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn race(current_lap: u32, total_laps: u32, degradation_rate: f64) -> RaceState {
        RaceState {
            current_lap,
            total_laps,
            degradation_rate,
            base_lap_time: 100.,
        }
    }

    #[test]
    fn test_no_pit_total() {
        let total = PitStopSimulator::default().simulate(30, 100., 0.02, &[]);
        assert!((total - 3870.).abs() < 1e-6);
    }

    #[test]
    fn test_thirty_laps_selects_two_stops() {
        let plan = PitStopSimulator::default().plan(&race(10, 40, 0.02)).unwrap();

        assert_eq!(plan.strategies.len(), 3);
        assert!((plan.strategies[0].total_time - 3870.).abs() < 1e-6);
        assert!((plan.strategies[1].total_time - 3450.).abs() < 1e-6);
        assert!((plan.strategies[2].total_time - 3330.).abs() < 1e-6);

        assert_eq!(plan.strategy_type, StrategyType::TwoPit);
        assert_eq!(plan.pit_laps, vec![20, 30]);
        assert!((plan.time_loss + 540.).abs() < 1e-6);
        assert!((plan.time_gain - 480.).abs() < 1e-6);
        assert!(plan.reasoning.contains("laps 20 and 30"));
    }

    #[test]
    fn test_short_race_never_two_stops() {
        let plan = PitStopSimulator::default().plan(&race(0, 20, 0.02)).unwrap();
        assert_eq!(plan.strategies.len(), 2);
        assert!(
            plan.strategies
                .iter()
                .all(|s| s.strategy_type != StrategyType::TwoPit)
        );
    }

    #[test]
    fn test_small_gain_keeps_stop_but_warns() {
        // the stop saves 50s of wear, 20s net of pit lane time
        let plan = PitStopSimulator::default().plan(&race(0, 20, 0.005)).unwrap();
        assert_eq!(plan.strategy_type, StrategyType::OnePit);
        assert_eq!(plan.pit_laps, vec![10]);
        assert!((plan.time_gain + 10.).abs() < 1e-6);
        assert!(plan.reasoning.starts_with("One pit stop at lap 10 considered"));
        assert!(plan.reasoning.contains("time loss of 10.0s"));
    }

    #[test]
    fn test_two_stop_marks_for_odd_lengths() {
        let plan = PitStopSimulator::default().plan(&race(0, 29, 0.02)).unwrap();
        assert_eq!(plan.strategies[2].pit_laps, vec![9, 19]);
    }

    #[test]
    fn test_overlong_race_is_rejected() {
        let simulator = PitStopSimulator::default();
        assert!(matches!(
            simulator.plan(&race(0, 2_200_000_000, 0.02)),
            Err(PaddockError::InvalidLapBounds { .. })
        ));
        assert!(matches!(
            simulator.plan(&race(0, u32::MAX, 0.02)),
            Err(PaddockError::InvalidLapBounds { .. })
        ));

        let plan = simulator
            .plan(&race(10, 10 + DEFAULT_MAX_REMAINING_LAPS, 0.02))
            .unwrap();
        assert_eq!(plan.degradation.len(), DEFAULT_MAX_REMAINING_LAPS as usize + 1);
        assert_eq!(plan.strategies[2].pit_laps, vec![343, 676]);
    }

    #[test]
    fn test_no_degradation_stays_out() {
        let plan = PitStopSimulator::default().plan(&race(0, 30, 0.)).unwrap();
        assert_eq!(plan.strategy_type, StrategyType::NoPit);
        assert!(plan.pit_laps.is_empty());
        assert_eq!(plan.time_loss, 0.);
        assert!(plan.reasoning.starts_with("No pit stop recommended"));
    }

    #[test]
    fn test_degradation_map() {
        let plan = PitStopSimulator::default().plan(&race(5, 8, 0.02)).unwrap();
        assert_eq!(plan.degradation.len(), 4);
        assert_eq!(plan.degradation[&5], 0.);
        assert!((plan.degradation[&8] - 0.06).abs() < 1e-12);
    }

    #[test]
    fn test_race_over_is_valid() {
        let plan = PitStopSimulator::default().plan(&race(25, 25, 0.02)).unwrap();
        assert_eq!(plan.strategy_type, StrategyType::NoPit);
        assert_eq!(plan.total_time, 0.);
    }

    #[test]
    fn test_invalid_inputs() {
        let simulator = PitStopSimulator::default();
        assert!(matches!(
            simulator.plan(&race(30, 20, 0.02)),
            Err(PaddockError::InvalidLapBounds { .. })
        ));
        assert!(matches!(
            simulator.plan(&race(0, 20, -0.1)),
            Err(PaddockError::InvalidDegradationRate { .. })
        ));
        assert!(matches!(
            simulator.plan(&race(0, 20, f64::NAN)),
            Err(PaddockError::InvalidDegradationRate { .. })
        ));
    }

    #[test]
    fn test_base_lap_estimate() {
        use crate::table::{RawRow, RawValue};

        let config = EngineConfig::default();
        assert_eq!(base_lap_estimate(None, &config), 100.);

        let rows: Vec<RawRow> = ["1:37.000", "1:39.000", "garbage"]
            .iter()
            .map(|t| [("FL_TIME".to_string(), RawValue::from(*t))].into_iter().collect())
            .collect();
        let table = ResultsTable::new(rows);
        assert!((base_lap_estimate(Some(&table), &config) - 100.5).abs() < 1e-9);

        let empty = ResultsTable::new(vec![]);
        assert_eq!(base_lap_estimate(Some(&empty), &config), 100.);
    }

    #[test]
    fn test_strategy_type_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&StrategyType::OnePit).unwrap(),
            "\"one_pit\""
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_selection_is_minimum(
            current in 0u32..50,
            extra in 0u32..60,
            rate in 0.0f64..0.1,
        ) {
            let plan = PitStopSimulator::default()
                .plan(&race(current, current + extra, rate))
                .unwrap();
            let min_total = plan
                .strategies
                .iter()
                .map(|s| s.total_time)
                .fold(f64::INFINITY, f64::min);
            prop_assert_eq!(plan.total_time, min_total);
            prop_assert_eq!(plan.strategies.len(), if extra > 20 { 3 } else { 2 });
        }
    }
}
