// Driver level analytics built from laps and telemetry

pub mod comparison;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use comparison::{ComparisonEntry, DriverComparison};

use crate::laps::LapRecord;
use crate::stats::{mean, min, population_std_dev};
use crate::telemetry::{TelemetrySample, TelemetrySummary};

/// Laps needed before a trend is classified
pub const MIN_TREND_LAPS: usize = 3;
const IMPROVING_RATIO: f64 = 0.99;
const DEGRADING_RATIO: f64 = 1.01;
const HIGH_TOP_SPEED: f64 = 130.;
const CONSISTENT_STD_DEV: f64 = 1.;

/// Direction of a driver's pace over the session.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Degrading,
    Stable,
    InsufficientData,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Improving => write!(f, "improving"),
            Trend::Degrading => write!(f, "degrading"),
            Trend::Stable => write!(f, "stable"),
            Trend::InsufficientData => write!(f, "insufficient_data"),
        }
    }
}

/// Compare the mean of the second half of a lap sequence to the first half.
pub fn classify_trend(lap_times: &[f64]) -> Trend {
    if lap_times.len() < MIN_TREND_LAPS {
        return Trend::InsufficientData;
    }
    let (first, second) = lap_times.split_at(lap_times.len() / 2);
    let (Some(first_half), Some(second_half)) =
        (mean(first.iter().copied()), mean(second.iter().copied()))
    else {
        return Trend::InsufficientData;
    };

    if second_half < first_half * IMPROVING_RATIO {
        Trend::Improving
    } else if second_half > first_half * DEGRADING_RATIO {
        Trend::Degrading
    } else {
        Trend::Stable
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DriverSummary {
    pub driver_id: String,
    pub best_lap_time: f64,
    pub avg_lap_time: f64,
    /// Population standard deviation of lap times
    pub consistency: f64,
    pub lap_count: usize,
    pub trend: Trend,
}

pub struct DriverSummaryBuilder;

impl DriverSummaryBuilder {
    /// Summarize a driver's valid laps, `None` when there are none.
    ///
    /// The trend is read in lap order regardless of how `laps` is sorted.
    pub fn build(driver_id: &str, laps: &[LapRecord]) -> Option<DriverSummary> {
        let mut valid: Vec<&LapRecord> = laps.iter().filter(|lap| lap.is_valid()).collect();
        valid.sort_by_key(|lap| lap.lap_number);
        let times: Vec<f64> = valid.iter().map(|lap| lap.time_seconds).collect();

        Some(DriverSummary {
            driver_id: driver_id.to_string(),
            best_lap_time: min(&times)?,
            avg_lap_time: mean(times.iter().copied())?,
            consistency: population_std_dev(&times)?,
            lap_count: times.len(),
            trend: classify_trend(&times),
        })
    }
}

/// Heuristic things the driver does well.
pub fn strengths(telemetry: &[TelemetrySample], lap_times: &[f64]) -> Vec<String> {
    let mut strengths = Vec::new();

    let top_speed = telemetry
        .iter()
        .map(|s| s.speed)
        .filter(|speed| *speed > 0.)
        .reduce(f64::max);
    if top_speed.is_some_and(|speed| speed > HIGH_TOP_SPEED) {
        strengths.push("High top speed achieved".to_string());
    }

    if population_std_dev(lap_times).is_some_and(|std| std < CONSISTENT_STD_DEV) {
        strengths.push("Consistent lap times".to_string());
    }
    strengths
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DriverAnalysis {
    #[serde(flatten)]
    pub summary: DriverSummary,
    pub telemetry_summary: TelemetrySummary,
    pub weak_sectors: Vec<String>,
    pub strengths: Vec<String>,
    /// Set when the laps were generated rather than recorded
    pub is_synthetic: bool,
}
