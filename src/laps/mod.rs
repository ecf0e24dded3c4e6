pub mod codec;

use std::collections::HashSet;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

pub use codec::{
    LapTimeError, format_lap_time, is_valid_lap_time, parse_lap_time, try_parse_lap_time,
};

use crate::table::{RawRow, RowExt, car_number};

/// Number of best laps a best-laps table carries per driver.
pub const BEST_LAP_COLUMNS: u32 = 10;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LapRecord {
    pub lap_number: u32,
    /// Lap time in seconds, `0` when the source time was unreadable
    pub time_seconds: f64,
    pub formatted: String,
}

impl LapRecord {
    pub fn new(lap_number: u32, time_seconds: f64) -> Self {
        Self {
            lap_number,
            time_seconds,
            formatted: format_lap_time(time_seconds),
        }
    }

    /// Build a lap from a raw time string, keeping the sentinel on failure.
    pub fn from_text(lap_number: u32, text: &str) -> Self {
        Self::new(lap_number, parse_lap_time(text))
    }

    pub fn is_valid(&self) -> bool {
        is_valid_lap_time(self.time_seconds)
    }
}

/// A driver's laps together with where they came from.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LapSet {
    pub laps: Vec<LapRecord>,
    pub is_synthetic: bool,
}

impl LapSet {
    pub fn recorded(laps: Vec<LapRecord>) -> Self {
        Self {
            laps,
            is_synthetic: false,
        }
    }

    pub fn synthetic(laps: Vec<LapRecord>) -> Self {
        Self {
            laps,
            is_synthetic: true,
        }
    }

    /// Times of the real laps, in the order they are stored.
    pub fn valid_times(&self) -> Vec<f64> {
        valid_times(&self.laps)
    }
}

pub fn valid_times(laps: &[LapRecord]) -> Vec<f64> {
    laps.iter()
        .filter(|lap| lap.is_valid())
        .map(|lap| lap.time_seconds)
        .collect()
}

/// Sort fastest first; sentinel laps are expected to be filtered already.
pub fn sort_by_time(laps: &mut [LapRecord]) {
    laps.sort_by(|a, b| a.time_seconds.total_cmp(&b.time_seconds));
}

/// Drop repeated lap numbers, first occurrence wins.
pub fn dedup_lap_numbers(laps: Vec<LapRecord>) -> Vec<LapRecord> {
    let mut seen = HashSet::new();
    laps.into_iter()
        .filter(|lap| {
            let fresh = seen.insert(lap.lap_number);
            if !fresh {
                warn!("Dropping duplicate lap number {}", lap.lap_number);
            }
            fresh
        })
        .collect()
}

/// Anything that can answer "which laps did this car do".
pub trait LapSource {
    /// `None` when the source knows nothing about the driver.
    fn driver_laps(&self, driver_number: u32) -> Option<Vec<LapRecord>>;
}

/// The "best 10 laps by driver" table: one row per car with
/// `BESTLAP_n` / `BESTLAP_n_LAPNUM` column pairs.
#[derive(Clone, Debug, Default)]
pub struct BestLapsTable {
    rows: Vec<RawRow>,
}

impl BestLapsTable {
    pub fn new(rows: Vec<RawRow>) -> Self {
        Self { rows }
    }

    fn row_for(&self, driver_number: u32) -> Option<&RawRow> {
        self.rows.iter().find(|row| {
            row.get("NUMBER")
                .and_then(car_number)
                .is_some_and(|n| n == driver_number)
        })
    }
}

impl LapSource for BestLapsTable {
    fn driver_laps(&self, driver_number: u32) -> Option<Vec<LapRecord>> {
        let row = self.row_for(driver_number)?;

        let mut laps = Vec::new();
        for i in 1..=BEST_LAP_COLUMNS {
            let Some(text) = row.text(&format!("BESTLAP_{i}")) else {
                continue;
            };
            let lap = LapRecord::from_text(
                row.number(&format!("BESTLAP_{i}_LAPNUM"))
                    .filter(|n| *n > 0. && n.fract() == 0.)
                    .map(|n| n as u32)
                    .unwrap_or(i),
                &text,
            );
            if lap.is_valid() {
                laps.push(lap);
            }
        }

        let mut laps = dedup_lap_numbers(laps);
        sort_by_time(&mut laps);
        debug!(
            "Found {} recorded laps for driver {}",
            laps.len(),
            driver_number
        );
        Some(laps)
    }
}
