// Race result table access

use log::warn;
use serde::{Deserialize, Serialize};

use crate::laps::{is_valid_lap_time, parse_lap_time};
use crate::table::{RawRow, RowExt, car_number};

pub const DEFAULT_VEHICLE: &str = "Toyota GR86";
pub const DEFAULT_CLASS: &str = "Am";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DriverEntry {
    pub id: String,
    pub number: String,
    pub vehicle: String,
    pub class: String,
    pub position: Option<u32>,
    /// Fastest lap in seconds, `0` when the result row had none
    pub best_lap: f64,
    pub total_time: String,
}

/// Driver list plus whether it came from a real result table.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DriverList {
    pub drivers: Vec<DriverEntry>,
    pub is_synthetic: bool,
}

/// The classified results of one race, one row per car in finishing order.
#[derive(Clone, Debug, Default)]
pub struct ResultsTable {
    rows: Vec<RawRow>,
}

impl ResultsTable {
    pub fn new(rows: Vec<RawRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[RawRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn drivers(&self) -> Vec<DriverEntry> {
        self.rows
            .iter()
            .filter_map(|row| {
                let Some(number) = row.text("NUMBER") else {
                    warn!("Skipping result row without a car number");
                    return None;
                };
                Some(DriverEntry {
                    id: number.clone(),
                    number,
                    vehicle: row
                        .text("VEHICLE")
                        .unwrap_or_else(|| DEFAULT_VEHICLE.to_string()),
                    class: row
                        .text("CLASS")
                        .unwrap_or_else(|| DEFAULT_CLASS.to_string()),
                    position: row.get("POSITION").and_then(car_number),
                    best_lap: row
                        .text("FL_TIME")
                        .map(|text| parse_lap_time(&text))
                        .unwrap_or(0.),
                    total_time: row.text("TOTAL_TIME").unwrap_or_default(),
                })
            })
            .collect()
    }

    /// Valid fastest-lap times, in table order.
    pub fn fastest_laps(&self) -> Vec<f64> {
        self.rows
            .iter()
            .filter_map(|row| row.text("FL_TIME"))
            .map(|text| parse_lap_time(&text))
            .filter(|seconds| is_valid_lap_time(*seconds))
            .collect()
    }
}
