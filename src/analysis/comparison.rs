use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::stats::{mean, min, population_std_dev};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ComparisonEntry {
    pub driver_id: String,
    pub best_lap: f64,
    pub avg_lap: f64,
    pub consistency: f64,
    pub lap_count: usize,
    pub is_synthetic: bool,
}

impl ComparisonEntry {
    /// Build an entry from valid lap times, `None` when there are none.
    /// A single lap has a consistency of `0`.
    pub fn from_times(
        driver_id: &str,
        times: &[f64],
        lap_count: usize,
        is_synthetic: bool,
    ) -> Option<Self> {
        let consistency = if times.len() > 1 {
            population_std_dev(times)?
        } else {
            0.
        };
        Some(Self {
            driver_id: driver_id.to_string(),
            best_lap: min(times)?,
            avg_lap: mean(times.iter().copied())?,
            consistency,
            lap_count,
            is_synthetic,
        })
    }
}

/// Side by side view of several drivers.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct DriverComparison {
    pub drivers: Vec<ComparisonEntry>,
    pub best_lap_comparison: BTreeMap<String, f64>,
    pub consistency_comparison: BTreeMap<String, f64>,
}

impl DriverComparison {
    pub fn push(&mut self, entry: ComparisonEntry) {
        self.best_lap_comparison
            .insert(entry.driver_id.clone(), entry.best_lap);
        self.consistency_comparison
            .insert(entry.driver_id.clone(), entry.consistency);
        self.drivers.push(entry);
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }

    /// Driver with the lowest best lap.
    pub fn fastest(&self) -> Option<&ComparisonEntry> {
        self.drivers
            .iter()
            .min_by(|a, b| a.best_lap.total_cmp(&b.best_lap))
    }
}
