// Headline findings for a whole race

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::laps::{LapSet, format_lap_time, is_valid_lap_time, parse_lap_time};
use crate::results::{DriverEntry, ResultsTable};
use crate::stats::population_std_dev;
use crate::table::{RowExt, car_number};

/// Drivers considered for the consistency award, in table order.
const CONSISTENCY_CANDIDATES: usize = 10;
const MIN_CONSISTENCY_LAPS: usize = 5;
/// Gaps at or above this many seconds are not worth reporting.
const CLOSE_FINISH_SECONDS: f64 = 1.0;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InsightType {
    Performance,
    Consistency,
    Strategy,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Impact {
    High,
    Medium,
    Low,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Insight {
    #[serde(rename = "type")]
    pub insight_type: InsightType,
    pub title: String,
    pub description: String,
    pub impact: Impact,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lap: Option<u32>,
}

impl Insight {
    fn new(
        insight_type: InsightType,
        title: &str,
        description: String,
        impact: Impact,
        driver: impl Into<String>,
    ) -> Self {
        Self {
            insight_type,
            title: title.to_string(),
            description,
            impact,
            driver: Some(driver.into()),
            lap: None,
        }
    }
}

/// Scans a race for its fastest lap, most consistent driver, closest finish
/// and winner.
pub struct InsightGenerator<'a> {
    results: Option<&'a ResultsTable>,
    drivers: &'a [DriverEntry],
}

impl<'a> InsightGenerator<'a> {
    pub fn new(results: Option<&'a ResultsTable>, drivers: &'a [DriverEntry]) -> Self {
        Self { results, drivers }
    }

    /// Insights in report order. `laps_for` resolves a driver id to its laps.
    pub fn generate<F>(&self, laps_for: F) -> Vec<Insight>
    where
        F: Fn(&str) -> LapSet,
    {
        let Some(results) = self.results.filter(|r| !r.is_empty()) else {
            info!("No race results, reporting the fastest driver only");
            return self.fastest_driver().into_iter().collect();
        };

        let insights: Vec<Insight> = [
            fastest_lap(results),
            self.most_consistent(laps_for),
            closest_finish(results),
            race_winner(results),
        ]
        .into_iter()
        .flatten()
        .collect();
        debug!("Generated {} race insights", insights.len());
        insights
    }

    fn fastest_driver(&self) -> Option<Insight> {
        let fastest = self
            .drivers
            .iter()
            .filter(|d| is_valid_lap_time(d.best_lap))
            .fold(None::<&DriverEntry>, |best, d| match best {
                Some(b) if b.best_lap <= d.best_lap => Some(b),
                _ => Some(d),
            })?;
        Some(Insight::new(
            InsightType::Performance,
            "Fastest Driver",
            format!(
                "Driver #{} achieved the fastest lap time of {}",
                fastest.number,
                format_lap_time(fastest.best_lap)
            ),
            Impact::High,
            fastest.id.clone(),
        ))
    }

    fn most_consistent<F>(&self, laps_for: F) -> Option<Insight>
    where
        F: Fn(&str) -> LapSet,
    {
        let mut best: Option<(&DriverEntry, f64)> = None;
        for driver in self.drivers.iter().take(CONSISTENCY_CANDIDATES) {
            let laps = laps_for(&driver.id);
            // placeholder laps say nothing about the driver
            if laps.is_synthetic {
                continue;
            }
            let times = laps.valid_times();
            if times.len() < MIN_CONSISTENCY_LAPS {
                continue;
            }
            let Some(std) = population_std_dev(&times) else {
                continue;
            };
            if best.is_none_or(|(_, min_std)| std < min_std) {
                best = Some((driver, std));
            }
        }

        let (driver, std) = best?;
        Some(Insight::new(
            InsightType::Consistency,
            "Most Consistent Driver",
            format!(
                "Driver #{} showed the most consistent lap times with a standard deviation of {std:.2}s",
                driver.id
            ),
            Impact::Medium,
            driver.id.clone(),
        ))
    }
}

fn fastest_lap(results: &ResultsTable) -> Option<Insight> {
    let mut best: Option<(String, f64)> = None;
    for row in results.rows() {
        let (Some(number), Some(text)) = (row.text("NUMBER"), row.text("FL_TIME")) else {
            continue;
        };
        let seconds = parse_lap_time(&text);
        if !is_valid_lap_time(seconds) {
            continue;
        }
        if best.as_ref().is_none_or(|(_, t)| seconds < *t) {
            best = Some((number, seconds));
        }
    }

    let (number, seconds) = best?;
    Some(Insight::new(
        InsightType::Performance,
        "Fastest Lap",
        format!(
            "Driver #{number} set the fastest lap of {}",
            format_lap_time(seconds)
        ),
        Impact::High,
        number,
    ))
}

/// Gap to the car ahead in seconds. Lap-down gaps and unreadable cells have
/// none.
fn gap_seconds(text: &str) -> Option<f64> {
    let text = text.trim();
    if text == "-" || text.contains("Lap") {
        return None;
    }
    let seconds = text.replace(['+', '-'], "").trim().parse::<f64>().ok()?;
    seconds.is_finite().then_some(seconds)
}

fn closest_finish(results: &ResultsTable) -> Option<Insight> {
    let mut closest: Option<(String, f64)> = None;
    for row in results.rows() {
        let Some(number) = row.text("NUMBER") else {
            continue;
        };
        let Some(gap) = row.text("GAP_PREVIOUS").as_deref().and_then(gap_seconds) else {
            continue;
        };
        if closest.as_ref().is_none_or(|(_, g)| gap < *g) {
            closest = Some((number, gap));
        }
    }

    let (number, gap) = closest.filter(|(_, gap)| *gap < CLOSE_FINISH_SECONDS)?;
    Some(Insight::new(
        InsightType::Strategy,
        "Closest Finish",
        format!(
            "Driver #{number} finished just {gap:.3}s behind the previous driver - an extremely close battle!"
        ),
        Impact::High,
        number,
    ))
}

fn race_winner(results: &ResultsTable) -> Option<Insight> {
    let row = results
        .rows()
        .iter()
        .find(|row| row.get("POSITION").and_then(car_number) == Some(1))?;
    let number = row.text("NUMBER")?;
    Some(Insight::new(
        InsightType::Performance,
        "Race Winner",
        format!(
            "Driver #{number} won the race with a total time of {}",
            row.text("TOTAL_TIME").unwrap_or_default()
        ),
        Impact::High,
        number,
    ))
}
