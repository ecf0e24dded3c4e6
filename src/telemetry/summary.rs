use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::stats::mean;

use super::TelemetrySample;

/// Fewer samples than this and sector analysis is not attempted
pub const MIN_SECTOR_SAMPLES: usize = 100;
const SECTOR_COUNT: usize = 3;
const MAX_WEAK_SECTORS: usize = 3;
/// A sector is slow when its mean speed is under this share of the lap mean
const SLOW_SECTOR_RATIO: f64 = 0.95;
/// Mean throttle below this is considered conservative
const CONSERVATIVE_THROTTLE: f64 = 50.;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySummary {
    pub max_speed: f64,
    pub avg_speed: f64,
    pub throttle_usage: f64,
    pub brake_usage: f64,
}

pub fn summarize(samples: &[TelemetrySample]) -> TelemetrySummary {
    let speeds = samples
        .iter()
        .map(|s| s.speed)
        .filter(|speed| *speed > 0.)
        .collect_vec();
    TelemetrySummary {
        max_speed: speeds.iter().copied().fold(0., f64::max),
        avg_speed: mean(speeds.iter().copied()).unwrap_or(0.),
        throttle_usage: mean(samples.iter().map(|s| s.throttle).filter(|t| *t > 0.))
            .unwrap_or(0.),
        brake_usage: mean(samples.iter().map(TelemetrySample::brake_total)).unwrap_or(0.),
    }
}

/// Split the samples into thirds by index and flag slow or timid sectors.
pub fn weak_sectors(samples: &[TelemetrySample]) -> Vec<String> {
    if samples.len() < MIN_SECTOR_SAMPLES {
        return Vec::new();
    }

    let lap_mean_speed = mean(samples.iter().map(|s| s.speed)).unwrap_or(0.);
    let sector_size = samples.len() / SECTOR_COUNT;
    let sectors = [
        &samples[..sector_size],
        &samples[sector_size..2 * sector_size],
        &samples[2 * sector_size..],
    ];

    let mut weaknesses = Vec::new();
    for (i, sector) in sectors.iter().enumerate() {
        let avg_speed = mean(sector.iter().map(|s| s.speed)).unwrap_or(0.);
        let avg_throttle = mean(sector.iter().map(|s| s.throttle)).unwrap_or(0.);

        if avg_speed < lap_mean_speed * SLOW_SECTOR_RATIO {
            weaknesses.push(format!("Sector {}: Lower average speed", i + 1));
        }
        if avg_throttle < CONSERVATIVE_THROTTLE {
            weaknesses.push(format!("Sector {}: Conservative throttle usage", i + 1));
        }
    }
    weaknesses.truncate(MAX_WEAK_SECTORS);
    weaknesses
}
