// Placeholder data used when real source data is missing or too thin.
//
// Everything here is reproducible from the provider seed and the salt passed
// in, so two runs with the same inputs produce the same output.

use std::f64::consts::PI;

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::laps::{LapRecord, LapSource, sort_by_time};
use crate::racing_line::RacingLinePoint;
use crate::results::{DEFAULT_CLASS, DEFAULT_VEHICLE, DriverEntry};

/// Center of the reference track (Barber Motorsports Park)
const TRACK_CENTER: (f64, f64) = (33.4806, -86.6553);
const WAYPOINT_SCALE: f64 = 0.012;
const OFFSET_SCALE: f64 = 0.00005;
const MIN_SPEED: f64 = 70.;
const MAX_SPEED: f64 = 140.;

/// Closed loop of (lat, lon) offsets tracing the reference circuit.
const WAYPOINTS: [(f64, f64); 52] = [
    (0.010, 0.000),
    (0.009, 0.001),
    (0.008, 0.002),
    (0.006, 0.004),
    (0.004, 0.006),
    (0.001, 0.007),
    (-0.002, 0.007),
    (-0.005, 0.006),
    (-0.007, 0.004),
    (-0.009, 0.002),
    (-0.010, 0.000),
    (-0.010, -0.002),
    (-0.009, -0.004),
    (-0.007, -0.006),
    (-0.005, -0.007),
    (-0.002, -0.008),
    (0.001, -0.008),
    (0.004, -0.007),
    (0.006, -0.005),
    (0.007, -0.003),
    (0.008, -0.001),
    (0.008, 0.001),
    (0.007, 0.003),
    (0.005, 0.005),
    (0.003, 0.006),
    (0.000, 0.006),
    (-0.002, 0.005),
    (-0.004, 0.003),
    (-0.005, 0.000),
    (-0.004, -0.003),
    (-0.002, -0.005),
    (0.000, -0.006),
    (0.003, -0.006),
    (0.005, -0.004),
    (0.006, -0.002),
    (0.007, 0.000),
    (0.006, 0.002),
    (0.004, 0.004),
    (0.002, 0.005),
    (0.000, 0.005),
    (-0.002, 0.004),
    (-0.003, 0.002),
    (-0.003, 0.000),
    (-0.002, -0.002),
    (0.000, -0.003),
    (0.002, -0.003),
    (0.003, -0.001),
    (0.003, 0.001),
    (0.002, 0.003),
    (0.000, 0.003),
    (-0.001, 0.002),
    (0.000, 0.000),
];

/// Base pace for a car number when nothing is known about the driver.
fn base_lap_time(driver_number: u32) -> f64 {
    97. + (driver_number % 10) as f64 * 0.5
}

#[derive(Clone, Debug)]
pub struct SyntheticDataProvider {
    seed: u64,
}

impl SyntheticDataProvider {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    fn rng(&self, salt: u64) -> StdRng {
        StdRng::seed_from_u64(self.seed ^ salt.wrapping_mul(0x9E37_79B9_7F4A_7C15))
    }

    /// Stand-in driver list for a race without results.
    pub fn drivers(&self) -> Vec<DriverEntry> {
        [
            (13, 97.428, "45:15.035"),
            (22, 97.746, "45:17.775"),
            (72, 97.737, "45:25.690"),
            (55, 98.094, "45:26.144"),
            (2, 98.326, "45:29.124"),
        ]
        .into_iter()
        .enumerate()
        .map(|(i, (number, best_lap, total_time))| DriverEntry {
            id: number.to_string(),
            number: number.to_string(),
            vehicle: DEFAULT_VEHICLE.to_string(),
            class: DEFAULT_CLASS.to_string(),
            position: Some(i as u32 + 1),
            best_lap,
            total_time: total_time.to_string(),
        })
        .collect()
    }

    /// Ten laps around the car number's base pace with ±0.25s jitter,
    /// fastest first.
    pub fn laps(&self, driver_number: u32) -> Vec<LapRecord> {
        let mut rng = self.rng(driver_number as u64);
        let base = base_lap_time(driver_number);
        let mut laps: Vec<LapRecord> = (1..=10u32)
            .map(|i| {
                let jitter = (rng.gen_range(0.0..1.0) - 0.5) * 0.5;
                LapRecord::new(i, base + i as f64 * 0.1 + jitter)
            })
            .collect();
        sort_by_time(&mut laps);
        laps
    }

    /// Ten lap times trailing a known best lap.
    pub fn laps_around(&self, driver_number: u32, best_lap: f64) -> Vec<f64> {
        let mut rng = self.rng(driver_number as u64);
        (0..10)
            .map(|i| best_lap + i as f64 * 0.1 + rng.gen_range(0.0..1.0) * 0.3)
            .collect()
    }

    /// Jitter-free ten laps from the car number alone.
    pub fn formula_laps(&self, driver_number: u32) -> Vec<f64> {
        let base = base_lap_time(driver_number);
        (0..10).map(|i| base + i as f64 * 0.1).collect()
    }

    /// The reference circuit with a synthesized speed trace.
    pub fn reference_line(&self, salt: u64, offset: f64, optimal: bool) -> Vec<RacingLinePoint> {
        let mut rng = self.rng(salt);
        let (base_lat, base_lon) = TRACK_CENTER;
        let count = WAYPOINTS.len() as f64;

        WAYPOINTS
            .iter()
            .enumerate()
            .map(|(i, (dlat, dlon))| {
                let progress = i as f64 / count;
                let speed = 110.
                    + 20. * (progress * 2. * PI).sin()
                    + 10. * (progress * 6. * PI).sin()
                    + 5. * rng.gen_range(0.0..1.0);
                RacingLinePoint {
                    lat: base_lat + dlat * WAYPOINT_SCALE + offset * OFFSET_SCALE,
                    lon: base_lon + dlon * WAYPOINT_SCALE + offset * OFFSET_SCALE,
                    speed: speed.clamp(MIN_SPEED, MAX_SPEED),
                    optimal,
                }
            })
            .collect()
    }
}

impl LapSource for SyntheticDataProvider {
    fn driver_laps(&self, driver_number: u32) -> Option<Vec<LapRecord>> {
        Some(self.laps(driver_number))
    }
}
