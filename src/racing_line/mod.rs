// Racing line extraction, smoothing and improvement hints

pub mod smoothing;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

pub use smoothing::{ApexBiasSmoother, LineSmoother};

use crate::config::{EngineConfig, Geofence};
use crate::stats::mean;
use crate::synthetic::SyntheticDataProvider;
use crate::telemetry::TelemetrySample;

/// Time potential reported whenever the reference line stands in for real data
pub const FALLBACK_TIME_POTENTIAL: f64 = 2.5;
/// Points needed on both lines before they are compared
const MIN_COMPARABLE_POINTS: usize = 10;
const SPEED_SAMPLE_STEP: usize = 10;
const CORNER_SPEED_RATIO: f64 = 1.05;
/// Combined front and rear brake pressure considered heavy braking
const HEAVY_BRAKE_PRESSURE: f64 = 50.;
/// Share of heavy braking samples that triggers the braking hint
const HEAVY_BRAKE_SHARE: f64 = 0.3;
/// Offset applied to the reference generator for the optimal fallback line
const REFERENCE_OPTIMAL_OFFSET: f64 = 0.0001;

pub const CORNER_SPEED_HINT: &str = "Consider carrying more speed through corners";
pub const BRAKING_HINT: &str = "Reduce braking points - brake earlier and smoother";
pub const CONSISTENCY_HINT: &str = "Racing line looks good - focus on consistency";
pub const INSUFFICIENT_LINE_HINT: &str = "Insufficient data for line analysis";
pub const INSUFFICIENT_GPS_HINT: &str = "Insufficient GPS data - using sample racing line";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RacingLinePoint {
    pub lat: f64,
    pub lon: f64,
    pub speed: f64,
    pub optimal: bool,
}

/// A geofenced telemetry sample carrying what the line analysis needs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub lat: f64,
    pub lon: f64,
    pub speed: f64,
    pub steering: f64,
    pub acc_y: f64,
    pub brake_total: f64,
}

impl From<&TrackPoint> for RacingLinePoint {
    fn from(point: &TrackPoint) -> Self {
        Self {
            lat: point.lat,
            lon: point.lon,
            speed: point.speed,
            optimal: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RacingLineAnalysis {
    pub current_line: Vec<RacingLinePoint>,
    pub optimal_line: Vec<RacingLinePoint>,
    pub improvements: Vec<String>,
    /// Percent speed gain of the optimal line over the driven one
    pub time_potential: f64,
    /// Set when the lines are the generated reference line
    pub is_synthetic: bool,
}

/// Keep samples with a real GPS fix inside the geofence.
pub fn extract_track_points(telemetry: &[TelemetrySample], geofence: &Geofence) -> Vec<TrackPoint> {
    telemetry
        .iter()
        .filter(|s| s.lat != 0. && s.lon != 0. && geofence.contains(s.lat, s.lon))
        .map(|s| TrackPoint {
            lat: s.lat,
            lon: s.lon,
            speed: s.speed,
            steering: s.steering_angle,
            acc_y: s.acc_y,
            brake_total: s.brake_total(),
        })
        .collect()
}

pub fn suggest_improvements(current: &[TrackPoint], optimal: &[RacingLinePoint]) -> Vec<String> {
    if current.len() < MIN_COMPARABLE_POINTS || optimal.len() < MIN_COMPARABLE_POINTS {
        return vec![INSUFFICIENT_LINE_HINT.to_string()];
    }

    let mut suggestions = Vec::new();
    let avg_current = mean(current.iter().step_by(SPEED_SAMPLE_STEP).map(|p| p.speed));
    let avg_optimal = mean(optimal.iter().step_by(SPEED_SAMPLE_STEP).map(|p| p.speed));
    if let (Some(avg_current), Some(avg_optimal)) = (avg_current, avg_optimal) {
        if avg_optimal > avg_current * CORNER_SPEED_RATIO {
            suggestions.push(CORNER_SPEED_HINT.to_string());
        }
    }

    let heavy_braking = current
        .iter()
        .filter(|p| p.brake_total > HEAVY_BRAKE_PRESSURE)
        .count();
    if heavy_braking as f64 > current.len() as f64 * HEAVY_BRAKE_SHARE {
        suggestions.push(BRAKING_HINT.to_string());
    }

    if suggestions.is_empty() {
        suggestions.push(CONSISTENCY_HINT.to_string());
    }
    suggestions
}

/// Percent difference in mean speed between the optimal and driven lines.
pub fn estimate_time_gain(current: &[TrackPoint], optimal: &[RacingLinePoint]) -> f64 {
    if current.len() < MIN_COMPARABLE_POINTS || optimal.len() < MIN_COMPARABLE_POINTS {
        return 0.;
    }
    let current_avg = mean(current.iter().map(|p| p.speed)).unwrap_or(0.);
    let optimal_avg = mean(optimal.iter().map(|p| p.speed)).unwrap_or(0.);
    if current_avg == 0. {
        return 0.;
    }
    (optimal_avg - current_avg) / current_avg * 100.
}

pub struct RacingLineOptimizer {
    geofence: Geofence,
    min_samples: usize,
    min_points: usize,
    max_points: usize,
    smoother: Box<dyn LineSmoother>,
}

impl RacingLineOptimizer {
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_smoother(config, Box::new(ApexBiasSmoother::default()))
    }

    pub fn with_smoother(config: &EngineConfig, smoother: Box<dyn LineSmoother>) -> Self {
        Self {
            geofence: config.geofence,
            min_samples: config.racing_line_min_samples,
            min_points: config.racing_line_min_points,
            max_points: config.racing_line_max_points,
            smoother,
        }
    }

    /// Analyze a driver's line. With too little telemetry or GPS coverage the
    /// reference line from `synthetic` is returned instead, flagged synthetic.
    pub fn analyze(
        &self,
        telemetry: &[TelemetrySample],
        synthetic: &SyntheticDataProvider,
        salt: u64,
    ) -> RacingLineAnalysis {
        if telemetry.len() < self.min_samples {
            warn!(
                "Only {} telemetry samples, using the reference racing line",
                telemetry.len()
            );
            return self.reference_analysis(
                synthetic,
                salt,
                &[CORNER_SPEED_HINT, BRAKING_HINT],
            );
        }

        let points = extract_track_points(telemetry, &self.geofence);
        if points.len() < self.min_points {
            warn!(
                "Only {} of {} samples inside the geofence, using the reference racing line",
                points.len(),
                telemetry.len()
            );
            return self.reference_analysis(
                synthetic,
                salt,
                &[INSUFFICIENT_GPS_HINT, CORNER_SPEED_HINT],
            );
        }

        let optimal = self.smoother.optimal_line(&points);
        let improvements = suggest_improvements(&points, &optimal);
        let time_potential = estimate_time_gain(&points, &optimal);
        debug!(
            "Racing line from {} track points, time potential {:.2}%",
            points.len(),
            time_potential
        );

        RacingLineAnalysis {
            current_line: points
                .iter()
                .take(self.max_points)
                .map(RacingLinePoint::from)
                .collect(),
            optimal_line: optimal.into_iter().take(self.max_points).collect(),
            improvements,
            time_potential,
            is_synthetic: false,
        }
    }

    fn reference_analysis(
        &self,
        synthetic: &SyntheticDataProvider,
        salt: u64,
        improvements: &[&str],
    ) -> RacingLineAnalysis {
        let mut current_line = synthetic.reference_line(salt, 0., false);
        let mut optimal_line = synthetic.reference_line(salt, REFERENCE_OPTIMAL_OFFSET, true);
        current_line.truncate(self.max_points);
        optimal_line.truncate(self.max_points);
        RacingLineAnalysis {
            current_line,
            optimal_line,
            improvements: improvements.iter().map(|s| s.to_string()).collect(),
            time_potential: FALLBACK_TIME_POTENTIAL,
            is_synthetic: true,
        }
    }
}
