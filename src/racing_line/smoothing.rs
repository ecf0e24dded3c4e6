use std::f64::consts::PI;

use super::{RacingLinePoint, TrackPoint};

/// Turns a driven line into a candidate optimal line.
///
/// The output has one point per input point, in the same order.
pub trait LineSmoother: Send + Sync {
    fn optimal_line(&self, points: &[TrackPoint]) -> Vec<RacingLinePoint>;
}

/// Moving average over a centered window with a sinusoidal latitude bias that
/// imitates cutting the apex. Speed is the window maximum scaled up.
///
/// This is a geometric heuristic, not a lap-time optimal solver.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ApexBiasSmoother {
    pub window_radius: usize,
    /// Peak latitude shift in degrees
    pub apex_offset: f64,
    pub speed_gain: f64,
}

impl Default for ApexBiasSmoother {
    fn default() -> Self {
        Self {
            window_radius: 5,
            apex_offset: 0.00002,
            speed_gain: 1.05,
        }
    }
}

impl LineSmoother for ApexBiasSmoother {
    fn optimal_line(&self, points: &[TrackPoint]) -> Vec<RacingLinePoint> {
        let n = points.len();
        (0..n)
            .map(|i| {
                let start = i.saturating_sub(self.window_radius);
                let end = (i + self.window_radius + 1).min(n);
                let window = &points[start..end];
                let len = window.len() as f64;
                let avg_lat = window.iter().map(|p| p.lat).sum::<f64>() / len;
                let avg_lon = window.iter().map(|p| p.lon).sum::<f64>() / len;
                let max_speed = window
                    .iter()
                    .map(|p| p.speed)
                    .fold(f64::NEG_INFINITY, f64::max);

                let progress = i as f64 / n as f64;
                let turn_bias = (progress * 4. * PI).sin().abs() * self.apex_offset;

                RacingLinePoint {
                    lat: avg_lat + turn_bias,
                    lon: avg_lon,
                    speed: max_speed * self.speed_gain,
                    optimal: true,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(lat: f64, lon: f64, speed: f64) -> TrackPoint {
        TrackPoint {
            lat,
            lon,
            speed,
            ..Default::default()
        }
    }

    #[test]
    fn test_one_output_per_input() {
        let points: Vec<TrackPoint> = (0..37).map(|i| point(33.48, -86.65, i as f64)).collect();
        assert_eq!(ApexBiasSmoother::default().optimal_line(&points).len(), 37);
        assert!(ApexBiasSmoother::default().optimal_line(&[]).is_empty());
    }

    #[test]
    fn test_window_max_speed_and_gain() {
        let mut points: Vec<TrackPoint> = (0..20).map(|_| point(33.48, -86.65, 100.)).collect();
        points[10].speed = 120.;

        let line = ApexBiasSmoother::default().optimal_line(&points);
        // index 5 and 15 reach index 10 with radius 5, index 4 and 16 do not
        assert!((line[5].speed - 126.).abs() < 1e-9);
        assert!((line[15].speed - 126.).abs() < 1e-9);
        assert!((line[4].speed - 105.).abs() < 1e-9);
        assert!((line[16].speed - 105.).abs() < 1e-9);
        assert!(line.iter().all(|p| p.optimal));
    }

    #[test]
    fn test_bias_only_moves_latitude() {
        let points: Vec<TrackPoint> = (0..40).map(|_| point(33.48, -86.65, 100.)).collect();
        let line = ApexBiasSmoother::default().optimal_line(&points);

        // progress 0 and 0.25 sit on zeros of |sin(4 pi p)|
        assert!((line[0].lat - 33.48).abs() < 1e-12);
        assert!((line[10].lat - 33.48).abs() < 1e-12);
        // progress 0.125 is a peak
        assert!((line[5].lat - (33.48 + 0.00002)).abs() < 1e-12);
        assert!(line.iter().all(|p| (p.lon + 86.65).abs() < 1e-12));
    }
}
