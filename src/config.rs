use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::PaddockError;

const CONFIG_DIR_NAME: &str = "paddock";
const CONFIG_FILE_NAME: &str = "config.json";

/// Latitude/longitude box treated as "on track". Bounds apply to absolute
/// values and are exclusive.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Geofence {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl Default for Geofence {
    fn default() -> Self {
        Self {
            lat_min: 33.,
            lat_max: 34.,
            lon_min: 86.,
            lon_max: 87.,
        }
    }
}

impl Geofence {
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        let (lat, lon) = (lat.abs(), lon.abs());
        self.lat_min < lat && lat < self.lat_max && self.lon_min < lon && lon < self.lon_max
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Rows per telemetry read chunk
    pub telemetry_chunk_rows: usize,
    /// Chunks read per telemetry query, rows beyond are never parsed
    pub telemetry_max_chunks: usize,
    /// Matched row count above which telemetry is downsampled
    pub telemetry_downsample_threshold: usize,
    /// Hard cap on samples returned for a telemetry query
    pub telemetry_max_samples: usize,
    pub default_sample_rate: usize,
    pub racing_line_sample_rate: usize,
    /// Raw samples required before attempting a racing line analysis
    pub racing_line_min_samples: usize,
    /// Geofenced points required before attempting a racing line analysis
    pub racing_line_min_points: usize,
    /// Cap on points per returned line
    pub racing_line_max_points: usize,
    pub geofence: Geofence,
    pub pit_stop_seconds: f64,
    /// Longest remaining race a pit stop plan is computed for
    pub max_remaining_laps: u32,
    /// Base lap time used when no result data exists
    pub default_base_lap_seconds: f64,
    /// Added to the mean best lap to estimate a race pace lap
    pub base_lap_offset_seconds: f64,
    /// Entries kept in the normalized telemetry cache
    pub cache_capacity: usize,
    /// Seed for every synthetic fallback generator
    pub synthetic_seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            telemetry_chunk_rows: 100_000,
            telemetry_max_chunks: 5,
            telemetry_downsample_threshold: 10_000,
            telemetry_max_samples: 5_000,
            default_sample_rate: 10,
            racing_line_sample_rate: 5,
            racing_line_min_samples: 100,
            racing_line_min_points: 50,
            racing_line_max_points: 200,
            geofence: Geofence::default(),
            pit_stop_seconds: 30.,
            max_remaining_laps: 1_000,
            default_base_lap_seconds: 100.,
            base_lap_offset_seconds: 2.5,
            cache_capacity: 64,
            synthetic_seed: 0x5EED_CAFE,
        }
    }
}

impl EngineConfig {
    pub fn default_path() -> Result<PathBuf, PaddockError> {
        Ok(dirs::config_dir()
            .ok_or(PaddockError::NoConfigDir)?
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME))
    }

    /// Load the config from an explicit path.
    pub fn from_path(path: &Path) -> Result<Self, PaddockError> {
        let file =
            std::fs::File::open(path).map_err(|e| PaddockError::ConfigIOError { source: e })?;
        serde_json::from_reader(file).map_err(|e| PaddockError::ConfigSerializeError { source: e })
    }

    /// Load the config from the application config directory, `None` when no
    /// config has been saved yet.
    pub fn from_local_file() -> Result<Option<Self>, PaddockError> {
        let config_path = Self::default_path()?;
        if config_path.exists() {
            debug!("Loading config from {:?}", config_path);
            Self::from_path(&config_path).map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), PaddockError> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| PaddockError::ConfigIOError { source: e })?;
            }
        }

        let file =
            std::fs::File::create(path).map_err(|e| PaddockError::ConfigIOError { source: e })?;
        serde_json::to_writer_pretty(file, self)
            .map_err(|e| PaddockError::ConfigSerializeError { source: e })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_geofence_uses_absolute_values() {
        let fence = Geofence::default();
        assert!(fence.contains(33.48, -86.65));
        assert!(fence.contains(-33.48, 86.65));
        assert!(!fence.contains(40.0, -86.65));
        assert!(!fence.contains(33.0, -86.65));
        assert!(!fence.contains(0., 0.));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join(CONFIG_FILE_NAME);

        let config = EngineConfig {
            pit_stop_seconds: 22.5,
            cache_capacity: 8,
            ..Default::default()
        };
        config.save(&path).unwrap();

        assert_eq!(EngineConfig::from_path(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, r#"{ "telemetry_max_samples": 100 }"#).unwrap();

        let config = EngineConfig::from_path(&path).unwrap();
        assert_eq!(config.telemetry_max_samples, 100);
        assert_eq!(config.racing_line_max_points, 200);
        assert_eq!(config.geofence, Geofence::default());
    }

    #[test]
    fn test_malformed_file_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "not json").unwrap();

        assert!(matches!(
            EngineConfig::from_path(&path),
            Err(PaddockError::ConfigSerializeError { .. })
        ));
    }
}
