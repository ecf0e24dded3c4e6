use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::errors::PaddockError;
use crate::table::{RawRow, RowExt, chunk_has_column};

use super::{TelemetrySample, TelemetrySource};

// Raw column aliases per canonical field, in priority order
const TIMESTAMP_COLUMNS: &[&str] = &["timestamp", "meta_time"];
const SPEED_COLUMNS: &[&str] = &["Speed"];
const GEAR_COLUMNS: &[&str] = &["Gear"];
const RPM_COLUMNS: &[&str] = &["nmot"];
const THROTTLE_COLUMNS: &[&str] = &["ath"];
const BRAKE_FRONT_COLUMNS: &[&str] = &["pbrake_f"];
const BRAKE_REAR_COLUMNS: &[&str] = &["pbrake_r"];
const ACC_X_COLUMNS: &[&str] = &["accx_can"];
const ACC_Y_COLUMNS: &[&str] = &["accy_can"];
const STEERING_COLUMNS: &[&str] = &["Steering_Angle"];
const LAT_COLUMNS: &[&str] = &["VBOX_Lat_Min", "VBOX_Lat"];
const LON_COLUMNS: &[&str] = &["VBOX_Long_Minutes", "VBOX_Long"];
const LAP_DISTANCE_COLUMNS: &[&str] = &["Laptrigger_lapdist_dls"];

const VEHICLE_COLUMNS: &[&str] = &["vehicle_id", "vehicle_number", "original_vehicle_id"];
const LAP_COLUMN: &str = "lap";

/// What telemetry to pull for one request.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TelemetryQuery {
    /// Matched as a substring of the raw vehicle identifier
    pub driver_id: String,
    pub lap: Option<u32>,
    /// Keep every Nth row once the matched volume is high
    pub sample_rate: usize,
}

impl TelemetryQuery {
    pub fn new(driver_id: impl Into<String>, lap: Option<u32>, sample_rate: usize) -> Self {
        Self {
            driver_id: driver_id.into(),
            lap,
            sample_rate,
        }
    }
}

/// Hard ceilings on how much telemetry a single query may touch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NormalizerLimits {
    pub chunk_rows: usize,
    pub max_chunks: usize,
    pub downsample_threshold: usize,
    pub max_samples: usize,
}

impl Default for NormalizerLimits {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for NormalizerLimits {
    fn from(config: &EngineConfig) -> Self {
        Self {
            chunk_rows: config.telemetry_chunk_rows,
            max_chunks: config.telemetry_max_chunks,
            downsample_threshold: config.telemetry_downsample_threshold,
            max_samples: config.telemetry_max_samples,
        }
    }
}

/// Maps heterogeneous raw telemetry rows onto [`TelemetrySample`].
pub struct TelemetryNormalizer {
    limits: NormalizerLimits,
}

impl TelemetryNormalizer {
    pub fn new(limits: NormalizerLimits) -> Self {
        Self { limits }
    }

    /// Normalize telemetry for a query. Read failures and empty matches both
    /// yield an empty sequence.
    pub fn normalize(
        &self,
        source: &dyn TelemetrySource,
        query: &TelemetryQuery,
    ) -> Vec<TelemetrySample> {
        match self.try_normalize(source, query) {
            Ok(samples) => samples,
            Err(e) => {
                warn!(
                    "Could not read telemetry for driver {}, returning no samples: {}",
                    query.driver_id, e
                );
                Vec::new()
            }
        }
    }

    pub fn try_normalize(
        &self,
        source: &dyn TelemetrySource,
        query: &TelemetryQuery,
    ) -> Result<Vec<TelemetrySample>, PaddockError> {
        let mut matched: Vec<RawRow> = Vec::new();
        for chunk in source
            .chunks(self.limits.chunk_rows)?
            .take(self.limits.max_chunks)
        {
            matched.extend(filter_chunk(chunk?, query));
        }

        if matched.is_empty() {
            debug!(
                "No telemetry rows matched driver {} lap {:?}",
                query.driver_id, query.lap
            );
            return Ok(Vec::new());
        }

        let step = if matched.len() > self.limits.downsample_threshold {
            query.sample_rate.max(1)
        } else {
            1
        };
        debug!(
            "Normalizing {} telemetry rows for driver {} (every {} row)",
            matched.len(),
            query.driver_id,
            step
        );

        Ok(matched
            .iter()
            .step_by(step)
            .take(self.limits.max_samples)
            .map(sample_from_row)
            .collect())
    }
}

/// Keep the rows of a chunk that belong to the queried car and lap.
///
/// Columns are resolved per chunk: a chunk without any vehicle column is not
/// filtered by vehicle, one without a lap column is not filtered by lap.
fn filter_chunk(mut chunk: Vec<RawRow>, query: &TelemetryQuery) -> Vec<RawRow> {
    if let Some(column) = VEHICLE_COLUMNS
        .iter()
        .find(|column| chunk_has_column(&chunk, column))
    {
        chunk.retain(|row| {
            row.text(column)
                .is_some_and(|vehicle| vehicle.contains(query.driver_id.as_str()))
        });
    }

    if let Some(lap) = query.lap {
        if chunk_has_column(&chunk, LAP_COLUMN) {
            chunk.retain(|row| row.number(LAP_COLUMN) == Some(lap as f64));
        }
    }
    chunk
}

pub fn sample_from_row(row: &RawRow) -> TelemetrySample {
    let field = |aliases: &[&str]| row.first_number(aliases).unwrap_or(0.);
    TelemetrySample {
        timestamp: field(TIMESTAMP_COLUMNS),
        speed: field(SPEED_COLUMNS),
        gear: field(GEAR_COLUMNS) as i32,
        rpm: field(RPM_COLUMNS),
        throttle: field(THROTTLE_COLUMNS),
        brake_front: field(BRAKE_FRONT_COLUMNS),
        brake_rear: field(BRAKE_REAR_COLUMNS),
        acc_x: field(ACC_X_COLUMNS),
        acc_y: field(ACC_Y_COLUMNS),
        steering_angle: field(STEERING_COLUMNS),
        lat: field(LAT_COLUMNS),
        lon: field(LON_COLUMNS),
        lap_distance: field(LAP_DISTANCE_COLUMNS),
    }
}
