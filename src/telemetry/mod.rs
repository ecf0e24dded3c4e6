pub mod normalizer;
pub mod summary;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use normalizer::{NormalizerLimits, TelemetryNormalizer, TelemetryQuery};
pub use summary::{TelemetrySummary, summarize, weak_sectors};

use crate::errors::PaddockError;
use crate::table::{RawRow, record_to_row};

/// Canonical telemetry sample. Every field is `0` when the source had no
/// usable column for it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    pub timestamp: f64,
    /// Speed in km/h
    pub speed: f64,
    pub gear: i32,
    pub rpm: f64,
    /// Throttle blade angle, 0-100
    pub throttle: f64,
    /// Front brake pressure, bar
    pub brake_front: f64,
    /// Rear brake pressure, bar
    pub brake_rear: f64,
    /// Longitudinal acceleration, g
    pub acc_x: f64,
    /// Lateral acceleration, g
    pub acc_y: f64,
    pub steering_angle: f64,
    /// Latitude in decimal degrees
    pub lat: f64,
    /// Longitude in decimal degrees
    pub lon: f64,
    /// Meters traveled from S/F this lap
    pub lap_distance: f64,
}

impl TelemetrySample {
    /// Combined front and rear brake pressure.
    pub fn brake_total(&self) -> f64 {
        self.brake_front + self.brake_rear
    }
}

pub type RowChunk = Result<Vec<RawRow>, PaddockError>;

/// Something that can hand out raw telemetry rows in bounded chunks.
///
/// Every call to [`TelemetrySource::chunks`] starts reading from the top, so
/// independent queries never share reader state.
pub trait TelemetrySource: Send + Sync {
    fn chunks(
        &self,
        chunk_size: usize,
    ) -> Result<Box<dyn Iterator<Item = RowChunk> + '_>, PaddockError>;
}

/// Telemetry rows already held in memory.
#[derive(Clone, Debug, Default)]
pub struct InMemoryTelemetry {
    rows: Vec<RawRow>,
}

impl InMemoryTelemetry {
    pub fn new(rows: Vec<RawRow>) -> Self {
        Self { rows }
    }
}

impl TelemetrySource for InMemoryTelemetry {
    fn chunks(
        &self,
        chunk_size: usize,
    ) -> Result<Box<dyn Iterator<Item = RowChunk> + '_>, PaddockError> {
        Ok(Box::new(
            self.rows
                .chunks(chunk_size.max(1))
                .map(|chunk| Ok(chunk.to_vec())),
        ))
    }
}

/// A telemetry CSV on disk, streamed record by record.
#[derive(Clone, Debug)]
pub struct CsvTelemetryFile {
    path: PathBuf,
    delimiter: u8,
}

impl CsvTelemetryFile {
    pub fn new(path: PathBuf, delimiter: u8) -> Self {
        Self { path, delimiter }
    }
}

impl TelemetrySource for CsvTelemetryFile {
    fn chunks(
        &self,
        chunk_size: usize,
    ) -> Result<Box<dyn Iterator<Item = RowChunk> + '_>, PaddockError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(self.delimiter)
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| PaddockError::TelemetryReadError { source: e })?;
        let headers = reader
            .headers()
            .map_err(|e| PaddockError::TelemetryReadError { source: e })?
            .clone();

        let chunk_size = chunk_size.max(1);
        let mut records = reader.into_records();
        let mut exhausted = false;
        Ok(Box::new(std::iter::from_fn(move || {
            if exhausted {
                return None;
            }
            let mut rows = Vec::new();
            while rows.len() < chunk_size {
                match records.next() {
                    Some(Ok(record)) => rows.push(record_to_row(&headers, &record)),
                    Some(Err(e)) => {
                        exhausted = true;
                        return Some(Err(PaddockError::TelemetryReadError { source: e }));
                    }
                    None => {
                        exhausted = true;
                        break;
                    }
                }
            }
            if rows.is_empty() { None } else { Some(Ok(rows)) }
        })))
    }
}
