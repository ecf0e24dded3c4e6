// Error types for paddock

use snafu::Snafu;
use std::io;

#[derive(Debug, Snafu)]
pub enum PaddockError {
    // Caller input errors, surfaced as client errors by the API layer
    #[snafu(display("Invalid driver id '{driver_id}': expected a car number"))]
    InvalidDriverId { driver_id: String },
    #[snafu(display(
        "Invalid lap bounds: current lap {current_lap}, total laps {total_laps}"
    ))]
    InvalidLapBounds { current_lap: u32, total_laps: u32 },
    #[snafu(display("Invalid sample rate {sample_rate}: must be at least 1"))]
    InvalidSampleRate { sample_rate: usize },
    #[snafu(display("Invalid tire degradation rate {rate}: must be a finite, non-negative fraction"))]
    InvalidDegradationRate { rate: f64 },
    #[snafu(display("No driver ids supplied for comparison"))]
    EmptyDriverList,
    #[snafu(display("Invalid delimiter '{delimiter}': must be a single ASCII character"))]
    InvalidDelimiter { delimiter: char },

    // Missing data that cannot be substituted
    #[snafu(display("No lap data found for driver {driver_id}"))]
    NoLapData { driver_id: String },

    // Errors while reading source tables
    #[snafu(display("Error reading table {path}"))]
    TableReadError { path: String, source: csv::Error },
    #[snafu(display("Error reading telemetry rows"))]
    TelemetryReadError { source: csv::Error },

    // Config management errors
    #[snafu(display("Could not find application config directory"))]
    NoConfigDir,
    #[snafu(display("Error reading or writing config file"))]
    ConfigIOError { source: io::Error },
    #[snafu(display("Error serializing config file"))]
    ConfigSerializeError { source: serde_json::Error },

    // CLI output errors
    #[snafu(display("Error writing output"))]
    OutputError { source: io::Error },
}
