// Library interface for paddock
// The binary and the integration tests both go through these modules

pub mod analysis;
pub mod cache;
pub mod config;
pub mod engine;
pub mod errors;
pub mod insights;
pub mod laps;
pub mod racing_line;
pub mod results;
pub mod stats;
pub mod strategy;
pub mod synthetic;
pub mod table;
pub mod telemetry;
pub mod writer;

// Re-export commonly used types
pub use analysis::{DriverAnalysis, DriverComparison, DriverSummary, Trend};
pub use config::EngineConfig;
pub use engine::{AnalyticsEngine, RaceData};
pub use errors::PaddockError;
pub use insights::{Impact, Insight, InsightType};
pub use laps::{LapRecord, LapSet, format_lap_time, parse_lap_time};
pub use racing_line::{RacingLineAnalysis, RacingLinePoint};
pub use results::{DriverEntry, DriverList};
pub use strategy::{PitStopPlan, StrategyType};
pub use table::{RawRow, RawValue, read_table};
pub use telemetry::{CsvTelemetryFile, InMemoryTelemetry, TelemetrySample, TelemetrySource};
