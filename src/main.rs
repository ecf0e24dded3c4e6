use std::{io, path::PathBuf};

use clap::{Parser, Subcommand};
use log::info;
use paddock::{
    AnalyticsEngine, CsvTelemetryFile, EngineConfig, PaddockError, RaceData, read_table,
    strategy::DEFAULT_DEGRADATION_RATE,
    table::delimiter_byte,
    writer::{write_json_lines, write_pretty},
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    /// Race results table
    #[arg(long, global = true)]
    results: Option<PathBuf>,

    /// Best 10 laps by driver table
    #[arg(long, global = true)]
    best_laps: Option<PathBuf>,

    /// Telemetry table (comma separated)
    #[arg(long, global = true)]
    telemetry: Option<PathBuf>,

    #[arg(long, global = true, default_value = "R1")]
    race_id: String,

    /// Engine config file, defaults to the user config directory
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Field delimiter of the results and best laps tables
    #[arg(long, global = true, default_value_t = ';')]
    delimiter: char,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the drivers of the race
    Drivers,
    /// A driver's laps, fastest first
    Laps { driver_id: String },
    Telemetry {
        driver_id: String,

        #[arg(short, long)]
        lap: Option<u32>,

        #[arg(short, long)]
        sample_rate: Option<usize>,

        /// Write samples as JSON lines instead of printing them
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Lap and telemetry analysis of one driver
    Analyze { driver_id: String },
    RacingLine { driver_id: String },
    Compare {
        #[arg(required = true, value_delimiter = ',')]
        driver_ids: Vec<String>,
    },
    PitStop {
        #[arg(long)]
        current_lap: u32,

        #[arg(long)]
        total_laps: u32,

        #[arg(long, default_value_t = DEFAULT_DEGRADATION_RATE)]
        degradation_rate: f64,
    },
    Insights,
    /// Write the default engine config
    InitConfig {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<EngineConfig, PaddockError> {
    match path {
        Some(path) => EngineConfig::from_path(path),
        None => Ok(EngineConfig::from_local_file()?.unwrap_or_default()),
    }
}

fn load_race(args: &Args) -> Result<RaceData, PaddockError> {
    let delimiter = delimiter_byte(args.delimiter)?;
    let mut race = RaceData::new(args.race_id.clone());
    if let Some(path) = &args.results {
        race = race.with_results(read_table(path, delimiter)?);
    }
    if let Some(path) = &args.best_laps {
        race = race.with_best_laps(read_table(path, delimiter)?);
    }
    if let Some(path) = &args.telemetry {
        race = race.with_telemetry(Box::new(CsvTelemetryFile::new(path.clone(), b',')));
    }
    Ok(race)
}

fn run(args: Args) -> Result<(), PaddockError> {
    if let Commands::InitConfig { output } = &args.command {
        let path = match output {
            Some(path) => path.clone(),
            None => EngineConfig::default_path()?,
        };
        EngineConfig::default().save(&path)?;
        info!("Wrote default config to {}", path.display());
        return Ok(());
    }

    let config = load_config(args.config.as_ref())?;
    let engine = AnalyticsEngine::new(load_race(&args)?, config);
    let stdout = io::stdout().lock();

    match &args.command {
        Commands::Drivers => write_pretty(stdout, &engine.drivers()),
        Commands::Laps { driver_id } => write_pretty(stdout, &engine.driver_laps(driver_id)?),
        Commands::Telemetry {
            driver_id,
            lap,
            sample_rate,
            output,
        } => {
            let sample_rate = sample_rate.unwrap_or(engine.config().default_sample_rate);
            let samples = engine.telemetry(driver_id, *lap, sample_rate)?;
            match output {
                Some(path) => write_json_lines(path, samples.as_slice()),
                None => write_pretty(stdout, &*samples),
            }
        }
        Commands::Analyze { driver_id } => {
            write_pretty(stdout, &engine.analyze_driver(driver_id)?)
        }
        Commands::RacingLine { driver_id } => {
            write_pretty(stdout, &engine.analyze_racing_line(driver_id)?)
        }
        Commands::Compare { driver_ids } => {
            write_pretty(stdout, &engine.compare_drivers(driver_ids)?)
        }
        Commands::PitStop {
            current_lap,
            total_laps,
            degradation_rate,
        } => write_pretty(
            stdout,
            &engine.pit_stop_strategy(*current_lap, *total_laps, *degradation_rate)?,
        ),
        Commands::Insights => write_pretty(stdout, &engine.race_insights()),
        Commands::InitConfig { .. } => Ok(()),
    }
}

fn main() {
    colog::init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
