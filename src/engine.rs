// Facade tying the analysis components to one race's data

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use log::{debug, info, warn};

use crate::analysis::comparison::{ComparisonEntry, DriverComparison};
use crate::analysis::{DriverAnalysis, DriverSummaryBuilder, strengths};
use crate::cache::{AnalysisCache, CacheKey};
use crate::config::EngineConfig;
use crate::errors::PaddockError;
use crate::insights::{Insight, InsightGenerator};
use crate::laps::{BestLapsTable, LapSet, LapSource, is_valid_lap_time};
use crate::racing_line::{RacingLineAnalysis, RacingLineOptimizer};
use crate::results::{DriverList, ResultsTable};
use crate::strategy::{PitStopPlan, PitStopSimulator, RaceState, base_lap_estimate};
use crate::synthetic::SyntheticDataProvider;
use crate::table::RawRow;
use crate::telemetry::{
    NormalizerLimits, TelemetryNormalizer, TelemetryQuery, TelemetrySample, TelemetrySource,
    summarize, weak_sectors,
};

type SharedSamples = Arc<Vec<TelemetrySample>>;

/// Everything the ingestion layer resolved for one race.
#[derive(Default)]
pub struct RaceData {
    pub race_id: String,
    pub results: Option<ResultsTable>,
    pub best_laps: Option<BestLapsTable>,
    pub telemetry: Option<Box<dyn TelemetrySource>>,
}

impl RaceData {
    pub fn new(race_id: impl Into<String>) -> Self {
        Self {
            race_id: race_id.into(),
            ..Default::default()
        }
    }

    pub fn with_results(mut self, rows: Vec<RawRow>) -> Self {
        self.results = Some(ResultsTable::new(rows));
        self
    }

    pub fn with_best_laps(mut self, rows: Vec<RawRow>) -> Self {
        self.best_laps = Some(BestLapsTable::new(rows));
        self
    }

    pub fn with_telemetry(mut self, source: Box<dyn TelemetrySource>) -> Self {
        self.telemetry = Some(source);
        self
    }
}

/// Driver ids are car numbers.
pub fn parse_driver_id(driver_id: &str) -> Result<u32, PaddockError> {
    driver_id
        .trim()
        .parse::<u32>()
        .map_err(|_| PaddockError::InvalidDriverId {
            driver_id: driver_id.to_string(),
        })
}

pub struct AnalyticsEngine {
    config: EngineConfig,
    race_id: String,
    results: Option<ResultsTable>,
    best_laps: Option<BestLapsTable>,
    telemetry: RwLock<Option<Arc<dyn TelemetrySource>>>,
    /// Bumped under the telemetry write lock on every replacement
    telemetry_generation: AtomicU64,
    normalizer: TelemetryNormalizer,
    optimizer: RacingLineOptimizer,
    simulator: PitStopSimulator,
    synthetic: SyntheticDataProvider,
    cache: Mutex<AnalysisCache<CacheKey, SharedSamples>>,
}

impl AnalyticsEngine {
    pub fn new(race: RaceData, config: EngineConfig) -> Self {
        info!(
            "Loaded race {} (results: {}, best laps: {}, telemetry: {})",
            race.race_id,
            race.results.is_some(),
            race.best_laps.is_some(),
            race.telemetry.is_some()
        );
        Self {
            normalizer: TelemetryNormalizer::new(NormalizerLimits::from(&config)),
            optimizer: RacingLineOptimizer::new(&config),
            simulator: PitStopSimulator::from_config(&config),
            synthetic: SyntheticDataProvider::new(config.synthetic_seed),
            cache: Mutex::new(AnalysisCache::new(config.cache_capacity)),
            race_id: race.race_id,
            results: race.results,
            best_laps: race.best_laps,
            telemetry: RwLock::new(race.telemetry.map(Arc::from)),
            telemetry_generation: AtomicU64::new(0),
            config,
        }
    }

    pub fn race_id(&self) -> &str {
        &self.race_id
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Swap the telemetry source and drop every cached sample set of this race.
    pub fn replace_telemetry(&self, source: Option<Box<dyn TelemetrySource>>) {
        {
            let mut telemetry = self
                .telemetry
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            *telemetry = source.map(Arc::from);
            self.telemetry_generation.fetch_add(1, Ordering::SeqCst);
        }
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .invalidate(|key| key.race_id == self.race_id);
        info!("Replaced telemetry for race {}", self.race_id);
    }

    pub fn drivers(&self) -> DriverList {
        match self.results.as_ref().filter(|r| !r.is_empty()) {
            Some(results) => DriverList {
                drivers: results.drivers(),
                is_synthetic: false,
            },
            None => {
                warn!(
                    "No results for race {}, using placeholder drivers",
                    self.race_id
                );
                DriverList {
                    drivers: self.synthetic.drivers(),
                    is_synthetic: true,
                }
            }
        }
    }

    /// A driver's laps, fastest first. Unknown drivers get placeholder laps.
    pub fn driver_laps(&self, driver_id: &str) -> Result<LapSet, PaddockError> {
        let number = parse_driver_id(driver_id)?;
        Ok(self.laps_for_number(number))
    }

    fn laps_for_number(&self, number: u32) -> LapSet {
        match self
            .best_laps
            .as_ref()
            .and_then(|table| table.driver_laps(number))
        {
            Some(laps) => LapSet::recorded(laps),
            None => {
                warn!("No lap data for driver {number}, using placeholder laps");
                LapSet::synthetic(self.synthetic.laps(number))
            }
        }
    }

    pub fn telemetry(
        &self,
        driver_id: &str,
        lap: Option<u32>,
        sample_rate: usize,
    ) -> Result<SharedSamples, PaddockError> {
        parse_driver_id(driver_id)?;
        if sample_rate == 0 {
            return Err(PaddockError::InvalidSampleRate { sample_rate });
        }

        let key = CacheKey {
            race_id: self.race_id.clone(),
            driver_id: driver_id.trim().to_string(),
            lap,
            sample_rate,
        };
        if let Some(samples) = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            debug!("Telemetry cache hit for driver {}", key.driver_id);
            return Ok(samples);
        }

        let (source, generation) = {
            let telemetry = self
                .telemetry
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            (
                telemetry.clone(),
                self.telemetry_generation.load(Ordering::SeqCst),
            )
        };
        let samples = match source {
            Some(source) => {
                let query = TelemetryQuery::new(key.driver_id.as_str(), lap, sample_rate);
                Arc::new(self.normalizer.normalize(&*source, &query))
            }
            None => {
                warn!("No telemetry for race {}", self.race_id);
                Arc::new(Vec::new())
            }
        };

        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        // a replacement during normalization makes these samples stale
        if self.telemetry_generation.load(Ordering::SeqCst) == generation {
            cache.insert(key, samples.clone());
        } else {
            debug!("Telemetry replaced while reading, not caching");
        }
        Ok(samples)
    }

    pub fn analyze_driver(&self, driver_id: &str) -> Result<DriverAnalysis, PaddockError> {
        let laps = self.driver_laps(driver_id)?;
        let summary = DriverSummaryBuilder::build(driver_id.trim(), &laps.laps).ok_or_else(|| {
            PaddockError::NoLapData {
                driver_id: driver_id.to_string(),
            }
        })?;
        let telemetry = self.telemetry(driver_id, None, self.config.default_sample_rate)?;

        Ok(DriverAnalysis {
            summary,
            telemetry_summary: summarize(&telemetry),
            weak_sectors: weak_sectors(&telemetry),
            strengths: strengths(&telemetry, &laps.valid_times()),
            is_synthetic: laps.is_synthetic,
        })
    }

    pub fn analyze_racing_line(&self, driver_id: &str) -> Result<RacingLineAnalysis, PaddockError> {
        let number = parse_driver_id(driver_id)?;
        let telemetry = self.telemetry(driver_id, None, self.config.racing_line_sample_rate)?;
        Ok(self
            .optimizer
            .analyze(&telemetry, &self.synthetic, number as u64))
    }

    pub fn compare_drivers(&self, driver_ids: &[String]) -> Result<DriverComparison, PaddockError> {
        if driver_ids.is_empty() {
            return Err(PaddockError::EmptyDriverList);
        }
        let numbers = driver_ids
            .iter()
            .map(|id| parse_driver_id(id).map(|n| (id.trim(), n)))
            .collect::<Result<Vec<_>, _>>()?;

        let drivers = self.drivers();
        let mut comparison = DriverComparison::default();
        for (driver_id, number) in &numbers {
            let laps = self.laps_for_number(*number);
            let times = laps.valid_times();
            if let Some(entry) =
                ComparisonEntry::from_times(driver_id, &times, laps.laps.len(), laps.is_synthetic)
            {
                comparison.push(entry);
                continue;
            }

            // recorded but empty, fall back on the driver list's best lap
            let known_best = drivers
                .drivers
                .iter()
                .find(|d| d.id == *driver_id)
                .map(|d| d.best_lap)
                .filter(|best| is_valid_lap_time(*best));
            if let Some(best) = known_best {
                let times = self.synthetic.laps_around(*number, best);
                if let Some(mut entry) =
                    ComparisonEntry::from_times(driver_id, &times, times.len(), true)
                {
                    entry.best_lap = best;
                    comparison.push(entry);
                }
            } else {
                debug!("Driver {driver_id} has no usable laps for comparison");
            }
        }

        if comparison.is_empty() {
            warn!("No comparable laps for any driver, using formula laps");
            for (driver_id, number) in &numbers {
                let times = self.synthetic.formula_laps(*number);
                if let Some(entry) =
                    ComparisonEntry::from_times(driver_id, &times, times.len(), true)
                {
                    comparison.push(entry);
                }
            }
        }
        Ok(comparison)
    }

    pub fn pit_stop_strategy(
        &self,
        current_lap: u32,
        total_laps: u32,
        degradation_rate: f64,
    ) -> Result<PitStopPlan, PaddockError> {
        self.simulator.plan(&RaceState {
            current_lap,
            total_laps,
            degradation_rate,
            base_lap_time: base_lap_estimate(self.results.as_ref(), &self.config),
        })
    }

    pub fn race_insights(&self) -> Vec<Insight> {
        let drivers = self.drivers();
        InsightGenerator::new(self.results.as_ref(), &drivers.drivers).generate(|driver_id| {
            match parse_driver_id(driver_id) {
                Ok(number) => self.laps_for_number(number),
                Err(_) => LapSet::default(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::StrategyType;
    use crate::table::RawValue;
    use crate::telemetry::{InMemoryTelemetry, RowChunk};
    use std::sync::mpsc;
    use std::thread;

    fn row(cells: &[(&str, &str)]) -> RawRow {
        cells
            .iter()
            .map(|(k, v)| (k.to_string(), RawValue::from_field(v)))
            .collect()
    }

    fn telemetry_rows(vehicle: &str, count: usize) -> Vec<RawRow> {
        (0..count)
            .map(|i| {
                let mut r = row(&[("vehicle_id", vehicle), ("lap", "1")]);
                r.insert("Speed".to_string(), RawValue::from(100. + (i % 40) as f64));
                r.insert("VBOX_Lat_Min".to_string(), RawValue::from(33.48 + i as f64 * 1e-6));
                r.insert("VBOX_Long_Minutes".to_string(), RawValue::from(-86.65));
                r
            })
            .collect()
    }

    fn engine() -> AnalyticsEngine {
        let race = RaceData::new("R1")
            .with_results(vec![
                row(&[("POSITION", "1"), ("NUMBER", "13"), ("FL_TIME", "1:37.000")]),
                row(&[("POSITION", "2"), ("NUMBER", "22"), ("FL_TIME", "1:39.000")]),
            ])
            .with_best_laps(vec![
                row(&[
                    ("NUMBER", "13"),
                    ("BESTLAP_1", "1:37.500"),
                    ("BESTLAP_1_LAPNUM", "2"),
                    ("BESTLAP_2", "1:36.900"),
                    ("BESTLAP_2_LAPNUM", "5"),
                    ("BESTLAP_3", "1:38.100"),
                    ("BESTLAP_3_LAPNUM", "9"),
                ]),
                row(&[("NUMBER", "22"), ("BESTLAP_1", "garbage")]),
            ])
            .with_telemetry(Box::new(InMemoryTelemetry::new(telemetry_rows(
                "GR86-002-13",
                300,
            ))));
        AnalyticsEngine::new(race, EngineConfig::default())
    }

    #[test]
    fn test_invalid_driver_ids() {
        let engine = engine();
        assert!(matches!(
            engine.driver_laps("abc"),
            Err(PaddockError::InvalidDriverId { .. })
        ));
        assert!(engine.telemetry("x1", None, 10).is_err());
        assert!(matches!(
            engine.telemetry("13", None, 0),
            Err(PaddockError::InvalidSampleRate { .. })
        ));
        assert!(matches!(
            engine.compare_drivers(&[]),
            Err(PaddockError::EmptyDriverList)
        ));
    }

    #[test]
    fn test_recorded_and_placeholder_laps() {
        let engine = engine();
        let laps = engine.driver_laps("13").unwrap();
        assert!(!laps.is_synthetic);
        assert_eq!(laps.laps[0].lap_number, 5);
        assert_eq!(laps.laps[0].formatted, "1:36.900");

        let missing = engine.driver_laps("99").unwrap();
        assert!(missing.is_synthetic);
        assert_eq!(missing.laps.len(), 10);

        let empty = engine.driver_laps("22").unwrap();
        assert!(!empty.is_synthetic);
        assert!(empty.laps.is_empty());
    }

    #[test]
    fn test_analyze_driver() {
        let analysis = engine().analyze_driver("13").unwrap();
        assert!((analysis.summary.best_lap_time - 96.9).abs() < 1e-9);
        assert_eq!(analysis.summary.lap_count, 3);
        assert!(!analysis.is_synthetic);
        assert!(analysis.telemetry_summary.max_speed > 130.);
        assert!(
            analysis
                .strengths
                .contains(&"High top speed achieved".to_string())
        );

        assert!(matches!(
            engine().analyze_driver("22"),
            Err(PaddockError::NoLapData { .. })
        ));
    }

    #[test]
    fn test_telemetry_is_cached_until_replaced() {
        let engine = engine();
        let first = engine.telemetry("13", Some(1), 10).unwrap();
        let second = engine.telemetry("13", Some(1), 10).unwrap();
        assert_eq!(first.len(), 300);
        assert!(Arc::ptr_eq(&first, &second));

        engine.replace_telemetry(None);
        assert!(engine.telemetry("13", Some(1), 10).unwrap().is_empty());
    }

    /// Blocks inside `chunks` until released, to replace telemetry mid-read.
    struct GatedTelemetry {
        inner: InMemoryTelemetry,
        entered: mpsc::Sender<()>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl TelemetrySource for GatedTelemetry {
        fn chunks(
            &self,
            chunk_size: usize,
        ) -> Result<Box<dyn Iterator<Item = RowChunk> + '_>, PaddockError> {
            self.entered.send(()).unwrap();
            self.release.lock().unwrap().recv().unwrap();
            self.inner.chunks(chunk_size)
        }
    }

    fn speed_rows(speed: f64, count: usize) -> Vec<RawRow> {
        (0..count)
            .map(|_| {
                let mut r = row(&[("vehicle_id", "GR86-002-13"), ("lap", "1")]);
                r.insert("Speed".to_string(), RawValue::from(speed));
                r
            })
            .collect()
    }

    #[test]
    fn test_replacement_during_read_is_not_cached() {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let gated = GatedTelemetry {
            inner: InMemoryTelemetry::new(speed_rows(1., 20)),
            entered: entered_tx,
            release: Mutex::new(release_rx),
        };
        let engine = AnalyticsEngine::new(
            RaceData::new("R1").with_telemetry(Box::new(gated)),
            EngineConfig::default(),
        );

        let stale = thread::scope(|scope| {
            let reader = scope.spawn(|| engine.telemetry("13", None, 10).unwrap());
            entered_rx.recv().unwrap();
            engine.replace_telemetry(Some(Box::new(InMemoryTelemetry::new(speed_rows(2., 20)))));
            release_tx.send(()).unwrap();
            reader.join().unwrap()
        });
        assert_eq!(stale[0].speed, 1.);

        let fresh = engine.telemetry("13", None, 10).unwrap();
        assert_eq!(fresh.len(), 20);
        assert!(fresh.iter().all(|s| s.speed == 2.));
    }

    #[test]
    fn test_racing_line_uses_telemetry() {
        let analysis = engine().analyze_racing_line("13").unwrap();
        assert!(!analysis.is_synthetic);
        assert_eq!(analysis.current_line.len(), 200);

        let fallback = engine().analyze_racing_line("99").unwrap();
        assert!(fallback.is_synthetic);
        assert_eq!(fallback.time_potential, 2.5);
        assert!(!fallback.improvements.is_empty());
    }

    #[test]
    fn test_compare_drivers_fallbacks() {
        let engine = engine();
        let ids = vec!["13".to_string(), "22".to_string()];
        let comparison = engine.compare_drivers(&ids).unwrap();
        assert_eq!(comparison.drivers.len(), 2);
        assert!(!comparison.drivers[0].is_synthetic);
        // 22 has no valid laps, its entry is built around its fastest lap
        assert!(comparison.drivers[1].is_synthetic);
        assert_eq!(comparison.best_lap_comparison["22"], 99.);
    }

    #[test]
    fn test_compare_formula_fallback() {
        let race = RaceData::new("R2").with_best_laps(vec![row(&[("NUMBER", "7")])]);
        let engine = AnalyticsEngine::new(race, EngineConfig::default());
        // driver list is synthetic and has no car 7
        let comparison = engine.compare_drivers(&["7".to_string()]).unwrap();
        assert_eq!(comparison.drivers.len(), 1);
        assert!((comparison.drivers[0].best_lap - 100.5).abs() < 1e-9);
        assert_eq!(comparison.drivers[0].lap_count, 10);
    }

    #[test]
    fn test_pit_stop_uses_results_pace() {
        let plan = engine().pit_stop_strategy(0, 30, 0.02).unwrap();
        assert!((plan.base_lap_time - 100.5).abs() < 1e-9);
        assert_ne!(plan.strategy_type, StrategyType::NoPit);

        let bare = AnalyticsEngine::new(RaceData::new("R2"), EngineConfig::default());
        assert_eq!(bare.pit_stop_strategy(0, 30, 0.02).unwrap().base_lap_time, 100.);
        assert!(matches!(
            bare.pit_stop_strategy(0, 2_200_000_000, 0.02),
            Err(PaddockError::InvalidLapBounds { .. })
        ));

        let short = AnalyticsEngine::new(
            RaceData::new("R3"),
            EngineConfig {
                max_remaining_laps: 25,
                ..Default::default()
            },
        );
        assert!(short.pit_stop_strategy(5, 30, 0.02).is_ok());
        assert!(short.pit_stop_strategy(4, 30, 0.02).is_err());
    }

    #[test]
    fn test_placeholder_drivers_and_insights() {
        let bare = AnalyticsEngine::new(RaceData::new("R2"), EngineConfig::default());
        assert!(bare.drivers().is_synthetic);

        let insights = bare.race_insights();
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].title, "Fastest Driver");
        assert_eq!(insights[0].driver.as_deref(), Some("13"));

        let titles: Vec<String> = engine().race_insights().into_iter().map(|i| i.title).collect();
        assert_eq!(titles, vec!["Fastest Lap", "Race Winner"]);
    }
}
