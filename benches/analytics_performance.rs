use criterion::{Criterion, black_box, criterion_group, criterion_main};
use paddock::config::EngineConfig;
use paddock::racing_line::RacingLineOptimizer;
use paddock::strategy::{PitStopSimulator, RaceState};
use paddock::synthetic::SyntheticDataProvider;
use paddock::table::{RawRow, RawValue};
use paddock::telemetry::{
    InMemoryTelemetry, NormalizerLimits, TelemetryNormalizer, TelemetryQuery, TelemetrySample,
};
use std::time::Duration;

fn create_telemetry_row(point_no: usize) -> RawRow {
    let vehicle = if point_no % 2 == 0 { "GR86-002-13" } else { "GR86-010-22" };
    let mut row = RawRow::new();
    row.insert("vehicle_id".to_string(), RawValue::from(vehicle));
    row.insert("lap".to_string(), RawValue::from((1 + point_no / 20_000) as f64));
    row.insert("Speed".to_string(), RawValue::from(90. + (point_no % 60) as f64));
    row.insert("ath".to_string(), RawValue::from(80.));
    row.insert("pbrake_f".to_string(), RawValue::from(12.));
    row.insert(
        "VBOX_Lat_Min".to_string(),
        RawValue::from(33.48 + (point_no % 1_000) as f64 * 1e-5),
    );
    row.insert(
        "VBOX_Long_Minutes".to_string(),
        RawValue::from(-86.65 - (point_no % 1_000) as f64 * 1e-5),
    );
    row
}

fn create_samples(count: usize) -> Vec<TelemetrySample> {
    (0..count)
        .map(|i| TelemetrySample {
            speed: 90. + (i % 60) as f64,
            lat: 33.48 + (i % 1_000) as f64 * 1e-5,
            lon: -86.65 - (i % 1_000) as f64 * 1e-5,
            ..Default::default()
        })
        .collect()
}

fn bench_normalizer(c: &mut Criterion) {
    let mut group = c.benchmark_group("telemetry_normalizer");

    let source = InMemoryTelemetry::new((0..100_000).map(create_telemetry_row).collect());
    let normalizer = TelemetryNormalizer::new(NormalizerLimits::default());

    group.bench_function("normalize_100k_rows_one_driver", |b| {
        let query = TelemetryQuery::new("13", None, 10);
        b.iter(|| black_box(normalizer.normalize(&source, &query)));
    });

    group.bench_function("normalize_100k_rows_one_lap", |b| {
        let query = TelemetryQuery::new("22", Some(2), 10);
        b.iter(|| black_box(normalizer.normalize(&source, &query)));
    });

    group.finish();
}

fn bench_racing_line(c: &mut Criterion) {
    let mut group = c.benchmark_group("racing_line");

    let config = EngineConfig::default();
    let optimizer = RacingLineOptimizer::new(&config);
    let synthetic = SyntheticDataProvider::new(config.synthetic_seed);

    for count in [1_000, 5_000] {
        let samples = create_samples(count);
        group.bench_function(format!("analyze_{count}_samples"), |b| {
            b.iter(|| black_box(optimizer.analyze(&samples, &synthetic, 13)));
        });
    }

    group.bench_function("reference_line_fallback", |b| {
        b.iter(|| black_box(optimizer.analyze(&[], &synthetic, 13)));
    });

    group.finish();
}

fn bench_pit_stop(c: &mut Criterion) {
    let simulator = PitStopSimulator::default();
    let race = RaceState {
        current_lap: 5,
        total_laps: 60,
        degradation_rate: 0.02,
        base_lap_time: 100.,
    };
    c.bench_function("pit_stop_plan_55_laps", |b| {
        b.iter(|| black_box(simulator.plan(black_box(&race))));
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(10))
        .sample_size(50);
    targets = bench_normalizer, bench_racing_line, bench_pit_stop
}
criterion_main!(benches);
