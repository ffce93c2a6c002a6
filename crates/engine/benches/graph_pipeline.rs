//! Benchmarks for the bounds and normalization pipeline

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tally_engine::{
    compute_bounds, compute_graph_state, expand_range, normalize, GraphInputs, SortKey, Tick,
    TimeWindow,
};

fn generate_ticks(count: usize) -> Vec<Tick> {
    let start = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
    (0..count)
        .map(|i| {
            let at = start + Duration::minutes(i as i64);
            let mut tick = Tick::new(1, ((i * 37) % 101) as f64 - 50.0, at);
            tick.id = i as i64 + 1;
            tick
        })
        .collect()
}

fn bench_compute_bounds(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_bounds");

    for count in [1_000, 10_000, 100_000] {
        let ticks = generate_ticks(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &ticks, |b, ticks| {
            b.iter(|| black_box(compute_bounds(black_box(ticks), SortKey::TimeForData)));
        });
    }

    group.finish();
}

fn bench_normalize(c: &mut Criterion) {
    let ticks = generate_ticks(100_000);
    let bounds = compute_bounds(&ticks, SortKey::TimeForData);
    let range = expand_range(bounds.range);

    let mut group = c.benchmark_group("normalize");
    group.throughput(Throughput::Elements(ticks.len() as u64));
    group.bench_function("100k_points", |b| {
        b.iter(|| {
            black_box(normalize(
                black_box(&ticks),
                SortKey::TimeForData,
                bounds.domain,
                range,
            ))
        });
    });
    group.finish();
}

fn bench_full_pipeline(c: &mut Criterion) {
    let ticks = generate_ticks(100_000);
    let fit = GraphInputs::for_counter(1, SortKey::TimeForData);
    let zoomed = fit.clone().with_domain(TimeWindow::new(
        ticks[25_000].time_for_data,
        ticks[75_000].time_for_data,
    ));

    let mut group = c.benchmark_group("compute_graph_state");
    group.throughput(Throughput::Elements(ticks.len() as u64));
    group.bench_function("fit_to_data", |b| {
        b.iter(|| black_box(compute_graph_state(black_box(&ticks), &fit, Duration::days(1))));
    });
    group.bench_function("domain_override", |b| {
        b.iter(|| black_box(compute_graph_state(black_box(&ticks), &zoomed, Duration::days(1))));
    });
    group.finish();
}

criterion_group!(benches, bench_compute_bounds, bench_normalize, bench_full_pipeline);
criterion_main!(benches);
