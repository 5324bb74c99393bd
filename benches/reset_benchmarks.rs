//! Engine benchmarks for SheetQL
//!
//! Run with: cargo bench
//!
//! Measures loading sources into the relation store and running capped
//! queries against them.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use sheetql_engine::{
    record, CellValue, QueryExecutor, Record, RelationStore, SourceSet, StoreOptions,
};

fn rows(n: usize) -> Vec<Record> {
    (0..n)
        .map(|i| {
            record([
                ("Region", CellValue::from(format!("region-{}", i % 17))),
                ("Amount", CellValue::from(i as f64 * 1.5)),
                ("Paid", CellValue::from(i % 3 == 0)),
                ("Note", CellValue::Null),
            ])
        })
        .collect()
}

fn sources(n: usize) -> SourceSet {
    let mut sources = SourceSet::new();
    sources.insert("Sales".to_string(), rows(n));
    sources
}

/// Benchmark a full reset at different source sizes
fn bench_reset(c: &mut Criterion) {
    let mut group = c.benchmark_group("reset_by_rows");
    group.sample_size(20);

    for size in [100, 1_000, 10_000].iter() {
        let store = RelationStore::new().unwrap();
        let input = sources(*size);

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| store.reset(black_box(&input)).unwrap())
        });
    }

    group.finish();
}

/// Benchmark reset with different insert batch sizes
fn bench_batch_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("reset_by_batch_size");
    group.sample_size(20);
    let input = sources(10_000);

    for batch_size in [100, 1_000, 10_000].iter() {
        let store = RelationStore::with_options(StoreOptions {
            batch_size: *batch_size,
        })
        .unwrap();

        group.bench_with_input(
            BenchmarkId::from_parameter(batch_size),
            batch_size,
            |b, _| b.iter(|| store.reset(black_box(&input)).unwrap()),
        );
    }

    group.finish();
}

/// Benchmark capped selects and aggregates over a loaded table
fn bench_query(c: &mut Criterion) {
    let store = RelationStore::new().unwrap();
    store.reset(&sources(10_000)).unwrap();
    let executor = QueryExecutor::new(&store);

    c.bench_function("select_capped_10k", |b| {
        b.iter(|| executor.execute(black_box("select * from sales")))
    });

    c.bench_function("group_by_region", |b| {
        b.iter(|| {
            executor.execute(black_box(
                "select region, sum(amount) as total from sales group by region",
            ))
        })
    });
}

criterion_group!(benches, bench_reset, bench_batch_size, bench_query);
criterion_main!(benches);
