//! Benchmarks for the audit pipeline.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::explicit_iter_loop,
    missing_docs
)]

use cprf_audit::{
    AuditConfig, AuditPipeline, Aggregator, RawTable, RuleEngine, SchemaNormalizer, TextDataset,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn create_raw(rows: usize) -> RawTable {
    let config = AuditConfig::default();
    RawTable::from_text_rows(
        config.required_columns(),
        (0..rows).map(|i| {
            vec![
                "ADOLOSCENT".to_string(),
                format!("Launch {}", i % 25),
                if i % 5 == 0 { String::new() } else { format!("2725{i:07}") },
                "ZP School".to_string(),
                if i % 9 == 0 { "01/01/2010".to_string() } else { "15/06/2009".to_string() },
                if i % 13 == 0 { "12345".to_string() } else { format!("98{:08}", i % 100_000_000) },
                "OBC".to_string(),
                "Yes".to_string(),
            ]
        }),
    )
}

fn create_dataset(rows: usize) -> TextDataset {
    let config = AuditConfig::default();
    SchemaNormalizer::new(config.required_columns())
        .normalize_raw(create_raw(rows))
        .expect("Failed to normalize")
        .0
}

fn bench_rule_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("rule_engine_scan");
    let engine = RuleEngine::from_config(&AuditConfig::default());

    for size in [1_000, 10_000, 100_000].iter() {
        let dataset = create_dataset(*size);
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &dataset, |b, dataset| {
            b.iter(|| engine.scan(black_box(dataset)).unwrap());
        });
    }

    group.finish();
}

fn bench_aggregation(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregation");
    let config = AuditConfig::default();
    let engine = RuleEngine::from_config(&config);
    let aggregator = Aggregator::from_config(&config);

    for size in [1_000, 10_000, 100_000].iter() {
        let dataset = create_dataset(*size);
        let findings = engine.scan(&dataset).unwrap();
        group.throughput(Throughput::Elements(findings.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &findings, |b, findings| {
            b.iter(|| aggregator.aggregate(&dataset, black_box(findings.clone())).unwrap());
        });
    }

    group.finish();
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline_evaluate");
    let pipeline = AuditPipeline::new(AuditConfig::default()).unwrap();

    for size in [1_000, 10_000].iter() {
        let batch = create_raw(*size).into_record_batch().unwrap();
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &batch, |b, batch| {
            b.iter(|| pipeline.evaluate(black_box(batch.clone())).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_rule_engine, bench_aggregation, bench_evaluate);
criterion_main!(benches);
