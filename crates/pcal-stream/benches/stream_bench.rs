//! Ledger ingestion and stats benchmarks.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pcal_core::clock::SystemClock;
use pcal_core::models::*;
use pcal_stream::DecisionStream;

fn ingest_into_full_ledger(c: &mut Criterion) {
    let stream = DecisionStream::new(10_000, Arc::new(SystemClock)).unwrap();
    c.bench_function("ingest_with_eviction", |b| {
        b.iter(|| {
            stream
                .ingest_decision(
                    DecisionSource::Cutover,
                    DecisionDomain::Deployment,
                    black_box(DecisionOutcome::Blocked),
                    "bench",
                    IngestOptions::new().confidence(70.0),
                )
                .unwrap()
        })
    });
}

fn stats_over_full_ledger(c: &mut Criterion) {
    let stream = DecisionStream::new(10_000, Arc::new(SystemClock)).unwrap();
    for i in 0..10_000 {
        stream
            .ingest_decision(
                DecisionSource::LoadController,
                DecisionDomain::Traffic,
                DecisionOutcome::ALL[i % 4],
                "bench",
                IngestOptions::new().confidence((i % 100) as f64),
            )
            .unwrap();
    }
    c.bench_function("decision_stats_10k", |b| {
        b.iter(|| black_box(stream.get_decision_stats().unwrap()))
    });
}

criterion_group!(benches, ingest_into_full_ledger, stats_over_full_ledger);
criterion_main!(benches);
