// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Summarization cost of latency distributions.
//!
//! Sorting and the exclusive-quantile interpolation dominate; this tracks how
//! the summary scales with the number of recorded samples.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use perfharness_core::stats::{LatencyRecorder, LatencySummary};
use perfharness_core::transport::TransportKind;
use perfharness_report::{render, ReportEntry, RunReport};
use std::time::Duration;

/// Sample counts to benchmark.
const SAMPLE_COUNTS: &[usize] = &[100, 1_000, 10_000, 100_000];

/// Deterministic spread of latencies between 0.5 ms and ~4.6 ms.
fn samples(count: usize) -> Vec<u64> {
    let mut state: u64 = 0x2545_f491_4f6c_dd1d;
    (0..count)
        .map(|_| {
            state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
            500_000 + (state >> 52) * 1_000
        })
        .collect()
}

fn bench_from_samples(c: &mut Criterion) {
    let mut group = c.benchmark_group("latency_summary_from_samples");
    group.measurement_time(Duration::from_secs(3));

    for &count in SAMPLE_COUNTS {
        group.throughput(Throughput::Elements(count as u64));
        let data = samples(count);

        group.bench_with_input(BenchmarkId::from_parameter(count), &data, |b, data| {
            b.iter(|| LatencySummary::from_samples(black_box(data.clone())))
        });
    }

    group.finish();
}

fn bench_recorder_summarize(c: &mut Criterion) {
    let mut group = c.benchmark_group("latency_recorder_summarize");
    group.measurement_time(Duration::from_secs(3));

    for &count in SAMPLE_COUNTS {
        group.throughput(Throughput::Elements(count as u64));
        let mut recorder = LatencyRecorder::with_capacity(count);
        for ns in samples(count) {
            recorder.record(Duration::from_nanos(ns));
        }

        group.bench_with_input(BenchmarkId::from_parameter(count), &recorder, |b, recorder| {
            b.iter(|| black_box(recorder.summarize()))
        });
    }

    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let mut report = RunReport::new(TransportKind::Grpc, "http://127.0.0.1:50051");
    for i in 0..50 {
        report.push(ReportEntry::latency(
            format!("ping_{}", i),
            &LatencySummary::from_samples(samples(1_000)),
        ));
    }

    c.bench_function("render_50_entries", |b| b.iter(|| render(black_box(&report))));
}

criterion_group!(
    benches,
    bench_from_samples,
    bench_recorder_summarize,
    bench_render,
);

criterion_main!(benches);
