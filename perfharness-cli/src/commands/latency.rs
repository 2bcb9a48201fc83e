// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `perfharness latency` - Ping-pong round-trip latency.

use perfharness_core::{LatencySummary, PerfHarness};
use perfharness_report::ReportEntry;

pub async fn execute(harness: &PerfHarness) -> Vec<ReportEntry> {
    let result = harness.measure_latency().await;

    match &result {
        Ok(summary) => tracing::info!(
            count = summary.count,
            median = %LatencySummary::format_latency(summary.median_ns),
            p99 = %LatencySummary::format_latency(summary.p99_ns),
            "Latency measured"
        ),
        Err(e) => tracing::warn!(error = %e, "Latency measurement failed"),
    }

    let latency = &harness.config().latency;
    vec![ReportEntry::latency("ping_pong", &result)
        .with_metadata("iterations", latency.iterations as u64)
        .with_metadata("warmup", latency.warmup as u64)]
}
