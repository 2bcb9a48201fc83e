// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `perfharness throughput` - Unary throughput per payload class.

use perfharness_core::PerfHarness;
use perfharness_report::ReportEntry;

pub async fn execute(harness: &PerfHarness) -> Vec<ReportEntry> {
    let config = &harness.config().throughput;
    let mut entries = Vec::with_capacity(config.payload_sizes.len());

    for &size in &config.payload_sizes {
        let result = harness.measure_throughput(size).await;
        if let Err(e) = &result {
            tracing::warn!(payload = size.name(), error = %e, "Throughput measurement failed");
        }

        entries.push(
            ReportEntry::throughput(format!("unary_{}", size), &result)
                .with_metadata("payload_size", size.name())
                .with_metadata("payload_bytes", size.bytes() as u64)
                .with_metadata("duration_ms", config.duration.as_millis() as u64),
        );
    }
    entries
}
