// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `perfharness batch` - Sequential against parallel batch execution.

use perfharness_core::PerfHarness;
use perfharness_report::ReportEntry;

pub async fn execute(harness: &PerfHarness) -> Vec<ReportEntry> {
    harness
        .compare_batches()
        .await
        .iter()
        .map(|(size, result)| {
            if let Ok(comparison) = result {
                tracing::info!(
                    batch_size = size,
                    speedup = comparison.speedup,
                    "Batch compared"
                );
            }
            ReportEntry::batch(*size, result)
        })
        .collect()
}
