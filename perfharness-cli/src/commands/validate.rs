// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `perfharness validate` - Self-checks of the measurement methods.

use std::sync::Arc;

use perfharness_core::{PerfHarness, SysinfoNetworkCounters};
use perfharness_report::ReportEntry;

pub async fn execute(harness: &PerfHarness) -> Vec<ReportEntry> {
    let report = harness.validate(Arc::new(SysinfoNetworkCounters)).await;
    tracing::info!(
        checks = report.checks.len(),
        failed = report.failed(),
        "Validation finished"
    );

    report.checks.iter().map(ReportEntry::check).collect()
}
