// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `perfharness smoke` - One call of every shape.

use perfharness_core::PerfHarness;
use perfharness_report::{EntryCategory, ReportEntry};

pub async fn execute(harness: &PerfHarness) -> Vec<ReportEntry> {
    let outcomes = harness.smoke().await;
    let failed = outcomes.iter().filter(|o| !o.succeeded()).count();
    if failed > 0 {
        tracing::warn!(failed, total = outcomes.len(), "Smoke calls failed");
    }

    outcomes
        .iter()
        .map(|outcome| ReportEntry::outcome(EntryCategory::Smoke, outcome))
        .collect()
}
