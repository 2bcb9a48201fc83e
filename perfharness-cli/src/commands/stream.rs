// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `perfharness stream` - Server, client and bidirectional streams.

use perfharness_core::PerfHarness;
use perfharness_report::{EntryCategory, ReportEntry};

pub async fn execute(harness: &PerfHarness) -> Vec<ReportEntry> {
    let mut outcomes = vec![harness.measure_server_stream().await];
    outcomes.extend(harness.measure_client_streams().await);

    outcomes
        .iter()
        .map(|outcome| ReportEntry::outcome(EntryCategory::Streaming, outcome))
        .collect()
}
