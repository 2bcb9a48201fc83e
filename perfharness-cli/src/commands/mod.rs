// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! CLI command implementations.
//!
//! Measurement commands never fail as a whole: each one turns its results,
//! failures included, into report entries.

pub mod batch;
pub mod config;
pub mod latency;
pub mod smoke;
pub mod stream;
pub mod throughput;
pub mod validate;

use perfharness_core::PerfHarness;
use perfharness_report::ReportEntry;

/// Every measurement family in the order `perfharness all` runs them.
pub async fn all(harness: &PerfHarness) -> Vec<ReportEntry> {
    let mut entries = smoke::execute(harness).await;
    entries.extend(latency::execute(harness).await);
    entries.extend(throughput::execute(harness).await);
    entries.extend(stream::execute(harness).await);
    entries.extend(batch::execute(harness).await);
    entries.extend(validate::execute(harness).await);
    entries
}
