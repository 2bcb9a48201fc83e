// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Perfharness Reporting
//!
//! Collects the outcome of every measurement in a run into a [`RunReport`],
//! persists it as JSON and renders a console summary.
//!
//! # Entry Categories
//!
//! - **Latency**: ping-pong round trips with percentile distribution
//! - **Throughput**: unary calls over a fixed window, per payload class
//! - **Streaming**: server, client and bidirectional streams
//! - **Batch**: sequential against parallel dispatch, speedup and efficiency
//! - **Smoke**: one call of every shape
//! - **Validation**: self-checks of the measurement methodology

pub mod report;
pub mod reporter;
pub mod summary;

pub use report::{EntryCategory, EntryStatus, ReportEntry, RunReport, SystemInfo};
pub use reporter::{JsonReporter, ReporterError};
pub use summary::{format_bytes_per_sec, print_summary, render};
