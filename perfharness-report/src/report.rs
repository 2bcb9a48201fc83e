// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Report model for one harness run.
//!
//! Every measurement becomes a labeled [`ReportEntry`], failed ones included,
//! so a run always ends with a record of whatever was collected.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sysinfo::System;

use perfharness_core::batch::BatchComparison;
use perfharness_core::error::{HarnessError, HarnessResult, PartialProgress};
use perfharness_core::stats::LatencySummary;
use perfharness_core::streaming::CallOutcome;
use perfharness_core::throughput::ThroughputReport;
use perfharness_core::transport::TransportKind;
use perfharness_core::validation::CheckOutcome;
use perfharness_core::CallState;

/// Measurement families a report entry can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryCategory {
    Latency,
    Throughput,
    Streaming,
    Batch,
    Smoke,
    Validation,
}

impl std::fmt::Display for EntryCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryCategory::Latency => write!(f, "latency"),
            EntryCategory::Throughput => write!(f, "throughput"),
            EntryCategory::Streaming => write!(f, "streaming"),
            EntryCategory::Batch => write!(f, "batch"),
            EntryCategory::Smoke => write!(f, "smoke"),
            EntryCategory::Validation => write!(f, "validation"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Ok,
    /// Stopped early or completed with an anomaly; partial counts are kept
    Partial,
    Failed,
}

impl EntryStatus {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Partial => "partial",
            Self::Failed => "failed",
        }
    }

    fn of_error(err: &HarnessError) -> Self {
        match err.progress() {
            Some(progress) if progress.completed > 0 => Self::Partial,
            _ => Self::Failed,
        }
    }
}

/// System information captured at run time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    /// Operating system name
    pub os: String,
    /// OS version
    pub os_version: String,
    /// Kernel version (Linux)
    pub kernel_version: Option<String>,
    /// CPU model name
    pub cpu_model: String,
    /// Number of CPU cores
    pub cpu_cores: usize,
    /// Total system memory in bytes
    pub memory_bytes: u64,
    /// Hostname
    pub hostname: String,
}

impl SystemInfo {
    /// Collect current system information.
    pub fn collect() -> Self {
        let mut sys = System::new_all();
        sys.refresh_all();

        Self {
            os: System::name().unwrap_or_else(|| "Unknown".to_string()),
            os_version: System::os_version().unwrap_or_else(|| "Unknown".to_string()),
            kernel_version: System::kernel_version(),
            cpu_model: sys
                .cpus()
                .first()
                .map(|cpu| cpu.brand().to_string())
                .unwrap_or_else(|| "Unknown".to_string()),
            cpu_cores: sys.cpus().len(),
            memory_bytes: sys.total_memory(),
            hostname: System::host_name().unwrap_or_else(|| "Unknown".to_string()),
        }
    }
}

fn to_json(value: impl Serialize) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// One labeled measurement in a run report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportEntry {
    pub name: String,
    pub category: EntryCategory,
    pub status: EntryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency: Option<LatencySummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub throughput: Option<ThroughputReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Work completed before a failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<PartialProgress>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Value>,
}

impl ReportEntry {
    fn new(name: impl Into<String>, category: EntryCategory, status: EntryStatus) -> Self {
        Self {
            name: name.into(),
            category,
            status,
            latency: None,
            throughput: None,
            error: None,
            progress: None,
            metadata: HashMap::new(),
        }
    }

    /// Entry for a measurement that produced no result.
    pub fn failed(name: impl Into<String>, category: EntryCategory, err: &HarnessError) -> Self {
        let mut entry = Self::new(name, category, EntryStatus::of_error(err));
        entry.error = Some(err.to_string());
        entry.progress = err.progress().copied();
        entry.latency = err.partial_latency().cloned();
        entry
    }

    pub fn latency(name: impl Into<String>, result: &HarnessResult<LatencySummary>) -> Self {
        match result {
            Ok(summary) => {
                let mut entry = Self::new(name, EntryCategory::Latency, EntryStatus::Ok);
                entry.latency = Some(summary.clone());
                entry
            }
            Err(e) => Self::failed(name, EntryCategory::Latency, e),
        }
    }

    pub fn throughput(name: impl Into<String>, result: &HarnessResult<ThroughputReport>) -> Self {
        match result {
            Ok(report) => {
                let mut entry = Self::new(name, EntryCategory::Throughput, EntryStatus::Ok);
                entry.throughput = Some(report.clone());
                entry
            }
            Err(e) => Self::failed(name, EntryCategory::Throughput, e),
        }
    }

    /// Entry for one driven call. Streams also get a throughput figure over
    /// the messages that arrived.
    pub fn outcome(category: EntryCategory, outcome: &CallOutcome) -> Self {
        let status = match outcome.state {
            CallState::Completed if outcome.anomaly.is_none() => EntryStatus::Ok,
            CallState::Completed => EntryStatus::Partial,
            _ if outcome.messages_received > 0 => EntryStatus::Partial,
            _ => EntryStatus::Failed,
        };

        let mut entry = Self::new(outcome.label.clone(), category, status)
            .with_metadata("shape", outcome.shape.name())
            .with_metadata("state", outcome.state.name())
            .with_metadata("elapsed_ns", outcome.elapsed_ns)
            .with_metadata("messages_sent", outcome.messages_sent)
            .with_metadata("messages_received", outcome.messages_received);
        if let Some(expected) = outcome.messages_expected {
            entry = entry.with_metadata("messages_expected", expected);
        }
        if let Some(anomaly) = &outcome.anomaly {
            entry = entry.with_metadata("anomaly", to_json(anomaly));
        }
        if outcome.messages_per_second.is_some() {
            entry.throughput = Some(ThroughputReport::calculate(
                outcome.messages_received,
                outcome.bytes,
                outcome.elapsed_ns,
            ));
        }
        entry.error = outcome.error.clone();
        entry
    }

    /// Entry for a sequential-against-parallel comparison at one batch size.
    pub fn batch(size: usize, result: &HarnessResult<BatchComparison>) -> Self {
        let name = format!("batch_{}", size);
        let comparison = match result {
            Ok(comparison) => comparison,
            Err(e) => {
                return Self::failed(name, EntryCategory::Batch, e).with_metadata("batch_size", size)
            }
        };

        let mut entry = Self::new(name, EntryCategory::Batch, EntryStatus::Ok)
            .with_metadata("batch_size", size)
            .with_metadata("strategy", to_json(comparison.strategy))
            .with_metadata("sequential_total_ns", comparison.sequential.total_ns)
            .with_metadata("parallel_total_ns", comparison.parallel.total_ns)
            .with_metadata("sequential_avg_ns", comparison.sequential.avg_ns_per_request)
            .with_metadata("parallel_avg_ns", comparison.parallel.avg_ns_per_request)
            .with_metadata("speedup", comparison.speedup)
            .with_metadata("efficiency_pct", comparison.efficiency_pct);
        entry.latency = comparison.parallel.latency.clone();
        entry
    }

    /// Entry for one validation check, results kept as metadata.
    pub fn check(check: &CheckOutcome) -> Self {
        let status = if check.passed() {
            EntryStatus::Ok
        } else if !check.results.is_empty() || check.progress.map_or(false, |p| p.completed > 0) {
            EntryStatus::Partial
        } else {
            EntryStatus::Failed
        };

        let mut entry = Self::new(check.kind.name(), EntryCategory::Validation, status)
            .with_metadata("results", to_json(&check.results));
        entry.error = check.error.clone();
        entry.progress = check.progress;
        entry
    }

    /// Add metadata to the entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Complete report of one harness run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Suite identifier
    pub suite: String,
    /// Harness version
    pub version: String,
    /// Wall-clock time the run started
    pub timestamp: DateTime<Utc>,
    pub system_info: SystemInfo,
    pub transport: TransportKind,
    pub target: String,
    pub entries: Vec<ReportEntry>,
}

impl RunReport {
    pub fn new(transport: TransportKind, target: impl Into<String>) -> Self {
        Self {
            suite: "perfharness".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now(),
            system_info: SystemInfo::collect(),
            transport,
            target: target.into(),
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, entry: ReportEntry) {
        self.entries.push(entry);
    }

    pub fn extend(&mut self, entries: impl IntoIterator<Item = ReportEntry>) {
        self.entries.extend(entries);
    }

    /// Entries that did not finish cleanly.
    pub fn unsuccessful(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.status != EntryStatus::Ok)
            .count()
    }

    /// The shared category of every entry, `None` for an empty or mixed run.
    pub fn category(&self) -> Option<EntryCategory> {
        let first = self.entries.first()?.category;
        self.entries
            .iter()
            .all(|e| e.category == first)
            .then_some(first)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perfharness_core::error::{PartialMeasurement, TransportError};
    use perfharness_core::validation::{CheckKind, ValidationResult};
    use perfharness_core::{CallShape, StreamAnomaly};

    fn summary() -> LatencySummary {
        LatencySummary::from_samples(vec![1_000, 2_000, 3_000]).unwrap()
    }

    fn reset() -> TransportError {
        TransportError::StreamReset {
            reason: "peer closed".to_string(),
        }
    }

    #[test]
    fn test_latency_entry() {
        let entry = ReportEntry::latency("ping", &Ok(summary()));
        assert_eq!(entry.status, EntryStatus::Ok);
        assert_eq!(entry.category, EntryCategory::Latency);
        assert_eq!(entry.latency.unwrap().count, 3);
    }

    #[test]
    fn test_failed_latency_keeps_partial_statistics() {
        let err = HarnessError::PartialFailure {
            operation: "latency",
            progress: PartialProgress {
                completed: 3,
                expected: Some(100),
                bytes: 0,
                elapsed_ns: 6_000,
            },
            partial: Some(Box::new(PartialMeasurement::Latency(summary()))),
            source: reset(),
        };
        let entry = ReportEntry::latency("ping_pong", &Err(err));

        assert_eq!(entry.status, EntryStatus::Partial);
        assert_eq!(entry.latency.as_ref().map(|l| l.count), Some(3));
        assert_eq!(entry.progress.map(|p| p.completed), Some(3));
        assert!(entry.error.is_some());

        let mut report = RunReport::new(TransportKind::Grpc, "http://127.0.0.1:50051");
        report.push(entry);
        let text = crate::summary::render(&report);
        assert!(text.contains("[partial] ping_pong: min="));
        assert!(text.contains("3/100 completed"));
    }

    #[test]
    fn test_partial_failure_keeps_progress() {
        let err = HarnessError::PartialFailure {
            operation: "throughput",
            progress: PartialProgress {
                completed: 12,
                expected: None,
                bytes: 12_288,
                elapsed_ns: 5_000_000,
            },
            partial: None,
            source: reset(),
        };
        let entry = ReportEntry::throughput("throughput_small", &Err(err));

        assert_eq!(entry.status, EntryStatus::Partial);
        assert_eq!(entry.progress.unwrap().bytes, 12_288);
        assert!(entry.error.unwrap().contains("peer closed"));
    }

    #[test]
    fn test_failure_without_progress() {
        let entry = ReportEntry::batch(10, &Err(reset().into()));
        assert_eq!(entry.status, EntryStatus::Failed);
        assert_eq!(entry.name, "batch_10");
        assert_eq!(entry.metadata["batch_size"], 10);
    }

    #[test]
    fn test_stream_outcome_with_anomaly_is_partial() {
        let outcome: CallOutcome = serde_json::from_value(serde_json::json!({
            "shape": "server_streaming",
            "label": "server_streaming",
            "state": "Completed",
            "events": [],
            "elapsed_ns": 1_000_000_000u64,
            "messages_sent": 1,
            "messages_received": 3,
            "messages_expected": 5,
            "bytes": 3072,
            "messages_per_second": 3.0,
            "anomaly": { "kind": "closed_early", "expected": 5, "received": 3 },
            "error": null
        }))
        .unwrap();
        assert_eq!(outcome.shape, CallShape::ServerStreaming);
        assert!(matches!(outcome.anomaly, Some(StreamAnomaly::ClosedEarly { .. })));

        let entry = ReportEntry::outcome(EntryCategory::Streaming, &outcome);
        assert_eq!(entry.status, EntryStatus::Partial);
        assert_eq!(entry.metadata["messages_expected"], 5);
        let throughput = entry.throughput.unwrap();
        assert_eq!(throughput.total_messages, 3);
        assert!((throughput.messages_per_second - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_failed_check_entry() {
        let check = CheckOutcome {
            kind: CheckKind::ThroughputAccuracy,
            results: Vec::new(),
            error: Some("Transport error: refused".to_string()),
            progress: None,
        };
        let entry = ReportEntry::check(&check);
        assert_eq!(entry.name, "throughput_accuracy");
        assert_eq!(entry.status, EntryStatus::Failed);
    }

    #[test]
    fn test_check_with_finished_results_is_partial() {
        let check = CheckOutcome {
            kind: CheckKind::DelayAccuracy,
            results: vec![ValidationResult::new("delay_1000us", "us", 1000.0, 1010.0)],
            error: Some("delay accuracy stopped early".to_string()),
            progress: Some(PartialProgress {
                completed: 0,
                expected: Some(100),
                bytes: 0,
                elapsed_ns: 0,
            }),
        };
        let entry = ReportEntry::check(&check);
        assert_eq!(entry.status, EntryStatus::Partial);
        assert_eq!(entry.metadata["results"][0]["label"], "delay_1000us");
    }

    #[test]
    fn test_report_category_and_failures() {
        let mut report = RunReport::new(TransportKind::Http, "http://127.0.0.1:8080");
        assert_eq!(report.category(), None);

        report.push(ReportEntry::latency("ping", &Ok(summary())));
        assert_eq!(report.category(), Some(EntryCategory::Latency));

        report.push(ReportEntry::batch(5, &Err(reset().into())));
        assert_eq!(report.category(), None);
        assert_eq!(report.unsuccessful(), 1);
    }

    #[test]
    fn test_system_info_collect() {
        let info = SystemInfo::collect();
        assert!(!info.os.is_empty());
        assert!(info.cpu_cores > 0);
        assert!(info.memory_bytes > 0);
    }
}
