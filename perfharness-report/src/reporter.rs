// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! JSON persistence for run reports.
//!
//! Reports are written to `<category>_<timestamp>.json`; a run mixing several
//! measurement families is filed under `run`.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::report::RunReport;

/// Errors that can occur during report generation.
#[derive(Debug, Error)]
pub enum ReporterError {
    #[error("Report I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize report: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// JSON reporter writing into one output directory.
pub struct JsonReporter {
    output_dir: PathBuf,
}

impl JsonReporter {
    /// Create a reporter, creating `output_dir` if needed.
    pub fn new(output_dir: impl AsRef<Path>) -> Result<Self, ReporterError> {
        let output_dir = output_dir.as_ref().to_path_buf();
        fs::create_dir_all(&output_dir)?;
        Ok(Self { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn write(&self, stem: &str, report: &RunReport) -> Result<PathBuf, ReporterError> {
        let timestamp = report.timestamp.format("%Y-%m-%dT%H-%M-%S%.3fZ");
        let filepath = self.output_dir.join(format!("{}_{}.json", stem, timestamp));

        let file = File::create(&filepath)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, report)?;

        tracing::debug!(
            path = %filepath.display(),
            entries = report.entries.len(),
            "Report written"
        );
        Ok(filepath)
    }

    /// Save a report and return the path of the created file.
    pub fn save(&self, report: &RunReport) -> Result<PathBuf, ReporterError> {
        let stem = report
            .category()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "run".to_string());
        self.write(&stem, report)
    }

    /// Save one file per entry category, all sharing the run's header.
    pub fn save_by_category(&self, report: &RunReport) -> Result<Vec<PathBuf>, ReporterError> {
        let mut by_category: HashMap<_, Vec<_>> = HashMap::new();
        for entry in &report.entries {
            by_category
                .entry(entry.category)
                .or_default()
                .push(entry.clone());
        }

        let mut paths = Vec::new();
        for (category, entries) in by_category {
            let category_report = RunReport {
                entries,
                ..report.clone()
            };
            paths.push(self.write(&category.to_string(), &category_report)?);
        }
        paths.sort();
        Ok(paths)
    }

    /// List all existing report files in the output directory.
    pub fn list_reports(&self) -> Result<Vec<PathBuf>, ReporterError> {
        let mut reports = Vec::new();
        for entry in fs::read_dir(&self.output_dir)? {
            let path = entry?.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                reports.push(path);
            }
        }
        reports.sort();
        Ok(reports)
    }

    /// Load an existing report from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<RunReport, ReporterError> {
        let file = File::open(path)?;
        let report = serde_json::from_reader(file)?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{EntryCategory, ReportEntry};
    use perfharness_core::error::TransportError;
    use perfharness_core::stats::LatencySummary;
    use perfharness_core::transport::TransportKind;
    use tempfile::TempDir;

    fn report() -> RunReport {
        let mut report = RunReport::new(TransportKind::Grpc, "http://127.0.0.1:50051");
        report.push(ReportEntry::latency(
            "ping",
            &LatencySummary::from_samples(vec![100, 200, 300]),
        ));
        report
    }

    #[test]
    fn test_reporter_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let reporter = JsonReporter::new(temp_dir.path()).unwrap();

        let path = reporter.save(&report()).unwrap();
        assert!(path.exists());
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("latency_"));

        let loaded = JsonReporter::load(&path).unwrap();
        assert_eq!(loaded.entries.len(), 1);
        assert_eq!(loaded.entries[0].name, "ping");
        assert_eq!(loaded.transport, TransportKind::Grpc);
        assert_eq!(loaded.entries[0].latency.as_ref().unwrap().max_ns, 300);
    }

    #[test]
    fn test_save_by_category_splits_entries() {
        let temp_dir = TempDir::new().unwrap();
        let reporter = JsonReporter::new(temp_dir.path().join("nested")).unwrap();

        let mut report = report();
        report.push(ReportEntry::batch(
            5,
            &Err(TransportError::StreamReset {
                reason: "reset".to_string(),
            }
            .into()),
        ));
        let combined = reporter.save(&report).unwrap();
        assert!(combined
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("run_"));

        let paths = reporter.save_by_category(&report).unwrap();
        assert_eq!(paths.len(), 2);
        for path in &paths {
            let loaded = JsonReporter::load(path).unwrap();
            assert_eq!(loaded.entries.len(), 1);
        }
        let batch = paths
            .iter()
            .map(|p| JsonReporter::load(p).unwrap())
            .find(|r| r.category() == Some(EntryCategory::Batch))
            .unwrap();
        assert!(batch.entries[0].error.is_some());

        assert_eq!(reporter.list_reports().unwrap().len(), 3);
    }

    #[test]
    fn test_load_missing_file() {
        let err = JsonReporter::load("/nonexistent/report.json").unwrap_err();
        assert!(matches!(err, ReporterError::Io(_)));
    }
}
