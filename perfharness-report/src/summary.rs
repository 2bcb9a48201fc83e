// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Console summary of a run report.

use std::fmt::Write;

use serde_json::Value;

use perfharness_core::stats::LatencySummary;

use crate::report::{EntryCategory, ReportEntry, RunReport};

/// Format a byte rate in human-readable form.
pub fn format_bytes_per_sec(bps: f64) -> String {
    if bps < 1_000.0 {
        format!("{:.2} B/s", bps)
    } else if bps < 1_000_000.0 {
        format!("{:.2} KB/s", bps / 1_000.0)
    } else if bps < 1_000_000_000.0 {
        format!("{:.2} MB/s", bps / 1_000_000.0)
    } else {
        format!("{:.2} GB/s", bps / 1_000_000_000.0)
    }
}

fn metadata_f64(entry: &ReportEntry, key: &str) -> Option<f64> {
    entry.metadata.get(key).and_then(Value::as_f64)
}

fn render_entry(out: &mut String, entry: &ReportEntry) {
    let _ = write!(out, "  [{:<7}] {}", entry.status.name(), entry.name);

    if let Some(latency) = &entry.latency {
        let _ = write!(
            out,
            ": min={} median={} p95={} p99={} max={} (n={})",
            LatencySummary::format_latency(latency.min_ns as f64),
            LatencySummary::format_latency(latency.median_ns),
            LatencySummary::format_latency(latency.p95_ns),
            LatencySummary::format_latency(latency.p99_ns),
            LatencySummary::format_latency(latency.max_ns as f64),
            latency.count
        );
    }

    if let Some(throughput) = &entry.throughput {
        let _ = write!(
            out,
            ": {:.2} msg/s, {} ({} messages)",
            throughput.messages_per_second,
            format_bytes_per_sec(throughput.bytes_per_second),
            throughput.total_messages
        );
    }

    if entry.category == EntryCategory::Batch {
        if let (Some(seq), Some(par), Some(speedup), Some(efficiency)) = (
            metadata_f64(entry, "sequential_total_ns"),
            metadata_f64(entry, "parallel_total_ns"),
            metadata_f64(entry, "speedup"),
            metadata_f64(entry, "efficiency_pct"),
        ) {
            let _ = write!(
                out,
                ": sequential={} parallel={} speedup={:.2}x efficiency={:.1}%",
                LatencySummary::format_latency(seq),
                LatencySummary::format_latency(par),
                speedup,
                efficiency
            );
        }
    }

    if entry.category == EntryCategory::Validation {
        if let Some(Value::Array(results)) = entry.metadata.get("results") {
            for result in results {
                let label = result["label"].as_str().unwrap_or("?");
                let unit = result["unit"].as_str().unwrap_or("");
                let expected = result["expected"].as_f64().unwrap_or_default();
                let measured = result["measured"].as_f64().unwrap_or_default();
                let _ = write!(
                    out,
                    "\n      {}: expected {:.3}{} measured {:.3}{}",
                    label, expected, unit, measured, unit
                );
                if let Some(error_pct) = result["error_pct"].as_f64() {
                    let _ = write!(out, " error {:.2}%", error_pct);
                }
            }
        }
    }

    if let Some(anomaly) = entry.metadata.get("anomaly") {
        let _ = write!(out, " anomaly={}", anomaly);
    }
    if let Some(progress) = &entry.progress {
        let _ = write!(out, " ({})", progress);
    }
    if let Some(error) = &entry.error {
        let _ = write!(out, "\n      error: {}", error);
    }
    out.push('\n');
}

/// Render the report as plain text, one line per entry.
pub fn render(report: &RunReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "perfharness {} - {} {}",
        report.version, report.transport, report.target
    );
    let _ = writeln!(
        out,
        "{} ({} cores), {} {}",
        report.system_info.cpu_model,
        report.system_info.cpu_cores,
        report.system_info.os,
        report.system_info.os_version
    );
    out.push('\n');

    let mut current = None;
    for entry in &report.entries {
        if current != Some(entry.category) {
            let _ = writeln!(out, "{}", entry.category);
            current = Some(entry.category);
        }
        render_entry(&mut out, entry);
    }

    let _ = writeln!(
        out,
        "\n{} entries, {} not ok",
        report.entries.len(),
        report.unsuccessful()
    );
    out
}

/// Print the summary to stdout.
pub fn print_summary(report: &RunReport) {
    print!("{}", render(report));
}
