// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Latency recording and descriptive statistics.
//!
//! Percentiles use exclusive linear interpolation over `n` equal-probability
//! intervals: p95 is cut point 19 of 19 for `n = 20`, p99 is cut point 99 of
//! 99 for `n = 100`. Historical results were computed this way, so the
//! arithmetic below is exact for integer nanosecond inputs.
//!
//! p95 needs at least 20 samples and p99 at least 100 for a stable result.
//! With fewer samples the cut point is clamped to the last two samples, which
//! can extrapolate past the maximum; the summary flags such values as unstable
//! instead of failing.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::clock::duration_to_nanos;
use crate::error::{HarnessError, HarnessResult, InvalidConfigurationError};

/// Samples needed before p95 is stable.
pub const P95_MIN_SAMPLES: usize = 20;
/// Samples needed before p99 is stable.
pub const P99_MIN_SAMPLES: usize = 100;

const DEFAULT_LABEL: &str = "call";

/// One duration measurement tagged with the call that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatencySample {
    pub label: String,
    pub nanos: u64,
}

/// Descriptive statistics over one measurement run, in nanoseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencySummary {
    /// Number of samples summarized
    pub count: usize,
    /// Minimum observed latency
    pub min_ns: u64,
    /// Maximum observed latency
    pub max_ns: u64,
    /// Arithmetic mean
    pub mean_ns: f64,
    /// Median (p50)
    pub median_ns: f64,
    /// 95th percentile, exclusive interpolation
    pub p95_ns: f64,
    /// 99th percentile, exclusive interpolation
    pub p99_ns: f64,
    /// Sample standard deviation (n - 1 denominator)
    pub std_dev_ns: f64,
}

impl LatencySummary {
    /// Compute a summary from raw nanosecond samples.
    pub fn from_samples(mut samples: Vec<u64>) -> HarnessResult<Self> {
        if samples.is_empty() {
            return Err(HarnessError::InsufficientData {
                metric: "latency summary",
                required: 1,
                available: 0,
            });
        }

        samples.sort_unstable();
        let len = samples.len();

        let sum: u128 = samples.iter().map(|&x| x as u128).sum();
        let mean_ns = sum as f64 / len as f64;
        let std_dev_ns = sample_std_dev(&samples, mean_ns);

        Ok(Self {
            count: len,
            min_ns: samples[0],
            max_ns: samples[len - 1],
            mean_ns,
            median_ns: median(&samples),
            p95_ns: exclusive_cut_point(&samples, 20, 19),
            p99_ns: exclusive_cut_point(&samples, 100, 99),
            std_dev_ns,
        })
    }

    /// Whether p95 was computed from enough samples.
    pub fn p95_is_stable(&self) -> bool {
        self.count >= P95_MIN_SAMPLES
    }

    /// Whether p99 was computed from enough samples.
    pub fn p99_is_stable(&self) -> bool {
        self.count >= P99_MIN_SAMPLES
    }

    pub fn mean(&self) -> Duration {
        Duration::from_nanos(self.mean_ns.round() as u64)
    }

    /// Format latency in human-readable form (auto-selects ns/μs/ms/s).
    pub fn format_latency(ns: f64) -> String {
        if ns < 1_000.0 {
            format!("{:.0}ns", ns)
        } else if ns < 1_000_000.0 {
            format!("{:.2}μs", ns / 1_000.0)
        } else if ns < 1_000_000_000.0 {
            format!("{:.2}ms", ns / 1_000_000.0)
        } else {
            format!("{:.2}s", ns / 1_000_000_000.0)
        }
    }
}

/// Cut point `i` (1-based) of the `n`-quantiles of `sorted`, exclusive method.
///
/// `sorted` must be non-empty and ascending. A single sample is returned as-is
/// for every cut point.
pub fn exclusive_cut_point(sorted: &[u64], n: usize, i: usize) -> f64 {
    let ld = sorted.len();
    if ld == 1 {
        return sorted[0] as f64;
    }

    let m = ld + 1;
    let j = (i * m / n).clamp(1, ld - 1);
    // Exact integer arithmetic. delta goes negative when j is clamped down.
    let delta = (i * m) as i128 - (j * n) as i128;
    let low = sorted[j - 1] as i128;
    let high = sorted[j] as i128;
    let weighted = low * (n as i128 - delta) + high * delta;
    weighted as f64 / n as f64
}

/// All `n - 1` cut points of the `n`-quantiles of `sorted`, exclusive method.
pub fn exclusive_quantiles(sorted: &[u64], n: usize) -> HarnessResult<Vec<f64>> {
    if sorted.is_empty() {
        return Err(HarnessError::InsufficientData {
            metric: "quantiles",
            required: 1,
            available: 0,
        });
    }
    if n < 2 {
        return Err(InvalidConfigurationError::InvalidFieldValue {
            field: "n",
            value: n.to_string(),
            reason: "Quantiles need at least two intervals".to_string(),
        }
        .into());
    }
    Ok((1..n).map(|i| exclusive_cut_point(sorted, n, i)).collect())
}

/// Nearest-rank percentile: the smallest sample with at least `percentile`%
/// of the distribution at or below it.
pub fn nearest_rank(sorted: &[u64], percentile: u32) -> HarnessResult<u64> {
    if sorted.is_empty() {
        return Err(HarnessError::InsufficientData {
            metric: "nearest-rank percentile",
            required: 1,
            available: 0,
        });
    }
    if percentile == 0 || percentile > 100 {
        return Err(InvalidConfigurationError::InvalidFieldValue {
            field: "percentile",
            value: percentile.to_string(),
            reason: "Must be between 1 and 100".to_string(),
        }
        .into());
    }
    let rank = (percentile as usize * sorted.len()).div_ceil(100);
    Ok(sorted[rank.max(1) - 1])
}

fn median(sorted: &[u64]) -> f64 {
    let len = sorted.len();
    if len % 2 == 1 {
        sorted[len / 2] as f64
    } else {
        (sorted[len / 2 - 1] as f64 + sorted[len / 2] as f64) / 2.0
    }
}

fn sample_std_dev(samples: &[u64], mean: f64) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let variance = samples
        .iter()
        .map(|&x| {
            let diff = x as f64 - mean;
            diff * diff
        })
        .sum::<f64>()
        / (samples.len() - 1) as f64;
    variance.sqrt()
}

/// Accumulates per-call durations for a single measurement run.
#[derive(Debug, Clone, Default)]
pub struct LatencyRecorder {
    samples: Vec<LatencySample>,
}

impl LatencyRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
        }
    }

    /// Append one sample under the default label.
    pub fn record(&mut self, duration: Duration) {
        self.record_labeled(DEFAULT_LABEL, duration);
    }

    pub fn record_labeled(&mut self, label: impl Into<String>, duration: Duration) {
        self.samples.push(LatencySample {
            label: label.into(),
            nanos: duration_to_nanos(duration),
        });
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[LatencySample] {
        &self.samples
    }

    /// Sum of all recorded durations.
    pub fn total(&self) -> Duration {
        Duration::from_nanos(self.samples.iter().map(|s| s.nanos).sum())
    }

    /// Summary over every recorded sample.
    pub fn summarize(&self) -> HarnessResult<LatencySummary> {
        let summary =
            LatencySummary::from_samples(self.samples.iter().map(|s| s.nanos).collect())?;
        if !summary.p99_is_stable() {
            tracing::debug!(
                samples = summary.count,
                "Fewer than {} samples, p95/p99 are approximate",
                P99_MIN_SAMPLES
            );
        }
        Ok(summary)
    }

    /// Summary over samples carrying `label`.
    pub fn summarize_label(&self, label: &str) -> HarnessResult<LatencySummary> {
        LatencySummary::from_samples(
            self.samples
                .iter()
                .filter(|s| s.label == label)
                .map(|s| s.nanos)
                .collect(),
        )
    }

    /// Summary that refuses to report approximate percentiles.
    pub fn summarize_stable(&self) -> HarnessResult<LatencySummary> {
        let summary = self.summarize()?;
        if !summary.p95_is_stable() {
            return Err(InvalidConfigurationError::PercentileExceedsSamples {
                percentile: 95,
                samples: summary.count,
            }
            .into());
        }
        if !summary.p99_is_stable() {
            return Err(InvalidConfigurationError::PercentileExceedsSamples {
                percentile: 99,
                samples: summary.count,
            }
            .into());
        }
        Ok(summary)
    }

    /// Nearest-rank percentile over every recorded sample.
    pub fn nearest_rank(&self, percentile: u32) -> HarnessResult<u64> {
        let mut sorted: Vec<u64> = self.samples.iter().map(|s| s.nanos).collect();
        sorted.sort_unstable();
        nearest_rank(&sorted, percentile)
    }
}

/// Recorder shared by concurrently running tasks.
///
/// Appends are serialized through a mutex. Summaries are only available after
/// [`ConcurrentLatencyRecorder::finalize`], which fails while any task still
/// holds a handle.
#[derive(Debug, Default)]
pub struct ConcurrentLatencyRecorder {
    samples: Mutex<Vec<LatencySample>>,
}

impl ConcurrentLatencyRecorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record_labeled(&self, label: impl Into<String>, duration: Duration) {
        let sample = LatencySample {
            label: label.into(),
            nanos: duration_to_nanos(duration),
        };
        self.samples
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(sample);
    }

    pub fn record(&self, duration: Duration) {
        self.record_labeled(DEFAULT_LABEL, duration);
    }

    /// Stop recording and hand the samples to a plain recorder.
    pub fn finalize(self: Arc<Self>) -> HarnessResult<LatencyRecorder> {
        let recorder = Arc::try_unwrap(self).map_err(|shared| HarnessError::RecorderInUse {
            holders: Arc::strong_count(&shared) - 1,
        })?;
        let samples = recorder
            .samples
            .into_inner()
            .unwrap_or_else(|p| p.into_inner());
        Ok(LatencyRecorder { samples })
    }
}
