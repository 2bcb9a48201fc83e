// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Fixed-duration throughput measurement.
//!
//! Rates are divided by the measured elapsed time of the window, never by the
//! nominal duration, so loop overhead does not bias the result.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::clock::{duration_to_nanos, monotonic, SharedClock};
use crate::error::{
    HarnessError, HarnessResult, InvalidConfigurationError, PartialProgress, TransportError,
};

/// Counters accumulated over one bounded-duration run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThroughputWindow {
    pub messages: u64,
    pub bytes: u64,
    pub elapsed: Duration,
}

impl ThroughputWindow {
    fn record(&mut self, bytes: u64) {
        self.messages += 1;
        self.bytes += bytes;
    }

    fn progress(&self) -> PartialProgress {
        PartialProgress {
            completed: self.messages,
            expected: None,
            bytes: self.bytes,
            elapsed_ns: duration_to_nanos(self.elapsed),
        }
    }

    /// Derive rates and close the window.
    pub fn finish(self) -> ThroughputReport {
        ThroughputReport::calculate(self.messages, self.bytes, duration_to_nanos(self.elapsed))
    }
}

/// Throughput derived from a finished window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThroughputReport {
    /// Messages completed per second
    pub messages_per_second: f64,
    /// Payload bytes per second
    pub bytes_per_second: f64,
    /// Total messages completed
    pub total_messages: u64,
    /// Total payload bytes
    pub total_bytes: u64,
    /// Measured window length in nanoseconds
    pub elapsed_ns: u64,
}

impl ThroughputReport {
    /// Calculate throughput from message count, byte count, and elapsed time.
    pub fn calculate(messages: u64, bytes: u64, elapsed_ns: u64) -> Self {
        let elapsed_secs = elapsed_ns as f64 / 1_000_000_000.0;
        let rate = |count: u64| {
            if elapsed_ns == 0 {
                0.0
            } else {
                count as f64 / elapsed_secs
            }
        };
        Self {
            messages_per_second: rate(messages),
            bytes_per_second: rate(bytes),
            total_messages: messages,
            total_bytes: bytes,
            elapsed_ns,
        }
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.elapsed_ns)
    }

    /// Format throughput in human-readable form.
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
}

/// Runs a call repeatedly until a time budget is spent.
pub struct ThroughputMeter {
    clock: SharedClock,
    warmup_calls: u64,
}

impl ThroughputMeter {
    pub fn new() -> Self {
        Self {
            clock: monotonic(),
            warmup_calls: 0,
        }
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// Unmeasured calls issued before the window opens.
    pub fn warmup(mut self, calls: u64) -> Self {
        self.warmup_calls = calls;
        self
    }

    /// Invoke `call` until `duration` of monotonic time has elapsed.
    ///
    /// `call` performs one request and returns the bytes it transferred. The
    /// first error stops the loop; counters gathered so far are returned inside
    /// [`HarnessError::PartialFailure`].
    pub async fn run<F, Fut>(&self, duration: Duration, mut call: F) -> HarnessResult<ThroughputReport>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<u64, TransportError>>,
    {
        if duration.is_zero() {
            return Err(InvalidConfigurationError::NonPositiveDuration {
                context: "throughput window",
            }
            .into());
        }

        for _ in 0..self.warmup_calls {
            call().await?;
        }

        tracing::debug!(duration_ms = duration.as_millis() as u64, "Throughput window open");

        let mut window = ThroughputWindow::default();
        let start = self.clock.now();

        while self.clock.since(start) < duration {
            match call().await {
                Ok(bytes) => window.record(bytes),
                Err(source) => {
                    window.elapsed = self.clock.since(start);
                    tracing::warn!(
                        messages = window.messages,
                        bytes = window.bytes,
                        error = %source,
                        "Throughput window aborted"
                    );
                    return Err(HarnessError::PartialFailure {
                        operation: "throughput",
                        progress: window.progress(),
                        partial: None,
                        source,
                    });
                }
            }
        }

        window.elapsed = self.clock.since(start);
        let report = window.finish();
        tracing::info!(
            messages = report.total_messages,
            msgs_per_sec = report.messages_per_second,
            "Throughput window closed"
        );
        Ok(report)
    }
}

impl Default for ThroughputMeter {
    fn default() -> Self {
        Self::new()
    }
}
