// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Self-checks of the measurement methodology.
//!
//! Four independent checks compare what the harness measures against ground
//! truth:
//!
//! 1. Noise floor: back-to-back clock reads with nothing in between.
//! 2. Delay accuracy: pings against a service configured with known delays.
//!    The harness does not inject the delay itself.
//! 3. Throughput accuracy: harness byte counts against OS network counters.
//! 4. Parallel efficiency: sequential versus parallel batches.
//!
//! A failed measurement fails its check only; [`ValidationHarness::run_all`]
//! always runs all four.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::batch::{BatchDispatcher, BatchStrategy};
use crate::clock::{duration_to_nanos, monotonic, SharedClock};
use crate::error::{
    HarnessError, HarnessResult, InvalidConfigurationError, PartialMeasurement, PartialProgress,
    TransportError,
};
use crate::netio::NetworkCounters;
use crate::throughput::{ThroughputMeter, ThroughputReport};
use crate::transport::{process_client_id, with_deadline, PingRequest, Transport};
use crate::types::{Payload, RequestId, RequestRecord};

/// Knobs for the four checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationSettings {
    pub noise_iterations: usize,
    pub delay_iterations: usize,
    /// Delays the service is configured to apply, in microseconds
    pub expected_delays_us: Vec<u64>,
    pub throughput_duration: Duration,
    pub throughput_message_size: usize,
    pub parallel_batch_size: usize,
    pub parallel_iterations: usize,
    pub batch_strategy: BatchStrategy,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            noise_iterations: 1000,
            delay_iterations: 100,
            expected_delays_us: vec![1000, 5000, 10000],
            throughput_duration: Duration::from_secs(5),
            throughput_message_size: 1024,
            parallel_batch_size: 5,
            parallel_iterations: 5,
            batch_strategy: BatchStrategy::ServerSide,
        }
    }
}

/// Expected against measured for one quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub label: String,
    pub unit: String,
    pub expected: f64,
    pub measured: f64,
    /// `|measured - expected| / expected * 100`, `None` when nothing is expected
    pub error_pct: Option<f64>,
    pub std_dev: Option<f64>,
}

impl ValidationResult {
    pub fn new(label: impl Into<String>, unit: impl Into<String>, expected: f64, measured: f64) -> Self {
        let error_pct = if expected == 0.0 {
            None
        } else {
            Some((measured - expected).abs() / expected * 100.0)
        };
        Self {
            label: label.into(),
            unit: unit.into(),
            expected,
            measured,
            error_pct,
            std_dev: None,
        }
    }

    pub fn with_std_dev(mut self, std_dev: f64) -> Self {
        self.std_dev = Some(std_dev);
        self
    }
}

/// Harness byte count against the OS view of the same window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThroughputAccuracy {
    pub harness: ThroughputReport,
    pub os_bytes: u64,
    pub harness_bytes_per_second: f64,
    pub os_bytes_per_second: f64,
    /// `os_bytes / harness_bytes * 100`; above 100 means framing overhead
    /// the harness does not count
    pub accuracy_pct: f64,
}

impl ThroughputAccuracy {
    pub fn results(&self) -> Vec<ValidationResult> {
        vec![
            ValidationResult::new(
                "bytes_per_second",
                "B/s",
                self.harness_bytes_per_second,
                self.os_bytes_per_second,
            ),
            ValidationResult::new("accuracy", "%", 100.0, self.accuracy_pct),
        ]
    }
}

/// Averaged sequential and parallel batch timings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParallelEfficiency {
    pub batch_size: usize,
    pub iterations: usize,
    pub strategy: BatchStrategy,
    pub sequential_mean_ns: f64,
    pub parallel_mean_ns: f64,
    pub speedup: f64,
    pub efficiency_pct: f64,
}

impl ParallelEfficiency {
    /// Ideal speedup equals the batch size, ideal efficiency is 100%.
    pub fn results(&self) -> Vec<ValidationResult> {
        vec![
            ValidationResult::new("speedup", "x", self.batch_size as f64, self.speedup),
            ValidationResult::new("efficiency", "%", 100.0, self.efficiency_pct),
        ]
    }
}

/// Names the four checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    NoiseFloor,
    DelayAccuracy,
    ThroughputAccuracy,
    ParallelEfficiency,
}

impl CheckKind {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::NoiseFloor => "noise_floor",
            Self::DelayAccuracy => "delay_accuracy",
            Self::ThroughputAccuracy => "throughput_accuracy",
            Self::ParallelEfficiency => "parallel_efficiency",
        }
    }
}

/// One check's results, or the error that stopped its measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub kind: CheckKind,
    pub results: Vec<ValidationResult>,
    pub error: Option<String>,
    pub progress: Option<PartialProgress>,
}

impl CheckOutcome {
    fn from_result(kind: CheckKind, result: HarnessResult<Vec<ValidationResult>>) -> Self {
        match result {
            Ok(results) => Self {
                kind,
                results,
                error: None,
                progress: None,
            },
            Err(e) => {
                tracing::warn!(check = kind.name(), error = %e, "Validation check failed");
                Self {
                    kind,
                    results: e.partial_results().to_vec(),
                    progress: e.progress().copied(),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    pub fn passed(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcome of every check in one validation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub checks: Vec<CheckOutcome>,
}

impl ValidationReport {
    pub fn failed(&self) -> usize {
        self.checks.iter().filter(|c| !c.passed()).count()
    }

    pub fn check(&self, kind: CheckKind) -> Option<&CheckOutcome> {
        self.checks.iter().find(|c| c.kind == kind)
    }
}

/// Runs the self-checks against one transport.
pub struct ValidationHarness {
    transport: Arc<dyn Transport>,
    counters: Arc<dyn NetworkCounters>,
    clock: SharedClock,
    call_timeout: Duration,
    settings: ValidationSettings,
}

impl ValidationHarness {
    pub fn new(
        transport: Arc<dyn Transport>,
        counters: Arc<dyn NetworkCounters>,
        call_timeout: Duration,
        settings: ValidationSettings,
    ) -> Self {
        Self {
            transport,
            counters,
            clock: monotonic(),
            call_timeout,
            settings,
        }
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> &ValidationSettings {
        &self.settings
    }

    /// Mean and sample standard deviation of back-to-back clock reads, in ns.
    pub fn noise_floor(&self) -> HarnessResult<ValidationResult> {
        let iterations = self.settings.noise_iterations;
        if iterations < 2 {
            return Err(HarnessError::InsufficientData {
                metric: "noise floor",
                required: 2,
                available: iterations,
            });
        }

        let mut deltas = Vec::with_capacity(iterations);
        for _ in 0..iterations {
            let start = self.clock.now();
            let end = self.clock.now();
            deltas.push(duration_to_nanos(end.saturating_duration_since(start)) as f64);
        }
        let (mean, std_dev) = mean_and_std_dev(&deltas);

        tracing::debug!(mean_ns = mean, std_dev_ns = std_dev, "Noise floor measured");
        Ok(ValidationResult::new("noise_floor", "ns", 0.0, mean).with_std_dev(std_dev))
    }

    /// Timed pings per configured delay, compared with that delay in µs.
    pub async fn delay_accuracy(&self) -> HarnessResult<Vec<ValidationResult>> {
        let iterations = self.settings.delay_iterations;
        if iterations < 2 {
            return Err(HarnessError::InsufficientData {
                metric: "delay accuracy",
                required: 2,
                available: iterations,
            });
        }

        let client_id = process_client_id();
        let mut results = Vec::with_capacity(self.settings.expected_delays_us.len());

        for &expected_us in &self.settings.expected_delays_us {
            let mut measured_us = Vec::with_capacity(iterations);
            let started = self.clock.now();
            for completed in 0..iterations {
                let start = self.clock.now();
                let result = with_deadline(
                    self.call_timeout,
                    "ping",
                    self.transport.ping(PingRequest::new(client_id.as_str())),
                )
                .await;
                let elapsed = self.clock.since(start);
                if let Err(source) = result {
                    tracing::warn!(
                        expected_us,
                        completed,
                        finished_delays = results.len(),
                        error = %source,
                        "Delay accuracy aborted"
                    );
                    return Err(HarnessError::PartialFailure {
                        operation: "delay accuracy",
                        progress: PartialProgress {
                            completed: completed as u64,
                            expected: Some(iterations as u64),
                            bytes: 0,
                            elapsed_ns: duration_to_nanos(self.clock.since(started)),
                        },
                        partial: Some(Box::new(PartialMeasurement::Validation(results))),
                        source,
                    });
                }
                measured_us.push(elapsed.as_nanos() as f64 / 1_000.0);
            }

            let (mean, std_dev) = mean_and_std_dev(&measured_us);
            let result = ValidationResult::new(
                format!("delay_{}us", expected_us),
                "us",
                expected_us as f64,
                mean,
            )
            .with_std_dev(std_dev);
            tracing::debug!(
                expected_us,
                measured_us = mean,
                error_pct = result.error_pct,
                "Delay accuracy measured"
            );
            results.push(result);
        }
        Ok(results)
    }

    /// Unary calls for the configured window, bracketed by OS counter reads.
    pub async fn throughput_accuracy(&self) -> HarnessResult<ThroughputAccuracy> {
        if self.settings.throughput_message_size == 0 {
            return Err(InvalidConfigurationError::InvalidFieldValue {
                field: "validation.throughput_message_size",
                value: "0".to_string(),
                reason: "Must be positive".to_string(),
            }
            .into());
        }

        let payload = Payload::filled(self.settings.throughput_message_size);
        let message_bytes = payload.byte_len();
        let meter = ThroughputMeter::new().with_clock(Arc::clone(&self.clock));
        let mut sequence = 0usize;

        let os_before = self.counters.bytes_sent();
        let report = meter
            .run(self.settings.throughput_duration, || {
                let request =
                    RequestRecord::new(RequestId::numbered("throughput", sequence), payload.clone());
                sequence += 1;
                let transport = Arc::clone(&self.transport);
                let timeout = self.call_timeout;
                async move {
                    with_deadline(timeout, "unary", transport.unary(request)).await?;
                    Ok::<u64, TransportError>(message_bytes)
                }
            })
            .await?;
        let os_after = self.counters.bytes_sent();

        let os_bytes = os_after.saturating_sub(os_before);
        let elapsed_secs = report.elapsed().as_secs_f64();
        let os_bytes_per_second = if elapsed_secs > 0.0 {
            os_bytes as f64 / elapsed_secs
        } else {
            0.0
        };
        let accuracy_pct = if report.total_bytes > 0 {
            os_bytes as f64 / report.total_bytes as f64 * 100.0
        } else {
            0.0
        };

        tracing::debug!(
            harness_bytes = report.total_bytes,
            os_bytes,
            accuracy_pct,
            "Throughput accuracy measured"
        );
        Ok(ThroughputAccuracy {
            harness_bytes_per_second: report.bytes_per_second,
            os_bytes_per_second,
            os_bytes,
            accuracy_pct,
            harness: report,
        })
    }

    /// Sequential and parallel batches of equal content, averaged.
    pub async fn parallel_efficiency(&self) -> HarnessResult<ParallelEfficiency> {
        let batch_size = self.settings.parallel_batch_size;
        let iterations = self.settings.parallel_iterations;
        if batch_size == 0 {
            return Err(InvalidConfigurationError::EmptyBatch.into());
        }
        if iterations == 0 {
            return Err(HarnessError::InsufficientData {
                metric: "parallel efficiency",
                required: 1,
                available: 0,
            });
        }

        let dispatcher = BatchDispatcher::new(Arc::clone(&self.transport), self.call_timeout)
            .with_clock(Arc::clone(&self.clock));
        let payload = Payload::filled(self.settings.throughput_message_size);
        let mut sequential_total = 0f64;
        let mut parallel_total = 0f64;

        for _ in 0..iterations {
            let requests = RequestRecord::numbered("parallel", batch_size, &payload);
            let comparison = dispatcher
                .compare(&requests, self.settings.batch_strategy)
                .await?;
            sequential_total += comparison.sequential.total_ns as f64;
            parallel_total += comparison.parallel.total_ns as f64;
        }

        let sequential_mean_ns = sequential_total / iterations as f64;
        let parallel_mean_ns = parallel_total / iterations as f64;
        let speedup = if parallel_mean_ns > 0.0 {
            sequential_mean_ns / parallel_mean_ns
        } else {
            0.0
        };

        Ok(ParallelEfficiency {
            batch_size,
            iterations,
            strategy: self.settings.batch_strategy,
            sequential_mean_ns,
            parallel_mean_ns,
            speedup,
            efficiency_pct: speedup / batch_size as f64 * 100.0,
        })
    }

    /// Run every check; failures are recorded per check.
    pub async fn run_all(&self) -> ValidationReport {
        tracing::info!(address = self.transport.target(), "Validation run starting");

        let checks = vec![
            CheckOutcome::from_result(CheckKind::NoiseFloor, self.noise_floor().map(|r| vec![r])),
            CheckOutcome::from_result(CheckKind::DelayAccuracy, self.delay_accuracy().await),
            CheckOutcome::from_result(
                CheckKind::ThroughputAccuracy,
                self.throughput_accuracy().await.map(|t| t.results()),
            ),
            CheckOutcome::from_result(
                CheckKind::ParallelEfficiency,
                self.parallel_efficiency().await.map(|p| p.results()),
            ),
        ];

        let report = ValidationReport { checks };
        tracing::info!(failed = report.failed(), "Validation run finished");
        report
    }
}

/// Mean and sample standard deviation (n - 1 denominator).
fn mean_and_std_dev(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    if values.len() < 2 {
        return (mean, 0.0);
    }
    let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>()
        / (values.len() - 1) as f64;
    (mean, variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::netio::ManualNetworkCounters;
    use crate::testing::StubTransport;

    /// Wire view of a stub: every unary call puts a fixed frame on the wire.
    struct FramedCounters {
        stub: Arc<StubTransport>,
        frame_bytes: u64,
    }

    impl NetworkCounters for FramedCounters {
        fn bytes_sent(&self) -> u64 {
            self.stub.calls() * self.frame_bytes
        }
    }

    fn settings() -> ValidationSettings {
        ValidationSettings {
            noise_iterations: 50,
            delay_iterations: 10,
            expected_delays_us: vec![1000],
            throughput_duration: Duration::from_millis(100),
            throughput_message_size: 1024,
            parallel_batch_size: 5,
            parallel_iterations: 3,
            batch_strategy: BatchStrategy::ServerSide,
        }
    }

    fn harness(stub: StubTransport, settings: ValidationSettings) -> (ValidationHarness, Arc<StubTransport>) {
        let stub = Arc::new(stub);
        let counters = Arc::new(FramedCounters {
            stub: Arc::clone(&stub),
            frame_bytes: 1100,
        });
        let harness =
            ValidationHarness::new(stub.clone(), counters, Duration::from_secs(1), settings);
        (harness, stub)
    }

    #[test]
    fn test_error_pct() {
        let result = ValidationResult::new("delay", "us", 2000.0, 2500.0);
        assert_eq!(result.error_pct, Some(25.0));
        assert_eq!(ValidationResult::new("noise", "ns", 0.0, 40.0).error_pct, None);
    }

    #[test]
    fn test_noise_floor_on_frozen_clock_is_zero() {
        let (harness, _) = harness(StubTransport::default(), settings());
        let harness = harness.with_clock(Arc::new(ManualClock::new()));
        let result = harness.noise_floor().unwrap();
        assert_eq!(result.measured, 0.0);
        assert_eq!(result.std_dev, Some(0.0));
        assert!(result.error_pct.is_none());
    }

    #[test]
    fn test_noise_floor_needs_two_samples() {
        let mut settings = settings();
        settings.noise_iterations = 1;
        let (harness, _) = harness(StubTransport::default(), settings);
        assert!(matches!(
            harness.noise_floor(),
            Err(HarnessError::InsufficientData { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_accuracy_matches_configured_delay() {
        let mut settings = settings();
        settings.expected_delays_us = vec![1000, 2000];
        let (harness, _) = harness(StubTransport::with_delay(Duration::from_millis(1)), settings);

        let results = harness.delay_accuracy().await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].measured, 1000.0);
        assert_eq!(results[0].error_pct, Some(0.0));
        // The stub always answers after 1ms
        assert_eq!(results[1].error_pct, Some(50.0));
        assert_eq!(results[1].std_dev, Some(0.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_accuracy_failure_keeps_finished_delays() {
        let mut settings = settings();
        settings.expected_delays_us = vec![1000, 2000, 5000];
        // Ten pings per delay: the third delay fails on its fourth ping
        let stub = || StubTransport {
            call_delay: Duration::from_millis(1),
            ping_fail_from: Some(24),
            ..StubTransport::default()
        };
        let (validator, _) = harness(stub(), settings.clone());

        let err = validator.delay_accuracy().await.unwrap_err();
        assert_eq!(err.progress().map(|p| p.completed), Some(3));
        let finished = err.partial_results();
        assert_eq!(finished.len(), 2);
        assert_eq!(finished[0].label, "delay_1000us");
        assert_eq!(finished[0].measured, 1000.0);
        assert_eq!(finished[1].label, "delay_2000us");

        let (fresh, _) = harness(stub(), settings);
        let report = fresh.run_all().await;
        let check = report.check(CheckKind::DelayAccuracy).unwrap();
        assert!(!check.passed());
        assert_eq!(check.results.len(), 2);
        assert_eq!(check.progress.map(|p| p.completed), Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_throughput_accuracy_exposes_framing_overhead() {
        let (harness, _) = harness(StubTransport::with_delay(Duration::from_millis(1)), settings());
        let accuracy = harness.throughput_accuracy().await.unwrap();

        assert_eq!(accuracy.harness.total_messages, 100);
        assert_eq!(accuracy.harness.total_bytes, 100 * 1024);
        assert_eq!(accuracy.os_bytes, 100 * 1100);
        assert!((accuracy.accuracy_pct - 107.421875).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_parallel_efficiency_averages_iterations() {
        let (harness, stub) =
            harness(StubTransport::with_delay(Duration::from_millis(10)), settings());
        let efficiency = harness.parallel_efficiency().await.unwrap();

        assert_eq!(efficiency.sequential_mean_ns, 50_000_000.0);
        assert_eq!(efficiency.parallel_mean_ns, 10_000_000.0);
        assert_eq!(efficiency.speedup, 5.0);
        assert_eq!(efficiency.efficiency_pct, 100.0);
        // Two server-side batch calls per iteration
        assert_eq!(stub.calls(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_check_does_not_stop_the_others() {
        let mut settings = settings();
        settings.batch_strategy = BatchStrategy::ClientSide;
        let stub = StubTransport {
            call_delay: Duration::from_millis(1),
            fail_from_call: Some(1),
            ..StubTransport::default()
        };
        let stub = Arc::new(stub);
        let harness = ValidationHarness::new(
            stub,
            Arc::new(ManualNetworkCounters::new()),
            Duration::from_secs(1),
            settings,
        );

        let report = harness.run_all().await;
        assert_eq!(report.checks.len(), 4);
        assert!(report.check(CheckKind::NoiseFloor).unwrap().passed());
        assert!(report.check(CheckKind::DelayAccuracy).unwrap().passed());
        let throughput = report.check(CheckKind::ThroughputAccuracy).unwrap();
        assert!(!throughput.passed());
        assert_eq!(throughput.progress.map(|p| p.completed), Some(0));
        assert!(!report.check(CheckKind::ParallelEfficiency).unwrap().passed());
        assert_eq!(report.failed(), 2);
    }
}
