// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Sequential versus parallel batch dispatch.
//!
//! Client-side dispatch issues one unary call per request, either one at a
//! time or all at once on a [`JoinSet`]. Server-side dispatch hands the whole
//! list to the service's batch operation. Either way the first failure aborts
//! the batch and the number of completed requests is reported with the error.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;

use crate::clock::{duration_to_nanos, monotonic, SharedClock, Timer};
use crate::error::{
    HarnessError, HarnessResult, InvalidConfigurationError, PartialProgress, TransportError,
};
use crate::stats::{ConcurrentLatencyRecorder, LatencySummary};
use crate::transport::{with_deadline, BatchRequest, Transport};
use crate::types::RequestRecord;

/// How the requests of a batch are issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchMode {
    /// One request at a time, each response awaited before the next issue.
    Sequential,
    /// Every request in flight at once.
    Parallel,
}

impl BatchMode {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Parallel => "parallel",
        }
    }
}

impl fmt::Display for BatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Where the batch is fanned out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BatchStrategy {
    /// The harness issues one unary call per request.
    #[default]
    #[serde(rename = "client")]
    ClientSide,
    /// The service's batch operation, with `parallel_process` set from the mode.
    #[serde(rename = "server")]
    ServerSide,
}

impl BatchStrategy {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ClientSide => "client",
            Self::ServerSide => "server",
        }
    }
}

impl fmt::Display for BatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for BatchStrategy {
    type Err = InvalidConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "client" | "client-side" | "client_side" => Ok(Self::ClientSide),
            "server" | "server-side" | "server_side" => Ok(Self::ServerSide),
            other => Err(InvalidConfigurationError::InvalidFieldValue {
                field: "batch.strategy",
                value: other.to_string(),
                reason: "Expected client or server".to_string(),
            }),
        }
    }
}

/// One batch trial: a request list bound to a mode, consumed by the dispatcher.
#[derive(Debug, Clone)]
pub struct BatchJob {
    requests: Vec<RequestRecord>,
    mode: BatchMode,
}

impl BatchJob {
    pub fn new(
        requests: Vec<RequestRecord>,
        mode: BatchMode,
    ) -> Result<Self, InvalidConfigurationError> {
        if requests.is_empty() {
            return Err(InvalidConfigurationError::EmptyBatch);
        }
        Ok(Self { requests, mode })
    }

    /// The same logical requests bound once to each mode.
    pub fn pair(requests: &[RequestRecord]) -> Result<(Self, Self), InvalidConfigurationError> {
        Ok((
            Self::new(requests.to_vec(), BatchMode::Sequential)?,
            Self::new(requests.to_vec(), BatchMode::Parallel)?,
        ))
    }

    pub fn mode(&self) -> BatchMode {
        self.mode
    }

    pub fn requests(&self) -> &[RequestRecord] {
        &self.requests
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

/// Wall-clock cost of one dispatched batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchTiming {
    pub mode: BatchMode,
    pub strategy: BatchStrategy,
    pub request_count: usize,
    /// First issue to last response
    pub total_ns: u64,
    /// `total_ns / request_count`
    pub avg_ns_per_request: f64,
    /// Sum of individual request latencies; `None` for server-side batches
    pub sum_of_request_times_ns: Option<u64>,
    /// Per-request latency distribution for client-side batches
    pub latency: Option<LatencySummary>,
    pub bytes: u64,
}

impl BatchTiming {
    fn new(
        mode: BatchMode,
        strategy: BatchStrategy,
        request_count: usize,
        total_ns: u64,
        bytes: u64,
    ) -> Self {
        Self {
            mode,
            strategy,
            request_count,
            total_ns,
            avg_ns_per_request: total_ns as f64 / request_count.max(1) as f64,
            sum_of_request_times_ns: None,
            latency: None,
            bytes,
        }
    }

    pub fn total(&self) -> Duration {
        Duration::from_nanos(self.total_ns)
    }
}

/// Both modes run over equivalent request sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchComparison {
    pub strategy: BatchStrategy,
    pub batch_size: usize,
    pub sequential: BatchTiming,
    pub parallel: BatchTiming,
    /// `sequential.total / parallel.total`, 0 when the parallel run took no time
    pub speedup: f64,
    /// `speedup / batch_size * 100`
    pub efficiency_pct: f64,
}

impl BatchComparison {
    pub fn from_timings(sequential: BatchTiming, parallel: BatchTiming) -> Self {
        let batch_size = sequential.request_count;
        let speedup = if parallel.total_ns == 0 {
            0.0
        } else {
            sequential.total_ns as f64 / parallel.total_ns as f64
        };
        Self {
            strategy: sequential.strategy,
            batch_size,
            speedup,
            efficiency_pct: speedup / batch_size.max(1) as f64 * 100.0,
            sequential,
            parallel,
        }
    }
}

/// Dispatches batches through the shared transport handle.
pub struct BatchDispatcher {
    transport: Arc<dyn Transport>,
    clock: SharedClock,
    call_timeout: Duration,
}

impl BatchDispatcher {
    pub fn new(transport: Arc<dyn Transport>, call_timeout: Duration) -> Self {
        Self {
            transport,
            clock: monotonic(),
            call_timeout,
        }
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// Issue every request as its own unary call in the given mode.
    ///
    /// Input records are cloned into the calls, never modified.
    pub async fn dispatch(
        &self,
        requests: &[RequestRecord],
        mode: BatchMode,
    ) -> HarnessResult<BatchTiming> {
        if requests.is_empty() {
            return Err(InvalidConfigurationError::EmptyBatch.into());
        }

        tracing::debug!(size = requests.len(), mode = mode.name(), "Dispatching batch");

        match mode {
            BatchMode::Sequential => self.dispatch_sequential(requests).await,
            BatchMode::Parallel => self.dispatch_parallel(requests).await,
        }
    }

    /// Run a prepared job with the given strategy.
    pub async fn execute(&self, job: BatchJob, strategy: BatchStrategy) -> HarnessResult<BatchTiming> {
        match strategy {
            BatchStrategy::ClientSide => self.dispatch(&job.requests, job.mode).await,
            BatchStrategy::ServerSide => self.dispatch_remote(&job.requests, job.mode).await,
        }
    }

    async fn dispatch_sequential(&self, requests: &[RequestRecord]) -> HarnessResult<BatchTiming> {
        let expected = requests.len() as u64;
        let recorder = ConcurrentLatencyRecorder::new();
        let mut bytes = 0u64;
        let batch_timer = Timer::start(self.clock.as_ref());

        for (completed, request) in requests.iter().enumerate() {
            let call_timer = Timer::start(self.clock.as_ref());
            let result = with_deadline(
                self.call_timeout,
                "unary",
                self.transport.unary(request.clone()),
            )
            .await;
            match result {
                Ok(response) => {
                    recorder.record(call_timer.elapsed());
                    bytes += response.payload_bytes;
                }
                Err(source) => {
                    return Err(batch_failure(
                        completed as u64,
                        expected,
                        bytes,
                        batch_timer.elapsed(),
                        source,
                    ));
                }
            }
        }

        let total_ns = batch_timer.stop();
        finish_client_timing(BatchMode::Sequential, requests.len(), total_ns, bytes, recorder)
    }

    async fn dispatch_parallel(&self, requests: &[RequestRecord]) -> HarnessResult<BatchTiming> {
        let expected = requests.len() as u64;
        let recorder = ConcurrentLatencyRecorder::new();
        let batch_timer = Timer::start(self.clock.as_ref());
        let mut tasks = JoinSet::new();

        for request in requests {
            let transport = Arc::clone(&self.transport);
            let clock = Arc::clone(&self.clock);
            let recorder = Arc::clone(&recorder);
            let request = request.clone();
            let timeout = self.call_timeout;
            tasks.spawn(async move {
                let start = clock.now();
                let response = with_deadline(timeout, "unary", transport.unary(request)).await?;
                recorder.record(clock.since(start));
                Ok::<u64, TransportError>(response.payload_bytes)
            });
        }

        let mut completed = 0u64;
        let mut bytes = 0u64;
        while let Some(joined) = tasks.join_next().await {
            let outcome = joined.unwrap_or_else(|e| {
                Err(TransportError::StreamReset {
                    reason: format!("batch task ended abnormally: {}", e),
                })
            });
            match outcome {
                Ok(n) => {
                    completed += 1;
                    bytes += n;
                }
                Err(source) => {
                    tasks.abort_all();
                    return Err(batch_failure(
                        completed,
                        expected,
                        bytes,
                        batch_timer.elapsed(),
                        source,
                    ));
                }
            }
        }

        let total_ns = batch_timer.stop();
        finish_client_timing(BatchMode::Parallel, requests.len(), total_ns, bytes, recorder)
    }

    /// Send the whole list through the service's batch operation.
    pub async fn dispatch_remote(
        &self,
        requests: &[RequestRecord],
        mode: BatchMode,
    ) -> HarnessResult<BatchTiming> {
        if requests.is_empty() {
            return Err(InvalidConfigurationError::EmptyBatch.into());
        }

        let request = BatchRequest {
            requests: requests.to_vec(),
            parallel_process: mode == BatchMode::Parallel,
        };
        let timer = Timer::start(self.clock.as_ref());
        let result = with_deadline(self.call_timeout, "batch", self.transport.batch(request)).await;

        let response = match result {
            Ok(response) => response,
            Err(source) => {
                return Err(batch_failure(
                    0,
                    requests.len() as u64,
                    0,
                    timer.elapsed(),
                    source,
                ));
            }
        };
        let total_ns = timer.stop();

        if response.responses.len() != requests.len() {
            tracing::warn!(
                sent = requests.len(),
                returned = response.responses.len(),
                "Batch response count differs from request count"
            );
        }
        let bytes = response.responses.iter().map(|r| r.payload_bytes).sum();

        Ok(BatchTiming::new(
            mode,
            BatchStrategy::ServerSide,
            requests.len(),
            total_ns,
            bytes,
        ))
    }

    /// Dispatch the same requests sequentially, then in parallel.
    pub async fn compare(
        &self,
        requests: &[RequestRecord],
        strategy: BatchStrategy,
    ) -> HarnessResult<BatchComparison> {
        let (sequential_job, parallel_job) = BatchJob::pair(requests)?;
        let sequential = self.execute(sequential_job, strategy).await?;
        let parallel = self.execute(parallel_job, strategy).await?;
        let comparison = BatchComparison::from_timings(sequential, parallel);

        tracing::info!(
            size = comparison.batch_size,
            strategy = strategy.name(),
            speedup = comparison.speedup,
            efficiency_pct = comparison.efficiency_pct,
            "Batch comparison complete"
        );
        Ok(comparison)
    }
}

fn batch_failure(
    completed: u64,
    expected: u64,
    bytes: u64,
    elapsed: Duration,
    source: TransportError,
) -> HarnessError {
    tracing::warn!(completed, expected, error = %source, "Batch aborted");
    HarnessError::PartialFailure {
        operation: "batch",
        progress: PartialProgress {
            completed,
            expected: Some(expected),
            bytes,
            elapsed_ns: duration_to_nanos(elapsed),
        },
        partial: None,
        source,
    }
}

fn finish_client_timing(
    mode: BatchMode,
    request_count: usize,
    total_ns: u64,
    bytes: u64,
    recorder: Arc<ConcurrentLatencyRecorder>,
) -> HarnessResult<BatchTiming> {
    let recorder = recorder.finalize()?;
    let mut timing = BatchTiming::new(mode, BatchStrategy::ClientSide, request_count, total_ns, bytes);
    timing.sum_of_request_times_ns = Some(duration_to_nanos(recorder.total()));
    timing.latency = Some(recorder.summarize()?);
    Ok(timing)
}
