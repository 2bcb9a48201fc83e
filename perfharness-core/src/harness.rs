// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! The harness instance: one transport handle, shared by every driver.

use std::sync::Arc;
use std::time::Duration;

use crate::batch::{BatchComparison, BatchDispatcher};
use crate::clock::{duration_to_nanos, monotonic, SharedClock};
use crate::config::Config;
use crate::error::{
    HarnessError, HarnessResult, PartialMeasurement, PartialProgress, TransportError,
};
use crate::netio::NetworkCounters;
use crate::stats::{LatencyRecorder, LatencySummary};
use crate::streaming::{CallOutcome, StreamingDriver};
use crate::throughput::{ThroughputMeter, ThroughputReport};
use crate::transport::{process_client_id, with_deadline, PingRequest, StreamRequest, Transport};
use crate::types::{Payload, PayloadSize, RequestId, RequestRecord};
use crate::validation::{ValidationHarness, ValidationReport};

/// Ping-pong latency measurement with unmeasured warmup.
pub struct LatencyProbe {
    transport: Arc<dyn Transport>,
    clock: SharedClock,
    call_timeout: Duration,
    /// Number of warmup pings before measurement
    warmup_iterations: usize,
    /// Number of measured pings
    measurement_iterations: usize,
}

impl LatencyProbe {
    pub fn new(transport: Arc<dyn Transport>, call_timeout: Duration) -> Self {
        Self {
            transport,
            clock: monotonic(),
            call_timeout,
            warmup_iterations: 10,
            measurement_iterations: 1000,
        }
    }

    /// Set the number of warmup iterations.
    pub fn warmup(mut self, iterations: usize) -> Self {
        self.warmup_iterations = iterations;
        self
    }

    /// Set the number of measurement iterations.
    pub fn iterations(mut self, iterations: usize) -> Self {
        self.measurement_iterations = iterations;
        self
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    async fn ping(&self, client_id: &str) -> Result<(), TransportError> {
        with_deadline(
            self.call_timeout,
            "ping",
            self.transport.ping(PingRequest::new(client_id)),
        )
        .await
        .map(|_| ())
    }

    /// Run the probe and collect one sample per measured ping.
    pub async fn run(&self) -> HarnessResult<LatencyRecorder> {
        let client_id = process_client_id();

        for _ in 0..self.warmup_iterations {
            self.ping(&client_id).await?;
        }

        let mut recorder = LatencyRecorder::with_capacity(self.measurement_iterations);
        let started = self.clock.now();
        for completed in 0..self.measurement_iterations {
            let start = self.clock.now();
            if let Err(source) = self.ping(&client_id).await {
                tracing::warn!(completed, error = %source, "Latency probe aborted");
                return Err(HarnessError::PartialFailure {
                    operation: "latency",
                    progress: PartialProgress {
                        completed: completed as u64,
                        expected: Some(self.measurement_iterations as u64),
                        bytes: 0,
                        elapsed_ns: duration_to_nanos(self.clock.since(started)),
                    },
                    partial: recorder
                        .summarize()
                        .ok()
                        .map(|summary| Box::new(PartialMeasurement::Latency(summary))),
                    source,
                });
            }
            recorder.record_labeled("ping", self.clock.since(start));
        }
        Ok(recorder)
    }

    /// Run the probe and summarize.
    pub async fn summarize(&self) -> HarnessResult<LatencySummary> {
        self.run().await?.summarize()
    }
}

/// Owns the transport handle and the validated configuration; every driver
/// it hands out shares the same handle.
pub struct PerfHarness {
    transport: Arc<dyn Transport>,
    clock: SharedClock,
    config: Config,
}

impl PerfHarness {
    pub fn new(transport: Arc<dyn Transport>, config: Config) -> Self {
        Self {
            transport,
            clock: monotonic(),
            config,
        }
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn latency_probe(&self) -> LatencyProbe {
        LatencyProbe::new(Arc::clone(&self.transport), self.config.call_timeout)
            .warmup(self.config.latency.warmup)
            .iterations(self.config.latency.iterations)
            .with_clock(Arc::clone(&self.clock))
    }

    pub fn streaming_driver(&self) -> StreamingDriver {
        StreamingDriver::new(Arc::clone(&self.transport), self.config.call_timeout)
            .with_clock(Arc::clone(&self.clock))
    }

    pub fn batch_dispatcher(&self) -> BatchDispatcher {
        BatchDispatcher::new(Arc::clone(&self.transport), self.config.call_timeout)
            .with_clock(Arc::clone(&self.clock))
    }

    pub fn validation(&self, counters: Arc<dyn NetworkCounters>) -> ValidationHarness {
        ValidationHarness::new(
            Arc::clone(&self.transport),
            counters,
            self.config.call_timeout,
            self.config.validation.clone(),
        )
        .with_clock(Arc::clone(&self.clock))
    }

    /// Ping-pong latency over the configured iterations.
    pub async fn measure_latency(&self) -> HarnessResult<LatencySummary> {
        tracing::info!(
            iterations = self.config.latency.iterations,
            warmup = self.config.latency.warmup,
            "Measuring latency"
        );
        self.latency_probe().summarize().await
    }

    /// Unary throughput for one payload class over the configured window.
    ///
    /// Bytes are counted as the key and value bytes of each request payload.
    pub async fn measure_throughput(&self, size: PayloadSize) -> HarnessResult<ThroughputReport> {
        let payload = Payload::entries_for(size);
        let timeout = self.config.call_timeout;

        tracing::info!(
            payload = size.name(),
            duration_ms = self.config.throughput.duration.as_millis() as u64,
            "Measuring throughput"
        );

        ThroughputMeter::new()
            .with_clock(Arc::clone(&self.clock))
            .warmup(self.config.throughput.warmup)
            .run(self.config.throughput.duration, || {
                let request = RequestRecord::new(RequestId::random(), payload.clone());
                let bytes = request.byte_len();
                let transport = Arc::clone(&self.transport);
                async move {
                    with_deadline(timeout, "unary", transport.unary(request)).await?;
                    Ok::<u64, TransportError>(bytes)
                }
            })
            .await
    }

    /// Server stream with the configured count and interval.
    pub async fn measure_server_stream(&self) -> CallOutcome {
        let streaming = &self.config.streaming;
        tracing::info!(
            messages = streaming.message_count,
            interval_ms = streaming.interval_ms,
            "Measuring server streaming"
        );
        self.streaming_driver()
            .server_streaming(StreamRequest {
                message_count: streaming.message_count,
                payload_size: streaming.payload_size,
                interval_ms: streaming.interval_ms,
            })
            .await
    }

    /// Client and bidirectional streams with the configured pacing.
    pub async fn measure_client_streams(&self) -> Vec<CallOutcome> {
        let streaming = &self.config.streaming;
        let payload = Payload::entries_for(streaming.payload_size);
        let driver = self.streaming_driver();
        vec![
            driver
                .client_streaming(
                    streaming.client_messages,
                    payload.clone(),
                    streaming.send_interval,
                )
                .await,
            driver
                .bidirectional(streaming.client_messages, payload, streaming.send_interval)
                .await,
        ]
    }

    /// Sequential against parallel for every configured batch size.
    ///
    /// A failure at one size is kept in its slot and the next size still runs.
    pub async fn compare_batches(&self) -> Vec<(usize, HarnessResult<BatchComparison>)> {
        let dispatcher = self.batch_dispatcher();
        let payload = Payload::entries_for(PayloadSize::Small);
        let mut results = Vec::with_capacity(self.config.batch.sizes.len());

        for &size in &self.config.batch.sizes {
            let requests = RequestRecord::numbered("batch", size, &payload);
            let comparison = dispatcher.compare(&requests, self.config.batch.strategy).await;
            results.push((size, comparison));
        }
        results
    }

    pub async fn smoke(&self) -> Vec<CallOutcome> {
        self.streaming_driver()
            .smoke(self.config.streaming.payload_size)
            .await
    }

    pub async fn validate(&self, counters: Arc<dyn NetworkCounters>) -> ValidationReport {
        self.validation(counters).run_all().await
    }
}
