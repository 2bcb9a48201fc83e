// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Drivers for each call shape.
//!
//! Every driver walks a [`CallStateMachine`] and returns a [`CallOutcome`]
//! holding its timed events. Transport errors move the call to `Failed` and are
//! kept on the outcome together with whatever was counted before the error;
//! they never abort the caller's run. A stream that closes early is
//! `Completed` with fewer messages than requested.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::batch::{BatchDispatcher, BatchMode};
use crate::clock::{duration_to_nanos, monotonic, SharedClock};
use crate::error::{HarnessError, HarnessResult, PartialProgress, TransportError};
use crate::state::{CallShape, CallState, CallStateMachine, TimedEvent};
use crate::transport::{
    process_client_id, with_deadline, PingRequest, RequestStream, ResponseStream, StreamRequest,
    Transport,
};
use crate::types::{Payload, PayloadSize, RequestId, RequestRecord};

/// Messages per stream in a smoke run.
pub const SMOKE_MESSAGES: u32 = 5;

/// Something about a call that completed but does not add up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StreamAnomaly {
    /// The client-stream summary disagrees with what was sent.
    CountMismatch { sent: u64, processed: u64 },
    /// The service closed the stream before the requested count arrived.
    ClosedEarly { expected: u64, received: u64 },
}

/// Result of driving one call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallOutcome {
    pub shape: CallShape,
    pub label: String,
    /// Terminal state, `Completed` or `Failed`
    pub state: CallState,
    pub events: Vec<TimedEvent>,
    /// First send to last receive
    pub elapsed_ns: u64,
    pub messages_sent: u64,
    pub messages_received: u64,
    pub messages_expected: Option<u64>,
    pub bytes: u64,
    /// Received messages per second over `elapsed_ns`, streams only
    pub messages_per_second: Option<f64>,
    pub anomaly: Option<StreamAnomaly>,
    /// Rendered transport error for `Failed` calls
    pub error: Option<String>,
    #[serde(skip)]
    failure: Option<TransportError>,
}

impl CallOutcome {
    fn new(shape: CallShape, label: impl Into<String>) -> Self {
        Self {
            shape,
            label: label.into(),
            state: CallState::Idle,
            events: Vec::new(),
            elapsed_ns: 0,
            messages_sent: 0,
            messages_received: 0,
            messages_expected: None,
            bytes: 0,
            messages_per_second: None,
            anomaly: None,
            error: None,
            failure: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.state == CallState::Completed
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.elapsed_ns)
    }

    /// Transport error that failed the call.
    pub fn failure(&self) -> Option<&TransportError> {
        self.failure.as_ref()
    }

    /// Turn a failed outcome into a partial-failure error with its counters.
    pub fn into_result(self) -> HarnessResult<Self> {
        match self.failure {
            Some(source) => Err(HarnessError::PartialFailure {
                operation: self.shape.name(),
                progress: PartialProgress {
                    completed: self.messages_received,
                    expected: self.messages_expected,
                    bytes: self.bytes,
                    elapsed_ns: self.elapsed_ns,
                },
                partial: None,
                source,
            }),
            None => Ok(self),
        }
    }

    fn close(mut self, machine: CallStateMachine, started: Instant, finished: Instant) -> Self {
        self.state = machine.state();
        self.events = machine.into_events();
        self.elapsed_ns = duration_to_nanos(finished.saturating_duration_since(started));
        if matches!(
            self.shape,
            CallShape::ServerStreaming | CallShape::ClientStreaming | CallShape::Bidirectional
        ) {
            let secs = self.elapsed().as_secs_f64();
            self.messages_per_second = Some(if secs > 0.0 {
                self.messages_received as f64 / secs
            } else {
                0.0
            });
        }
        self
    }

    fn record_failure(&mut self, error: TransportError) {
        tracing::warn!(
            call = self.shape.name(),
            label = %self.label,
            received = self.messages_received,
            error = %error,
            "Call failed"
        );
        self.error = Some(error.to_string());
        self.failure = Some(error);
    }
}

/// Bounded request producer, paced lazily as the transport pulls from it.
///
/// Request `i` is built and stamped only when the send path asks for it, after
/// sleeping `interval` for every request but the first. The producer records
/// how many requests it handed out and when it ran dry.
struct PacedProducer {
    sent: Arc<AtomicU64>,
    exhausted_at: Arc<Mutex<Option<Instant>>>,
}

impl PacedProducer {
    fn start(
        prefix: &'static str,
        count: u32,
        payload: Payload,
        interval: Duration,
        clock: SharedClock,
    ) -> (Self, RequestStream) {
        let sent = Arc::new(AtomicU64::new(0));
        let exhausted_at = Arc::new(Mutex::new(None));
        let counter = Arc::clone(&sent);
        let exhausted = Arc::clone(&exhausted_at);

        let requests = stream::unfold(0u32, move |i| {
            let payload = payload.clone();
            let counter = Arc::clone(&counter);
            let exhausted = Arc::clone(&exhausted);
            let clock = Arc::clone(&clock);
            async move {
                if i >= count {
                    *exhausted.lock().unwrap_or_else(|p| p.into_inner()) = Some(clock.now());
                    return None;
                }
                if i > 0 && !interval.is_zero() {
                    tokio::time::sleep(interval).await;
                }
                counter.fetch_add(1, Ordering::SeqCst);
                let request = RequestRecord::new(RequestId::numbered(prefix, i as usize), payload);
                Some((request, i + 1))
            }
        })
        .boxed();

        (Self { sent, exhausted_at }, requests)
    }

    fn sent(&self) -> u64 {
        self.sent.load(Ordering::SeqCst)
    }

    fn exhausted_at(&self) -> Option<Instant> {
        *self.exhausted_at.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// Drives calls of every shape through the shared transport handle.
pub struct StreamingDriver {
    transport: Arc<dyn Transport>,
    clock: SharedClock,
    call_timeout: Duration,
}

impl StreamingDriver {
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

    fn begin(&self, shape: CallShape) -> (CallStateMachine, Instant) {
        let mut machine = CallStateMachine::new(shape, self.clock.as_ref());
        let started = self.clock.now();
        // Idle -> Sending is always valid on a fresh machine.
        let _ = machine.transition_to(CallState::Sending, self.clock.as_ref());
        (machine, started)
    }

    fn advance(&self, machine: &mut CallStateMachine, target: CallState) {
        if let Err(e) = machine.transition_to(target, self.clock.as_ref()) {
            tracing::debug!(error = %e, "Ignoring transition");
        }
    }

    /// One request, one response; latency is receive time minus send time.
    pub async fn unary(&self, request: RequestRecord) -> CallOutcome {
        let mut outcome = CallOutcome::new(CallShape::Unary, request.id.to_string());
        let (mut machine, started) = self.begin(CallShape::Unary);
        outcome.messages_sent = 1;
        outcome.messages_expected = Some(1);

        let result = with_deadline(self.call_timeout, "unary", self.transport.unary(request)).await;
        match result {
            Ok(response) => {
                outcome.messages_received = 1;
                outcome.bytes = response.payload_bytes;
                self.advance(&mut machine, CallState::Completed);
            }
            Err(e) => {
                outcome.record_failure(e);
                machine.fail(self.clock.as_ref());
            }
        }
        outcome.close(machine, started, self.clock.now())
    }

    /// Minimal round trip.
    pub async fn ping(&self, client_id: &str) -> CallOutcome {
        let mut outcome = CallOutcome::new(CallShape::PingPong, client_id);
        let (mut machine, started) = self.begin(CallShape::PingPong);
        outcome.messages_sent = 1;
        outcome.messages_expected = Some(1);

        let result = with_deadline(
            self.call_timeout,
            "ping",
            self.transport.ping(PingRequest::new(client_id)),
        )
        .await;
        match result {
            Ok(_) => {
                outcome.messages_received = 1;
                self.advance(&mut machine, CallState::Completed);
            }
            Err(e) => {
                outcome.record_failure(e);
                machine.fail(self.clock.as_ref());
            }
        }
        outcome.close(machine, started, self.clock.now())
    }

    /// One request, then receive until the stream closes or
    /// `message_count` responses arrived.
    pub async fn server_streaming(&self, request: StreamRequest) -> CallOutcome {
        let expected = u64::from(request.message_count);
        let per_message = self.call_timeout + Duration::from_millis(request.interval_ms);
        let mut outcome = CallOutcome::new(CallShape::ServerStreaming, "server_stream");
        outcome.messages_sent = 1;
        outcome.messages_expected = Some(expected);
        let (mut machine, started) = self.begin(CallShape::ServerStreaming);

        let opened = with_deadline(
            self.call_timeout,
            "server_stream",
            self.transport.server_stream(request),
        )
        .await;
        let mut finished = self.clock.now();
        match opened {
            Ok(responses) => {
                self.advance(&mut machine, CallState::Receiving);
                let drained = self
                    .drain(responses, expected, per_message, &mut outcome, &mut finished)
                    .await;
                match drained {
                    Ok(()) => self.complete_stream(&mut machine, &mut outcome, expected),
                    Err(e) => {
                        outcome.record_failure(e);
                        machine.fail(self.clock.as_ref());
                    }
                }
            }
            Err(e) => {
                outcome.record_failure(e);
                machine.fail(self.clock.as_ref());
            }
        }

        tracing::debug!(
            received = outcome.messages_received,
            expected,
            state = machine.state().name(),
            "Server stream finished"
        );
        outcome.close(machine, started, finished)
    }

    /// Send `count` requests over one stream, pacing sends by `send_interval`,
    /// then wait for the single aggregate response.
    pub async fn client_streaming(
        &self,
        count: u32,
        payload: Payload,
        send_interval: Duration,
    ) -> CallOutcome {
        let mut outcome = CallOutcome::new(CallShape::ClientStreaming, "client_stream");
        outcome.messages_expected = Some(1);
        let (mut machine, started) = self.begin(CallShape::ClientStreaming);
        let (producer, requests) = PacedProducer::start(
            "client-stream",
            count,
            payload.clone(),
            send_interval,
            Arc::clone(&self.clock),
        );

        // The deadline covers the paced sends plus the usual per-call budget.
        let budget = self.call_timeout + send_interval * count;
        let result =
            with_deadline(budget, "client_stream", self.transport.client_stream(requests)).await;
        let finished = self.clock.now();
        outcome.messages_sent = producer.sent();
        outcome.bytes = producer.sent() * payload.byte_len();

        match result {
            Ok(summary) => {
                let closed_at = producer.exhausted_at().unwrap_or(finished);
                if let Err(e) = machine.transition_at(CallState::Receiving, closed_at) {
                    tracing::debug!(error = %e, "Ignoring transition");
                }
                outcome.messages_received = 1;
                if summary.messages_processed != outcome.messages_sent {
                    tracing::warn!(
                        sent = outcome.messages_sent,
                        processed = summary.messages_processed,
                        "Client stream processed count mismatch"
                    );
                    outcome.anomaly = Some(StreamAnomaly::CountMismatch {
                        sent: outcome.messages_sent,
                        processed: summary.messages_processed,
                    });
                }
                self.advance(&mut machine, CallState::Completed);
            }
            Err(e) => {
                outcome.record_failure(e);
                machine.fail(self.clock.as_ref());
            }
        }
        outcome.close(machine, started, finished)
    }

    /// Full-duplex exchange: sends are driven by the transport independently
    /// of receives, which are collected until the stream closes or `count`
    /// responses arrived.
    pub async fn bidirectional(
        &self,
        count: u32,
        payload: Payload,
        send_interval: Duration,
    ) -> CallOutcome {
        let expected = u64::from(count);
        let per_message = self.call_timeout + send_interval;
        let mut outcome = CallOutcome::new(CallShape::Bidirectional, "bidirectional");
        outcome.messages_expected = Some(expected);
        let (mut machine, started) = self.begin(CallShape::Bidirectional);
        let (producer, requests) = PacedProducer::start(
            "bidi",
            count,
            payload,
            send_interval,
            Arc::clone(&self.clock),
        );

        let opened = with_deadline(
            self.call_timeout,
            "bidirectional",
            self.transport.bidirectional(requests),
        )
        .await;
        let mut finished = self.clock.now();
        match opened {
            Ok(responses) => {
                self.advance(&mut machine, CallState::Receiving);
                let drained = self
                    .drain(responses, expected, per_message, &mut outcome, &mut finished)
                    .await;
                match drained {
                    Ok(()) => self.complete_stream(&mut machine, &mut outcome, expected),
                    Err(e) => {
                        outcome.record_failure(e);
                        machine.fail(self.clock.as_ref());
                    }
                }
            }
            Err(e) => {
                outcome.record_failure(e);
                machine.fail(self.clock.as_ref());
            }
        }
        outcome.messages_sent = producer.sent();
        outcome.close(machine, started, finished)
    }

    /// Pull responses until the stream ends or `limit` arrived. Each wait for
    /// the next message is bounded by `per_message`: the call timeout plus the
    /// pacing interval between messages.
    async fn drain(
        &self,
        mut responses: ResponseStream,
        limit: u64,
        per_message: Duration,
        outcome: &mut CallOutcome,
        finished: &mut Instant,
    ) -> Result<(), TransportError> {
        while outcome.messages_received < limit {
            let next = with_deadline(per_message, outcome.shape.name(), async {
                Ok(responses.next().await)
            })
            .await?;
            match next {
                Some(Ok(response)) => {
                    outcome.messages_received += 1;
                    outcome.bytes += response.payload_bytes;
                    *finished = self.clock.now();
                }
                Some(Err(e)) => {
                    *finished = self.clock.now();
                    return Err(e);
                }
                None => break,
            }
        }
        Ok(())
    }

    fn complete_stream(
        &self,
        machine: &mut CallStateMachine,
        outcome: &mut CallOutcome,
        expected: u64,
    ) {
        if outcome.messages_received < expected {
            tracing::warn!(
                call = outcome.shape.name(),
                expected,
                received = outcome.messages_received,
                "Stream closed early"
            );
            outcome.anomaly = Some(StreamAnomaly::ClosedEarly {
                expected,
                received: outcome.messages_received,
            });
        }
        self.advance(machine, CallState::Completed);
    }

    /// One call of every shape, failures recorded rather than propagated.
    pub async fn smoke(&self, payload_size: PayloadSize) -> Vec<CallOutcome> {
        let payload = Payload::filled(payload_size.bytes());
        let mut outcomes = Vec::with_capacity(7);

        tracing::info!(address = self.transport.target(), "Smoke run starting");

        outcomes.push(
            self.unary(RequestRecord::new(RequestId::numbered("smoke", 0), payload.clone()))
                .await,
        );
        outcomes.push(
            self.server_streaming(StreamRequest {
                message_count: SMOKE_MESSAGES,
                payload_size,
                interval_ms: 0,
            })
            .await,
        );
        outcomes.push(
            self.client_streaming(SMOKE_MESSAGES, payload.clone(), Duration::ZERO)
                .await,
        );
        outcomes.push(
            self.bidirectional(SMOKE_MESSAGES, payload.clone(), Duration::ZERO)
                .await,
        );
        outcomes.push(self.ping(&process_client_id()).await);

        let dispatcher = BatchDispatcher::new(Arc::clone(&self.transport), self.call_timeout)
            .with_clock(Arc::clone(&self.clock));
        let requests = RequestRecord::numbered("smoke-batch", SMOKE_MESSAGES as usize, &payload);
        for mode in [BatchMode::Sequential, BatchMode::Parallel] {
            let mut outcome = CallOutcome::new(CallShape::Batch, format!("batch_{}", mode));
            let mut machine = CallStateMachine::new(CallShape::Batch, self.clock.as_ref());
            let _ = machine.transition_to(CallState::Sending, self.clock.as_ref());
            outcome.messages_sent = requests.len() as u64;
            outcome.messages_expected = Some(requests.len() as u64);

            match dispatcher.dispatch(&requests, mode).await {
                Ok(timing) => {
                    outcome.messages_received = timing.request_count as u64;
                    outcome.bytes = timing.bytes;
                    outcome.elapsed_ns = timing.total_ns;
                    self.advance(&mut machine, CallState::Completed);
                }
                Err(e) => {
                    if let Some(progress) = e.progress() {
                        outcome.messages_received = progress.completed;
                        outcome.elapsed_ns = progress.elapsed_ns;
                    }
                    outcome.error = Some(e.to_string());
                    outcome.failure = e.transport_error().cloned();
                    machine.fail(self.clock.as_ref());
                }
            }
            outcome.state = machine.state();
            outcome.events = machine.into_events();
            outcomes.push(outcome);
        }

        let failed = outcomes.iter().filter(|o| !o.succeeded()).count();
        tracing::info!(calls = outcomes.len(), failed, "Smoke run finished");
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubTransport;
    use crate::transport::{ClientStreamSummary, ResponseStream};

    fn driver(stub: StubTransport) -> StreamingDriver {
        StreamingDriver::new(Arc::new(stub), Duration::from_secs(1))
    }

    fn stream_request(count: u32, interval_ms: u64) -> StreamRequest {
        StreamRequest {
            message_count: count,
            payload_size: PayloadSize::Small,
            interval_ms,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_stream_exact_count_completes() {
        let outcome = driver(StubTransport::default())
            .server_streaming(stream_request(5, 10))
            .await;

        assert_eq!(outcome.state, CallState::Completed);
        assert_eq!(outcome.messages_received, 5);
        assert!(outcome.anomaly.is_none());
        assert_eq!(outcome.elapsed(), Duration::from_millis(40));
        let rate = outcome.messages_per_second.unwrap();
        assert!((rate - 125.0).abs() < 1e-9);
        let states: Vec<CallState> = outcome.events.iter().map(|e| e.state).collect();
        assert_eq!(
            states,
            vec![
                CallState::Idle,
                CallState::Sending,
                CallState::Receiving,
                CallState::Completed
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_stream_early_close_is_partial_not_failed() {
        let outcome = driver(StubTransport {
            stream_limit: Some(3),
            ..StubTransport::default()
        })
        .server_streaming(stream_request(5, 1))
        .await;

        assert_eq!(outcome.state, CallState::Completed);
        assert_eq!(outcome.messages_received, 3);
        assert_eq!(
            outcome.anomaly,
            Some(StreamAnomaly::ClosedEarly {
                expected: 5,
                received: 3
            })
        );
        assert!(outcome.into_result().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_stream_reset_fails_with_partial_count() {
        let outcome = driver(StubTransport {
            stream_fail_after: Some(2),
            ..StubTransport::default()
        })
        .server_streaming(stream_request(5, 1))
        .await;

        assert_eq!(outcome.state, CallState::Failed);
        assert_eq!(outcome.messages_received, 2);
        let err = outcome.into_result().unwrap_err();
        assert_eq!(err.progress().map(|p| p.completed), Some(2));
        assert!(matches!(
            err.transport_error(),
            Some(TransportError::StreamReset { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unary_latency_and_failure() {
        let stub = StubTransport {
            call_delay: Duration::from_millis(3),
            fail_from_call: Some(2),
            ..StubTransport::default()
        };
        let driver = driver(stub);
        let payload = Payload::filled(64);

        let ok = driver
            .unary(RequestRecord::new(RequestId::numbered("u", 0), payload.clone()))
            .await;
        assert!(ok.succeeded());
        assert_eq!(ok.elapsed(), Duration::from_millis(3));
        assert_eq!(ok.bytes, 64);

        let failed = driver
            .unary(RequestRecord::new(RequestId::numbered("u", 1), payload))
            .await;
        assert_eq!(failed.state, CallState::Failed);
        assert!(failed.error.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unary_hang_becomes_deadline_failure() {
        let driver = StreamingDriver::new(
            Arc::new(StubTransport::with_delay(Duration::from_secs(60))),
            Duration::from_millis(100),
        );
        let outcome = driver
            .unary(RequestRecord::new(RequestId::numbered("u", 0), Payload::default()))
            .await;

        assert_eq!(outcome.state, CallState::Failed);
        assert!(matches!(
            outcome.failure(),
            Some(TransportError::DeadlineExceeded { timeout_ms: 100, .. })
        ));
        assert_eq!(outcome.elapsed(), Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_stream_pacing_and_count() {
        let outcome = driver(StubTransport::default())
            .client_streaming(4, Payload::filled(10), Duration::from_millis(25))
            .await;

        assert_eq!(outcome.state, CallState::Completed);
        assert_eq!(outcome.messages_sent, 4);
        assert_eq!(outcome.bytes, 40);
        assert!(outcome.anomaly.is_none());
        // Three gaps between four sends
        assert_eq!(outcome.elapsed(), Duration::from_millis(75));
        let receiving = outcome
            .events
            .iter()
            .find(|e| e.state == CallState::Receiving)
            .unwrap();
        assert_eq!(receiving.at_ns, 75_000_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_stream_mismatch_is_anomaly_not_error() {
        let outcome = driver(StubTransport {
            client_stream_shortfall: 1,
            ..StubTransport::default()
        })
        .client_streaming(5, Payload::filled(1), Duration::ZERO)
        .await;

        assert_eq!(outcome.state, CallState::Completed);
        assert_eq!(
            outcome.anomaly,
            Some(StreamAnomaly::CountMismatch {
                sent: 5,
                processed: 4
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_bidirectional_sends_do_not_wait_for_responses() {
        // Each response takes 50ms, sends are 10ms apart. Half duplex would
        // need 5 * 50ms; full duplex finishes 50ms after the last send.
        let outcome = driver(StubTransport::with_delay(Duration::from_millis(50)))
            .bidirectional(5, Payload::filled(8), Duration::from_millis(10))
            .await;

        assert_eq!(outcome.state, CallState::Completed);
        assert_eq!(outcome.messages_sent, 5);
        assert_eq!(outcome.messages_received, 5);
        assert_eq!(outcome.elapsed(), Duration::from_millis(90));
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_stream_interval_longer_than_timeout_completes() {
        let driver = StreamingDriver::new(
            Arc::new(StubTransport::default()),
            Duration::from_millis(200),
        );
        let outcome = driver.server_streaming(stream_request(3, 300)).await;

        assert_eq!(outcome.state, CallState::Completed, "{:?}", outcome.error);
        assert_eq!(outcome.messages_received, 3);
        assert_eq!(outcome.elapsed(), Duration::from_millis(600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bidirectional_send_interval_longer_than_timeout_completes() {
        let driver = StreamingDriver::new(
            Arc::new(StubTransport::default()),
            Duration::from_millis(200),
        );
        let outcome = driver
            .bidirectional(3, Payload::filled(8), Duration::from_millis(300))
            .await;

        assert_eq!(outcome.state, CallState::Completed, "{:?}", outcome.error);
        assert_eq!(outcome.messages_sent, 3);
        assert_eq!(outcome.messages_received, 3);
        assert_eq!(outcome.elapsed(), Duration::from_millis(600));
    }

    struct SilentTransport;

    #[async_trait::async_trait]
    impl Transport for SilentTransport {
        fn kind(&self) -> crate::transport::TransportKind {
            crate::transport::TransportKind::Http
        }
        fn target(&self) -> &str {
            "silent"
        }
        async fn unary(
            &self,
            _request: RequestRecord,
        ) -> Result<crate::transport::CallResponse, TransportError> {
            futures::future::pending().await
        }
        async fn ping(
            &self,
            _request: PingRequest,
        ) -> Result<crate::transport::PongResponse, TransportError> {
            futures::future::pending().await
        }
        async fn server_stream(
            &self,
            _request: StreamRequest,
        ) -> Result<ResponseStream, TransportError> {
            Ok(stream::pending().boxed())
        }
        async fn client_stream(
            &self,
            _requests: RequestStream,
        ) -> Result<ClientStreamSummary, TransportError> {
            futures::future::pending().await
        }
        async fn bidirectional(
            &self,
            _requests: RequestStream,
        ) -> Result<ResponseStream, TransportError> {
            Ok(stream::pending().boxed())
        }
        async fn batch(
            &self,
            _request: crate::transport::BatchRequest,
        ) -> Result<crate::transport::BatchResponse, TransportError> {
            futures::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_stream_times_out() {
        let driver = StreamingDriver::new(Arc::new(SilentTransport), Duration::from_millis(200));
        let outcome = driver.server_streaming(stream_request(5, 0)).await;

        assert_eq!(outcome.state, CallState::Failed);
        assert!(matches!(
            outcome.failure(),
            Some(TransportError::DeadlineExceeded {
                operation: "server_streaming",
                ..
            })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_smoke_records_every_shape() {
        let outcomes = driver(StubTransport::with_delay(Duration::from_millis(1)))
            .smoke(PayloadSize::Small)
            .await;

        let shapes: Vec<CallShape> = outcomes.iter().map(|o| o.shape).collect();
        assert_eq!(
            shapes,
            vec![
                CallShape::Unary,
                CallShape::ServerStreaming,
                CallShape::ClientStreaming,
                CallShape::Bidirectional,
                CallShape::PingPong,
                CallShape::Batch,
                CallShape::Batch
            ]
        );
        assert!(outcomes.iter().all(CallOutcome::succeeded));
    }

    #[tokio::test(start_paused = true)]
    async fn test_smoke_keeps_going_after_failures() {
        let outcomes = driver(StubTransport {
            fail_from_call: Some(1),
            ..StubTransport::default()
        })
        .smoke(PayloadSize::Empty)
        .await;

        assert_eq!(outcomes.len(), 7);
        assert_eq!(outcomes[0].state, CallState::Failed);
        assert!(outcomes[1].succeeded());
        assert_eq!(outcomes[5].state, CallState::Failed);
    }
}
