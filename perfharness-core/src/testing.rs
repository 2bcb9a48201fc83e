// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Deterministic in-process transport for unit tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;

use crate::error::TransportError;
use crate::transport::{
    BatchRequest, BatchResponse, CallResponse, ClientStreamSummary, PingRequest, PongResponse,
    RequestStream, ResponseStream, StreamRequest, Transport, TransportKind,
};
use crate::types::RequestRecord;

/// Every call sleeps for a fixed delay on the tokio clock.
#[derive(Debug, Default)]
pub(crate) struct StubTransport {
    pub call_delay: Duration,
    /// Unary calls numbered from 1; call `n` and later fail when set
    pub fail_from_call: Option<u64>,
    /// Pings numbered from 1; ping `n` and later fail when set
    pub ping_fail_from: Option<u64>,
    /// Server streams close after this many messages when set
    pub stream_limit: Option<u32>,
    /// Server streams fail after this many messages when set
    pub stream_fail_after: Option<u32>,
    /// Subtracted from the client-stream processed count
    pub client_stream_shortfall: u64,
    pub calls: AtomicU64,
    pub pings: AtomicU64,
}

impl StubTransport {
    pub fn with_delay(call_delay: Duration) -> Self {
        Self {
            call_delay,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    fn response_for(request: &RequestRecord) -> CallResponse {
        CallResponse {
            request_id: request.id.to_string(),
            payload_bytes: request.byte_len(),
            server_processing_us: None,
        }
    }
}

#[async_trait]
impl Transport for StubTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Grpc
    }

    fn target(&self) -> &str {
        "stub"
    }

    async fn unary(&self, request: RequestRecord) -> Result<CallResponse, TransportError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.call_delay).await;
        if self.fail_from_call.is_some_and(|n| call >= n) {
            return Err(TransportError::ConnectionRefused {
                target: "stub".to_string(),
                reason: format!("call {} refused", call),
            });
        }
        Ok(Self::response_for(&request))
    }

    async fn ping(&self, request: PingRequest) -> Result<PongResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let ping = self.pings.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.call_delay).await;
        if self.ping_fail_from.is_some_and(|n| ping >= n) {
            return Err(TransportError::StreamReset {
                reason: format!("ping {} dropped", ping),
            });
        }
        Ok(PongResponse {
            client_id: request.client_id,
            server_timestamp: Some(chrono::Utc::now()),
        })
    }

    async fn server_stream(
        &self,
        request: StreamRequest,
    ) -> Result<ResponseStream, TransportError> {
        let count = self
            .stream_limit
            .map_or(request.message_count, |limit| limit.min(request.message_count));
        let fail_after = self.stream_fail_after;
        let interval = Duration::from_millis(request.interval_ms);

        let stream = futures::stream::iter(0..count)
            .then(move |i| async move {
                if i > 0 {
                    tokio::time::sleep(interval).await;
                }
                if fail_after.is_some_and(|n| i >= n) {
                    return Err(TransportError::StreamReset {
                        reason: "stub reset".to_string(),
                    });
                }
                Ok(CallResponse {
                    request_id: i.to_string(),
                    payload_bytes: 16,
                    server_processing_us: None,
                })
            })
            .boxed();
        Ok(stream)
    }

    async fn client_stream(
        &self,
        requests: RequestStream,
    ) -> Result<ClientStreamSummary, TransportError> {
        let received = requests.count().await as u64;
        Ok(ClientStreamSummary {
            messages_processed: received.saturating_sub(self.client_stream_shortfall),
        })
    }

    async fn bidirectional(
        &self,
        requests: RequestStream,
    ) -> Result<ResponseStream, TransportError> {
        let delay = self.call_delay;
        let stream = requests
            .map(move |request| async move {
                tokio::time::sleep(delay).await;
                Ok(Self::response_for(&request))
            })
            .buffer_unordered(64)
            .boxed();
        Ok(stream)
    }

    async fn batch(&self, request: BatchRequest) -> Result<BatchResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let per_request = self.call_delay * request.requests.len() as u32;
        let delay = if request.parallel_process {
            self.call_delay
        } else {
            per_request
        };
        tokio::time::sleep(delay).await;
        Ok(BatchResponse {
            responses: request.requests.iter().map(Self::response_for).collect(),
        })
    }
}
