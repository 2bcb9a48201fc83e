// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! HTTP adapter: JSON request/response endpoints plus an SSE server stream.
//!
//! | Call shape        | Endpoint                                      |
//! |-------------------|-----------------------------------------------|
//! | unary             | `POST /unary`                                 |
//! | server streaming  | `GET /stream?message_count=..&interval_ms=..` |
//! | client streaming  | `POST /client-stream` (messages collected)    |
//! | bidirectional     | `POST /bidirectional`, one per message        |
//! | ping              | `POST /ping`                                  |
//! | batch             | `POST /batch`                                 |

use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use futures::StreamExt;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use perfharness_core::error::{InvalidConfigurationError, TransportError};
use perfharness_core::transport::{
    BatchRequest, BatchResponse, CallResponse, ClientStreamSummary, PingRequest, PongResponse,
    RequestStream, ResponseStream, StreamRequest, Transport, TransportKind,
};
use perfharness_core::types::{DataEntry, Payload, RequestRecord};

/// Bidirectional requests allowed in flight at once.
const BIDI_IN_FLIGHT: usize = 64;

// =============================================================================
// Wire format
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum WirePayload {
    Text(String),
    Entries(Vec<DataEntry>),
}

#[derive(Debug, Serialize)]
struct WireRequest {
    request_id: String,
    payload: WirePayload,
}

impl From<RequestRecord> for WireRequest {
    fn from(record: RequestRecord) -> Self {
        let payload = match record.payload {
            Payload::Bytes(bytes) => {
                WirePayload::Text(String::from_utf8_lossy(&bytes).into_owned())
            }
            Payload::Entries(entries) => WirePayload::Entries(entries),
        };
        Self {
            request_id: record.id.to_string(),
            payload,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct WireMetrics {
    processing_time_us: Option<u64>,
}

/// Response object shared by unary, bidirectional, batch and stream events.
/// Stream events carry `sequence_number` instead of `request_id`.
#[derive(Debug, Default, Deserialize)]
struct WireResponse {
    #[serde(default)]
    request_id: Option<Value>,
    #[serde(default)]
    sequence_number: Option<u64>,
    #[serde(default)]
    payload: Value,
    #[serde(default)]
    metrics: Option<WireMetrics>,
}

fn payload_bytes(payload: &Value) -> u64 {
    match payload {
        Value::String(text) => text.len() as u64,
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(text) => text.len() as u64,
                Value::Object(entry) => ["key", "value"]
                    .iter()
                    .filter_map(|field| entry.get(*field).and_then(Value::as_str))
                    .map(|s| s.len() as u64)
                    .sum(),
                _ => 0,
            })
            .sum(),
        _ => 0,
    }
}

impl From<WireResponse> for CallResponse {
    fn from(wire: WireResponse) -> Self {
        let request_id = match (wire.request_id, wire.sequence_number) {
            (Some(Value::String(id)), _) => id,
            (Some(Value::Number(n)), _) => n.to_string(),
            (_, Some(seq)) => seq.to_string(),
            _ => String::new(),
        };
        Self {
            request_id,
            payload_bytes: payload_bytes(&wire.payload),
            server_processing_us: wire.metrics.and_then(|m| m.processing_time_us),
        }
    }
}

#[derive(Debug, Serialize)]
struct WirePing {
    client_id: String,
    /// Microseconds since the Unix epoch
    send_timestamp: i64,
}

#[derive(Debug, Deserialize)]
struct WirePong {
    client_id: String,
    #[serde(default)]
    server_timestamp: Option<i64>,
}

#[derive(Debug, Serialize)]
struct WireClientStream {
    messages: Vec<WireRequest>,
}

#[derive(Debug, Deserialize)]
struct WireClientStreamResponse {
    messages_processed: u64,
}

#[derive(Debug, Serialize)]
struct WireBatch {
    requests: Vec<WireRequest>,
    parallel_process: bool,
}

#[derive(Debug, Deserialize)]
struct WireBatchResponse {
    #[serde(default)]
    responses: Vec<WireResponse>,
}

// =============================================================================
// Server-sent events
// =============================================================================

/// Incremental decoder for a `text/event-stream` body.
///
/// Events are separated by a blank line. The `data:` lines of one event are
/// joined with `\n`; comments and other fields are ignored.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one body chunk and return the data of every event it completed.
    ///
    /// Raw bytes are buffered until an event ends, so a character split
    /// across chunks is decoded whole.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend(chunk.iter().copied().filter(|&b| b != b'\r'));

        let mut events = Vec::new();
        while let Some(end) = self.buffer.windows(2).position(|w| w == b"\n\n") {
            let block: Vec<u8> = self.buffer.drain(..end + 2).collect();
            let block = String::from_utf8_lossy(&block);
            let data: Vec<&str> = block
                .lines()
                .filter_map(|line| line.strip_prefix("data:"))
                .map(|value| value.strip_prefix(' ').unwrap_or(value))
                .collect();
            if !data.is_empty() {
                events.push(data.join("\n"));
            }
        }
        events
    }

    /// Bytes of an unterminated event still waiting for more input.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

fn decode_event(data: &str) -> Result<CallResponse, TransportError> {
    serde_json::from_str::<WireResponse>(data)
        .map(CallResponse::from)
        .map_err(|e| TransportError::Decode {
            reason: format!("stream event: {}", e),
        })
}

// =============================================================================
// Transport
// =============================================================================

/// Client handle and base URL. Cloned into spawned and streamed calls.
#[derive(Clone)]
struct Endpoint {
    client: Client,
    base: String,
    call_timeout: Duration,
}

impl Endpoint {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    fn error(&self, err: reqwest::Error, operation: &'static str) -> TransportError {
        if err.is_timeout() {
            TransportError::DeadlineExceeded {
                operation,
                timeout_ms: self.call_timeout.as_millis() as u64,
            }
        } else if err.is_connect() {
            TransportError::ConnectionRefused {
                target: self.base.clone(),
                reason: err.to_string(),
            }
        } else if err.is_decode() {
            TransportError::Decode {
                reason: err.to_string(),
            }
        } else {
            TransportError::StreamReset {
                reason: err.to_string(),
            }
        }
    }

    /// Turn a non-2xx status into `Rejected`, keeping the body as the message.
    async fn check(&self, response: Response) -> Result<Response, TransportError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(TransportError::Rejected {
            code: status.as_u16().to_string(),
            message,
        })
    }

    async fn post<B, R>(
        &self,
        path: &str,
        body: &B,
        operation: &'static str,
    ) -> Result<R, TransportError>
    where
        B: Serialize + ?Sized,
        R: for<'de> Deserialize<'de>,
    {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| self.error(e, operation))?;
        self.check(response)
            .await?
            .json::<R>()
            .await
            .map_err(|e| self.error(e, operation))
    }

    async fn unary(
        &self,
        request: RequestRecord,
        path: &str,
        operation: &'static str,
    ) -> Result<CallResponse, TransportError> {
        self.post::<_, WireResponse>(path, &WireRequest::from(request), operation)
            .await
            .map(CallResponse::from)
    }
}

pub struct HttpTransport {
    endpoint: Endpoint,
}

impl HttpTransport {
    /// `base` must already be normalized (scheme present, no trailing slash).
    ///
    /// No per-request timeout is set on the client; deadlines are applied by
    /// the drivers so long server streams are not cut off.
    pub fn new(base: &str, call_timeout: Duration) -> Result<Self, InvalidConfigurationError> {
        let client = Client::builder()
            .connect_timeout(call_timeout)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| InvalidConfigurationError::InvalidFieldValue {
                field: "target.address",
                value: base.to_string(),
                reason: e.to_string(),
            })?;

        tracing::debug!(address = base, "Created HTTP client");

        Ok(Self {
            endpoint: Endpoint {
                client,
                base: base.to_string(),
                call_timeout,
            },
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Http
    }

    fn target(&self) -> &str {
        &self.endpoint.base
    }

    async fn unary(&self, request: RequestRecord) -> Result<CallResponse, TransportError> {
        self.endpoint.unary(request, "/unary", "unary").await
    }

    async fn ping(&self, request: PingRequest) -> Result<PongResponse, TransportError> {
        let body = WirePing {
            client_id: request.client_id,
            send_timestamp: request.sent_at.timestamp_micros(),
        };
        let pong: WirePong = self.endpoint.post("/ping", &body, "ping").await?;
        Ok(PongResponse {
            client_id: pong.client_id,
            server_timestamp: pong.server_timestamp.and_then(DateTime::from_timestamp_micros),
        })
    }

    async fn server_stream(
        &self,
        request: StreamRequest,
    ) -> Result<ResponseStream, TransportError> {
        let url = format!(
            "{}?message_count={}&interval_ms={}",
            self.endpoint.url("/stream"),
            request.message_count,
            request.interval_ms
        );
        let response = self
            .endpoint
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| self.endpoint.error(e, "server_streaming"))?;
        let response = self.endpoint.check(response).await?;

        let endpoint = self.endpoint.clone();
        let mut decoder = SseDecoder::new();
        Ok(response
            .bytes_stream()
            .map(move |chunk| match chunk {
                Ok(bytes) => decoder
                    .push(&bytes)
                    .into_iter()
                    .map(|data| decode_event(&data))
                    .collect::<Vec<_>>(),
                Err(e) => vec![Err(endpoint.error(e, "server_streaming"))],
            })
            .flat_map(futures::stream::iter)
            .boxed())
    }

    async fn client_stream(
        &self,
        requests: RequestStream,
    ) -> Result<ClientStreamSummary, TransportError> {
        // The endpoint takes every message in one body, so pacing happens
        // while collecting.
        let messages: Vec<WireRequest> = requests.map(WireRequest::from).collect().await;
        tracing::trace!(messages = messages.len(), "Posting client stream");
        let response: WireClientStreamResponse = self
            .endpoint
            .post("/client-stream", &WireClientStream { messages }, "client_streaming")
            .await?;
        Ok(ClientStreamSummary {
            messages_processed: response.messages_processed,
        })
    }

    async fn bidirectional(
        &self,
        requests: RequestStream,
    ) -> Result<ResponseStream, TransportError> {
        let endpoint = self.endpoint.clone();
        Ok(requests
            .map(move |request| {
                let endpoint = endpoint.clone();
                async move { endpoint.unary(request, "/bidirectional", "bidirectional").await }
            })
            .buffer_unordered(BIDI_IN_FLIGHT)
            .boxed())
    }

    async fn batch(&self, request: BatchRequest) -> Result<BatchResponse, TransportError> {
        let body = WireBatch {
            requests: request.requests.into_iter().map(WireRequest::from).collect(),
            parallel_process: request.parallel_process,
        };
        let response: WireBatchResponse = self.endpoint.post("/batch", &body, "batch").await?;
        Ok(BatchResponse {
            responses: response.responses.into_iter().map(CallResponse::from).collect(),
        })
    }
}
