// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Transport seam between the harness and the service under test.
//!
//! The harness only consumes call primitives: a blocking unary call, a
//! server-push stream, a client stream and a bidirectional stream. Each wire
//! protocol provides one adapter implementing [`Transport`]; drivers work on
//! the transport-agnostic records defined here.

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::error::{InvalidConfigurationError, TransportError};
use crate::types::{PayloadSize, RequestRecord};

/// Wire protocol used to reach the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Grpc,
    Http,
}

impl TransportKind {
    /// Loopback address used when no target is given.
    pub const fn default_target(&self) -> &'static str {
        match self {
            Self::Grpc => "http://127.0.0.1:50051",
            Self::Http => "http://127.0.0.1:8080",
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Grpc => "grpc",
            Self::Http => "http",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for TransportKind {
    type Err = InvalidConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "grpc" | "rpc" => Ok(Self::Grpc),
            "http" | "rest" | "sse" => Ok(Self::Http),
            other => Err(InvalidConfigurationError::InvalidFieldValue {
                field: "transport",
                value: other.to_string(),
                reason: "Expected grpc or http".to_string(),
            }),
        }
    }
}

/// Response to a unary, streamed or batched request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CallResponse {
    /// Identifier echoed by the service (sequence number for server streams)
    pub request_id: String,
    /// Payload bytes carried by the response
    pub payload_bytes: u64,
    /// Processing time reported by the service, if any
    pub server_processing_us: Option<u64>,
}

/// Minimal round-trip request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingRequest {
    pub client_id: String,
    pub sent_at: DateTime<Utc>,
}

impl PingRequest {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            sent_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PongResponse {
    pub client_id: String,
    pub server_timestamp: Option<DateTime<Utc>>,
}

/// Parameters of a server-streaming call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRequest {
    pub message_count: u32,
    pub payload_size: PayloadSize,
    pub interval_ms: u64,
}

/// Aggregate response closing a client stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClientStreamSummary {
    pub messages_processed: u64,
}

/// Whole batch handed to the service's batch operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub requests: Vec<RequestRecord>,
    pub parallel_process: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchResponse {
    pub responses: Vec<CallResponse>,
}

/// Requests fed lazily into a client or bidirectional stream.
pub type RequestStream = BoxStream<'static, RequestRecord>;

/// Responses arriving on a server or bidirectional stream. The stream ends when
/// the service closes it.
pub type ResponseStream = BoxStream<'static, Result<CallResponse, TransportError>>;

/// Call primitives exposed by the service under test.
///
/// Implementations are shared read-only by every driver, so all methods take
/// `&self`.
#[async_trait]
pub trait Transport: Send + Sync {
    fn kind(&self) -> TransportKind;

    /// Address the transport is connected to.
    fn target(&self) -> &str;

    /// One request, one response.
    async fn unary(&self, request: RequestRecord) -> Result<CallResponse, TransportError>;

    /// Minimal round trip used for base latency.
    async fn ping(&self, request: PingRequest) -> Result<PongResponse, TransportError>;

    /// One request, responses pushed until the service closes the stream.
    async fn server_stream(&self, request: StreamRequest)
        -> Result<ResponseStream, TransportError>;

    /// Requests pulled from `requests` until it ends, then one aggregate response.
    async fn client_stream(
        &self,
        requests: RequestStream,
    ) -> Result<ClientStreamSummary, TransportError>;

    /// Requests and responses interleaved over one open exchange. Sending must
    /// not wait for earlier responses.
    async fn bidirectional(&self, requests: RequestStream)
        -> Result<ResponseStream, TransportError>;

    /// Service-side batch processing.
    async fn batch(&self, request: BatchRequest) -> Result<BatchResponse, TransportError>;
}

/// Run `call` with a deadline, converting a hang into `DeadlineExceeded`.
pub async fn with_deadline<T, F>(
    timeout: Duration,
    operation: &'static str,
    call: F,
) -> Result<T, TransportError>
where
    F: Future<Output = Result<T, TransportError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation, timeout_ms = timeout.as_millis() as u64, "Call timed out");
            Err(TransportError::DeadlineExceeded {
                operation,
                timeout_ms: timeout.as_millis() as u64,
            })
        }
    }
}

/// Client identifier for pings issued by this process.
pub fn process_client_id() -> String {
    format!("perfharness-{}", std::process::id())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_kind_parse() {
        assert_eq!("gRPC".parse::<TransportKind>().unwrap(), TransportKind::Grpc);
        assert_eq!("sse".parse::<TransportKind>().unwrap(), TransportKind::Http);
        assert!("carrier-pigeon".parse::<TransportKind>().is_err());
        assert_eq!(TransportKind::Http.default_target(), "http://127.0.0.1:8080");
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_converts_hang() {
        let result: Result<(), _> = with_deadline(
            Duration::from_millis(50),
            "unary",
            futures::future::pending(),
        )
        .await;
        assert_eq!(
            result,
            Err(TransportError::DeadlineExceeded {
                operation: "unary",
                timeout_ms: 50
            })
        );
    }

    #[tokio::test]
    async fn test_deadline_passes_result_through() {
        let result = with_deadline(Duration::from_secs(1), "ping", async { Ok(7) }).await;
        assert_eq!(result, Ok(7));
    }
}
