// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Protobuf messages of the `perftest.PerformanceTest` service.
//!
//! Field tags follow declaration order in each message. The messages are
//! declared by hand so the crate builds without `protoc`.
//!
//! No `.proto` file ships with this crate, so every tag here is inferred, and
//! `TestRequest.raw_payload` (tag 5) has no known counterpart. Check the tags
//! against the service definition actually deployed before trusting gRPC
//! results. When that file is available, generate these types with
//! `tonic-build` from a build script instead.

use chrono::{DateTime, Utc};

use perfharness_core::transport::{
    BatchRequest as CoreBatchRequest, CallResponse, ClientStreamSummary, PingRequest as CorePing,
    PongResponse as CorePong, StreamRequest as CoreStreamRequest,
};
use perfharness_core::types::{DataEntry, Payload, RequestRecord};

/// Fully qualified service name used in call paths.
pub const SERVICE: &str = "perftest.PerformanceTest";

pub mod path {
    pub const UNARY: &str = "/perftest.PerformanceTest/UnaryCall";
    pub const SERVER_STREAMING: &str = "/perftest.PerformanceTest/ServerStreaming";
    pub const CLIENT_STREAMING: &str = "/perftest.PerformanceTest/ClientStreaming";
    pub const BIDIRECTIONAL: &str = "/perftest.PerformanceTest/BidirectionalStreaming";
    pub const PING_PONG: &str = "/perftest.PerformanceTest/PingPong";
    pub const BATCH: &str = "/perftest.PerformanceTest/BatchProcess";
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum PayloadSize {
    Empty = 0,
    Small = 1,
    Medium = 2,
    Large = 3,
    Xlarge = 4,
}

impl From<perfharness_core::PayloadSize> for PayloadSize {
    fn from(size: perfharness_core::PayloadSize) -> Self {
        use perfharness_core::PayloadSize as Class;
        match size {
            Class::Empty => Self::Empty,
            Class::Small => Self::Small,
            Class::Medium => Self::Medium,
            Class::Large => Self::Large,
            Class::XLarge => Self::Xlarge,
        }
    }
}

/// Smallest size class whose nominal size holds `len` bytes.
fn size_class(len: u64) -> PayloadSize {
    use perfharness_core::PayloadSize as Class;
    [Class::Empty, Class::Small, Class::Medium, Class::Large]
        .into_iter()
        .find(|class| len <= class.bytes() as u64)
        .unwrap_or(Class::XLarge)
        .into()
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DataStructure {
    #[prost(string, tag = "1")]
    pub key: String,
    #[prost(string, tag = "2")]
    pub value: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TestRequest {
    #[prost(string, tag = "1")]
    pub request_id: String,
    #[prost(message, optional, tag = "2")]
    pub timestamp: Option<prost_types::Timestamp>,
    #[prost(enumeration = "PayloadSize", tag = "3")]
    pub payload_size: i32,
    #[prost(message, repeated, tag = "4")]
    pub payload: Vec<DataStructure>,
    #[prost(bytes = "vec", tag = "5")]
    pub raw_payload: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TestResponse {
    #[prost(string, tag = "1")]
    pub request_id: String,
    #[prost(message, optional, tag = "2")]
    pub timestamp: Option<prost_types::Timestamp>,
    #[prost(message, repeated, tag = "3")]
    pub payload: Vec<DataStructure>,
    #[prost(bytes = "vec", tag = "4")]
    pub raw_payload: Vec<u8>,
    #[prost(uint64, optional, tag = "5")]
    pub processing_time_us: Option<u64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StreamRequest {
    #[prost(uint32, tag = "1")]
    pub message_count: u32,
    #[prost(enumeration = "PayloadSize", tag = "2")]
    pub payload_size: i32,
    #[prost(uint64, tag = "3")]
    pub interval_ms: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StreamResponse {
    #[prost(uint64, tag = "1")]
    pub messages_processed: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PingRequest {
    #[prost(string, tag = "1")]
    pub client_id: String,
    #[prost(message, optional, tag = "2")]
    pub send_timestamp: Option<prost_types::Timestamp>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PongResponse {
    #[prost(string, tag = "1")]
    pub client_id: String,
    #[prost(message, optional, tag = "2")]
    pub server_timestamp: Option<prost_types::Timestamp>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BatchRequest {
    #[prost(message, repeated, tag = "1")]
    pub requests: Vec<TestRequest>,
    #[prost(bool, tag = "2")]
    pub parallel_process: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BatchResponse {
    #[prost(message, repeated, tag = "1")]
    pub responses: Vec<TestResponse>,
}

pub fn timestamp(at: DateTime<Utc>) -> prost_types::Timestamp {
    prost_types::Timestamp {
        seconds: at.timestamp(),
        nanos: at.timestamp_subsec_nanos() as i32,
    }
}

/// `None` for timestamps outside chrono's range or with negative nanos.
pub fn datetime(ts: &prost_types::Timestamp) -> Option<DateTime<Utc>> {
    let nanos = u32::try_from(ts.nanos).ok()?;
    DateTime::from_timestamp(ts.seconds, nanos)
}

impl From<DataEntry> for DataStructure {
    fn from(entry: DataEntry) -> Self {
        Self {
            key: entry.key,
            value: entry.value,
        }
    }
}

impl From<RequestRecord> for TestRequest {
    fn from(record: RequestRecord) -> Self {
        let payload_size = size_class(record.byte_len()) as i32;
        let (payload, raw_payload) = match record.payload {
            Payload::Bytes(bytes) => (Vec::new(), bytes),
            Payload::Entries(entries) => (entries.into_iter().map(Into::into).collect(), Vec::new()),
        };
        Self {
            request_id: record.id.to_string(),
            timestamp: Some(timestamp(record.issued_at)),
            payload_size,
            payload,
            raw_payload,
        }
    }
}

impl TestResponse {
    /// Key and value bytes of the entries plus the raw bytes.
    pub fn payload_bytes(&self) -> u64 {
        let entries: u64 = self
            .payload
            .iter()
            .map(|e| (e.key.len() + e.value.len()) as u64)
            .sum();
        entries + self.raw_payload.len() as u64
    }
}

impl From<TestResponse> for CallResponse {
    fn from(response: TestResponse) -> Self {
        Self {
            payload_bytes: response.payload_bytes(),
            server_processing_us: response.processing_time_us,
            request_id: response.request_id,
        }
    }
}

impl From<CoreStreamRequest> for StreamRequest {
    fn from(request: CoreStreamRequest) -> Self {
        Self {
            message_count: request.message_count,
            payload_size: PayloadSize::from(request.payload_size) as i32,
            interval_ms: request.interval_ms,
        }
    }
}

impl From<StreamResponse> for ClientStreamSummary {
    fn from(response: StreamResponse) -> Self {
        Self {
            messages_processed: response.messages_processed,
        }
    }
}

impl From<CorePing> for PingRequest {
    fn from(ping: CorePing) -> Self {
        Self {
            client_id: ping.client_id,
            send_timestamp: Some(timestamp(ping.sent_at)),
        }
    }
}

impl From<PongResponse> for CorePong {
    fn from(pong: PongResponse) -> Self {
        Self {
            server_timestamp: pong.server_timestamp.as_ref().and_then(datetime),
            client_id: pong.client_id,
        }
    }
}

impl From<CoreBatchRequest> for BatchRequest {
    fn from(batch: CoreBatchRequest) -> Self {
        Self {
            requests: batch.requests.into_iter().map(Into::into).collect(),
            parallel_process: batch.parallel_process,
        }
    }
}
