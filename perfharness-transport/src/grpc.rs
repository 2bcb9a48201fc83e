// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! gRPC adapter over a lazily connected tonic channel.
//!
//! The channel is cheap to clone; each call clones the client so concurrent
//! drivers never contend on `&mut self`.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tonic::client::Grpc;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, Endpoint};
use tonic::{Code, Request, Status};

use perfharness_core::error::{InvalidConfigurationError, TransportError};
use perfharness_core::transport::{
    BatchRequest, BatchResponse, CallResponse, ClientStreamSummary, PingRequest, PongResponse,
    RequestStream, ResponseStream, StreamRequest, Transport, TransportKind,
};
use perfharness_core::types::RequestRecord;

use crate::proto::{self, path};

/// Translate a gRPC status into the harness' failure taxonomy.
pub fn status_to_error(status: Status, operation: &'static str, target: &str) -> TransportError {
    match status.code() {
        Code::DeadlineExceeded => TransportError::DeadlineExceeded {
            operation,
            timeout_ms: 0,
        },
        Code::Unavailable => TransportError::ConnectionRefused {
            target: target.to_string(),
            reason: status.message().to_string(),
        },
        Code::Cancelled | Code::Aborted => TransportError::StreamReset {
            reason: format!("{:?}: {}", status.code(), status.message()),
        },
        code => TransportError::Rejected {
            code: format!("{:?}", code),
            message: status.message().to_string(),
        },
    }
}

pub struct GrpcTransport {
    target: String,
    grpc: Grpc<Channel>,
}

impl GrpcTransport {
    /// Build a transport without dialing. Only a malformed target fails here;
    /// an unreachable service surfaces on the first call. Must be called
    /// inside a tokio runtime.
    pub fn new(target: &str, connect_timeout: Duration) -> Result<Self, InvalidConfigurationError> {
        let endpoint = Endpoint::from_shared(target.to_string())
            .map_err(|e| InvalidConfigurationError::InvalidFieldValue {
                field: "target.address",
                value: target.to_string(),
                reason: e.to_string(),
            })?
            .connect_timeout(connect_timeout)
            .tcp_nodelay(true);

        tracing::debug!(address = target, service = proto::SERVICE, "Created lazy gRPC channel");

        Ok(Self {
            target: target.to_string(),
            grpc: Grpc::new(endpoint.connect_lazy()),
        })
    }

    async fn client(&self, operation: &'static str) -> Result<Grpc<Channel>, TransportError> {
        let mut grpc = self.grpc.clone();
        grpc.ready().await.map_err(|e| {
            tracing::debug!(operation, error = %e, "gRPC channel not ready");
            TransportError::ConnectionRefused {
                target: self.target.clone(),
                reason: e.to_string(),
            }
        })?;
        Ok(grpc)
    }

    fn error(&self, status: Status, operation: &'static str) -> TransportError {
        status_to_error(status, operation, &self.target)
    }
}

fn responses(
    stream: tonic::Streaming<proto::TestResponse>,
    operation: &'static str,
    target: String,
) -> ResponseStream {
    stream
        .map(move |item| {
            item.map(CallResponse::from)
                .map_err(|status| status_to_error(status, operation, &target))
        })
        .boxed()
}

#[async_trait]
impl Transport for GrpcTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Grpc
    }

    fn target(&self) -> &str {
        &self.target
    }

    async fn unary(&self, request: RequestRecord) -> Result<CallResponse, TransportError> {
        let mut grpc = self.client("unary").await?;
        let response = grpc
            .unary(
                Request::new(proto::TestRequest::from(request)),
                PathAndQuery::from_static(path::UNARY),
                ProstCodec::<proto::TestRequest, proto::TestResponse>::default(),
            )
            .await
            .map_err(|s| self.error(s, "unary"))?;
        Ok(response.into_inner().into())
    }

    async fn ping(&self, request: PingRequest) -> Result<PongResponse, TransportError> {
        let mut grpc = self.client("ping").await?;
        let response = grpc
            .unary(
                Request::new(proto::PingRequest::from(request)),
                PathAndQuery::from_static(path::PING_PONG),
                ProstCodec::<proto::PingRequest, proto::PongResponse>::default(),
            )
            .await
            .map_err(|s| self.error(s, "ping"))?;
        Ok(response.into_inner().into())
    }

    async fn server_stream(
        &self,
        request: StreamRequest,
    ) -> Result<ResponseStream, TransportError> {
        let mut grpc = self.client("server_streaming").await?;
        let stream = grpc
            .server_streaming(
                Request::new(proto::StreamRequest::from(request)),
                PathAndQuery::from_static(path::SERVER_STREAMING),
                ProstCodec::<proto::StreamRequest, proto::TestResponse>::default(),
            )
            .await
            .map_err(|s| self.error(s, "server_streaming"))?
            .into_inner();
        Ok(responses(stream, "server_streaming", self.target.clone()))
    }

    async fn client_stream(
        &self,
        requests: RequestStream,
    ) -> Result<ClientStreamSummary, TransportError> {
        let mut grpc = self.client("client_streaming").await?;
        let response = grpc
            .client_streaming(
                Request::new(requests.map(proto::TestRequest::from)),
                PathAndQuery::from_static(path::CLIENT_STREAMING),
                ProstCodec::<proto::TestRequest, proto::StreamResponse>::default(),
            )
            .await
            .map_err(|s| self.error(s, "client_streaming"))?;
        Ok(response.into_inner().into())
    }

    async fn bidirectional(
        &self,
        requests: RequestStream,
    ) -> Result<ResponseStream, TransportError> {
        let mut grpc = self.client("bidirectional").await?;
        let stream = grpc
            .streaming(
                Request::new(requests.map(proto::TestRequest::from)),
                PathAndQuery::from_static(path::BIDIRECTIONAL),
                ProstCodec::<proto::TestRequest, proto::TestResponse>::default(),
            )
            .await
            .map_err(|s| self.error(s, "bidirectional"))?
            .into_inner();
        Ok(responses(stream, "bidirectional", self.target.clone()))
    }

    async fn batch(&self, request: BatchRequest) -> Result<BatchResponse, TransportError> {
        let mut grpc = self.client("batch").await?;
        let response = grpc
            .unary(
                Request::new(proto::BatchRequest::from(request)),
                PathAndQuery::from_static(path::BATCH),
                ProstCodec::<proto::BatchRequest, proto::BatchResponse>::default(),
            )
            .await
            .map_err(|s| self.error(s, "batch"))?;
        Ok(BatchResponse {
            responses: response
                .into_inner()
                .responses
                .into_iter()
                .map(CallResponse::from)
                .collect(),
        })
    }
}
