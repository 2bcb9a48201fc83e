// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Wire adapters for the perfharness [`Transport`] seam.
//!
//! - [`GrpcTransport`]: the `perftest.PerformanceTest` service over tonic
//! - [`HttpTransport`]: JSON endpoints and an SSE stream over reqwest

pub mod grpc;
pub mod http;
pub mod proto;

use std::sync::Arc;
use std::time::Duration;

use perfharness_core::config::TargetConfig;
use perfharness_core::error::HarnessResult;
use perfharness_core::transport::{Transport, TransportKind};

pub use grpc::GrpcTransport;
pub use http::{HttpTransport, SseDecoder};

/// Build the transport for `target`. Fails only on a malformed address; the
/// service itself is first contacted by the first call.
pub fn connect(target: &TargetConfig, call_timeout: Duration) -> HarnessResult<Arc<dyn Transport>> {
    tracing::info!(
        transport = %target.transport,
        address = %target.address,
        "Connecting to service under test"
    );

    let transport: Arc<dyn Transport> = match target.transport {
        TransportKind::Grpc => Arc::new(GrpcTransport::new(&target.address, call_timeout)?),
        TransportKind::Http => Arc::new(HttpTransport::new(&target.address, call_timeout)?),
    };
    Ok(transport)
}
