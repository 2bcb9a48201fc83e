// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Perfharness Core Library
//!
//! Measurement and validation harness for RPC and HTTP services.
//! Provides the monotonic clock, latency statistics, throughput windows,
//! batch dispatch, per-call-shape streaming drivers, and self-validation
//! of the measurement methodology. Wire protocols plug in through the
//! [`Transport`] trait.

pub mod batch;
pub mod clock;
pub mod config;
pub mod error;
pub mod harness;
pub mod netio;
pub mod state;
pub mod stats;
pub mod streaming;
pub mod throughput;
pub mod transport;
pub mod types;
pub mod validation;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use batch::{BatchComparison, BatchDispatcher, BatchJob, BatchMode, BatchStrategy, BatchTiming};
pub use clock::{Clock, ManualClock, MonotonicClock, SharedClock};
pub use config::{Config, ConfigLoader, ConfigOverrides};
pub use error::{
    HarnessError, HarnessResult, InvalidConfigurationError, PartialMeasurement, PartialProgress,
    TransportError,
};
pub use harness::{LatencyProbe, PerfHarness};
pub use netio::{NetworkCounters, SysinfoNetworkCounters};
pub use state::{CallShape, CallState, CallStateMachine};
pub use stats::{ConcurrentLatencyRecorder, LatencyRecorder, LatencySummary};
pub use streaming::{CallOutcome, StreamAnomaly, StreamingDriver};
pub use throughput::{ThroughputMeter, ThroughputReport};
pub use transport::{Transport, TransportKind};
pub use types::{Payload, PayloadSize, RequestId, RequestRecord};
pub use validation::{CheckKind, ValidationHarness, ValidationReport, ValidationResult};
