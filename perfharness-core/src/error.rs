// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Custom error types for the measurement harness.
//!
//! Every failure is an explicit enum variant. Library code never returns
//! `Box<dyn Error>` or `anyhow::Result`; partial work is always carried
//! inside the error instead of being dropped.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::stats::LatencySummary;
use crate::validation::ValidationResult;

/// Top-level error type for the harness.
#[derive(Debug, Error)]
pub enum HarnessError {
    // =========================================================================
    // Per-call failures
    // =========================================================================
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("{operation} stopped early after {progress}: {source}")]
    PartialFailure {
        operation: &'static str,
        progress: PartialProgress,
        /// Statistics derived from the work that completed before the failure
        partial: Option<Box<PartialMeasurement>>,
        #[source]
        source: TransportError,
    },

    // =========================================================================
    // Statistics
    // =========================================================================
    #[error("Insufficient data: {metric} needs at least {required} samples, {available} recorded")]
    InsufficientData {
        metric: &'static str,
        required: usize,
        available: usize,
    },

    #[error("Recorder still shared by {holders} in-flight tasks")]
    RecorderInUse { holders: usize },

    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(#[from] StateTransitionError),

    // =========================================================================
    // Configuration - rejected before any call is issued
    // =========================================================================
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(#[from] InvalidConfigurationError),

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Configuration parse error: {message}")]
    ConfigParse { message: String },

    // =========================================================================
    // System Errors
    // =========================================================================
    #[error("IO error: {context} - {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl HarnessError {
    /// Partial progress attached to this error, if any work completed.
    pub fn progress(&self) -> Option<&PartialProgress> {
        match self {
            Self::PartialFailure { progress, .. } => Some(progress),
            _ => None,
        }
    }

    /// Latency statistics over the samples recorded before the failure.
    pub fn partial_latency(&self) -> Option<&LatencySummary> {
        match self {
            Self::PartialFailure { partial, .. } => match partial.as_deref() {
                Some(PartialMeasurement::Latency(summary)) => Some(summary),
                _ => None,
            },
            _ => None,
        }
    }

    /// Validation results finished before the failure.
    pub fn partial_results(&self) -> &[ValidationResult] {
        match self {
            Self::PartialFailure { partial, .. } => match partial.as_deref() {
                Some(PartialMeasurement::Validation(results)) => results.as_slice(),
                _ => &[],
            },
            _ => &[],
        }
    }

    /// The transport failure at the root of this error, if any.
    pub fn transport_error(&self) -> Option<&TransportError> {
        match self {
            Self::Transport(e) => Some(e),
            Self::PartialFailure { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Failures reported by a transport adapter for a single call or stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Connection to {target} refused: {reason}")]
    ConnectionRefused { target: String, reason: String },

    #[error("Deadline exceeded: {operation} took longer than {timeout_ms}ms")]
    DeadlineExceeded {
        operation: &'static str,
        timeout_ms: u64,
    },

    #[error("Stream reset: {reason}")]
    StreamReset { reason: String },

    #[error("Service rejected the call ({code}): {message}")]
    Rejected { code: String, message: String },

    #[error("Malformed response: {reason}")]
    Decode { reason: String },
}

/// Configuration problems detected before a measurement starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidConfigurationError {
    #[error("Duration for {context} must be positive")]
    NonPositiveDuration { context: &'static str },

    #[error("Batch must contain at least one request")]
    EmptyBatch,

    #[error("Percentile p{percentile} cannot be computed from {samples} samples")]
    PercentileExceedsSamples { percentile: u32, samples: usize },

    #[error("Missing required field: {field} in {context}")]
    MissingRequiredField {
        field: &'static str,
        context: String,
    },

    #[error("Invalid field value: {field} = {value} - {reason}")]
    InvalidFieldValue {
        field: &'static str,
        value: String,
        reason: String,
    },
}

/// State transition errors for the per-call state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateTransitionError {
    #[error("Cannot transition {call} call from {from} to {to}")]
    InvalidTransition {
        call: &'static str,
        from: &'static str,
        to: &'static str,
    },

    #[error("{call} call is in terminal state: {state}")]
    TerminalState {
        call: &'static str,
        state: &'static str,
    },
}

/// Counters accumulated before an operation stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PartialProgress {
    /// Units of work (calls, messages, requests) that completed
    pub completed: u64,
    /// Units of work that were planned, when known up front
    pub expected: Option<u64>,
    /// Bytes accounted for by the completed work
    pub bytes: u64,
    /// Monotonic time spent before the failure, in nanoseconds
    pub elapsed_ns: u64,
}

impl std::fmt::Display for PartialProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.expected {
            Some(expected) => write!(f, "{}/{} completed", self.completed, expected),
            None => write!(f, "{} completed", self.completed),
        }
    }
}

/// What a loop measurement had derived when it stopped early.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PartialMeasurement {
    Latency(LatencySummary),
    Validation(Vec<ValidationResult>),
}

/// Result type alias using HarnessError.
pub type HarnessResult<T> = Result<T, HarnessError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_failure_display_carries_counts() {
        let err = HarnessError::PartialFailure {
            operation: "batch",
            progress: PartialProgress {
                completed: 3,
                expected: Some(5),
                bytes: 3072,
                elapsed_ns: 1_000,
            },
            partial: None,
            source: TransportError::StreamReset {
                reason: "peer closed".to_string(),
            },
        };
        let text = err.to_string();
        assert!(text.contains("3/5 completed"));
        assert!(text.contains("peer closed"));
        assert_eq!(err.progress().map(|p| p.completed), Some(3));
    }

    #[test]
    fn test_error_chain() {
        let config_err = InvalidConfigurationError::NonPositiveDuration {
            context: "throughput window",
        };
        let err: HarnessError = config_err.into();
        assert!(matches!(err, HarnessError::InvalidConfiguration(_)));
        assert!(err.transport_error().is_none());
    }

    #[test]
    fn test_transport_error_lookup() {
        let err: HarnessError = TransportError::DeadlineExceeded {
            operation: "unary",
            timeout_ms: 250,
        }
        .into();
        assert!(matches!(
            err.transport_error(),
            Some(TransportError::DeadlineExceeded { timeout_ms: 250, .. })
        ));
    }
}
