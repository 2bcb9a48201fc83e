// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Per-call state machine with timed transitions.
//!
//! Lifecycle: Idle → Sending → Completed, or Idle → Sending → Receiving →
//! Completed. Failed is reachable from every non-terminal state. Each
//! transition is stamped with the monotonic offset from call start, which
//! gives drivers their sequence of timed events.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::clock::{duration_to_nanos, Clock};
use crate::error::StateTransitionError;

/// Call shapes exercised against the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallShape {
    Unary,
    ServerStreaming,
    ClientStreaming,
    Bidirectional,
    PingPong,
    Batch,
}

impl CallShape {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Unary => "unary",
            Self::ServerStreaming => "server_streaming",
            Self::ClientStreaming => "client_streaming",
            Self::Bidirectional => "bidirectional",
            Self::PingPong => "ping_pong",
            Self::Batch => "batch",
        }
    }
}

impl std::fmt::Display for CallShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Call lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallState {
    /// Nothing issued yet.
    Idle,

    /// Request(s) being written to the transport.
    Sending,

    /// Waiting on or consuming responses.
    Receiving,

    /// Finished, possibly with fewer messages than requested.
    Completed,

    /// The transport reported an error.
    Failed,
}

impl CallState {
    /// Get the state name for error messages.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Sending => "Sending",
            Self::Receiving => "Receiving",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
        }
    }

    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Check if transition to the target state is valid.
    pub fn can_transition_to(&self, target: CallState) -> bool {
        matches!(
            (self, target),
            (Self::Idle, Self::Sending)
                | (Self::Sending, Self::Receiving)
                | (Self::Sending, Self::Completed)
                | (Self::Receiving, Self::Completed)
                | (Self::Idle, Self::Failed)
                | (Self::Sending, Self::Failed)
                | (Self::Receiving, Self::Failed)
        )
    }
}

impl std::fmt::Display for CallState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One state change, offset from the start of the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedEvent {
    pub state: CallState,
    pub at_ns: u64,
}

/// State machine for a single call.
#[derive(Debug)]
pub struct CallStateMachine {
    shape: CallShape,
    current_state: CallState,
    started: Instant,
    events: Vec<TimedEvent>,
}

impl CallStateMachine {
    /// Create a machine in `Idle`, anchored at the clock's current instant.
    pub fn new(shape: CallShape, clock: &dyn Clock) -> Self {
        Self {
            shape,
            current_state: CallState::Idle,
            started: clock.now(),
            events: vec![TimedEvent {
                state: CallState::Idle,
                at_ns: 0,
            }],
        }
    }

    pub fn state(&self) -> CallState {
        self.current_state
    }

    pub fn shape(&self) -> CallShape {
        self.shape
    }

    pub fn events(&self) -> &[TimedEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<TimedEvent> {
        self.events
    }

    /// Time from call start to the latest transition.
    pub fn elapsed_at_last_transition(&self) -> Duration {
        self.events
            .last()
            .map(|e| Duration::from_nanos(e.at_ns))
            .unwrap_or_default()
    }

    /// Attempt to transition to a new state.
    pub fn transition_to(
        &mut self,
        target: CallState,
        clock: &dyn Clock,
    ) -> Result<(), StateTransitionError> {
        self.transition_at(target, clock.now())
    }

    /// Transition stamped with an instant observed earlier, e.g. the moment a
    /// lazily consumed producer ran dry.
    pub fn transition_at(
        &mut self,
        target: CallState,
        at: Instant,
    ) -> Result<(), StateTransitionError> {
        if self.current_state.is_terminal() {
            return Err(StateTransitionError::TerminalState {
                call: self.shape.name(),
                state: self.current_state.name(),
            });
        }
        if !self.current_state.can_transition_to(target) {
            return Err(StateTransitionError::InvalidTransition {
                call: self.shape.name(),
                from: self.current_state.name(),
                to: target.name(),
            });
        }

        tracing::trace!(
            call = self.shape.name(),
            from = self.current_state.name(),
            to = target.name(),
            "State transition"
        );

        self.current_state = target;
        self.events.push(TimedEvent {
            state: target,
            at_ns: duration_to_nanos(at.saturating_duration_since(self.started)),
        });
        Ok(())
    }

    /// Move to `Failed` from whatever non-terminal state the call is in.
    pub fn fail(&mut self, clock: &dyn Clock) {
        if !self.current_state.is_terminal() {
            // Every non-terminal state may fail.
            let _ = self.transition_to(CallState::Failed, clock);
        }
    }
}
