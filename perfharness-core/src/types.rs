// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Transport-agnostic request records and payloads.
//!
//! Every driver builds these records and hands them to a transport adapter,
//! which owns the wire representation. Identifiers validate their invariants
//! at creation time.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::InvalidConfigurationError;

/// Per-entry overhead assumed when sizing structured payloads.
const ENTRY_OVERHEAD_BYTES: usize = 30;

/// Validated request identifier. Must be non-empty.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RequestId(String);

impl RequestId {
    /// Create a new RequestId with validation.
    pub fn new(id: impl Into<String>) -> Result<Self, InvalidConfigurationError> {
        let id = id.into();
        if id.is_empty() {
            return Err(InvalidConfigurationError::InvalidFieldValue {
                field: "request_id",
                value: id,
                reason: "Request ID cannot be empty".to_string(),
            });
        }
        Ok(Self(id))
    }

    /// Random identifier for calls that do not need a meaningful one.
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Sequential identifier such as `batch-3`.
    pub fn numbered(prefix: &str, index: usize) -> Self {
        Self(format!("{}-{}", prefix, index))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for RequestId {
    type Error = InvalidConfigurationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RequestId> for String {
    fn from(id: RequestId) -> Self {
        id.0
    }
}

/// Payload size classes understood by the service under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadSize {
    Empty,
    #[default]
    Small,
    Medium,
    Large,
    XLarge,
}

impl PayloadSize {
    /// Nominal size in bytes.
    pub const fn bytes(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Small => 1024,
            Self::Medium => 10 * 1024,
            Self::Large => 100 * 1024,
            Self::XLarge => 1024 * 1024,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
            Self::XLarge => "xlarge",
        }
    }
}

impl fmt::Display for PayloadSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for PayloadSize {
    type Err = InvalidConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "empty" => Ok(Self::Empty),
            "small" => Ok(Self::Small),
            "medium" => Ok(Self::Medium),
            "large" => Ok(Self::Large),
            "xlarge" => Ok(Self::XLarge),
            other => Err(InvalidConfigurationError::InvalidFieldValue {
                field: "payload_size",
                value: other.to_string(),
                reason: "Expected one of empty, small, medium, large, xlarge".to_string(),
            }),
        }
    }
}

/// One key/value entry of a structured payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataEntry {
    pub key: String,
    pub value: String,
}

/// Request body: raw bytes or a list of structured entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Payload {
    Bytes(Vec<u8>),
    Entries(Vec<DataEntry>),
}

impl Payload {
    /// Raw payload of `len` ASCII `x` bytes.
    pub fn filled(len: usize) -> Self {
        Self::Bytes(vec![b'x'; len])
    }

    /// Structured payload whose entries add up to roughly `size` bytes.
    pub fn entries_for(size: PayloadSize) -> Self {
        let target = size.bytes();
        let value_len = target / 1000;
        let mut entries = Vec::new();
        let mut current = 0;

        while current < target {
            let key = format!("key_{}", entries.len());
            let value = format!("value_{}", "x".repeat(value_len));
            current += key.len() + value.len() + ENTRY_OVERHEAD_BYTES;
            entries.push(DataEntry { key, value });
        }

        Self::Entries(entries)
    }

    /// Bytes the harness accounts for when this payload is sent.
    ///
    /// Entries count key and value bytes only; framing is not included.
    pub fn byte_len(&self) -> u64 {
        match self {
            Self::Bytes(bytes) => bytes.len() as u64,
            Self::Entries(entries) => entries
                .iter()
                .map(|e| (e.key.len() + e.value.len()) as u64)
                .sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.byte_len() == 0
    }
}

impl Default for Payload {
    fn default() -> Self {
        Self::Bytes(Vec::new())
    }
}

/// A single request as issued by a driver.
///
/// Immutable after construction; `issued_at` is wall-clock metadata only and
/// never used for duration arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestRecord {
    pub id: RequestId,
    pub issued_at: DateTime<Utc>,
    pub payload: Payload,
}

impl RequestRecord {
    pub fn new(id: RequestId, payload: Payload) -> Self {
        Self {
            id,
            issued_at: Utc::now(),
            payload,
        }
    }

    /// `count` records named `<prefix>-<i>` sharing one payload shape.
    pub fn numbered(prefix: &str, count: usize, payload: &Payload) -> Vec<Self> {
        (0..count)
            .map(|i| Self::new(RequestId::numbered(prefix, i), payload.clone()))
            .collect()
    }

    pub fn byte_len(&self) -> u64 {
        self.payload.byte_len()
    }
}
