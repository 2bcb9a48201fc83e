// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! YAML configuration parser with strict schema validation.
//!
//! Every measurement reads its parameters from a validated [`Config`]. Any
//! invalid field is rejected before a single call is issued. `call_timeout_ms`
//! has no default: a run without a per-call deadline is refused.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::batch::BatchStrategy;
use crate::error::{HarnessError, HarnessResult, InvalidConfigurationError};
use crate::transport::TransportKind;
use crate::types::PayloadSize;
use crate::validation::ValidationSettings;

/// Upper bound for any single call deadline (10 minutes).
const MAX_CALL_TIMEOUT_MS: u64 = 600_000;

// =============================================================================
// Raw configuration as parsed from YAML (before validation)
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawConfig {
    target: RawTargetConfig,
    call_timeout_ms: Option<u64>,
    latency: RawLatencyConfig,
    throughput: RawThroughputConfig,
    streaming: RawStreamingConfig,
    batch: RawBatchConfig,
    validation: RawValidationConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawTargetConfig {
    transport: Option<String>,
    address: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawLatencyConfig {
    iterations: usize,
    warmup: usize,
}

impl Default for RawLatencyConfig {
    fn default() -> Self {
        Self {
            iterations: 1000,
            warmup: 10,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawThroughputConfig {
    duration_ms: u64,
    payload_sizes: Vec<String>,
    warmup: u64,
}

impl Default for RawThroughputConfig {
    fn default() -> Self {
        Self {
            duration_ms: 10_000,
            payload_sizes: vec!["small".into(), "medium".into(), "large".into()],
            warmup: 0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawStreamingConfig {
    message_count: u32,
    interval_ms: u64,
    payload_size: String,
    client_messages: u32,
    send_interval_ms: u64,
}

impl Default for RawStreamingConfig {
    fn default() -> Self {
        Self {
            message_count: 1000,
            interval_ms: 10,
            payload_size: "small".into(),
            client_messages: 5,
            send_interval_ms: 0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawBatchConfig {
    sizes: Vec<usize>,
    strategy: String,
}

impl Default for RawBatchConfig {
    fn default() -> Self {
        Self {
            sizes: vec![10, 50, 100],
            strategy: "client".into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawValidationConfig {
    noise_iterations: usize,
    delay_iterations: usize,
    expected_delays_us: Vec<u64>,
    throughput_duration_ms: u64,
    throughput_message_size: usize,
    parallel_batch_size: usize,
    parallel_iterations: usize,
    batch_strategy: String,
}

impl Default for RawValidationConfig {
    fn default() -> Self {
        let settings = ValidationSettings::default();
        Self {
            noise_iterations: settings.noise_iterations,
            delay_iterations: settings.delay_iterations,
            expected_delays_us: settings.expected_delays_us,
            throughput_duration_ms: settings.throughput_duration.as_millis() as u64,
            throughput_message_size: settings.throughput_message_size,
            parallel_batch_size: settings.parallel_batch_size,
            parallel_iterations: settings.parallel_iterations,
            batch_strategy: settings.batch_strategy.name().to_string(),
        }
    }
}

// =============================================================================
// Validated configuration
// =============================================================================

/// Service under test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetConfig {
    pub transport: TransportKind,
    /// Base URL including scheme
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatencyConfig {
    pub iterations: usize,
    pub warmup: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThroughputConfig {
    pub duration: Duration,
    pub payload_sizes: Vec<PayloadSize>,
    pub warmup: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamingConfig {
    pub message_count: u32,
    pub interval_ms: u64,
    pub payload_size: PayloadSize,
    pub client_messages: u32,
    pub send_interval: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    pub sizes: Vec<usize>,
    pub strategy: BatchStrategy,
}

/// Complete validated configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub target: TargetConfig,
    pub call_timeout: Duration,
    pub latency: LatencyConfig,
    pub throughput: ThroughputConfig,
    pub streaming: StreamingConfig,
    pub batch: BatchConfig,
    pub validation: ValidationSettings,
}

/// Values supplied on the command line, applied over the file before
/// validation.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub transport: Option<String>,
    pub address: Option<String>,
    pub call_timeout_ms: Option<u64>,
    pub latency_iterations: Option<usize>,
    pub latency_warmup: Option<usize>,
    pub throughput_duration_ms: Option<u64>,
    pub payload_size: Option<String>,
    pub message_count: Option<u32>,
    pub interval_ms: Option<u64>,
    pub batch_sizes: Option<Vec<usize>>,
    pub batch_strategy: Option<String>,
}

impl ConfigOverrides {
    fn apply(&self, raw: &mut RawConfig) {
        if let Some(transport) = &self.transport {
            raw.target.transport = Some(transport.clone());
        }
        if let Some(address) = &self.address {
            raw.target.address = Some(address.clone());
        }
        if let Some(ms) = self.call_timeout_ms {
            raw.call_timeout_ms = Some(ms);
        }
        if let Some(n) = self.latency_iterations {
            raw.latency.iterations = n;
        }
        if let Some(n) = self.latency_warmup {
            raw.latency.warmup = n;
        }
        if let Some(ms) = self.throughput_duration_ms {
            raw.throughput.duration_ms = ms;
        }
        if let Some(size) = &self.payload_size {
            raw.throughput.payload_sizes = vec![size.clone()];
            raw.streaming.payload_size = size.clone();
        }
        if let Some(n) = self.message_count {
            raw.streaming.message_count = n;
        }
        if let Some(ms) = self.interval_ms {
            raw.streaming.interval_ms = ms;
        }
        if let Some(sizes) = &self.batch_sizes {
            raw.batch.sizes = sizes.clone();
        }
        if let Some(strategy) = &self.batch_strategy {
            raw.batch.strategy = strategy.clone();
        }
    }
}

/// Configuration loader with strict validation.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate configuration from a YAML file.
    pub fn load_file(path: impl AsRef<Path>) -> HarnessResult<Config> {
        Self::resolve(Some(path.as_ref()), &ConfigOverrides::default())
    }

    /// Load and validate configuration from a YAML string.
    pub fn load_string(content: &str) -> HarnessResult<Config> {
        Self::validate(Self::parse(content)?)
    }

    /// Optional file plus command-line overrides, validated together.
    pub fn resolve(path: Option<&Path>, overrides: &ConfigOverrides) -> HarnessResult<Config> {
        let mut raw = match path {
            Some(path) => Self::parse(&Self::read(path)?)?,
            None => RawConfig::default(),
        };
        overrides.apply(&mut raw);
        Self::validate(raw)
    }

    fn read(path: &Path) -> HarnessResult<String> {
        if !path.exists() {
            return Err(HarnessError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        std::fs::read_to_string(path).map_err(|e| HarnessError::Io {
            context: "reading config file",
            source: e,
        })
    }

    fn parse(content: &str) -> HarnessResult<RawConfig> {
        if content.trim().is_empty() {
            return Ok(RawConfig::default());
        }
        serde_yaml::from_str(content).map_err(|e| HarnessError::ConfigParse {
            message: format!("YAML parse error: {}", e),
        })
    }

    /// Validate raw configuration and convert to validated types.
    fn validate(raw: RawConfig) -> HarnessResult<Config> {
        let call_timeout = Self::validate_timeout(raw.call_timeout_ms)?;
        let target = Self::validate_target(raw.target)?;

        if raw.latency.iterations == 0 {
            return Err(invalid("latency.iterations", "0", "Must be at least 1"));
        }

        let throughput = Self::validate_throughput(raw.throughput)?;
        let streaming = Self::validate_streaming(raw.streaming)?;
        let batch = Self::validate_batch(raw.batch)?;
        let validation = Self::validate_validation(raw.validation)?;

        Ok(Config {
            target,
            call_timeout,
            latency: LatencyConfig {
                iterations: raw.latency.iterations,
                warmup: raw.latency.warmup,
            },
            throughput,
            streaming,
            batch,
            validation,
        })
    }

    fn validate_timeout(raw: Option<u64>) -> HarnessResult<Duration> {
        let ms = raw.ok_or_else(|| InvalidConfigurationError::MissingRequiredField {
            field: "call_timeout_ms",
            context: "configuration root".to_string(),
        })?;
        if ms == 0 {
            return Err(InvalidConfigurationError::NonPositiveDuration {
                context: "call_timeout_ms",
            }
            .into());
        }
        if ms > MAX_CALL_TIMEOUT_MS {
            return Err(invalid(
                "call_timeout_ms",
                &ms.to_string(),
                "Must not exceed 600000ms",
            ));
        }
        Ok(Duration::from_millis(ms))
    }

    fn validate_target(raw: RawTargetConfig) -> HarnessResult<TargetConfig> {
        let transport = match raw.transport {
            Some(name) => name.parse::<TransportKind>()?,
            None => TransportKind::default(),
        };
        let address = match raw.address {
            Some(address) => normalize_address(&address)?,
            None => transport.default_target().to_string(),
        };
        Ok(TargetConfig { transport, address })
    }

    fn validate_throughput(raw: RawThroughputConfig) -> HarnessResult<ThroughputConfig> {
        if raw.duration_ms == 0 {
            return Err(InvalidConfigurationError::NonPositiveDuration {
                context: "throughput.duration_ms",
            }
            .into());
        }
        if raw.payload_sizes.is_empty() {
            return Err(invalid(
                "throughput.payload_sizes",
                "[]",
                "At least one payload size is required",
            ));
        }
        let payload_sizes = raw
            .payload_sizes
            .iter()
            .map(|s| s.parse::<PayloadSize>())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ThroughputConfig {
            duration: Duration::from_millis(raw.duration_ms),
            payload_sizes,
            warmup: raw.warmup,
        })
    }

    fn validate_streaming(raw: RawStreamingConfig) -> HarnessResult<StreamingConfig> {
        if raw.message_count == 0 {
            return Err(invalid("streaming.message_count", "0", "Must be at least 1"));
        }
        if raw.client_messages == 0 {
            return Err(invalid("streaming.client_messages", "0", "Must be at least 1"));
        }
        Ok(StreamingConfig {
            message_count: raw.message_count,
            interval_ms: raw.interval_ms,
            payload_size: raw.payload_size.parse()?,
            client_messages: raw.client_messages,
            send_interval: Duration::from_millis(raw.send_interval_ms),
        })
    }

    fn validate_batch(raw: RawBatchConfig) -> HarnessResult<BatchConfig> {
        if raw.sizes.is_empty() || raw.sizes.contains(&0) {
            return Err(InvalidConfigurationError::EmptyBatch.into());
        }
        Ok(BatchConfig {
            sizes: raw.sizes,
            strategy: raw.strategy.parse()?,
        })
    }

    fn validate_validation(raw: RawValidationConfig) -> HarnessResult<ValidationSettings> {
        if raw.noise_iterations < 2 {
            return Err(invalid(
                "validation.noise_iterations",
                &raw.noise_iterations.to_string(),
                "Must be at least 2",
            ));
        }
        if raw.delay_iterations < 2 {
            return Err(invalid(
                "validation.delay_iterations",
                &raw.delay_iterations.to_string(),
                "Must be at least 2",
            ));
        }
        if raw.expected_delays_us.contains(&0) {
            return Err(invalid(
                "validation.expected_delays_us",
                "0",
                "Expected delays must be positive",
            ));
        }
        if raw.throughput_duration_ms == 0 {
            return Err(InvalidConfigurationError::NonPositiveDuration {
                context: "validation.throughput_duration_ms",
            }
            .into());
        }
        if raw.throughput_message_size == 0 {
            return Err(invalid(
                "validation.throughput_message_size",
                "0",
                "Must be positive",
            ));
        }
        if raw.parallel_batch_size == 0 {
            return Err(InvalidConfigurationError::EmptyBatch.into());
        }
        if raw.parallel_iterations == 0 {
            return Err(invalid(
                "validation.parallel_iterations",
                "0",
                "Must be at least 1",
            ));
        }

        Ok(ValidationSettings {
            noise_iterations: raw.noise_iterations,
            delay_iterations: raw.delay_iterations,
            expected_delays_us: raw.expected_delays_us,
            throughput_duration: Duration::from_millis(raw.throughput_duration_ms),
            throughput_message_size: raw.throughput_message_size,
            parallel_batch_size: raw.parallel_batch_size,
            parallel_iterations: raw.parallel_iterations,
            batch_strategy: raw.batch_strategy.parse()?,
        })
    }
}

fn invalid(field: &'static str, value: &str, reason: &str) -> HarnessError {
    InvalidConfigurationError::InvalidFieldValue {
        field,
        value: value.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

/// Accepts `host:port` or a base URL; returns a URL with scheme and no
/// trailing slash.
pub fn normalize_address(address: &str) -> Result<String, InvalidConfigurationError> {
    let trimmed = address.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(InvalidConfigurationError::InvalidFieldValue {
            field: "target.address",
            value: address.to_string(),
            reason: "Address cannot be empty".to_string(),
        });
    }
    if trimmed.contains("://") {
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(InvalidConfigurationError::InvalidFieldValue {
                field: "target.address",
                value: address.to_string(),
                reason: "Only http and https schemes are supported".to_string(),
            });
        }
        Ok(trimmed.to_string())
    } else {
        Ok(format!("http://{}", trimmed))
    }
}
