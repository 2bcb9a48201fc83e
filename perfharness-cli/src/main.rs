// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! perfharness CLI
//!
//! Command-line front-end for measuring and validating an RPC or HTTP
//! performance-test service.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use perfharness_core::{ConfigLoader, ConfigOverrides, PerfHarness};
use perfharness_report::{print_summary, JsonReporter, RunReport};

mod commands;

/// perfharness - Latency, throughput and streaming measurements for RPC services
#[derive(Parser)]
#[command(name = "perfharness")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Transport to use (grpc or http)
    #[arg(long, global = true)]
    pub transport: Option<String>,

    /// Base URL of the service under test
    #[arg(long, global = true)]
    pub target: Option<String>,

    /// Per-call timeout in milliseconds
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Directory to write the JSON report into
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ping-pong round-trip latency
    Latency {
        /// Measured iterations
        #[arg(long)]
        iterations: Option<usize>,

        /// Discarded warmup iterations
        #[arg(long)]
        warmup: Option<usize>,
    },

    /// Unary throughput over a fixed window
    Throughput {
        /// Window length in milliseconds
        #[arg(long)]
        duration_ms: Option<u64>,

        /// Payload class (empty, small, medium, large, xlarge)
        #[arg(long)]
        payload: Option<String>,
    },

    /// Server, client and bidirectional streaming
    Stream {
        /// Messages the server should send
        #[arg(long)]
        messages: Option<u32>,

        /// Server-side interval between messages
        #[arg(long)]
        interval_ms: Option<u64>,
    },

    /// Sequential against parallel batch execution
    Batch {
        /// Batch sizes, comma separated
        #[arg(long, value_delimiter = ',')]
        sizes: Option<Vec<usize>>,

        /// Where parallelism happens (client or server)
        #[arg(long)]
        strategy: Option<String>,
    },

    /// One call of every shape
    Smoke,

    /// Self-checks of the measurement methods
    Validate,

    /// Every measurement family in turn
    All,

    /// Print the resolved configuration and exit
    Config,
}

impl Cli {
    /// Command-line values to layer over the configuration file.
    pub fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides {
            transport: self.transport.clone(),
            address: self.target.clone(),
            call_timeout_ms: self.timeout_ms,
            ..ConfigOverrides::default()
        };

        match &self.command {
            Commands::Latency { iterations, warmup } => {
                overrides.latency_iterations = *iterations;
                overrides.latency_warmup = *warmup;
            }
            Commands::Throughput {
                duration_ms,
                payload,
            } => {
                overrides.throughput_duration_ms = *duration_ms;
                overrides.payload_size = payload.clone();
            }
            Commands::Stream {
                messages,
                interval_ms,
            } => {
                overrides.message_count = *messages;
                overrides.interval_ms = *interval_ms;
            }
            Commands::Batch { sizes, strategy } => {
                overrides.batch_sizes = sizes.clone();
                overrides.batch_strategy = strategy.clone();
            }
            Commands::Smoke | Commands::Validate | Commands::All | Commands::Config => {}
        }
        overrides
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ConfigLoader::resolve(cli.config.as_deref(), &cli.overrides())
        .context("Configuration is invalid")?;

    if let Commands::Config = cli.command {
        commands::config::execute(&config);
        return Ok(());
    }

    let transport = perfharness_transport::connect(&config.target, config.call_timeout)
        .context("Failed to set up transport")?;
    let mut report = RunReport::new(config.target.transport, config.target.address.clone());
    let harness = PerfHarness::new(transport, config);

    let entries = match cli.command {
        Commands::Latency { .. } => commands::latency::execute(&harness).await,
        Commands::Throughput { .. } => commands::throughput::execute(&harness).await,
        Commands::Stream { .. } => commands::stream::execute(&harness).await,
        Commands::Batch { .. } => commands::batch::execute(&harness).await,
        Commands::Smoke => commands::smoke::execute(&harness).await,
        Commands::Validate => commands::validate::execute(&harness).await,
        Commands::All => commands::all(&harness).await,
        Commands::Config => Vec::new(),
    };
    report.extend(entries);

    print_summary(&report);

    if let Some(dir) = &cli.output {
        match JsonReporter::new(dir).and_then(|reporter| reporter.save(&report)) {
            Ok(path) => println!("Report saved to: {}", path.display()),
            Err(e) => tracing::error!(error = %e, dir = %dir.display(), "Failed to write report"),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "perfharness",
            "batch",
            "--sizes",
            "5,10,50",
            "--target",
            "http://127.0.0.1:8080",
            "--timeout-ms",
            "500",
        ])
        .unwrap();

        let overrides = cli.overrides();
        assert_eq!(overrides.batch_sizes, Some(vec![5, 10, 50]));
        assert_eq!(overrides.address.as_deref(), Some("http://127.0.0.1:8080"));
        assert_eq!(overrides.call_timeout_ms, Some(500));
        assert!(overrides.latency_iterations.is_none());
    }

    #[test]
    fn test_throughput_payload_override_resolves() {
        let cli = Cli::try_parse_from([
            "perfharness",
            "--transport",
            "http",
            "--target",
            "http://127.0.0.1:8080",
            "--timeout-ms",
            "1000",
            "throughput",
            "--payload",
            "large",
            "--duration-ms",
            "250",
        ])
        .unwrap();

        let config = ConfigLoader::resolve(None, &cli.overrides()).unwrap();
        assert_eq!(
            config.throughput.payload_sizes,
            vec![perfharness_core::PayloadSize::Large]
        );
        assert_eq!(config.throughput.duration.as_millis(), 250);
    }

    #[test]
    fn test_missing_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["perfharness", "--verbose"]).is_err());
    }
}
