// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `perfharness config` - Print the resolved configuration.

use perfharness_core::Config;

fn join<T: ToString>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn execute(config: &Config) {
    println!("✓ Configuration is valid");
    println!();
    println!("Target:");
    println!("  Transport:          {}", config.target.transport);
    println!("  Address:            {}", config.target.address);
    println!("  Call Timeout:       {}ms", config.call_timeout.as_millis());
    println!();
    println!("Latency:");
    println!(
        "  Iterations:         {} (+{} warmup)",
        config.latency.iterations, config.latency.warmup
    );
    println!();
    println!("Throughput:");
    println!(
        "  Duration:           {}ms",
        config.throughput.duration.as_millis()
    );
    println!(
        "  Payload Sizes:      {}",
        join(&config.throughput.payload_sizes)
    );
    println!();
    println!("Streaming:");
    println!(
        "  Server Messages:    {} every {}ms ({})",
        config.streaming.message_count,
        config.streaming.interval_ms,
        config.streaming.payload_size
    );
    println!(
        "  Client Messages:    {} every {}ms",
        config.streaming.client_messages,
        config.streaming.send_interval.as_millis()
    );
    println!();
    println!("Batch:");
    println!("  Sizes:              {}", join(&config.batch.sizes));
    println!("  Strategy:           {}", config.batch.strategy);
    println!();
    println!("Validation:");
    println!(
        "  Expected Delays:    {} us",
        join(&config.validation.expected_delays_us)
    );
    println!(
        "  Batch Strategy:     {}",
        config.validation.batch_strategy
    );
}
