// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! OS-level network byte counters.

use std::sync::atomic::{AtomicU64, Ordering};

use sysinfo::Networks;

/// Source of cumulative transmitted-byte counts.
pub trait NetworkCounters: Send + Sync {
    /// Bytes transmitted across all interfaces since the counters started.
    fn bytes_sent(&self) -> u64;
}

/// Counters read from the operating system through `sysinfo`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SysinfoNetworkCounters;

impl NetworkCounters for SysinfoNetworkCounters {
    fn bytes_sent(&self) -> u64 {
        let networks = Networks::new_with_refreshed_list();
        let mut total = 0u64;
        for (_interface, data) in &networks {
            total = total.saturating_add(data.total_transmitted());
        }
        total
    }
}

/// Counter fed by the caller, for tests and dry runs.
#[derive(Debug, Default)]
pub struct ManualNetworkCounters {
    sent: AtomicU64,
}

impl ManualNetworkCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, bytes: u64) {
        self.sent.fetch_add(bytes, Ordering::SeqCst);
    }
}

impl NetworkCounters for ManualNetworkCounters {
    fn bytes_sent(&self) -> u64 {
        self.sent.load(Ordering::SeqCst)
    }
}
