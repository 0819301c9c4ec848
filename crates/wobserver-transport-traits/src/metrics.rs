//! Transport metrics types.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// A serializable snapshot of a transport's counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransportMetrics {
    /// Total number of bytes sent.
    pub bytes_sent: u64,

    /// Total number of bytes received.
    pub bytes_received: u64,

    /// Total number of commands sent.
    pub messages_sent: u64,

    /// Total number of envelopes received.
    pub messages_received: u64,

    /// Total number of connection attempts (including reconnection attempts).
    pub connections: u64,

    /// Total number of failed connection attempts.
    pub failed_connections: u64,

    /// Number of times connectivity came back after a loss.
    pub reconnections: u64,

    /// Envelopes dropped because no caller was waiting for them.
    pub unmatched_envelopes: u64,

    /// Failed request/response exchanges (polling transport).
    pub failed_exchanges: u64,

    /// The average exchange latency, in milliseconds.
    pub average_latency_ms: f64,
}

/// A lock-free, atomic structure for metrics updates.
#[derive(Debug, Default)]
pub struct AtomicMetrics {
    /// Total bytes sent (atomic counter).
    pub bytes_sent: AtomicU64,

    /// Total bytes received (atomic counter).
    pub bytes_received: AtomicU64,

    /// Total commands sent (atomic counter).
    pub messages_sent: AtomicU64,

    /// Total envelopes received (atomic counter).
    pub messages_received: AtomicU64,

    /// Connection attempts (atomic counter).
    pub connections: AtomicU64,

    /// Failed connection attempts (atomic counter).
    pub failed_connections: AtomicU64,

    /// Recoveries after a connectivity loss (atomic counter).
    pub reconnections: AtomicU64,

    /// Envelopes nobody waited for (atomic counter).
    pub unmatched_envelopes: AtomicU64,

    /// Failed exchanges (atomic counter).
    pub failed_exchanges: AtomicU64,

    /// The average latency, stored as an exponential moving average in microseconds.
    avg_latency_us: AtomicU64,
}

impl AtomicMetrics {
    /// Creates a new `AtomicMetrics` instance with all counters initialized to zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one outgoing command of `bytes` length.
    pub fn record_sent(&self, bytes: usize) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Records one incoming envelope of `bytes` length.
    pub fn record_received(&self, bytes: usize) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Increments a counter by one.
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Updates the average latency using an exponential moving average (EMA).
    pub fn update_latency_us(&self, latency_us: u64) {
        let current = self.avg_latency_us.load(Ordering::Relaxed);
        let new_avg = if current == 0 {
            latency_us
        } else {
            // EMA with alpha = 0.1, saturating so multi-second latencies cannot overflow
            current.saturating_mul(9).saturating_add(latency_us) / 10
        };
        self.avg_latency_us.store(new_avg, Ordering::Relaxed);
    }

    /// Creates a serializable `TransportMetrics` snapshot from the current atomic values.
    pub fn snapshot(&self) -> TransportMetrics {
        TransportMetrics {
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            connections: self.connections.load(Ordering::Relaxed),
            failed_connections: self.failed_connections.load(Ordering::Relaxed),
            reconnections: self.reconnections.load(Ordering::Relaxed),
            unmatched_envelopes: self.unmatched_envelopes.load(Ordering::Relaxed),
            failed_exchanges: self.failed_exchanges.load(Ordering::Relaxed),
            average_latency_ms: (self.avg_latency_us.load(Ordering::Relaxed) as f64) / 1000.0,
        }
    }
}
