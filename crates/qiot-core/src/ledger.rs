//! Server-side ingestion ledger
//!
//! The ledger is an immutable snapshot of the counters plus the latest
//! ingestion record. Each successful ingestion produces the next snapshot via
//! [`Ledger::record`]; the server swaps snapshots atomically so the counter
//! bump and the record overwrite are observed together.

use serde::{Deserialize, Serialize};

/// Simulated operational signals derived from the message counter
///
/// `throughput` and `latency` are pure functions of `message_count`, so a
/// replayed sequence of ingestions reproduces the same trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsState {
    pub message_count: u64,
    pub throughput: f64,
    pub latency: u64,
    pub device_count: u32,
}

impl MetricsState {
    /// Startup state: zero messages
    pub fn new(device_count: u32) -> Self {
        Self::at(0, device_count)
    }

    /// State after exactly `message_count` successful ingestions
    pub fn at(message_count: u64, device_count: u32) -> Self {
        Self {
            message_count,
            throughput: throughput_for(message_count),
            latency: latency_for(message_count),
            device_count,
        }
    }

    /// Increment the counter, then recompute the derived signals
    pub fn advanced(&self) -> Self {
        Self::at(self.message_count + 1, self.device_count)
    }
}

fn throughput_for(message_count: u64) -> f64 {
    2.0 + (message_count % 10) as f64 / 10.0
}

fn latency_for(message_count: u64) -> u64 {
    10 + message_count % 15
}

/// The most recently decoded message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionRecord {
    pub device_id: String,
    pub decoded_text: String,
    pub sequence_number: u64,
}

/// Counters plus the single retained record ("last value wins")
#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    pub metrics: MetricsState,
    pub latest: Option<IngestionRecord>,
}

impl Ledger {
    pub fn new(device_count: u32) -> Self {
        Self {
            metrics: MetricsState::new(device_count),
            latest: None,
        }
    }

    /// Next snapshot after one successful ingestion
    ///
    /// The new record's sequence number equals the new message count.
    pub fn record(&self, device_id: &str, decoded_text: &str) -> Self {
        let metrics = self.metrics.advanced();
        let latest = IngestionRecord {
            device_id: device_id.to_string(),
            decoded_text: decoded_text.to_string(),
            sequence_number: metrics.message_count,
        };
        Self {
            metrics,
            latest: Some(latest),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_defaults() {
        let metrics = MetricsState::new(5);
        assert_eq!(metrics.message_count, 0);
        assert_eq!(metrics.throughput, 2.0);
        assert_eq!(metrics.latency, 10);
        assert_eq!(metrics.device_count, 5);
    }

    #[test]
    fn test_metrics_at_seven() {
        let metrics = MetricsState::at(7, 5);
        assert!((metrics.throughput - 2.7).abs() < 1e-9);
        assert_eq!(metrics.latency, 17);

        // Reproducible: same counter, same values
        assert_eq!(metrics, MetricsState::at(7, 5));
    }

    #[test]
    fn test_metrics_wrap_with_modulus() {
        assert!((MetricsState::at(10, 1).throughput - 2.0).abs() < 1e-9);
        assert!((MetricsState::at(19, 1).throughput - 2.9).abs() < 1e-9);
        assert_eq!(MetricsState::at(15, 1).latency, 10);
        assert_eq!(MetricsState::at(29, 1).latency, 24);
    }

    #[test]
    fn test_advance_matches_direct_computation() {
        let mut metrics = MetricsState::new(3);
        for _ in 0..7 {
            metrics = metrics.advanced();
        }
        assert_eq!(metrics, MetricsState::at(7, 3));
    }

    #[test]
    fn test_record_overwrites_latest() {
        let ledger = Ledger::new(5)
            .record("sensor1", "first")
            .record("sensor2", "second");

        assert_eq!(ledger.metrics.message_count, 2);
        let latest = ledger.latest.unwrap();
        assert_eq!(latest.device_id, "sensor2");
        assert_eq!(latest.decoded_text, "second");
        assert_eq!(latest.sequence_number, 2);
    }
}
