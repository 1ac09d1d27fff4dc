//! Server state: process keypair plus the ingestion ledger

use std::sync::Arc;

use arc_swap::ArcSwap;
use metrics_exporter_prometheus::PrometheusHandle;
use qiot_core::{IngestionRecord, KeyManager, Ledger, MetricsState, ServerConfig, ServerKeyPair};

use crate::error::Result;

/// Shared server state
///
/// The keypair is generated once in [`ServerState::new`] and never mutated, so
/// request handlers read it without locking. The ledger is an immutable
/// snapshot replaced by compare-and-swap on every successful ingestion.
pub struct ServerState {
    keypair: ServerKeyPair,
    key_manager: KeyManager,
    ledger: ArcSwap<Ledger>,
    prometheus: Option<PrometheusHandle>,
    /// Configuration
    pub config: ServerConfig,
}

impl ServerState {
    /// Generate the process keypair and start from an empty ledger
    pub fn new(config: ServerConfig) -> Result<Self> {
        let key_manager = KeyManager::new(config.algorithm);
        let keypair = key_manager.generate()?;

        tracing::info!(
            algorithm = %keypair.algorithm(),
            public_key_bytes = keypair.public_key().len(),
            "Server keypair generated"
        );

        Ok(Self {
            keypair,
            key_manager,
            ledger: ArcSwap::from_pointee(Ledger::new(config.device_count)),
            prometheus: None,
            config,
        })
    }

    /// Attach a Prometheus handle so `/metrics` can render it
    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }

    pub fn keypair(&self) -> &ServerKeyPair {
        &self.keypair
    }

    pub fn public_key_hex(&self) -> String {
        self.keypair.public_key_hex()
    }

    pub fn prometheus(&self) -> Option<&PrometheusHandle> {
        self.prometheus.as_ref()
    }

    /// Fresh keypair that is NOT installed; the process keypair is unchanged
    pub fn rekey(&self) -> Result<ServerKeyPair> {
        Ok(self.key_manager.rekey()?)
    }

    /// Current ledger snapshot
    pub fn snapshot(&self) -> Arc<Ledger> {
        self.ledger.load_full()
    }

    pub fn metrics(&self) -> MetricsState {
        self.ledger.load().metrics.clone()
    }

    pub fn latest(&self) -> Option<IngestionRecord> {
        self.ledger.load().latest.clone()
    }

    /// Advance the counters and replace the latest record as one unit
    ///
    /// Concurrent commits retry until their swap lands, so each call bumps
    /// `message_count` by exactly one. Returns the record's sequence number.
    pub fn commit(&self, device_id: &str, decoded_text: &str) -> u64 {
        let previous = self.ledger.rcu(|current| current.record(device_id, decoded_text));
        previous.metrics.message_count + 1
    }
}

/// Shared server state type
pub type SharedState = Arc<ServerState>;

/// Create shared state from config
pub fn create_shared_state(config: ServerConfig) -> Result<SharedState> {
    Ok(Arc::new(ServerState::new(config)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_starts_empty() {
        let state = ServerState::new(ServerConfig::default().with_device_count(9)).unwrap();
        let metrics = state.metrics();
        assert_eq!(metrics.message_count, 0);
        assert_eq!(metrics.device_count, 9);
        assert!(state.latest().is_none());
        assert_eq!(
            state.keypair().public_key().len(),
            state.config.algorithm.public_key_len()
        );
    }

    #[test]
    fn test_commit_returns_sequence_and_replaces_record() {
        let state = ServerState::new(ServerConfig::default()).unwrap();
        assert_eq!(state.commit("sensor1", "a"), 1);
        assert_eq!(state.commit("sensor2", "b"), 2);

        let latest = state.latest().unwrap();
        assert_eq!(latest.device_id, "sensor2");
        assert_eq!(latest.sequence_number, 2);
        assert_eq!(state.metrics().message_count, 2);
    }

    #[test]
    fn test_rekey_leaves_process_key_untouched() {
        let state = ServerState::new(ServerConfig::default()).unwrap();
        let before = state.public_key_hex();
        let fresh = state.rekey().unwrap();

        assert_ne!(fresh.public_key_hex(), before);
        assert_eq!(state.public_key_hex(), before);
    }

    #[test]
    fn test_concurrent_commits_lose_nothing() {
        let state = Arc::new(ServerState::new(ServerConfig::default()).unwrap());
        let threads: Vec<_> = (0..8)
            .map(|t| {
                let state = state.clone();
                std::thread::spawn(move || {
                    for i in 0..250 {
                        state.commit(&format!("sensor{t}"), &format!("reading {i}"));
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        let snapshot = state.snapshot();
        assert_eq!(snapshot.metrics.message_count, 2000);
        assert_eq!(snapshot.latest.as_ref().unwrap().sequence_number, 2000);
    }
}
