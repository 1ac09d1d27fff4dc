//! Prometheus metrics for the ingestion server
//!
//! Only outcome labels, never device payloads or key material. These are
//! measured values, separate from the synthetic counters in `/api/metrics`.

use metrics::{counter, gauge, histogram};
use std::time::Duration;

use crate::error::{Result, ServerError};

pub const OUTCOME_OK: &str = "ok";
pub const OUTCOME_CLIENT_ERROR: &str = "client_error";
pub const OUTCOME_SERVER_ERROR: &str = "server_error";

pub fn record_ingest(outcome: &str, duration: Duration) {
    counter!("qiot_ingest_total", "outcome" => outcome.to_string()).increment(1);
    histogram!("qiot_ingest_duration_seconds", "outcome" => outcome.to_string())
        .record(duration.as_secs_f64());
}

pub fn record_ingest_start() {
    gauge!("qiot_ingest_in_flight").increment(1.0);
}

pub fn record_ingest_end() {
    gauge!("qiot_ingest_in_flight").decrement(1.0);
}

/// Bumped once per committed reading.
pub fn record_commit() {
    counter!("qiot_ingest_committed_total").increment(1);
}

pub fn record_public_key_request() {
    counter!("qiot_public_key_requests_total").increment(1);
}

pub fn record_rekey(status: &str) {
    counter!("qiot_rekey_total", "status" => status.to_string()).increment(1);
}

pub fn init_prometheus_recorder() -> Result<metrics_exporter_prometheus::PrometheusHandle> {
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    builder
        .install_recorder()
        .map_err(|e| ServerError::Recorder(e.to_string()))
}
