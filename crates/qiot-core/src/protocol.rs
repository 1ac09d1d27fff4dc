//! JSON wire types for the ingestion HTTP surface
//!
//! Binary fields travel hex-encoded. `device_type` and `algorithm` were added
//! after the first protocol revision and stay optional so older devices keep
//! working.

use serde::{Deserialize, Serialize};

use crate::kem::KemAlgorithm;
use crate::ledger::{IngestionRecord, MetricsState};

/// Reported when a device omits `device_type`
pub const DEFAULT_DEVICE_TYPE: &str = "unknown";

/// `GET /get_public_key` and `POST /rekey`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicKeyResponse {
    pub public_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<KemAlgorithm>,
}

/// `POST /send_data` body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendDataRequest {
    /// KEM ciphertext (hex)
    pub ciphertext: String,
    /// Masked payload (hex)
    pub encrypted_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
}

impl SendDataRequest {
    pub fn device_type_or_default(&self) -> &str {
        self.device_type.as_deref().unwrap_or(DEFAULT_DEVICE_TYPE)
    }
}

/// `POST /send_data` response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SendDataResponse {
    Success { decrypted: String, device_type: String },
    Error { message: String },
}

impl SendDataResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, SendDataResponse::Success { .. })
    }
}

/// `GET /status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub quantum_layer: String,
}

impl StatusResponse {
    pub fn running() -> Self {
        Self {
            status: "Server running".to_string(),
            quantum_layer: "active".to_string(),
        }
    }
}

/// `GET /api/metrics`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsResponse {
    pub throughput: f64,
    pub latency: u64,
    pub device_count: u32,
    pub message_count: u64,
}

impl From<&MetricsState> for MetricsResponse {
    fn from(m: &MetricsState) -> Self {
        Self {
            throughput: m.throughput,
            latency: m.latency,
            device_count: m.device_count,
            message_count: m.message_count,
        }
    }
}

/// `GET /api/latest`: `null` until the first successful ingestion
pub type LatestResponse = Option<IngestionRecord>;

/// Best-effort text decode of unmasked bytes
///
/// Invalid UTF-8 sequences become U+FFFD; this never fails.
pub fn decode_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
