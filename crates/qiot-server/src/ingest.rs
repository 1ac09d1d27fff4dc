//! Per-message ingestion pipeline
//!
//! Receive -> hex decode -> decapsulate -> unmask -> lossy text decode ->
//! commit -> respond. Any failure aborts this message only; nothing here is
//! fatal to the process.
//!
//! There is no integrity check anywhere in this pipeline. A ciphertext that
//! was not produced against the server key decapsulates to an unrelated
//! secret and the message "succeeds" with garbled text.

use qiot_core::{decode_text, Error as CoreError};

use crate::error::Result;
use crate::state::ServerState;

/// Outcome of one successful ingestion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ingested {
    pub decoded_text: String,
    pub sequence_number: u64,
}

/// Decode, decapsulate and unmask one telemetry message, then commit it
pub fn ingest(
    state: &ServerState,
    device_id: &str,
    ciphertext_hex: &str,
    masked_payload_hex: &str,
) -> Result<Ingested> {
    let ciphertext =
        hex::decode(ciphertext_hex.trim()).map_err(|e| CoreError::malformed_hex("ciphertext", e))?;
    let masked = hex::decode(masked_payload_hex.trim())
        .map_err(|e| CoreError::malformed_hex("encrypted_message", e))?;

    let shared_secret = state.keypair().decapsulate(&ciphertext)?;
    let plaintext = shared_secret.unmask(&masked);
    let decoded_text = decode_text(&plaintext);

    let sequence_number = state.commit(device_id, &decoded_text);

    tracing::debug!(
        device_type = device_id,
        sequence = sequence_number,
        bytes = plaintext.len(),
        "Telemetry ingested"
    );

    Ok(Ingested {
        decoded_text,
        sequence_number,
    })
}
