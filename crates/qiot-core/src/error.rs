//! Error types for qiot-core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed hex in {field}: {source}")]
    MalformedHex {
        field: &'static str,
        #[source]
        source: hex::FromHexError,
    },

    #[error("Invalid public key for {algorithm}: {reason}")]
    InvalidPublicKey { algorithm: String, reason: String },

    #[error("Invalid secret key for {algorithm}: {reason}")]
    InvalidSecretKey { algorithm: String, reason: String },

    #[error("Malformed ciphertext: expected {expected} bytes, got {actual}")]
    MalformedCiphertext { expected: usize, actual: usize },

    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    #[error("Encapsulation failed: {0}")]
    Encapsulation(String),

    #[error("Decapsulation failed: {0}")]
    Decapsulation(String),

    #[error("Cannot mask {0} bytes with an empty secret")]
    EmptySecret(usize),

    #[error("Unknown KEM algorithm: {0}")]
    UnknownAlgorithm(String),
}

impl Error {
    /// Hex decoding failure for a named request field
    pub fn malformed_hex(field: &'static str, source: hex::FromHexError) -> Self {
        Error::MalformedHex { field, source }
    }

    /// True for errors caused by the caller's input rather than the server
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::MalformedHex { .. }
                | Error::InvalidPublicKey { .. }
                | Error::MalformedCiphertext { .. }
                | Error::EmptySecret(_)
                | Error::UnknownAlgorithm(_)
        )
    }
}
