//! Device client error types

use qiot_core::KemAlgorithm;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Protocol error: {0}")]
    Core(#[from] qiot_core::Error),

    #[error("Invalid public key encoding: {0}")]
    PublicKeyEncoding(#[from] hex::FromHexError),

    #[error("Server returned {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Server rejected message: {0}")]
    Rejected(String),

    #[error("Algorithm mismatch: device uses {client}, server publishes {server}")]
    AlgorithmMismatch {
        client: KemAlgorithm,
        server: KemAlgorithm,
    },

    #[error("Unknown device type: {0}")]
    UnknownDeviceType(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;
