//! qiot-core: Key exchange and masking primitives for post-quantum IoT telemetry
//!
//! This crate defines the protocol shared by devices and the ingestion server:
//! - KEM: ML-KEM (FIPS 203) key generation, encapsulation, decapsulation
//! - Mask: repeating-keystream XOR over the payload, keyed by the shared secret
//! - Ledger: the server-side counters and the single retained ingestion record
//! - Protocol: JSON wire types for the HTTP surface
//!
//! # Threat Model
//!
//! ## Adversary Model
//!
//! - **Adversary**: passive network observer, possibly quantum-capable
//! - **Security goal**: payload confidentiality per message (MLWE hardness)
//! - **Non-goals**: integrity, authenticity, replay protection, device identity
//!
//! ## What an Observer Learns
//!
//! | Information | Observer Knowledge |
//! |-------------|--------------------|
//! | Server public key | **YES** - published |
//! | Payload length | **YES** - masking is length-preserving |
//! | Device type label | **YES** - sent in the clear |
//! | Payload content | NO - masked with a single-use KEM secret |
//!
//! ## Known Gap
//!
//! There is no integrity check. A tampered or foreign ciphertext still
//! decapsulates to 32 bytes (implicit rejection) and the server reports
//! success with garbled text. Callers must not treat `status: "success"` as
//! proof of origin.

mod config;
mod error;
mod kem;
mod ledger;
mod mask;
mod protocol;

pub use config::{ServerConfig, PROTOCOL_VERSION};
pub use error::Error;
pub use kem::{decapsulate, encapsulate, Exchange, KemAlgorithm, KeyManager, SecretKey, ServerKeyPair, SharedSecret};
pub use ledger::{IngestionRecord, Ledger, MetricsState};
pub use mask::{keystream, mask};
pub use protocol::{
    decode_text, LatestResponse, MetricsResponse, PublicKeyResponse, SendDataRequest, SendDataResponse,
    StatusResponse, DEFAULT_DEVICE_TYPE,
};

pub type Result<T> = std::result::Result<T, Error>;

/// Protocol constants
pub mod constants {
    /// Shared secret length in bytes (identical for every ML-KEM parameter set)
    pub const SHARED_SECRET_LEN: usize = 32;

    /// Default number of devices reported by the metrics endpoint
    pub const DEFAULT_DEVICE_COUNT: u32 = 5;

    /// Default server port
    pub const DEFAULT_PORT: u16 = 5000;
}
