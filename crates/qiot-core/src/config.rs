//! Ingestion server configuration

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::constants::{DEFAULT_DEVICE_COUNT, DEFAULT_PORT};
use crate::kem::KemAlgorithm;

/// Protocol version constant
pub const PROTOCOL_VERSION: &str = "2.0.0";

/// Configuration for the ingestion server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    /// KEM parameter set for the process keypair
    #[serde(default)]
    pub algorithm: KemAlgorithm,
    /// Static device count reported by `/api/metrics`
    #[serde(default = "default_device_count")]
    pub device_count: u32,
    /// Mount the experimental `/rekey` endpoint
    #[serde(default)]
    pub experimental_rekey: bool,
    /// Install the Prometheus recorder and serve `/metrics`
    #[serde(default)]
    pub prometheus: bool,
    /// Protocol version
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_bind_addr() -> SocketAddr {
    ([127, 0, 0, 1], DEFAULT_PORT).into()
}

fn default_device_count() -> u32 {
    DEFAULT_DEVICE_COUNT
}

fn default_version() -> String {
    PROTOCOL_VERSION.to_string()
}

impl ServerConfig {
    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Listen on all interfaces at `port`
    pub fn with_port(mut self, port: u16) -> Self {
        self.bind_addr = ([0, 0, 0, 0], port).into();
        self
    }

    pub fn with_algorithm(mut self, algorithm: KemAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_device_count(mut self, device_count: u32) -> Self {
        self.device_count = device_count;
        self
    }

    pub fn with_experimental_rekey(mut self, enabled: bool) -> Self {
        self.experimental_rekey = enabled;
        self
    }

    pub fn with_prometheus(mut self, enabled: bool) -> Self {
        self.prometheus = enabled;
        self
    }

    /// Load configuration from a JSON file
    pub fn load(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            algorithm: KemAlgorithm::default(),
            device_count: DEFAULT_DEVICE_COUNT,
            experimental_rekey: false,
            prometheus: false,
            version: PROTOCOL_VERSION.to_string(),
        }
    }
}
