//! Device-side client: fetch key, encapsulate, mask, post

use std::time::Duration;

use reqwest::Client;

use qiot_core::{
    encapsulate, KemAlgorithm, MetricsResponse, PublicKeyResponse, SendDataRequest, SendDataResponse,
    StatusResponse,
};

use crate::error::{ClientError, Result};

/// Sends masked telemetry to an ingestion server
///
/// No retries: a transport failure or non-success response is returned to
/// the caller and the attempt is abandoned.
pub struct DeviceClient {
    http: Client,
    server_url: String,
    algorithm: KemAlgorithm,
    device_type: String,
}

impl DeviceClient {
    /// Create a new client with the given server URL and device type
    pub fn new(server_url: impl Into<String>, device_type: impl Into<String>) -> Self {
        Self::with_http(Client::new(), server_url, device_type, KemAlgorithm::default())
    }

    fn with_http(
        http: Client,
        server_url: impl Into<String>,
        device_type: impl Into<String>,
        algorithm: KemAlgorithm,
    ) -> Self {
        Self {
            http,
            server_url: server_url.into().trim_end_matches('/').to_string(),
            algorithm,
            device_type: device_type.into(),
        }
    }

    pub fn device_type(&self) -> &str {
        &self.device_type
    }

    pub fn algorithm(&self) -> KemAlgorithm {
        self.algorithm
    }

    /// Fetch and decode the server's public key
    pub async fn fetch_public_key(&self) -> Result<Vec<u8>> {
        let url = format!("{}/get_public_key", self.server_url);
        let resp = self.http.get(&url).send().await?;

        if !resp.status().is_success() {
            return Err(ClientError::Server {
                status: resp.status().as_u16(),
                message: resp.text().await.unwrap_or_default(),
            });
        }

        let key_resp: PublicKeyResponse = resp.json().await?;
        if let Some(server) = key_resp.algorithm {
            if server != self.algorithm {
                return Err(ClientError::AlgorithmMismatch {
                    client: self.algorithm,
                    server,
                });
            }
        }

        let public_key = hex::decode(&key_resp.public_key)?;
        tracing::debug!(bytes = public_key.len(), "Received server public key");
        Ok(public_key)
    }

    /// Encapsulate against `public_key` and mask `plaintext` with the fresh secret
    pub fn seal(&self, public_key: &[u8], plaintext: &[u8]) -> Result<SendDataRequest> {
        let exchange = encapsulate(self.algorithm, public_key)?;
        let (ciphertext, masked) = exchange.seal(plaintext);

        Ok(SendDataRequest {
            ciphertext: hex::encode(ciphertext),
            encrypted_message: hex::encode(masked),
            device_type: Some(self.device_type.clone()),
        })
    }

    /// Post a sealed message, returning the server's decoded text
    pub async fn post(&self, request: &SendDataRequest) -> Result<String> {
        let url = format!("{}/send_data", self.server_url);
        let resp = self.http.post(&url).json(request).send().await?;

        if !resp.status().is_success() {
            return Err(ClientError::Server {
                status: resp.status().as_u16(),
                message: resp.text().await.unwrap_or_default(),
            });
        }

        match resp.json::<SendDataResponse>().await? {
            SendDataResponse::Success { decrypted, .. } => Ok(decrypted),
            SendDataResponse::Error { message } => Err(ClientError::Rejected(message)),
        }
    }

    /// Seal and send one reading against an already fetched key
    pub async fn send_with_key(&self, public_key: &[u8], message: &str) -> Result<String> {
        let request = self.seal(public_key, message.as_bytes())?;
        self.post(&request).await
    }

    /// Full exchange: fetch key, seal, send
    pub async fn send_telemetry(&self, message: &str) -> Result<String> {
        let public_key = self.fetch_public_key().await?;
        self.send_with_key(&public_key, message).await
    }

    pub async fn status(&self) -> Result<StatusResponse> {
        let url = format!("{}/status", self.server_url);
        Ok(self.http.get(&url).send().await?.error_for_status()?.json().await?)
    }

    pub async fn metrics(&self) -> Result<MetricsResponse> {
        let url = format!("{}/api/metrics", self.server_url);
        Ok(self.http.get(&url).send().await?.error_for_status()?.json().await?)
    }
}

/// Builder for DeviceClient
pub struct ClientBuilder {
    server_url: String,
    device_type: String,
    algorithm: KemAlgorithm,
    timeout: Option<Duration>,
}

impl ClientBuilder {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            device_type: qiot_core::DEFAULT_DEVICE_TYPE.to_string(),
            algorithm: KemAlgorithm::default(),
            timeout: None,
        }
    }

    pub fn device_type(mut self, device_type: impl Into<String>) -> Self {
        self.device_type = device_type.into();
        self
    }

    pub fn algorithm(mut self, algorithm: KemAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<DeviceClient> {
        let mut http = Client::builder();
        if let Some(timeout) = self.timeout {
            http = http.timeout(timeout);
        }

        Ok(DeviceClient::with_http(
            http.build()?,
            self.server_url,
            self.device_type,
            self.algorithm,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qiot_core::KeyManager;

    #[test]
    fn test_server_url_trimmed() {
        let client = DeviceClient::new("http://localhost:5000/", "sensor1");
        assert_eq!(client.server_url, "http://localhost:5000");
        assert_eq!(client.device_type(), "sensor1");
    }

    #[test]
    fn test_seal_produces_decryptable_request() {
        let server = KeyManager::default().generate().unwrap();
        let client = DeviceClient::new("http://localhost:5000", "sensor3");

        let req = client.seal(server.public_key(), b"Blood Oxygen: 98% SpO2").unwrap();
        assert_eq!(req.device_type.as_deref(), Some("sensor3"));
        assert_eq!(req.encrypted_message.len(), 2 * 22);

        let ct = hex::decode(&req.ciphertext).unwrap();
        let masked = hex::decode(&req.encrypted_message).unwrap();
        let plain = server.decapsulate(&ct).unwrap().unmask(&masked);
        assert_eq!(plain, b"Blood Oxygen: 98% SpO2");
    }

    #[test]
    fn test_seal_is_fresh_per_message() {
        let server = KeyManager::default().generate().unwrap();
        let client = DeviceClient::new("http://localhost:5000", "sensor1");

        let a = client.seal(server.public_key(), b"same").unwrap();
        let b = client.seal(server.public_key(), b"same").unwrap();
        assert_ne!(a.ciphertext, b.ciphertext);
        assert_ne!(a.encrypted_message, b.encrypted_message);
    }

    #[test]
    fn test_builder_algorithm_mismatch_rejected_locally() {
        let server = KeyManager::new(KemAlgorithm::MlKem768).generate().unwrap();
        let client = ClientBuilder::new("http://localhost:5000")
            .algorithm(KemAlgorithm::MlKem512)
            .build()
            .unwrap();

        let err = client.seal(server.public_key(), b"x").unwrap_err();
        assert!(matches!(err, ClientError::Core(qiot_core::Error::InvalidPublicKey { .. })));
    }
}
