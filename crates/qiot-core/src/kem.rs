//! ML-KEM key management, encapsulation and decapsulation
//!
//! Thin wrapper over `fips203` that works on byte slices so keys and
//! ciphertexts can travel hex-encoded over JSON. Every operation is
//! parameterised by [`KemAlgorithm`]; lengths are checked before any lattice
//! arithmetic runs.

use std::fmt;
use std::str::FromStr;

use fips203::traits::{Decaps, Encaps, KeyGen, SerDes};
use fips203::{ml_kem_1024, ml_kem_512, ml_kem_768};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::constants::SHARED_SECRET_LEN;
use crate::error::Error;
use crate::mask::apply_keystream;
use crate::Result;

macro_rules! keygen {
    ($kem:ident) => {{
        let (ek, dk) = $kem::KG::try_keygen_with_rng(&mut OsRng)
            .map_err(|e| Error::KeyGeneration(e.to_string()))?;
        (ek.into_bytes().to_vec(), dk.into_bytes().to_vec())
    }};
}

macro_rules! encaps {
    ($kem:ident, $alg:expr, $pk:expr) => {{
        let bytes: [u8; $kem::EK_LEN] = $pk.try_into().map_err(|_| Error::InvalidPublicKey {
            algorithm: $alg.to_string(),
            reason: format!("expected {} bytes", $kem::EK_LEN),
        })?;
        let ek = $kem::EncapsKey::try_from_bytes(bytes).map_err(|e| Error::InvalidPublicKey {
            algorithm: $alg.to_string(),
            reason: e.to_string(),
        })?;
        let (ss, ct) = ek
            .try_encaps_with_rng(&mut OsRng)
            .map_err(|e| Error::Encapsulation(e.to_string()))?;
        (ct.into_bytes().to_vec(), ss.into_bytes())
    }};
}

macro_rules! decaps {
    ($kem:ident, $alg:expr, $sk:expr, $ct:expr) => {{
        let mut sk_bytes: [u8; $kem::DK_LEN] = $sk.try_into().map_err(|_| Error::InvalidSecretKey {
            algorithm: $alg.to_string(),
            reason: format!("expected {} bytes", $kem::DK_LEN),
        })?;
        let dk = $kem::DecapsKey::try_from_bytes(sk_bytes);
        sk_bytes.zeroize();
        let dk = dk.map_err(|e| Error::InvalidSecretKey {
            algorithm: $alg.to_string(),
            reason: e.to_string(),
        })?;

        let ct_bytes: [u8; $kem::CT_LEN] = $ct.try_into().map_err(|_| Error::MalformedCiphertext {
            expected: $kem::CT_LEN,
            actual: $ct.len(),
        })?;
        let ct = $kem::CipherText::try_from_bytes(ct_bytes)
            .map_err(|e| Error::Decapsulation(e.to_string()))?;
        dk.try_decaps(&ct)
            .map_err(|e| Error::Decapsulation(e.to_string()))?
            .into_bytes()
    }};
}

/// ML-KEM parameter set
///
/// The reference deployment used Kyber512, which is what `MlKem512` standardises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KemAlgorithm {
    #[serde(rename = "ML-KEM-512")]
    MlKem512,
    #[serde(rename = "ML-KEM-768")]
    MlKem768,
    #[serde(rename = "ML-KEM-1024")]
    MlKem1024,
}

impl KemAlgorithm {
    /// Encapsulation (public) key length in bytes
    pub fn public_key_len(&self) -> usize {
        match self {
            KemAlgorithm::MlKem512 => ml_kem_512::EK_LEN,
            KemAlgorithm::MlKem768 => ml_kem_768::EK_LEN,
            KemAlgorithm::MlKem1024 => ml_kem_1024::EK_LEN,
        }
    }

    /// Decapsulation (secret) key length in bytes
    pub fn secret_key_len(&self) -> usize {
        match self {
            KemAlgorithm::MlKem512 => ml_kem_512::DK_LEN,
            KemAlgorithm::MlKem768 => ml_kem_768::DK_LEN,
            KemAlgorithm::MlKem1024 => ml_kem_1024::DK_LEN,
        }
    }

    /// Ciphertext length in bytes
    pub fn ciphertext_len(&self) -> usize {
        match self {
            KemAlgorithm::MlKem512 => ml_kem_512::CT_LEN,
            KemAlgorithm::MlKem768 => ml_kem_768::CT_LEN,
            KemAlgorithm::MlKem1024 => ml_kem_1024::CT_LEN,
        }
    }

    /// Shared secret length in bytes
    pub fn shared_secret_len(&self) -> usize {
        SHARED_SECRET_LEN
    }
}

impl fmt::Display for KemAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KemAlgorithm::MlKem512 => write!(f, "ML-KEM-512"),
            KemAlgorithm::MlKem768 => write!(f, "ML-KEM-768"),
            KemAlgorithm::MlKem1024 => write!(f, "ML-KEM-1024"),
        }
    }
}

impl FromStr for KemAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "mlkem512" | "kyber512" | "512" => Ok(KemAlgorithm::MlKem512),
            "mlkem768" | "kyber768" | "768" => Ok(KemAlgorithm::MlKem768),
            "mlkem1024" | "kyber1024" | "1024" => Ok(KemAlgorithm::MlKem1024),
            _ => Err(Error::UnknownAlgorithm(s.to_string())),
        }
    }
}

impl Default for KemAlgorithm {
    fn default() -> Self {
        KemAlgorithm::MlKem512
    }
}

/// Server decapsulation key bytes, wiped on drop
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecretKey(Vec<u8>);

impl SecretKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey([REDACTED; {}])", self.0.len())
    }
}

/// 32-byte KEM shared secret
///
/// Not `Clone`: [`SharedSecret::unmask`] and [`Exchange::seal`]
/// consume it, so a secret cannot key two messages.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret([u8; SHARED_SECRET_LEN]);

impl SharedSecret {
    pub fn as_bytes(&self) -> &[u8; SHARED_SECRET_LEN] {
        &self.0
    }

    /// Recover plaintext bytes from a masked payload, consuming the secret
    pub fn unmask(self, masked: &[u8]) -> Vec<u8> {
        apply_keystream(masked, &self.0)
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedSecret([REDACTED])")
    }
}

/// Result of one encapsulation: the ciphertext to send and the secret it carries
#[derive(Debug)]
pub struct Exchange {
    pub ciphertext: Vec<u8>,
    shared_secret: SharedSecret,
}

impl Exchange {
    /// Mask `plaintext` with this exchange's secret, returning `(ciphertext, masked_payload)`
    pub fn seal(self, plaintext: &[u8]) -> (Vec<u8>, Vec<u8>) {
        let (ciphertext, shared_secret) = self.into_parts();
        let masked = apply_keystream(plaintext, shared_secret.as_bytes());
        (ciphertext, masked)
    }

    pub fn into_parts(self) -> (Vec<u8>, SharedSecret) {
        (self.ciphertext, self.shared_secret)
    }

    pub fn shared_secret(&self) -> &SharedSecret {
        &self.shared_secret
    }
}

/// The server's long-lived keypair
///
/// `secret_key` has no serde impl and is only read by [`ServerKeyPair::decapsulate`].
#[derive(Debug)]
pub struct ServerKeyPair {
    algorithm: KemAlgorithm,
    public_key: Vec<u8>,
    secret_key: SecretKey,
}

impl ServerKeyPair {
    pub fn algorithm(&self) -> KemAlgorithm {
        self.algorithm
    }

    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(&self.public_key)
    }

    /// Recover the shared secret carried by `ciphertext`
    pub fn decapsulate(&self, ciphertext: &[u8]) -> Result<SharedSecret> {
        decapsulate(self.algorithm, &self.secret_key, ciphertext)
    }
}

/// Generates server keypairs for a fixed parameter set
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyManager {
    algorithm: KemAlgorithm,
}

impl KeyManager {
    pub fn new(algorithm: KemAlgorithm) -> Self {
        Self { algorithm }
    }

    pub fn algorithm(&self) -> KemAlgorithm {
        self.algorithm
    }

    /// Generate the process keypair
    pub fn generate(&self) -> Result<ServerKeyPair> {
        let (public_key, secret_key) = match self.algorithm {
            KemAlgorithm::MlKem512 => keygen!(ml_kem_512),
            KemAlgorithm::MlKem768 => keygen!(ml_kem_768),
            KemAlgorithm::MlKem1024 => keygen!(ml_kem_1024),
        };

        Ok(ServerKeyPair {
            algorithm: self.algorithm,
            public_key,
            secret_key: SecretKey(secret_key),
        })
    }

    /// Generate a fresh keypair unrelated to any existing one
    ///
    /// Nothing is invalidated: holders of the original public key keep
    /// working against the original secret key.
    pub fn rekey(&self) -> Result<ServerKeyPair> {
        self.generate()
    }
}

/// Derive a fresh shared secret against `peer_public_key`
///
/// Every call draws new randomness, so repeated calls yield distinct ciphertexts.
pub fn encapsulate(algorithm: KemAlgorithm, peer_public_key: &[u8]) -> Result<Exchange> {
    let expected = algorithm.public_key_len();
    if peer_public_key.len() != expected {
        return Err(Error::InvalidPublicKey {
            algorithm: algorithm.to_string(),
            reason: format!("expected {} bytes, got {}", expected, peer_public_key.len()),
        });
    }

    let (ciphertext, shared_secret) = match algorithm {
        KemAlgorithm::MlKem512 => encaps!(ml_kem_512, algorithm, peer_public_key),
        KemAlgorithm::MlKem768 => encaps!(ml_kem_768, algorithm, peer_public_key),
        KemAlgorithm::MlKem1024 => encaps!(ml_kem_1024, algorithm, peer_public_key),
    };

    Ok(Exchange {
        ciphertext,
        shared_secret: SharedSecret(shared_secret),
    })
}

/// Recover the shared secret from `ciphertext`
///
/// ML-KEM uses implicit rejection: a well-formed ciphertext that was not
/// produced against this key still yields 32 pseudorandom bytes. Only length
/// and encoding problems are reported.
pub fn decapsulate(algorithm: KemAlgorithm, secret_key: &SecretKey, ciphertext: &[u8]) -> Result<SharedSecret> {
    let expected = algorithm.ciphertext_len();
    if ciphertext.len() != expected {
        return Err(Error::MalformedCiphertext {
            expected,
            actual: ciphertext.len(),
        });
    }
    if secret_key.len() != algorithm.secret_key_len() {
        return Err(Error::InvalidSecretKey {
            algorithm: algorithm.to_string(),
            reason: format!("expected {} bytes, got {}", algorithm.secret_key_len(), secret_key.len()),
        });
    }

    let shared_secret = match algorithm {
        KemAlgorithm::MlKem512 => decaps!(ml_kem_512, algorithm, secret_key.as_bytes(), ciphertext),
        KemAlgorithm::MlKem768 => decaps!(ml_kem_768, algorithm, secret_key.as_bytes(), ciphertext),
        KemAlgorithm::MlKem1024 => decaps!(ml_kem_1024, algorithm, secret_key.as_bytes(), ciphertext),
    };

    Ok(SharedSecret(shared_secret))
}
