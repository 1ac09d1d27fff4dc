//! Repeating-keystream XOR mask
//!
//! The keystream is the secret repeated end to end and truncated to the data
//! length. Masking is length-preserving and self-inverse. It carries no
//! integrity tag, so a secret must never key more than one message.

use crate::error::Error;
use crate::Result;

/// Build the keystream covering `len` bytes
pub fn keystream(secret: &[u8], len: usize) -> Result<Vec<u8>> {
    if secret.is_empty() && len > 0 {
        return Err(Error::EmptySecret(len));
    }
    Ok(secret.iter().copied().cycle().take(len).collect())
}

/// XOR `data` with the keystream derived from `secret`
///
/// Applying it twice with the same secret returns the original bytes.
pub fn mask(data: &[u8], secret: &[u8]) -> Result<Vec<u8>> {
    if secret.is_empty() && !data.is_empty() {
        return Err(Error::EmptySecret(data.len()));
    }
    Ok(apply_keystream(data, secret))
}

/// Caller guarantees `secret` is non-empty whenever `data` is
pub(crate) fn apply_keystream(data: &[u8], secret: &[u8]) -> Vec<u8> {
    data.iter()
        .zip(secret.iter().cycle())
        .map(|(d, k)| d ^ k)
        .collect()
}
