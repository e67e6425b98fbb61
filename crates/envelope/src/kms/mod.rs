//! Key provider: per-object data keys generated and unwrapped by a remote KMS.
//!
//! # Security invariants
//!
//! - A [`DataKey`] lives only in process memory, is never cloned, and its
//!   bytes are zeroed when it is dropped.
//! - Every encryption requests a new data key. Nothing is cached across
//!   calls, so one leaked key exposes exactly one object.

pub mod aws;

pub use aws::KmsKeyProvider;

use async_trait::async_trait;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::{CipherError, KEY_LEN};
use crate::error::EnvelopeError;

/// Raw 256-bit data key. Zeroed on drop; redacted in `Debug` output.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DataKey([u8; KEY_LEN]);

impl DataKey {
    /// Copy key material out of `bytes`, which must be exactly [`KEY_LEN`] long.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::InvalidKeyLength`] for any other length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CipherError> {
        if bytes.len() != KEY_LEN {
            return Err(CipherError::InvalidKeyLength(bytes.len()));
        }
        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(bytes);
        Ok(Self(key))
    }

    /// Borrow the raw key bytes for a cipher call.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; KEY_LEN]> for DataKey {
    fn from(key: [u8; KEY_LEN]) -> Self {
        Self(key)
    }
}

impl std::fmt::Debug for DataKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material.
        f.write_str("DataKey([REDACTED])")
    }
}

/// Output of [`KeyProvider::generate_data_key`].
#[derive(Debug)]
pub struct GeneratedDataKey {
    /// Plaintext key for the cipher call. Drop it as soon as encryption ends.
    pub data_key: DataKey,
    /// KMS-encrypted form of `data_key`, safe to persist.
    pub wrapped_key: Vec<u8>,
    /// Identifier (usually the ARN) of the master key that wrapped it.
    pub key_id: String,
}

/// Generates and unwraps data keys under a single configured master key.
///
/// Implementations are stateless proxies to the key service; each call is one
/// round trip and nothing is cached.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyProvider: Send + Sync {
    /// Request a fresh 256-bit data key and its wrapped form.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::KeyGeneration`] if the remote call fails or
    /// its response is incomplete.
    async fn generate_data_key(&self) -> Result<GeneratedDataKey, EnvelopeError>;

    /// Recover the raw data key from its wrapped form.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::KeyUnwrap`] if the remote call fails or
    /// returns no usable plaintext.
    async fn unwrap_data_key(&self, wrapped_key: &[u8]) -> Result<DataKey, EnvelopeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_key_requires_exact_length() {
        assert!(DataKey::from_slice(&[7u8; KEY_LEN]).is_ok());
        assert_eq!(
            DataKey::from_slice(&[7u8; 16]).unwrap_err(),
            CipherError::InvalidKeyLength(16)
        );
    }

    #[test]
    fn data_key_redacted_in_debug() {
        let key = DataKey::from_slice(&[0xFF; KEY_LEN]).unwrap();
        let rendered = format!("{key:?}");
        assert!(rendered.contains("REDACTED"));
        assert!(!rendered.contains("255"));
    }

    #[test]
    fn zeroize_clears_key_material() {
        let mut key = DataKey::from_slice(&[0x42; KEY_LEN]).unwrap();
        key.zeroize();
        assert!(key.as_bytes().iter().all(|b| *b == 0));
    }
}
