//! [`KmsKeyProvider`]: [`KeyProvider`] backed by AWS KMS.

use async_trait::async_trait;
use aws_sdk_kms::{primitives::Blob, types::DataKeySpec};
use tracing::debug;

use super::{DataKey, GeneratedDataKey, KeyProvider};
use crate::aws::remote_error;
use crate::error::EnvelopeError;

/// Calls KMS `GenerateDataKey` / `Decrypt` under one master key.
#[derive(Clone, Debug)]
pub struct KmsKeyProvider {
    client: aws_sdk_kms::Client,
    key_id: String,
}

impl KmsKeyProvider {
    /// Create a provider for the master key `key_id` (ID, ARN, or alias).
    pub fn new(client: aws_sdk_kms::Client, key_id: impl Into<String>) -> Self {
        Self {
            client,
            key_id: key_id.into(),
        }
    }

    /// Configured master key identifier.
    pub fn key_id(&self) -> &str {
        &self.key_id
    }
}

#[async_trait]
impl KeyProvider for KmsKeyProvider {
    async fn generate_data_key(&self) -> Result<GeneratedDataKey, EnvelopeError> {
        let resp = self
            .client
            .generate_data_key()
            .key_id(&self.key_id)
            .key_spec(DataKeySpec::Aes256)
            .send()
            .await
            .map_err(|e| EnvelopeError::KeyGeneration(remote_error(e)))?;

        let plaintext = resp.plaintext().ok_or_else(|| {
            EnvelopeError::KeyGeneration("KMS response contained no plaintext key".into())
        })?;
        let wrapped = resp.ciphertext_blob().ok_or_else(|| {
            EnvelopeError::KeyGeneration("KMS response contained no wrapped key".into())
        })?;
        let key_id = resp.key_id().ok_or_else(|| {
            EnvelopeError::KeyGeneration("KMS response contained no key id".into())
        })?;

        let data_key = DataKey::from_slice(plaintext.as_ref())
            .map_err(|e| EnvelopeError::KeyGeneration(e.into()))?;

        debug!(key_id = %key_id, wrapped_len = wrapped.as_ref().len(), "generated data key");
        Ok(GeneratedDataKey {
            data_key,
            wrapped_key: wrapped.as_ref().to_vec(),
            key_id: key_id.to_owned(),
        })
    }

    async fn unwrap_data_key(&self, wrapped_key: &[u8]) -> Result<DataKey, EnvelopeError> {
        let resp = self
            .client
            .decrypt()
            .key_id(&self.key_id)
            .ciphertext_blob(Blob::new(wrapped_key))
            .send()
            .await
            .map_err(|e| EnvelopeError::KeyUnwrap(remote_error(e)))?;

        let plaintext = resp.plaintext().ok_or_else(|| {
            EnvelopeError::KeyUnwrap("KMS decrypt response contained no plaintext".into())
        })?;

        DataKey::from_slice(plaintext.as_ref()).map_err(|e| EnvelopeError::KeyUnwrap(e.into()))
    }
}
