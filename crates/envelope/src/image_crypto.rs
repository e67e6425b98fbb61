//! [`ImageCrypto`]: encrypt-and-store and retrieve-and-decrypt workflows.
//!
//! # Encrypt and store
//!
//! ```text
//! generate_data_key ─► fresh IV ─► encrypt ─► serialize record ─► put
//! ```
//!
//! # Retrieve and decrypt
//!
//! ```text
//! get ─► try_parse record ─┬─ absent  ─► stored bytes as-is
//!                          └─ present ─► unwrap_data_key ─► decrypt
//! ```
//!
//! Any failing step aborts the operation. Nothing is retried here and
//! nothing is written unless every earlier step succeeded.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info, instrument, warn};

use crate::aws::AwsClients;
use crate::crypto::{self, Algorithm};
use crate::error::{EncryptAndStoreError, EnvelopeError, RetrieveAndDecryptError};
use crate::kms::{GeneratedDataKey, KeyProvider, KmsKeyProvider};
use crate::metadata::{self, Envelope, METADATA_FIELD};
use crate::settings::EnvelopeSettings;
use crate::store::{ObjectMetadata, ObjectStore, S3ObjectStore, OCTET_STREAM};

/// Envelope-encryption front end for one bucket and one master key.
///
/// Cheap to clone and safe to call concurrently: the only state is the fixed
/// configuration and the stateless collaborators.
#[derive(Clone)]
pub struct ImageCrypto {
    keys: Arc<dyn KeyProvider>,
    store: Arc<dyn ObjectStore>,
    algorithm: Algorithm,
}

impl ImageCrypto {
    /// Compose an instance from explicit collaborators.
    pub fn new(
        keys: Arc<dyn KeyProvider>,
        store: Arc<dyn ObjectStore>,
        algorithm: Algorithm,
    ) -> Self {
        Self {
            keys,
            store,
            algorithm,
        }
    }

    /// Build an instance talking to AWS KMS and S3 as described by `settings`.
    pub async fn connect(settings: &EnvelopeSettings) -> Self {
        let aws = AwsClients::init(settings).await;
        let keys = KmsKeyProvider::new(aws.kms, settings.kms_key_id.clone());
        let store = S3ObjectStore::new(aws.s3, settings.bucket.clone());
        info!(
            bucket = store.bucket(),
            key_id = keys.key_id(),
            algorithm = %settings.algorithm,
            "envelope encryption ready"
        );
        Self::new(Arc::new(keys), Arc::new(store), settings.algorithm)
    }

    /// Algorithm applied to new encryptions.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Encrypt `plaintext` under a fresh data key and store it at `key`.
    ///
    /// Returns `key` on success.
    ///
    /// # Errors
    ///
    /// Returns [`EncryptAndStoreError`] wrapping the failed step. When key
    /// generation or encryption fails, the store is never called.
    #[instrument(skip_all, fields(key = %key, bytes = plaintext.len(), algorithm = %self.algorithm))]
    pub async fn encrypt_and_store(
        &self,
        plaintext: &[u8],
        key: &str,
    ) -> Result<String, EncryptAndStoreError> {
        match self.try_encrypt_and_store(plaintext, key).await {
            Ok(()) => {
                debug!("object encrypted and stored");
                Ok(key.to_owned())
            }
            Err(e) => {
                warn!(error = %e, "encrypt and store failed");
                Err(e.into())
            }
        }
    }

    async fn try_encrypt_and_store(&self, plaintext: &[u8], key: &str) -> Result<(), EnvelopeError> {
        let GeneratedDataKey {
            data_key,
            wrapped_key,
            key_id,
        } = self.keys.generate_data_key().await?;

        let iv = self.algorithm.generate_iv();
        let ciphertext = crypto::encrypt(plaintext, data_key.as_bytes(), &iv, self.algorithm)?;
        drop(data_key);

        let record = Envelope {
            wrapped_key,
            iv,
            algorithm: self.algorithm.identifier().to_owned(),
            key_id,
        };
        let metadata = ObjectMetadata::from([(METADATA_FIELD.to_owned(), record.serialize()?)]);

        self.store
            .put(key, Bytes::from(ciphertext), OCTET_STREAM, metadata)
            .await
    }

    /// Fetch the object at `key`, decrypting it if it carries an encryption
    /// record.
    ///
    /// Objects without the record are returned byte-for-byte and cost no KMS
    /// call. The stored algorithm identifier, not [`ImageCrypto::algorithm`],
    /// selects the cipher.
    ///
    /// # Errors
    ///
    /// Returns [`RetrieveAndDecryptError`] wrapping the failed step; use
    /// [`RetrieveAndDecryptError::is_not_found`] to tell a missing object
    /// apart from a decryption failure. A present but corrupt record is
    /// always an error.
    #[instrument(skip_all, fields(key = %key))]
    pub async fn retrieve_and_decrypt(&self, key: &str) -> Result<Bytes, RetrieveAndDecryptError> {
        self.try_retrieve_and_decrypt(key).await.map_err(|e| {
            if !matches!(e, EnvelopeError::ObjectNotFound(_)) {
                warn!(error = %e, "retrieve and decrypt failed");
            }
            e.into()
        })
    }

    async fn try_retrieve_and_decrypt(&self, key: &str) -> Result<Bytes, EnvelopeError> {
        let object = self.store.get(key).await?;

        // A stripped field is indistinguishable from a pre-encryption object.
        let Some(envelope) = metadata::try_parse(&object.metadata)? else {
            debug!(bytes = object.body.len(), "no encryption record; returning stored bytes");
            return Ok(object.body);
        };

        let algorithm: Algorithm = envelope.algorithm.parse()?;
        let data_key = self.keys.unwrap_data_key(&envelope.wrapped_key).await?;
        let plaintext = crypto::decrypt(&object.body, data_key.as_bytes(), &envelope.iv, algorithm)?;

        debug!(%algorithm, key_id = %envelope.key_id, bytes = plaintext.len(), "object decrypted");
        Ok(Bytes::from(plaintext))
    }
}

impl std::fmt::Debug for ImageCrypto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageCrypto")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}
