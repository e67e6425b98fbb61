//! Error taxonomy for the envelope-encryption core.
//!
//! Sub-step failures are reported as [`EnvelopeError`]. The two public
//! orchestrator operations wrap whatever sub-step failed in exactly one
//! top-level type each ([`EncryptAndStoreError`], [`RetrieveAndDecryptError`])
//! so callers match on a single error per operation and still reach the root
//! cause through [`std::error::Error::source`].

use thiserror::Error;

use crate::crypto::CipherError;

/// Boxed cause preserved inside [`EnvelopeError`] variants.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure of a single envelope sub-step.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// KMS failed to produce a usable data key.
    #[error("data key generation failed: {0}")]
    KeyGeneration(#[source] BoxError),

    /// KMS failed to unwrap a previously wrapped data key.
    #[error("data key unwrap failed: {0}")]
    KeyUnwrap(#[source] BoxError),

    /// Local symmetric cipher operation failed.
    #[error(transparent)]
    Cipher(#[from] CipherError),

    /// The encryption metadata field is present but not a valid record.
    #[error("encryption metadata is corrupt: {0}")]
    MetadataCorrupt(String),

    /// The store has no object under the requested key.
    #[error("object not found: {0}")]
    ObjectNotFound(String),

    /// Transport failure while writing to the object store.
    #[error("object store write failed: {0}")]
    StoreWrite(#[source] BoxError),

    /// Transport failure while reading from the object store.
    #[error("object store read failed: {0}")]
    StoreRead(#[source] BoxError),
}

impl EnvelopeError {
    /// `true` for failures of a remote call that may succeed if repeated.
    ///
    /// Missing objects, corrupt metadata and local cipher failures are
    /// deterministic and never become transient.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            EnvelopeError::KeyGeneration(_)
                | EnvelopeError::KeyUnwrap(_)
                | EnvelopeError::StoreWrite(_)
                | EnvelopeError::StoreRead(_)
        )
    }
}

/// Failure of [`crate::ImageCrypto::encrypt_and_store`].
#[derive(Debug, Error)]
#[error("encrypt and store failed: {cause}")]
pub struct EncryptAndStoreError {
    #[source]
    cause: EnvelopeError,
}

impl EncryptAndStoreError {
    /// The sub-step failure that aborted the operation.
    pub fn cause(&self) -> &EnvelopeError {
        &self.cause
    }

    /// Consume the error, returning the sub-step failure.
    pub fn into_cause(self) -> EnvelopeError {
        self.cause
    }

    /// See [`EnvelopeError::is_transient`].
    pub fn is_transient(&self) -> bool {
        self.cause.is_transient()
    }
}

impl From<EnvelopeError> for EncryptAndStoreError {
    fn from(cause: EnvelopeError) -> Self {
        Self { cause }
    }
}

/// Failure of [`crate::ImageCrypto::retrieve_and_decrypt`].
#[derive(Debug, Error)]
#[error("retrieve and decrypt failed: {cause}")]
pub struct RetrieveAndDecryptError {
    #[source]
    cause: EnvelopeError,
}

impl RetrieveAndDecryptError {
    /// The sub-step failure that aborted the operation.
    pub fn cause(&self) -> &EnvelopeError {
        &self.cause
    }

    /// Consume the error, returning the sub-step failure.
    pub fn into_cause(self) -> EnvelopeError {
        self.cause
    }

    /// `true` when the store reported no object for the key.
    pub fn is_not_found(&self) -> bool {
        matches!(self.cause, EnvelopeError::ObjectNotFound(_))
    }

    /// See [`EnvelopeError::is_transient`].
    pub fn is_transient(&self) -> bool {
        self.cause.is_transient()
    }
}

impl From<EnvelopeError> for RetrieveAndDecryptError {
    fn from(cause: EnvelopeError) -> Self {
        Self { cause }
    }
}
