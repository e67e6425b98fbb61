//! KMS envelope encryption for binary objects stored in S3.
//!
//! Every write draws a fresh 256-bit data key from KMS, encrypts the payload
//! locally, and stores the ciphertext together with a small metadata record
//! holding the KMS-wrapped data key and IV. Reads reverse the process.
//! Objects stored before encryption was introduced carry no record and are
//! returned unchanged.
//!
//! ```no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use envelope::{EnvelopeSettings, ImageCrypto};
//!
//! let settings = EnvelopeSettings::new("my-bucket", "alias/images")
//!     .with_region("ap-northeast-2");
//! let crypto = ImageCrypto::connect(&settings).await;
//!
//! crypto.encrypt_and_store(b"\x89PNG...", "images/cat.png").await?;
//! let bytes = crypto.retrieve_and_decrypt("images/cat.png").await?;
//! # let _ = bytes;
//! # Ok(())
//! # }
//! ```

pub mod aws;
pub mod crypto;
pub mod error;
pub mod image_crypto;
pub mod kms;
pub mod metadata;
pub mod settings;
pub mod store;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use crypto::{Algorithm, CipherError};
pub use error::{EncryptAndStoreError, EnvelopeError, RetrieveAndDecryptError};
pub use image_crypto::ImageCrypto;
pub use kms::{DataKey, KeyProvider};
pub use settings::{EnvelopeSettings, StaticCredentials, DEFAULT_OPERATION_TIMEOUT};
pub use store::{ObjectStore, StoredObject};
