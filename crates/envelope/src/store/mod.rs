//! Object store gateway: whole-object put and get with a flat metadata map.
//!
//! Bodies are fully buffered in memory. Inputs are bounded-size images, so no
//! chunked or backpressured path exists; callers must cap object size.

pub mod s3;

pub use s3::S3ObjectStore;

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::EnvelopeError;

/// Flat string-to-string user metadata attached to a stored object.
pub type ObjectMetadata = HashMap<String, String>;

/// Content type recorded for every object this crate writes.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// An object body and its metadata as held by the store.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StoredObject {
    /// Ciphertext, or plaintext for objects stored without encryption.
    pub body: Bytes,
    /// User metadata; may or may not carry an encryption record.
    pub metadata: ObjectMetadata,
}

/// Put / get access to a single bucket.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `body` under `key`, replacing any existing object.
    ///
    /// The write is all-or-nothing: readers see either the previous object or
    /// the complete new one.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::StoreWrite`] on transport failure.
    async fn put(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
        metadata: ObjectMetadata,
    ) -> Result<(), EnvelopeError>;

    /// Fetch the object under `key`, draining its body into memory.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::ObjectNotFound`] if there is no such object and
    /// [`EnvelopeError::StoreRead`] on transport failure.
    async fn get(&self, key: &str) -> Result<StoredObject, EnvelopeError>;
}
