//! In-memory [`KeyProvider`] and [`ObjectStore`] for tests.
//!
//! Enabled for this crate's own tests and, for downstream crates, through the
//! `test-util` feature. Neither type is suitable for production: the master
//! key is a constant held in memory.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use aes_gcm_siv::aead::{rand_core::RngCore, OsRng};
use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;
use zeroize::Zeroize;

use crate::crypto::{self, Algorithm, KEY_LEN};
use crate::error::EnvelopeError;
use crate::kms::{DataKey, GeneratedDataKey, KeyProvider};
use crate::store::{ObjectMetadata, ObjectStore, StoredObject};

/// Wraps data keys locally with AES-256-GCM-SIV under a fixed master key.
///
/// Wrapped form: `nonce (12 bytes) || ciphertext+tag`.
#[derive(Debug)]
pub struct StaticKeyProvider {
    master: DataKey,
    key_id: String,
    generated: AtomicUsize,
    unwrapped: AtomicUsize,
}

impl StaticKeyProvider {
    /// Provider whose master key is `[seed; 32]`.
    pub fn new(key_id: impl Into<String>, seed: u8) -> Self {
        Self {
            master: DataKey::from([seed; KEY_LEN]),
            key_id: key_id.into(),
            generated: AtomicUsize::new(0),
            unwrapped: AtomicUsize::new(0),
        }
    }

    /// Number of `generate_data_key` calls so far.
    pub fn generated(&self) -> usize {
        self.generated.load(Ordering::SeqCst)
    }

    /// Number of `unwrap_data_key` calls so far.
    pub fn unwrapped(&self) -> usize {
        self.unwrapped.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyProvider for StaticKeyProvider {
    async fn generate_data_key(&self) -> Result<GeneratedDataKey, EnvelopeError> {
        self.generated.fetch_add(1, Ordering::SeqCst);

        let mut raw = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut raw);
        let data_key = DataKey::from(raw);
        raw.zeroize();

        let nonce = Algorithm::Aes256GcmSiv.generate_iv();
        let sealed = crypto::encrypt(
            data_key.as_bytes(),
            self.master.as_bytes(),
            &nonce,
            Algorithm::Aes256GcmSiv,
        )
        .map_err(|e| EnvelopeError::KeyGeneration(e.into()))?;

        let mut wrapped_key = nonce;
        wrapped_key.extend_from_slice(&sealed);
        Ok(GeneratedDataKey {
            data_key,
            wrapped_key,
            key_id: self.key_id.clone(),
        })
    }

    async fn unwrap_data_key(&self, wrapped_key: &[u8]) -> Result<DataKey, EnvelopeError> {
        self.unwrapped.fetch_add(1, Ordering::SeqCst);

        let nonce_len = Algorithm::Aes256GcmSiv.iv_len();
        if wrapped_key.len() <= nonce_len {
            return Err(EnvelopeError::KeyUnwrap("wrapped key is too short".into()));
        }
        let (nonce, sealed) = wrapped_key.split_at(nonce_len);
        let mut raw =
            crypto::decrypt(sealed, self.master.as_bytes(), nonce, Algorithm::Aes256GcmSiv)
                .map_err(|e| EnvelopeError::KeyUnwrap(e.into()))?;
        let data_key = DataKey::from_slice(&raw);
        raw.zeroize();
        data_key.map_err(|e| EnvelopeError::KeyUnwrap(e.into()))
    }
}

/// Object store backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<String, StoredObject>>,
    puts: AtomicUsize,
}

impl InMemoryObjectStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object directly, bypassing [`ObjectStore::put`].
    pub async fn insert(
        &self,
        key: impl Into<String>,
        body: impl Into<Bytes>,
        metadata: ObjectMetadata,
    ) {
        let object = StoredObject {
            body: body.into(),
            metadata,
        };
        self.objects.write().await.insert(key.into(), object);
    }

    /// Snapshot of the object under `key`, if any.
    pub async fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects.read().await.get(key).cloned()
    }

    /// Number of `put` calls so far.
    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(
        &self,
        key: &str,
        body: Bytes,
        _content_type: &str,
        metadata: ObjectMetadata,
    ) -> Result<(), EnvelopeError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.insert(key, body, metadata).await;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<StoredObject, EnvelopeError> {
        self.object(key)
            .await
            .ok_or_else(|| EnvelopeError::ObjectNotFound(key.to_owned()))
    }
}
