//! Encryption metadata record attached to every encrypted object.
//!
//! # Wire format
//!
//! One entry in the object's user-metadata map, under [`METADATA_FIELD`]:
//!
//! ```text
//! {"encryptedDataKey":"<base64>","iv":"<base64>","algorithm":"aes-256-cbc","keyId":"arn:aws:kms:…"}
//! ```
//!
//! The field set and names are fixed; objects written by any other
//! implementation of this format must stay readable.

use base64::{
    alphabet,
    engine::{general_purpose, DecodePaddingMode, GeneralPurpose},
    Engine as _,
};
use serde::{Deserialize, Serialize};

use crate::error::EnvelopeError;
use crate::store::ObjectMetadata;

/// Metadata map entry holding the serialized record.
pub const METADATA_FIELD: &str = "x-amz-meta-encryption";

/// Standard alphabet, accepting input with or without `=` padding.
const LENIENT_STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    general_purpose::PAD.with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Serialized shape of the record, binary fields base64-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptionMetadata {
    /// Wrapped data key, base64.
    pub encrypted_data_key: String,
    /// IV (or nonce), base64.
    pub iv: String,
    /// Cipher identifier, e.g. `aes-256-cbc`.
    pub algorithm: String,
    /// Master key that wrapped the data key.
    pub key_id: String,
}

/// Decoded record, ready for unwrap and decryption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Wrapped data key bytes.
    pub wrapped_key: Vec<u8>,
    /// IV bytes.
    pub iv: Vec<u8>,
    /// Cipher identifier as stored; validated only when decrypting.
    pub algorithm: String,
    /// Master key that wrapped the data key.
    pub key_id: String,
}

impl Envelope {
    /// Encode to the wire record.
    pub fn to_metadata(&self) -> EncryptionMetadata {
        EncryptionMetadata {
            encrypted_data_key: general_purpose::STANDARD.encode(&self.wrapped_key),
            iv: general_purpose::STANDARD.encode(&self.iv),
            algorithm: self.algorithm.clone(),
            key_id: self.key_id.clone(),
        }
    }

    /// Serialize to the JSON text stored under [`METADATA_FIELD`].
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::MetadataCorrupt`] if JSON encoding fails.
    pub fn serialize(&self) -> Result<String, EnvelopeError> {
        serde_json::to_string(&self.to_metadata())
            .map_err(|e| EnvelopeError::MetadataCorrupt(e.to_string()))
    }
}

impl TryFrom<EncryptionMetadata> for Envelope {
    type Error = EnvelopeError;

    fn try_from(m: EncryptionMetadata) -> Result<Self, Self::Error> {
        let wrapped_key = decode_field("encryptedDataKey", &m.encrypted_data_key)?;
        let iv = decode_field("iv", &m.iv)?;
        Ok(Self {
            wrapped_key,
            iv,
            algorithm: m.algorithm,
            key_id: m.key_id,
        })
    }
}

fn decode_field(name: &str, value: &str) -> Result<Vec<u8>, EnvelopeError> {
    let bytes = LENIENT_STANDARD
        .decode(value.trim())
        .map_err(|e| EnvelopeError::MetadataCorrupt(format!("{name} is not valid base64: {e}")))?;
    if bytes.is_empty() {
        return Err(EnvelopeError::MetadataCorrupt(format!("{name} is empty")));
    }
    Ok(bytes)
}

/// Look up and decode the encryption record in an object's metadata.
///
/// Returns `Ok(None)` when the field is missing or empty: the object was
/// stored without encryption. A present but malformed field is an error,
/// never a silent fallback to returning ciphertext.
///
/// # Errors
///
/// Returns [`EnvelopeError::MetadataCorrupt`] if the field is not a JSON
/// record of the expected shape or a binary field is not base64.
pub fn try_parse(metadata: &ObjectMetadata) -> Result<Option<Envelope>, EnvelopeError> {
    let raw = match metadata.get(METADATA_FIELD) {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Ok(None),
    };
    let record: EncryptionMetadata =
        serde_json::from_str(raw).map_err(|e| EnvelopeError::MetadataCorrupt(e.to_string()))?;
    Envelope::try_from(record).map(Some)
}
