//! AES-256 encryption and decryption of whole object bodies.
//!
//! **Algorithm choice:** objects are written with `aes-256-cbc` by default so
//! they stay readable by every existing consumer of the bucket. The
//! identifier is recorded per object and decryption always dispatches on the
//! recorded value, never on the instance default.
//!
//! **Never reuse an IV.** Call [`Algorithm::generate_iv`] once per encryption.

use std::fmt;
use std::str::FromStr;

use aes::Aes256;
use aes_gcm_siv::{
    aead::{rand_core::RngCore, Aead, KeyInit, OsRng},
    Aes256GcmSiv, Nonce,
};
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use thiserror::Error;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// AES block size; also the CBC IV length.
const BLOCK_LEN: usize = 16;

/// Byte length of an AES-GCM-SIV nonce (12 bytes = 96 bits).
const GCM_SIV_NONCE_LEN: usize = 12;

/// Errors produced by the cipher layer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    /// The data key is the wrong length (must be [`KEY_LEN`] bytes).
    #[error("invalid data key length: expected 32 bytes, got {0}")]
    InvalidKeyLength(usize),

    /// The IV does not match the algorithm's required length.
    #[error("invalid IV length for {algorithm}: expected {expected} bytes, got {actual}")]
    InvalidIvLength {
        algorithm: Algorithm,
        expected: usize,
        actual: usize,
    },

    /// Ciphertext is empty or not a whole number of blocks.
    #[error("ciphertext is truncated: {0} bytes is not a positive multiple of 16")]
    TruncatedCiphertext(usize),

    /// Padding did not verify after CBC decryption.
    #[error("bad padding in decrypted data")]
    BadPadding,

    /// AES-GCM-SIV encryption or authentication failed.
    #[error("aead operation failed")]
    AeadFailure,

    /// The algorithm identifier is not one this build understands.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),
}

/// Block cipher and mode used for an object body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Algorithm {
    /// AES-256 in CBC mode with PKCS#7 padding.
    #[default]
    Aes256Cbc,
    /// AES-256-GCM-SIV (RFC 8452).
    Aes256GcmSiv,
}

impl Algorithm {
    /// Identifier written into the encryption metadata record.
    pub fn identifier(self) -> &'static str {
        match self {
            Algorithm::Aes256Cbc => "aes-256-cbc",
            Algorithm::Aes256GcmSiv => "aes-256-gcm-siv",
        }
    }

    /// Required IV (nonce) length in bytes.
    pub fn iv_len(self) -> usize {
        match self {
            Algorithm::Aes256Cbc => BLOCK_LEN,
            Algorithm::Aes256GcmSiv => GCM_SIV_NONCE_LEN,
        }
    }

    /// Draw a fresh IV of the right length from the OS CSPRNG.
    pub fn generate_iv(self) -> Vec<u8> {
        let mut iv = vec![0u8; self.iv_len()];
        OsRng.fill_bytes(&mut iv);
        iv
    }

    fn check_iv(self, iv: &[u8]) -> Result<(), CipherError> {
        if iv.len() != self.iv_len() {
            return Err(CipherError::InvalidIvLength {
                algorithm: self,
                expected: self.iv_len(),
                actual: iv.len(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

impl FromStr for Algorithm {
    type Err = CipherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        [Algorithm::Aes256Cbc, Algorithm::Aes256GcmSiv]
            .into_iter()
            .find(|a| a.identifier().eq_ignore_ascii_case(s))
            .ok_or_else(|| CipherError::UnsupportedAlgorithm(s.to_owned()))
    }
}

/// Encrypt `plaintext` under `key` and `iv` with `algorithm`.
///
/// Deterministic: identical inputs always give identical output. Freshness
/// comes entirely from the caller-supplied IV.
///
/// # Errors
///
/// Returns [`CipherError::InvalidKeyLength`] or [`CipherError::InvalidIvLength`]
/// on length mismatch, and [`CipherError::AeadFailure`] on an internal AEAD
/// error.
pub fn encrypt(
    plaintext: &[u8],
    key: &[u8],
    iv: &[u8],
    algorithm: Algorithm,
) -> Result<Vec<u8>, CipherError> {
    check_key(key)?;
    algorithm.check_iv(iv)?;
    match algorithm {
        Algorithm::Aes256Cbc => {
            let enc = Aes256CbcEnc::new_from_slices(key, iv)
                .map_err(|_| CipherError::InvalidKeyLength(key.len()))?;
            Ok(enc.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
        }
        Algorithm::Aes256GcmSiv => gcm_siv(key)?
            .encrypt(Nonce::from_slice(iv), plaintext)
            .map_err(|_| CipherError::AeadFailure),
    }
}

/// Decrypt `ciphertext` produced by [`encrypt`] with the same inputs.
///
/// `algorithm` must come from the object's own metadata.
///
/// # Errors
///
/// Returns [`CipherError::TruncatedCiphertext`] or [`CipherError::BadPadding`]
/// for malformed CBC input, [`CipherError::AeadFailure`] when GCM-SIV
/// authentication fails, and a length error for a bad key or IV.
pub fn decrypt(
    ciphertext: &[u8],
    key: &[u8],
    iv: &[u8],
    algorithm: Algorithm,
) -> Result<Vec<u8>, CipherError> {
    check_key(key)?;
    algorithm.check_iv(iv)?;
    match algorithm {
        Algorithm::Aes256Cbc => {
            if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
                return Err(CipherError::TruncatedCiphertext(ciphertext.len()));
            }
            let dec = Aes256CbcDec::new_from_slices(key, iv)
                .map_err(|_| CipherError::InvalidKeyLength(key.len()))?;
            dec.decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
                .map_err(|_| CipherError::BadPadding)
        }
        Algorithm::Aes256GcmSiv => gcm_siv(key)?
            .decrypt(Nonce::from_slice(iv), ciphertext)
            .map_err(|_| CipherError::AeadFailure),
    }
}

fn check_key(key: &[u8]) -> Result<(), CipherError> {
    if key.len() != KEY_LEN {
        return Err(CipherError::InvalidKeyLength(key.len()));
    }
    Ok(())
}

fn gcm_siv(key: &[u8]) -> Result<Aes256GcmSiv, CipherError> {
    Aes256GcmSiv::new_from_slice(key).map_err(|_| CipherError::InvalidKeyLength(key.len()))
}
