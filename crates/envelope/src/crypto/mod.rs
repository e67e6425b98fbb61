//! Symmetric cipher engine for object bodies.
//!
//! This module is intentionally free of AWS and I/O dependencies. Callers
//! supply the raw data key and IV; nothing here generates or stores keys.
//!
//! # Supported algorithms
//!
//! | identifier        | key | IV  | notes                         |
//! |-------------------|-----|-----|-------------------------------|
//! | `aes-256-cbc`     | 32  | 16  | PKCS#7 padding, default       |
//! | `aes-256-gcm-siv` | 32  | 12  | authenticated, nonce in `iv`  |

pub mod cipher;

pub use cipher::{decrypt, encrypt, Algorithm, CipherError, KEY_LEN};
