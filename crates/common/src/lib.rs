//! Common types, protocol definitions, errors, and the retry helper shared
//! across `image-vault` crates.

pub mod error;
pub mod protocol;
pub mod retry;

pub use error::ServiceError;
pub use retry::{Retry, RetryPolicy};
