//! Shared application state injected into every Axum handler.

use common::RetryPolicy;
use envelope::ImageCrypto;

/// Application state shared across all request handlers.
///
/// Cloned per request; [`ImageCrypto`] is `Arc`-backed so this copies no
/// buffers or clients.
#[derive(Clone, Debug)]
pub struct AppState {
    /// The one orchestrator instance this process serves from.
    pub crypto: ImageCrypto,
    /// Retry policy wrapped around every store and fetch.
    pub retry: RetryPolicy,
}

impl AppState {
    /// Create a new [`AppState`].
    pub fn new(crypto: ImageCrypto, retry: RetryPolicy) -> Self {
        Self { crypto, retry }
    }
}
