//! Request and response types exchanged over the public HTTP API.
//!
//! Image bodies travel as raw `application/octet-stream` bytes; only the
//! small status documents below are JSON.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Store endpoint
// ---------------------------------------------------------------------------

/// Successful response body for `PUT /images/*key`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreResponse {
    /// Object key the encrypted image was stored under.
    pub key: String,
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"not_found"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<&crate::ServiceError> for ErrorResponse {
    fn from(err: &crate::ServiceError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ServiceError;

    #[test]
    fn store_response_shape() {
        let json = serde_json::to_value(StoreResponse {
            key: "avatars/1.png".into(),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"key": "avatars/1.png"}));
    }

    #[test]
    fn error_response_from_service_error() {
        let e = ErrorResponse::from(&ServiceError::NotFound("avatars/1.png".into()));
        assert_eq!(e.code, "not_found");
        assert!(e.message.contains("avatars/1.png"));
    }
}
