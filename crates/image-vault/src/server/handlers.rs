//! Axum request handlers for all service endpoints.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use common::protocol::{ErrorResponse, HealthResponse, StoreResponse};
use common::{Retry, ServiceError};
use envelope::store::OCTET_STREAM;
use envelope::{EncryptAndStoreError, EnvelopeError, RetrieveAndDecryptError};
use tracing::{info, warn};

use super::state::AppState;

/// `PUT /images/*key` — encrypt the request body and store it under `key`.
///
/// Transient KMS / S3 failures are retried per the configured policy; any
/// other failure is returned on the first attempt.
pub async fn store(
    State(state): State<AppState>,
    Path(key): Path<String>,
    body: Bytes,
) -> Response {
    if key.trim().is_empty() {
        return error_response(&ServiceError::BadRequest("object key must not be empty".into()));
    }
    if body.is_empty() {
        return error_response(&ServiceError::BadRequest("image body must not be empty".into()));
    }

    let crypto = &state.crypto;
    let result = Retry::new(state.retry)
        .abort_if(|e: &EncryptAndStoreError| !e.is_transient())
        .on_retry(|attempt, err: Option<&EncryptAndStoreError>| {
            warn!(attempt, error = ?err.map(ToString::to_string), "retrying store");
        })
        .run(|| crypto.encrypt_and_store(&body, &key))
        .await;

    match result {
        Ok(key) => {
            info!(key = %key, bytes = body.len(), "image stored");
            (StatusCode::CREATED, Json(StoreResponse { key })).into_response()
        }
        Err(e) => error_response(&to_service_error(e.cause())),
    }
}

/// `GET /images/*key` — fetch and decrypt the image stored under `key`.
pub async fn retrieve(State(state): State<AppState>, Path(key): Path<String>) -> Response {
    if key.trim().is_empty() {
        return error_response(&ServiceError::BadRequest("object key must not be empty".into()));
    }

    let crypto = &state.crypto;
    let result = Retry::new(state.retry)
        .abort_if(|e: &RetrieveAndDecryptError| !e.is_transient())
        .on_retry(|attempt, err: Option<&RetrieveAndDecryptError>| {
            warn!(attempt, error = ?err.map(ToString::to_string), "retrying fetch");
        })
        .run(|| crypto.retrieve_and_decrypt(&key))
        .await;

    match result {
        Ok(bytes) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, OCTET_STREAM)],
            bytes,
        )
            .into_response(),
        Err(e) => error_response(&to_service_error(e.cause())),
    }
}

/// `GET /health` — liveness check.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".into(),
    })
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}

/// Classify a core failure for the HTTP surface.
///
/// Details of cipher and remote failures stay in the logs; callers only see a
/// generic message.
fn to_service_error(cause: &EnvelopeError) -> ServiceError {
    match cause {
        EnvelopeError::ObjectNotFound(key) => ServiceError::NotFound(key.clone()),
        e if e.is_transient() => {
            warn!(error = %e, "upstream dependency failed");
            ServiceError::Unavailable("upstream dependency failed".into())
        }
        e @ (EnvelopeError::MetadataCorrupt(_) | EnvelopeError::Cipher(_)) => {
            warn!(error = %e, "decryption failed");
            ServiceError::EncryptionFailure("stored object could not be processed".into())
        }
        e => ServiceError::Internal(e.to_string()),
    }
}

fn error_response(err: &ServiceError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ErrorResponse::from(err))).into_response()
}
