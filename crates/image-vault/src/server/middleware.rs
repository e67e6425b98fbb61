//! Axum middleware helpers applied to the router.
//!
//! Includes request-id tagging, request tracing, and timeout enforcement.

use std::time::Duration;

use axum::{body::Body, http::Request};
use tracing::Span;

/// Floor for the per-request timeout applied to all routes.
pub const MIN_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Headroom between the retry budget and the per-request timeout.
pub const REQUEST_TIMEOUT_SLACK: Duration = Duration::from_secs(5);

/// Header carrying the per-request correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Root span for one HTTP request.
///
/// Runs inside the request-id layer, so the id is always present.
pub fn request_span(req: &Request<Body>) -> Span {
    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");

    tracing::info_span!(
        "http_request",
        method = %req.method(),
        path = %req.uri().path(),
        request_id = %request_id,
    )
}
