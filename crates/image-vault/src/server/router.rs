//! Axum router construction.

use std::time::Duration;

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::{DefaultOnResponse, TraceLayer},
    LatencyUnit,
};
use tracing::Level;

use super::{handlers, middleware, state::AppState};

/// Build the application [`Router`] with all routes and middleware attached.
///
/// Uploads larger than `max_object_bytes` are rejected with `413`; requests
/// still running after `request_timeout` get `408`.
pub fn build(state: AppState, max_object_bytes: usize, request_timeout: Duration) -> Router {
    Router::new()
        .route(
            "/images/*key",
            get(handlers::retrieve).put(handlers::store),
        )
        .route("/health", get(handlers::health))
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(max_object_bytes))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(middleware::request_span)
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .latency_unit(LatencyUnit::Millis),
                ),
        )
        // Outermost: the id exists before the span is built and is copied
        // onto every response, including timeouts.
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body, Bytes},
        http::{header, Request, StatusCode},
        response::Response,
    };
    use common::RetryPolicy;
    use envelope::metadata::METADATA_FIELD;
    use envelope::store::ObjectMetadata;
    use envelope::testing::{InMemoryObjectStore, StaticKeyProvider};
    use envelope::{Algorithm, EnvelopeError, ImageCrypto, ObjectStore, StoredObject};
    use tower::ServiceExt;

    const LIMIT: usize = 64 * 1024;

    fn quick_retry() -> RetryPolicy {
        RetryPolicy {
            max_retries: 2,
            delay: Duration::from_millis(1),
            exponential_backoff: false,
        }
    }

    fn app_with(store: Arc<dyn ObjectStore>) -> (Router, Arc<StaticKeyProvider>) {
        let keys = Arc::new(StaticKeyProvider::new("local-key", 4));
        let crypto = ImageCrypto::new(keys.clone(), store, Algorithm::Aes256Cbc);
        (
            build(
                AppState::new(crypto, quick_retry()),
                LIMIT,
                middleware::MIN_REQUEST_TIMEOUT,
            ),
            keys,
        )
    }

    fn app() -> (Router, Arc<StaticKeyProvider>, Arc<InMemoryObjectStore>) {
        let store = Arc::new(InMemoryObjectStore::new());
        let (router, keys) = app_with(store.clone());
        (router, keys, store)
    }

    fn put(uri: &str, body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method("PUT")
            .uri(uri)
            .body(body.into())
            .unwrap()
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json(resp: Response) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// Store whose every call fails with a transient read/write error.
    #[derive(Default)]
    struct FlakyStore {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ObjectStore for FlakyStore {
        async fn put(
            &self,
            _key: &str,
            _body: Bytes,
            _content_type: &str,
            _metadata: ObjectMetadata,
        ) -> Result<(), EnvelopeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(EnvelopeError::StoreWrite("connection reset".into()))
        }

        async fn get(&self, _key: &str) -> Result<StoredObject, EnvelopeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(EnvelopeError::StoreRead("connection reset".into()))
        }
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let (app, keys, store) = app();
        let image = vec![0x89, b'P', b'N', b'G', 0, 1, 2, 3];

        let resp = app
            .clone()
            .oneshot(put("/images/cats/tabby.png", image.clone()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(json(resp).await["key"], "cats/tabby.png");

        let stored = store.object("cats/tabby.png").await.unwrap();
        assert_ne!(stored.body.as_ref(), image.as_slice());
        assert!(stored.metadata.contains_key(METADATA_FIELD));

        let resp = app.oneshot(get_req("/images/cats/tabby.png")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()[header::CONTENT_TYPE],
            "application/octet-stream"
        );
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body.as_ref(), image.as_slice());
        assert_eq!((keys.generated(), keys.unwrapped()), (1, 1));
    }

    #[tokio::test]
    async fn missing_image_returns_404() {
        let (app, _, _) = app();
        let resp = app.oneshot(get_req("/images/nope.png")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(json(resp).await["code"], "not_found");
    }

    #[tokio::test]
    async fn legacy_image_is_served_verbatim() {
        let (app, keys, store) = app();
        store
            .insert("old.png", Bytes::from_static(b"plain bytes"), ObjectMetadata::new())
            .await;

        let resp = app.oneshot(get_req("/images/old.png")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body.as_ref(), b"plain bytes");
        assert_eq!(keys.unwrapped(), 0);
    }

    #[tokio::test]
    async fn corrupt_metadata_returns_500() {
        let (app, _, store) = app();
        store
            .insert(
                "broken.png",
                Bytes::from_static(b"ciphertext"),
                ObjectMetadata::from([(METADATA_FIELD.to_owned(), "{oops".to_owned())]),
            )
            .await;

        let resp = app.oneshot(get_req("/images/broken.png")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json(resp).await["code"], "encryption_failure");
    }

    #[tokio::test]
    async fn transient_failures_are_retried_then_503() {
        let store = Arc::new(FlakyStore::default());
        let (app, _) = app_with(store.clone());

        let resp = app.clone().oneshot(get_req("/images/a.png")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json(resp).await["code"], "service_unavailable");
        assert_eq!(store.calls.load(Ordering::SeqCst), 3);

        let resp = app.oneshot(put("/images/a.png", "data")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(store.calls.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn empty_body_is_rejected() {
        let (app, keys, _) = app();
        let resp = app.oneshot(put("/images/a.png", Body::empty())).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(keys.generated(), 0);
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let (app, keys, _) = app();
        let resp = app
            .oneshot(put("/images/big.png", vec![0u8; LIMIT + 1]))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(keys.generated(), 0);
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let (app, _, _) = app();
        let resp = app.oneshot(get_req("/health")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json(resp).await["status"], "ok");
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let (app, _, _) = app();
        let resp = app.oneshot(get_req("/unknown")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(json(resp).await["code"], "not_found");
    }

    #[tokio::test]
    async fn request_id_is_generated_and_propagated() {
        let (app, _, _) = app();

        let resp = app.clone().oneshot(get_req("/health")).await.unwrap();
        let generated = resp.headers()[middleware::REQUEST_ID_HEADER]
            .to_str()
            .unwrap()
            .to_owned();
        assert_eq!(generated.len(), 36);

        let req = Request::builder()
            .uri("/health")
            .header(middleware::REQUEST_ID_HEADER, "caller-supplied-id")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(
            resp.headers()[middleware::REQUEST_ID_HEADER],
            "caller-supplied-id"
        );
    }
}
