//! [`S3ObjectStore`]: [`ObjectStore`] backed by Amazon S3.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::debug;

use super::{ObjectMetadata, ObjectStore, StoredObject};
use crate::aws::remote_error;
use crate::error::EnvelopeError;

/// Single-bucket S3 gateway.
///
/// Uses plain `PutObject`, which S3 commits atomically; no multipart upload
/// is ever left half-visible.
#[derive(Clone, Debug)]
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3ObjectStore {
    /// Create a gateway for `bucket`.
    pub fn new(client: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Configured bucket name.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
        metadata: ObjectMetadata,
    ) -> Result<(), EnvelopeError> {
        let len = body.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .set_metadata(Some(metadata))
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| EnvelopeError::StoreWrite(remote_error(e)))?;

        debug!(bucket = %self.bucket, key = %key, bytes = len, "object stored");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<StoredObject, EnvelopeError> {
        let resp = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(err) if err.as_service_error().is_some_and(|e| e.is_no_such_key()) => {
                return Err(EnvelopeError::ObjectNotFound(key.to_owned()));
            }
            Err(err) => return Err(EnvelopeError::StoreRead(remote_error(err))),
        };

        let metadata = resp.metadata().cloned().unwrap_or_default();
        let body = resp
            .body
            .collect()
            .await
            .map_err(|e| EnvelopeError::StoreRead(remote_error(e)))?
            .into_bytes();

        debug!(bucket = %self.bucket, key = %key, bytes = body.len(), "object fetched");
        Ok(StoredObject { body, metadata })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::error::ErrorMetadata;
    use aws_sdk_s3::operation::get_object::{GetObjectError, GetObjectOutput};
    use aws_sdk_s3::operation::put_object::{PutObjectError, PutObjectOutput};
    use aws_sdk_s3::types::error::NoSuchKey;
    use aws_smithy_mocks::{mock, mock_client};

    use crate::store::OCTET_STREAM;

    const BUCKET: &str = "images";

    fn access_denied() -> ErrorMetadata {
        ErrorMetadata::builder()
            .code("AccessDenied")
            .message("denied")
            .build()
    }

    #[tokio::test]
    async fn put_sends_content_type_and_metadata() {
        let rule = mock!(aws_sdk_s3::Client::put_object)
            .match_requests(|req| {
                req.bucket() == Some(BUCKET)
                    && req.key() == Some("cats/tabby.png")
                    && req.content_type() == Some("image/png")
                    && req.metadata().and_then(|m| m.get("encryption")).map(String::as_str)
                        == Some("{\"iv\":\"AA==\"}")
            })
            .then_output(|| PutObjectOutput::builder().build());
        let client = mock_client!(aws_sdk_s3, [&rule]);

        let metadata =
            ObjectMetadata::from([("encryption".to_owned(), "{\"iv\":\"AA==\"}".to_owned())]);
        S3ObjectStore::new(client, BUCKET)
            .put(
                "cats/tabby.png",
                Bytes::from_static(b"ciphertext"),
                "image/png",
                metadata,
            )
            .await
            .unwrap();
        assert_eq!(rule.num_calls(), 1);
    }

    #[tokio::test]
    async fn put_failure_maps_to_store_write() {
        let rule = mock!(aws_sdk_s3::Client::put_object)
            .then_error(|| PutObjectError::generic(access_denied()));
        let client = mock_client!(aws_sdk_s3, [&rule]);

        let err = S3ObjectStore::new(client, BUCKET)
            .put("a.png", Bytes::from_static(b"x"), OCTET_STREAM, ObjectMetadata::new())
            .await
            .unwrap_err();
        assert!(matches!(err, EnvelopeError::StoreWrite(_)), "{err}");
        assert!(err.to_string().contains("AccessDenied"));
    }

    #[tokio::test]
    async fn get_returns_body_and_metadata() {
        let rule = mock!(aws_sdk_s3::Client::get_object)
            .match_requests(|req| req.bucket() == Some(BUCKET) && req.key() == Some("a.png"))
            .then_output(|| {
                GetObjectOutput::builder()
                    .body(ByteStream::from_static(b"ciphertext"))
                    .metadata("encryption", "{}")
                    .build()
            });
        let client = mock_client!(aws_sdk_s3, [&rule]);

        let object = S3ObjectStore::new(client, BUCKET).get("a.png").await.unwrap();
        assert_eq!(object.body.as_ref(), b"ciphertext");
        assert_eq!(object.metadata.get("encryption").map(String::as_str), Some("{}"));
    }

    #[tokio::test]
    async fn get_without_metadata_yields_empty_map() {
        let rule = mock!(aws_sdk_s3::Client::get_object).then_output(|| {
            GetObjectOutput::builder()
                .body(ByteStream::from_static(b"plain"))
                .build()
        });
        let client = mock_client!(aws_sdk_s3, [&rule]);

        let object = S3ObjectStore::new(client, BUCKET).get("old.png").await.unwrap();
        assert!(object.metadata.is_empty());
    }

    #[tokio::test]
    async fn missing_key_maps_to_object_not_found() {
        let rule = mock!(aws_sdk_s3::Client::get_object)
            .then_error(|| GetObjectError::NoSuchKey(NoSuchKey::builder().build()));
        let client = mock_client!(aws_sdk_s3, [&rule]);

        let err = S3ObjectStore::new(client, BUCKET).get("k").await.unwrap_err();
        assert!(matches!(&err, EnvelopeError::ObjectNotFound(key) if key == "k"), "{err}");
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn other_get_failure_maps_to_store_read() {
        let rule = mock!(aws_sdk_s3::Client::get_object)
            .then_error(|| GetObjectError::generic(access_denied()));
        let client = mock_client!(aws_sdk_s3, [&rule]);

        let err = S3ObjectStore::new(client, BUCKET).get("k").await.unwrap_err();
        assert!(matches!(err, EnvelopeError::StoreRead(_)), "{err}");
    }
}
