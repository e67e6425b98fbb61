//! Fixed per-instance configuration for [`crate::ImageCrypto`].

use std::time::Duration;

use crate::crypto::Algorithm;

/// Bound applied to each KMS / S3 call unless overridden.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Static AWS credentials used instead of the default provider chain.
#[derive(Clone, PartialEq, Eq)]
pub struct StaticCredentials {
    /// AWS access key id.
    pub access_key_id: String,
    /// AWS secret access key.
    pub secret_access_key: String,
}

impl std::fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .finish()
    }
}

/// Everything an [`crate::ImageCrypto`] instance needs: one bucket, one master
/// key, one algorithm for new objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeSettings {
    /// AWS region; `None` defers to the provider chain.
    pub region: Option<String>,
    /// Bucket holding the objects.
    pub bucket: String,
    /// KMS master key ID, ARN, or alias.
    pub kms_key_id: String,
    /// Algorithm used for new encryptions.
    pub algorithm: Algorithm,
    /// Static credentials; `None` defers to the provider chain.
    pub credentials: Option<StaticCredentials>,
    /// Endpoint override for both services (S3-compatible stores, emulators).
    pub endpoint_url: Option<String>,
    /// Upper bound on each KMS / S3 call; a call that exceeds it fails with
    /// that call's typed error. `None` leaves calls unbounded.
    pub operation_timeout: Option<Duration>,
}

impl EnvelopeSettings {
    /// Settings for `bucket` and `kms_key_id`.
    ///
    /// Region, credentials and endpoint are left to the provider chain; every
    /// remote call is bounded by [`DEFAULT_OPERATION_TIMEOUT`].
    pub fn new(bucket: impl Into<String>, kms_key_id: impl Into<String>) -> Self {
        Self {
            region: None,
            bucket: bucket.into(),
            kms_key_id: kms_key_id.into(),
            algorithm: Algorithm::default(),
            credentials: None,
            endpoint_url: None,
            operation_timeout: Some(DEFAULT_OPERATION_TIMEOUT),
        }
    }

    /// Set the region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Set the algorithm used for new encryptions.
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Use static credentials.
    pub fn with_credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.credentials = Some(StaticCredentials {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
        });
        self
    }

    /// Point both clients at a custom endpoint.
    pub fn with_endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }

    /// Bound every remote call.
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = Some(timeout);
        self
    }
}
