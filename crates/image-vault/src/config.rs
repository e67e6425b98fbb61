//! Configuration loading and validation for the image-vault service.
//!
//! All values are read from environment variables at startup. The process will
//! exit with a clear error message if any required variable is missing or invalid.

use std::time::Duration;

use anyhow::{Context, Result};
use common::RetryPolicy;
use envelope::{Algorithm, EnvelopeSettings, DEFAULT_OPERATION_TIMEOUT};
use serde::Deserialize;

use crate::server::middleware::{MIN_REQUEST_TIMEOUT, REQUEST_TIMEOUT_SLACK};

/// Validated service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Bucket holding the encrypted images. **Required.**
    pub s3_bucket: String,

    /// KMS master key id, ARN, or alias used to wrap data keys. **Required.**
    pub kms_key_id: String,

    /// AWS region; the SDK provider chain decides when unset.
    #[serde(default)]
    pub aws_region: Option<String>,

    /// Algorithm for new objects (`aes-256-cbc` or `aes-256-gcm-siv`).
    #[serde(default = "default_encryption_algorithm")]
    pub encryption_algorithm: String,

    /// Static access key id; must be paired with the secret below.
    #[serde(default)]
    pub static_access_key_id: Option<String>,

    /// Static secret access key; must be paired with the key id above.
    #[serde(default)]
    pub static_secret_access_key: Option<String>,

    /// Endpoint override for both KMS and S3 (e.g. LocalStack, MinIO).
    #[serde(default)]
    pub aws_endpoint_url: Option<String>,

    /// Upper bound in seconds on each KMS and S3 call.
    #[serde(default = "default_aws_operation_timeout_secs")]
    pub aws_operation_timeout_secs: u64,

    /// Port the HTTP server listens on.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Largest accepted upload, in bytes.
    #[serde(default = "default_max_object_bytes")]
    pub max_object_bytes: usize,

    /// Retries after the first attempt for each store / fetch.
    #[serde(default = "default_retry_max_retries")]
    pub retry_max_retries: u32,

    /// Base delay between attempts, in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Double the delay after every attempt.
    #[serde(default = "default_retry_exponential_backoff")]
    pub retry_exponential_backoff: bool,

    /// OTLP gRPC endpoint; span export is disabled when unset.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_encryption_algorithm() -> String {
    Algorithm::default().identifier().into()
}
fn default_aws_operation_timeout_secs() -> u64 {
    DEFAULT_OPERATION_TIMEOUT.as_secs()
}
fn default_listen_port() -> u16 {
    8080
}
fn default_max_object_bytes() -> usize {
    20 * 1024 * 1024
}
fn default_retry_max_retries() -> u32 {
    5
}
fn default_retry_delay_ms() -> u64 {
    200
}
fn default_retry_exponential_backoff() -> bool {
    true
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any required variable is absent or cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        ensure_non_empty(&self.s3_bucket, "S3_BUCKET")?;
        ensure_non_empty(&self.kms_key_id, "KMS_KEY_ID")?;
        self.algorithm()?;

        match (&self.static_access_key_id, &self.static_secret_access_key) {
            (Some(id), Some(secret)) => {
                ensure_non_empty(id, "STATIC_ACCESS_KEY_ID")?;
                ensure_non_empty(secret, "STATIC_SECRET_ACCESS_KEY")?;
            }
            (None, None) => {}
            _ => anyhow::bail!(
                "STATIC_ACCESS_KEY_ID and STATIC_SECRET_ACCESS_KEY must be set together"
            ),
        }

        if self.aws_operation_timeout_secs == 0 {
            anyhow::bail!("AWS_OPERATION_TIMEOUT_SECS must be > 0");
        }
        if self.listen_port == 0 {
            anyhow::bail!("LISTEN_PORT must be > 0");
        }
        if self.max_object_bytes == 0 {
            anyhow::bail!("MAX_OBJECT_BYTES must be > 0");
        }
        if self.retry_delay_ms == 0 {
            anyhow::bail!("RETRY_DELAY_MS must be > 0");
        }
        Ok(())
    }

    /// Algorithm applied to new objects.
    ///
    /// # Errors
    ///
    /// Returns an error if `ENCRYPTION_ALGORITHM` names an unsupported cipher.
    pub fn algorithm(&self) -> Result<Algorithm> {
        self.encryption_algorithm
            .parse::<Algorithm>()
            .with_context(|| format!("ENCRYPTION_ALGORITHM {:?} is invalid", self.encryption_algorithm))
    }

    /// Core settings for [`envelope::ImageCrypto::connect`].
    ///
    /// # Errors
    ///
    /// Returns an error if the algorithm cannot be parsed.
    pub fn envelope_settings(&self) -> Result<EnvelopeSettings> {
        let mut settings = EnvelopeSettings::new(&self.s3_bucket, &self.kms_key_id)
            .with_algorithm(self.algorithm()?);

        if let Some(region) = &self.aws_region {
            settings = settings.with_region(region);
        }
        if let (Some(id), Some(secret)) =
            (&self.static_access_key_id, &self.static_secret_access_key)
        {
            settings = settings.with_credentials(id, secret);
        }
        if let Some(endpoint) = &self.aws_endpoint_url {
            settings = settings.with_endpoint_url(endpoint);
        }
        Ok(settings.with_operation_timeout(self.operation_timeout()))
    }

    /// Bound on each KMS and S3 call.
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.aws_operation_timeout_secs)
    }

    /// Bound on one HTTP request.
    ///
    /// Covers the worst retried store: two remote calls per attempt, each
    /// running into the operation timeout, plus every back-off sleep. A
    /// request that gives up on its upstreams therefore answers with its own
    /// 503 before the HTTP layer's 408 fires.
    pub fn request_timeout(&self) -> Duration {
        let attempts = self.retry_max_retries.saturating_add(1);
        self.operation_timeout()
            .saturating_mul(2)
            .saturating_mul(attempts)
            .saturating_add(self.retry_policy().total_delay())
            .saturating_add(REQUEST_TIMEOUT_SLACK)
            .max(MIN_REQUEST_TIMEOUT)
    }

    /// Retry policy wrapped around every store and fetch.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.retry_max_retries,
            delay: Duration::from_millis(self.retry_delay_ms),
            exponential_backoff: self.retry_exponential_backoff,
        }
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} is required and must not be empty");
    }
    Ok(())
}
