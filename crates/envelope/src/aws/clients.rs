//! AWS SDK client bundle built from [`EnvelopeSettings`].

use aws_config::{timeout::TimeoutConfig, BehaviorVersion, Region};
use aws_sdk_s3::config::Credentials;
use tracing::info;

use crate::settings::EnvelopeSettings;

/// Bundle of AWS SDK clients sharing one resolved [`aws_config::SdkConfig`].
///
/// Both clients are cheap to clone and safe to share across tasks.
#[derive(Clone, Debug)]
pub struct AwsClients {
    /// KMS client used to generate and unwrap data keys.
    pub kms: aws_sdk_kms::Client,
    /// S3 client used to store and fetch object bodies.
    pub s3: aws_sdk_s3::Client,
}

impl AwsClients {
    /// Initialise the KMS and S3 clients.
    ///
    /// Region and credentials come from `settings` when present, otherwise
    /// from the standard AWS provider chain (environment, profile, IMDS). The
    /// optional operation timeout bounds every KMS and S3 call; a call that
    /// exceeds it fails with the SDK's timeout error rather than hanging.
    pub async fn init(settings: &EnvelopeSettings) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());

        if let Some(region) = &settings.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(creds) = &settings.credentials {
            loader = loader.credentials_provider(Credentials::new(
                creds.access_key_id.clone(),
                creds.secret_access_key.clone(),
                None,
                None,
                "image-vault-static",
            ));
        }
        if let Some(timeout) = settings.operation_timeout {
            loader = loader.timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(timeout)
                    .build(),
            );
        }

        let config = loader.load().await;

        let mut kms = aws_sdk_kms::config::Builder::from(&config);
        let mut s3 = aws_sdk_s3::config::Builder::from(&config);

        // S3-compatible stores and KMS emulators live behind one endpoint and
        // do not support virtual-hosted bucket addressing.
        if let Some(endpoint) = &settings.endpoint_url {
            kms = kms.endpoint_url(endpoint);
            s3 = s3.endpoint_url(endpoint).force_path_style(true);
        }

        info!(
            region = ?config.region(),
            endpoint = settings.endpoint_url.as_deref().unwrap_or("default"),
            "AWS clients initialised"
        );

        Self {
            kms: aws_sdk_kms::Client::from_conf(kms.build()),
            s3: aws_sdk_s3::Client::from_conf(s3.build()),
        }
    }
}
