//! AWS SDK client initialisation for KMS and S3, plus SDK error flattening.

pub mod clients;

pub use clients::AwsClients;

use aws_sdk_s3::error::DisplayErrorContext;
use thiserror::Error;

use crate::error::BoxError;

/// SDK failure whose message carries the full SDK error context.
///
/// The plain `Display` of an SDK error is often just `"service error"`; the
/// flattened message keeps the service code and message visible in logs and
/// in the top-level operation error.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct RemoteError {
    message: String,
    #[source]
    source: BoxError,
}

/// Box an SDK error as a [`RemoteError`], keeping the original as its source.
pub(crate) fn remote_error<E>(err: E) -> BoxError
where
    E: std::error::Error + Send + Sync + 'static,
{
    Box::new(RemoteError {
        message: DisplayErrorContext(&err).to_string(),
        source: Box::new(err),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn remote_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "connect timed out");
        let err = remote_error(io);
        assert!(err.to_string().contains("connect timed out"));
        assert!(err.source().is_some());
    }
}
