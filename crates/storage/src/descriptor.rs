//! Bucket capability record.

use aws_credential_types::Credentials;
use aws_sdk_s3::config::{BehaviorVersion, Region};

use scoring_core::error::CoreError;

/// Everything needed to reach one S3-compatible bucket.
///
/// This is a capability record, not a connection: a client is constructed
/// from it on demand for every operation set, so stale pooled sessions
/// can never outlive a credential rotation.
#[derive(Debug, Clone)]
pub struct BucketDescriptor {
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub bucket_name: String,
}

impl BucketDescriptor {
    /// Load the destination bucket from `BUCKET_*` environment variables.
    ///
    /// Returns `Ok(None)` when no bucket is configured at all
    /// (`BUCKET_NAME` unset); the mover turns that into a fail-fast
    /// configuration error. A partially configured bucket is rejected
    /// immediately.
    pub fn from_env() -> Result<Option<Self>, CoreError> {
        if std::env::var("BUCKET_NAME").is_err() {
            return Ok(None);
        }
        let var = |name: &str| {
            std::env::var(name).map_err(|_| {
                CoreError::Configuration(format!("{name} must be set when BUCKET_NAME is set"))
            })
        };
        Ok(Some(BucketDescriptor {
            endpoint: var("BUCKET_ENDPOINT")?,
            access_key: var("BUCKET_ACCESS_KEY")?,
            secret_key: var("BUCKET_SECRET_KEY")?,
            region: std::env::var("BUCKET_REGION").unwrap_or_else(|_| "us-east-1".into()),
            bucket_name: var("BUCKET_NAME")?,
        }))
    }

    /// Build a fresh S3 client for one operation set.
    ///
    /// Path-style addressing is forced so MinIO-style endpoints work
    /// without wildcard DNS.
    pub fn client(&self) -> aws_sdk_s3::Client {
        let credentials = Credentials::from_keys(
            self.access_key.clone(),
            self.secret_key.clone(),
            None,
        );
        let config = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(self.region.clone()))
            .endpoint_url(&self.endpoint)
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();
        aws_sdk_s3::Client::from_conf(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_construction_does_not_connect() {
        // Building a client from a descriptor is pure configuration.
        let descriptor = BucketDescriptor {
            endpoint: "http://localhost:9000".to_string(),
            access_key: "mlflow".to_string(),
            secret_key: "mlflow".to_string(),
            region: "us-east-1".to_string(),
            bucket_name: "mlflow".to_string(),
        };
        let _client = descriptor.client();
    }
}
