//! Object-store trait and the S3-backed implementation.

use std::path::Path;

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use tracing::{debug, warn};

use crate::descriptor::BucketDescriptor;
use crate::error::TransferError;

/// The bucket operations the mover needs.
///
/// Tests swap this for an in-memory store; production uses
/// [`BucketClient`].
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Whether an object exists at exactly `key`.
    async fn exists(&self, key: &str) -> bool;

    /// Whether any object exists under `prefix`.
    async fn exists_prefix(&self, prefix: &str) -> bool;

    /// Upload a local file to `key`.
    async fn upload(&self, local_path: &Path, key: &str) -> Result<(), TransferError>;

    /// Upload an in-memory payload to `key`.
    async fn upload_bytes(&self, bytes: Vec<u8>, key: &str) -> Result<(), TransferError>;

    /// Download the object at `key` into `local_path`.
    async fn download(&self, key: &str, local_path: &Path) -> Result<(), TransferError>;
}

/// S3-compatible bucket client.
///
/// Holds only the descriptor; an SDK client is built per call so the
/// struct stays cheap to clone and credential changes take effect on
/// the next operation.
#[derive(Debug, Clone)]
pub struct BucketClient {
    descriptor: BucketDescriptor,
}

impl BucketClient {
    pub fn new(descriptor: BucketDescriptor) -> Self {
        Self { descriptor }
    }

    pub fn bucket_name(&self) -> &str {
        &self.descriptor.bucket_name
    }

    /// Probe the bucket with a single-object listing.
    ///
    /// A one-key `list_objects_v2` touches transport, credentials, and
    /// bucket existence in one round trip without transferring data.
    pub async fn check_connection(&self) -> Result<(), TransferError> {
        self.descriptor
            .client()
            .list_objects_v2()
            .bucket(&self.descriptor.bucket_name)
            .max_keys(1)
            .send()
            .await
            .map_err(|e| TransferError::Bucket(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for BucketClient {
    async fn exists(&self, key: &str) -> bool {
        match self
            .descriptor
            .client()
            .head_object()
            .bucket(&self.descriptor.bucket_name)
            .key(key)
            .send()
            .await
        {
            Ok(_) => true,
            Err(e) => {
                // Missing keys and transport errors both read as absent;
                // the subsequent upload surfaces any real fault.
                debug!(key, error = %e, "head_object returned error, treating as absent");
                false
            }
        }
    }

    async fn exists_prefix(&self, prefix: &str) -> bool {
        match self
            .descriptor
            .client()
            .list_objects_v2()
            .bucket(&self.descriptor.bucket_name)
            .prefix(prefix)
            .max_keys(1)
            .send()
            .await
        {
            Ok(output) => output.key_count().unwrap_or(0) > 0,
            Err(e) => {
                warn!(prefix, error = %e, "prefix listing failed, treating as absent");
                false
            }
        }
    }

    async fn upload(&self, local_path: &Path, key: &str) -> Result<(), TransferError> {
        let body = ByteStream::from_path(local_path)
            .await
            .map_err(|e| TransferError::Staging(e.to_string()))?;
        self.descriptor
            .client()
            .put_object()
            .bucket(&self.descriptor.bucket_name)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(|e| TransferError::Bucket(e.to_string()))?;
        debug!(key, "uploaded object");
        Ok(())
    }

    async fn upload_bytes(&self, bytes: Vec<u8>, key: &str) -> Result<(), TransferError> {
        self.descriptor
            .client()
            .put_object()
            .bucket(&self.descriptor.bucket_name)
            .key(key)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| TransferError::Bucket(e.to_string()))?;
        debug!(key, "uploaded object");
        Ok(())
    }

    async fn download(&self, key: &str, local_path: &Path) -> Result<(), TransferError> {
        let output = self
            .descriptor
            .client()
            .get_object()
            .bucket(&self.descriptor.bucket_name)
            .key(key)
            .send()
            .await
            .map_err(|e| TransferError::Bucket(e.to_string()))?;
        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| TransferError::Bucket(e.to_string()))?
            .into_bytes();
        tokio::fs::write(local_path, &bytes).await?;
        Ok(())
    }
}
