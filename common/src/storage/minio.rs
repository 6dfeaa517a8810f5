// MinIO / S3 object storage via rust-s3

use super::ObjectStorage;
use crate::config::StorageConfig;
use crate::errors::StorageError;
use async_trait::async_trait;
use s3::bucket::Bucket;
use s3::creds::Credentials;
use s3::region::Region;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

/// Bucket client for an S3-compatible endpoint (path-style addressing)
#[derive(Clone, Debug)]
pub struct MinioStorage {
    bucket: Arc<Bucket>,
    public_base_url: String,
}

impl MinioStorage {
    #[instrument(skip(config), fields(endpoint = %config.endpoint, bucket = %config.bucket))]
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        // Region::Custom expects the endpoint with its scheme for non-AWS hosts
        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        };

        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| {
            error!(error = %e, "Invalid object storage credentials");
            StorageError::ConnectionFailed(format!("Failed to create credentials: {}", e))
        })?;

        let bucket = Bucket::new(&config.bucket, region, credentials)
            .map_err(|e| {
                error!(error = %e, "Failed to configure bucket");
                StorageError::ConnectionFailed(format!("Failed to create bucket: {}", e))
            })?
            .with_path_style();

        let public_base_url = if config.public_base_url.is_empty() {
            format!(
                "{}/{}",
                config.endpoint.trim_end_matches('/'),
                config.bucket
            )
        } else {
            config.public_base_url.trim_end_matches('/').to_string()
        };

        info!(bucket = %config.bucket, "Object storage client initialized");

        Ok(Self {
            bucket: Arc::new(bucket),
            public_base_url,
        })
    }

    /// List at most one key to verify credentials and connectivity
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), StorageError> {
        self.bucket
            .list(String::new(), Some("/".to_string()))
            .await
            .map_err(|e| {
                error!(error = %e, "Object storage health check failed");
                StorageError::ObjectStoreError(format!("Health check failed: {}", e))
            })?;
        Ok(())
    }
}

fn check_status(status: u16, action: &str, key: &str) -> Result<(), StorageError> {
    if (200..300).contains(&status) {
        Ok(())
    } else {
        Err(StorageError::ObjectStoreError(format!(
            "Failed to {} '{}': status {}",
            action, key, status
        )))
    }
}

#[async_trait]
impl ObjectStorage for MinioStorage {
    #[instrument(skip(self, data), fields(size = data.len()))]
    async fn put_object(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<(), StorageError> {
        let response = self
            .bucket
            .put_object_with_content_type(key, data, content_type)
            .await
            .map_err(|e| {
                error!(error = %e, key = %key, "Failed to store object");
                StorageError::ObjectStoreError(format!("Failed to put object '{}': {}", key, e))
            })?;

        check_status(response.status_code(), "put object", key)?;
        debug!(key = %key, "Object stored");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        let response = self.bucket.delete_object(key).await.map_err(|e| {
            error!(error = %e, key = %key, "Failed to delete object");
            StorageError::ObjectStoreError(format!("Failed to delete object '{}': {}", key, e))
        })?;

        // S3 answers 204 for missing keys as well; 404 only comes from a missing bucket
        check_status(response.status_code(), "delete object", key)?;
        debug!(key = %key, "Object deleted");
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }
}
