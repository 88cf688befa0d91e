use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::presigning::PresigningConfig;
use thiserror::Error;

use crate::config;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("presigning failed: {0}")]
    Presign(String),
}

/// Object-storage collaborator, reduced to the two operations the platform
/// needs: time-limited upload and download URLs for an opaque object key.
#[async_trait]
pub trait AssetStore: Send + Sync {
    async fn upload_url(&self, key: &str, ttl: Duration) -> Result<String, AssetError>;
    async fn download_url(&self, key: &str, ttl: Duration) -> Result<String, AssetError>;
}

/// S3-backed implementation using SDK presigning.
pub struct S3Assets {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Assets {
    pub async fn from_env() -> Self {
        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self {
            client: aws_sdk_s3::Client::new(&aws_config),
            bucket: config::config().assets.bucket.clone(),
        }
    }
}

#[async_trait]
impl AssetStore for S3Assets {
    async fn upload_url(&self, key: &str, ttl: Duration) -> Result<String, AssetError> {
        let presigning = PresigningConfig::expires_in(ttl)
            .map_err(|e| AssetError::Presign(e.to_string()))?;
        let request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| AssetError::Presign(e.to_string()))?;
        Ok(request.uri().to_string())
    }

    async fn download_url(&self, key: &str, ttl: Duration) -> Result<String, AssetError> {
        let presigning = PresigningConfig::expires_in(ttl)
            .map_err(|e| AssetError::Presign(e.to_string()))?;
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| AssetError::Presign(e.to_string()))?;
        Ok(request.uri().to_string())
    }
}
