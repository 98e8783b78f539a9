// S3-compatible backend built on rust-s3

use async_trait::async_trait;
use bytes::Bytes;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::region::Region;
use s3::Bucket;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::{ObjectBackend, StorageError};
use crate::config::StorageConfig;

pub struct S3Backend {
    config: StorageConfig,
    bucket: OnceCell<Bucket>,
}

impl S3Backend {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            bucket: OnceCell::new(),
        }
    }

    /// The bucket handle is built on first use and reused afterwards.
    async fn bucket(&self) -> Result<&Bucket, StorageError> {
        let bucket = self
            .bucket
            .get_or_try_init(|| async { self.build_bucket() })
            .await?;
        Ok(bucket)
    }

    fn build_bucket(&self) -> Result<Bucket, StorageError> {
        let region = match &self.config.s3_endpoint {
            Some(endpoint) => Region::Custom {
                region: self.config.s3_region.clone(),
                endpoint: endpoint.trim_end_matches('/').to_string(),
            },
            None => self
                .config
                .s3_region
                .parse()
                .map_err(|e| StorageError::Config(format!("invalid region: {}", e)))?,
        };

        let credentials = Credentials::new(
            self.config.s3_access_key_id.as_deref(),
            self.config.s3_secret_access_key.as_deref(),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::Config(format!("invalid credentials: {}", e)))?;

        let mut bucket = Bucket::new(&self.config.s3_bucket, region, credentials)?;
        if self.config.s3_path_style {
            bucket = bucket.with_path_style();
        }

        info!(bucket = %self.config.s3_bucket, "Initialized S3 bucket client");
        Ok(bucket)
    }
}

#[async_trait]
impl ObjectBackend for S3Backend {
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), StorageError> {
        debug!("Uploading object to S3: {} ({} bytes)", key, data.len());
        let bucket = self.bucket().await?;
        bucket
            .put_object_with_content_type(key, &data, content_type)
            .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        debug!("Deleting object from S3: {}", key);
        let bucket = self.bucket().await?;
        match bucket.delete_object(key).await {
            Ok(_) => Ok(()),
            Err(S3Error::HttpFailWithBody(404, _)) => {
                debug!("Object already absent: {}", key);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn presign_get(&self, key: &str, expiration_secs: u32) -> Result<String, StorageError> {
        let bucket = self.bucket().await?;
        let url = bucket.presign_get(key, expiration_secs, None).await?;
        Ok(url)
    }
}
