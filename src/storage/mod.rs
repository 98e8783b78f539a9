//! Object storage for task images.
//!
//! `StorageClient` is what handlers talk to. It wraps an [`ObjectBackend`]
//! (S3-compatible bucket or in-memory map) and owns the rules that are
//! independent of the backend: empty-key short circuits, the extension
//! whitelist and storage key generation.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::{StorageConfig, StorageProvider};

pub mod memory;
pub mod s3_client;

pub use memory::MemoryBackend;
pub use s3_client::S3Backend;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("S3 request failed: {0}")]
    Backend(#[from] s3::error::S3Error),

    #[error("Storage misconfigured: {0}")]
    Config(String),

    #[error("Object not found: {0}")]
    NotFound(String),
}

/// Raw operations against a bucket.
#[async_trait]
pub trait ObjectBackend: Send + Sync {
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), StorageError>;

    /// Removing an object that does not exist is not an error.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;

    async fn presign_get(&self, key: &str, expiration_secs: u32) -> Result<String, StorageError>;
}

#[derive(Clone)]
pub struct StorageClient {
    backend: Arc<dyn ObjectBackend>,
    allowed_extensions: Arc<BTreeSet<String>>,
}

impl StorageClient {
    pub fn new(backend: Arc<dyn ObjectBackend>, allowed_extensions: BTreeSet<String>) -> Self {
        Self {
            backend,
            allowed_extensions: Arc::new(allowed_extensions),
        }
    }

    /// Picks the backend named by the configuration. No connection is made here.
    pub fn from_config(config: &StorageConfig) -> Self {
        let backend: Arc<dyn ObjectBackend> = match config.provider {
            StorageProvider::S3 => Arc::new(S3Backend::new(config.clone())),
            StorageProvider::Memory => Arc::new(MemoryBackend::new(&config.s3_bucket)),
        };
        info!(provider = ?config.provider, bucket = %config.s3_bucket, "Storage client configured");
        Self::new(backend, config.allowed_extensions.clone())
    }

    /// Stores `data` under `key` and returns the key.
    pub async fn upload(&self, data: Bytes, key: &str, content_type: &str) -> Result<String, StorageError> {
        match self.backend.put(key, data, content_type).await {
            Ok(()) => {
                info!(key, content_type, "Uploaded object");
                Ok(key.to_string())
            }
            Err(e) => {
                error!("Failed to upload file to storage: {}", e);
                Err(e)
            }
        }
    }

    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        if key.is_empty() {
            return Ok(());
        }

        match self.backend.remove(key).await {
            Ok(()) => {
                info!(key, "Deleted object");
                Ok(())
            }
            Err(e) => {
                error!("Failed to delete file from storage: {}", e);
                Err(e)
            }
        }
    }

    /// Time-limited download URL, or `None` for an empty key or a backend failure.
    pub async fn presigned_url(&self, key: &str, expiration_secs: u32) -> Option<String> {
        if key.is_empty() {
            return None;
        }

        match self.backend.presign_get(key, expiration_secs).await {
            Ok(url) => Some(url),
            Err(e) => {
                error!("Failed to generate download URL: {}", e);
                None
            }
        }
    }

    pub fn allowed_extensions(&self) -> &BTreeSet<String> {
        &self.allowed_extensions
    }

    pub fn is_allowed_extension(&self, extension: &str) -> bool {
        self.allowed_extensions.contains(&extension.to_lowercase())
    }

    /// Random v4 UUID plus the lowercased extension of `original_filename`, if it has one.
    pub fn generate_unique_key(original_filename: &str) -> String {
        let unique_id = Uuid::new_v4();
        match file_extension(original_filename) {
            Some(ext) if !ext.is_empty() => format!("{}.{}", unique_id, ext),
            _ => unique_id.to_string(),
        }
    }
}

/// Lowercased text after the last dot, `None` when the name has no dot.
pub fn file_extension(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
}
