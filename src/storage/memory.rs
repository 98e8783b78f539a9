// In-process backend for local development (STORAGE_PROVIDER=memory)

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use super::{ObjectBackend, StorageError};

#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub data: Bytes,
    pub content_type: String,
}

pub struct MemoryBackend {
    bucket: String,
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl MemoryBackend {
    pub fn new(bucket: &str) -> Self {
        let bucket = if bucket.is_empty() { "local" } else { bucket };
        Self {
            bucket: bucket.to_string(),
            objects: RwLock::new(HashMap::new()),
        }
    }

    pub async fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects.read().await.get(key).cloned()
    }

    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ObjectBackend for MemoryBackend {
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), StorageError> {
        self.objects.write().await.insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.objects.write().await.remove(key);
        Ok(())
    }

    async fn presign_get(&self, key: &str, expiration_secs: u32) -> Result<String, StorageError> {
        if !self.objects.read().await.contains_key(key) {
            return Err(StorageError::NotFound(key.to_string()));
        }
        Ok(format!(
            "memory://{}/{}?X-Amz-Expires={}",
            self.bucket, key, expiration_secs
        ))
    }
}
