//! In-memory storage backend for tests and single-node development.

use crate::traits::{Storage, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct MemoryStorage {
    objects: Arc<RwLock<HashMap<String, Bytes>>>,
    base_url: String,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            objects: Arc::new(RwLock::new(HashMap::new())),
            base_url: "memory://fines".to_string(),
        }
    }

    fn validate_key(storage_key: &str) -> StorageResult<()> {
        if storage_key.contains("..") || storage_key.starts_with('/') {
            return Err(StorageError::InvalidKey(
                "Storage key contains invalid characters".to_string(),
            ));
        }
        Ok(())
    }

    fn generate_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }

    /// Stored bytes for a key, if any. Test helper.
    pub async fn get(&self, storage_key: &str) -> Option<Bytes> {
        self.objects.read().await.get(storage_key).cloned()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn upload(
        &self,
        storage_key: &str,
        _content_type: &str,
        data: Vec<u8>,
    ) -> StorageResult<String> {
        Self::validate_key(storage_key)?;
        self.objects
            .write()
            .await
            .insert(storage_key.to_string(), Bytes::from(data));
        Ok(self.generate_url(storage_key))
    }

    async fn presigned_url(
        &self,
        storage_key: &str,
        _expires_in: Duration,
    ) -> StorageResult<String> {
        Self::validate_key(storage_key)?;
        if !self.objects.read().await.contains_key(storage_key) {
            return Err(StorageError::NotFound(storage_key.to_string()));
        }
        Ok(self.generate_url(storage_key))
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        Self::validate_key(storage_key)?;
        self.objects.write().await.remove(storage_key);
        Ok(())
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        Self::validate_key(storage_key)?;
        Ok(self.objects.read().await.contains_key(storage_key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_then_exists_and_delete() {
        let storage = MemoryStorage::new();

        let url = storage
            .upload("jean-dupont/1-abcdef-avis.pdf", "application/pdf", vec![1, 2, 3])
            .await
            .unwrap();
        assert_eq!(url, "memory://fines/jean-dupont/1-abcdef-avis.pdf");
        assert!(storage.exists("jean-dupont/1-abcdef-avis.pdf").await.unwrap());

        storage.delete("jean-dupont/1-abcdef-avis.pdf").await.unwrap();
        assert!(!storage.exists("jean-dupont/1-abcdef-avis.pdf").await.unwrap());
    }

    #[tokio::test]
    async fn test_presigned_url_requires_existing_object() {
        let storage = MemoryStorage::new();
        let result = storage
            .presigned_url("missing.pdf", Duration::from_secs(60))
            .await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }
}
