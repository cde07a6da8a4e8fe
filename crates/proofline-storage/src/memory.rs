//! In-memory object store for tests and single-process runs.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;

use crate::keys::{join_url, validate_key};
use crate::traits::{Storage, StorageError, StorageResult};
use crate::StorageBackend;

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    content_type: String,
}

pub struct MemoryStorage {
    objects: RwLock<BTreeMap<String, StoredObject>>,
    base_url: String,
    max_object_size: Option<usize>,
}

impl MemoryStorage {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
            base_url: base_url.into(),
            max_object_size: None,
        }
    }

    /// Reject objects larger than `bytes` with [`StorageError::PayloadTooLarge`].
    pub fn with_max_object_size(mut self, bytes: usize) -> Self {
        self.max_object_size = Some(bytes);
        self
    }

    /// Stored paths in lexical order.
    pub fn paths(&self) -> Vec<String> {
        self.objects
            .read()
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.objects.read().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn content_type(&self, path: &str) -> Option<String> {
        self.objects
            .read()
            .ok()
            .and_then(|objects| objects.get(path).map(|o| o.content_type.clone()))
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new("memory://media")
    }
}

fn poisoned<T>(_: T) -> StorageError {
    StorageError::BackendError("memory storage lock poisoned".to_string())
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn upload(
        &self,
        path: &str,
        data: Bytes,
        content_type: &str,
        overwrite: bool,
    ) -> StorageResult<String> {
        validate_key(path)?;
        if let Some(max) = self.max_object_size {
            if data.len() > max {
                return Err(StorageError::PayloadTooLarge(format!(
                    "{} bytes exceeds {} bytes",
                    data.len(),
                    max
                )));
            }
        }

        let mut objects = self.objects.write().map_err(poisoned)?;
        if !overwrite && objects.contains_key(path) {
            return Err(StorageError::AlreadyExists(path.to_string()));
        }
        objects.insert(
            path.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(path.to_string())
    }

    async fn download(&self, path: &str) -> StorageResult<Bytes> {
        validate_key(path)?;
        let objects = self.objects.read().map_err(poisoned)?;
        objects
            .get(path)
            .map(|o| o.data.clone())
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    fn public_url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    async fn delete(&self, paths: &[String]) -> StorageResult<()> {
        for path in paths {
            validate_key(path)?;
        }
        let mut objects = self.objects.write().map_err(poisoned)?;
        for path in paths {
            objects.remove(path);
        }
        Ok(())
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        validate_key(path)?;
        Ok(self.objects.read().map_err(poisoned)?.contains_key(path))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_only_uploads_conflict() {
        let storage = MemoryStorage::default();
        storage
            .upload("originals/c/a.png", Bytes::from_static(b"a"), "image/png", false)
            .await
            .unwrap();
        let err = storage
            .upload("originals/c/a.png", Bytes::from_static(b"b"), "image/png", false)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));
        assert_eq!(storage.content_type("originals/c/a.png").as_deref(), Some("image/png"));
    }

    #[tokio::test]
    async fn oversized_objects_are_rejected() {
        let storage = MemoryStorage::default().with_max_object_size(4);
        let err = storage
            .upload("originals/c/a.jpg", Bytes::from_static(b"12345"), "image/jpeg", false)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::PayloadTooLarge(_)));
        assert!(storage.is_empty());
    }
}
