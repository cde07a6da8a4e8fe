use crate::keys::{join_url, validate_key};
use crate::traits::{Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use std::io::Write;
use tempfile::NamedTempFile;

/// Local filesystem storage implementation
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for blobs (e.g., "./data/media")
    /// * `base_url` - Base URL the directory is served under (e.g., "http://localhost:3000/media")
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            base_url,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Convert storage key to filesystem path with traversal checks.
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        validate_key(storage_key)?;

        let path = self.base_path.join(storage_key);

        let base_canonical = self.base_path.canonicalize().map_err(|e| {
            StorageError::ConfigError(format!("Failed to canonicalize base path: {}", e))
        })?;

        // Existing symlinks could still point outside the root.
        if let Ok(canonical) = path.canonicalize() {
            if canonical.strip_prefix(&base_canonical).is_err() {
                return Err(StorageError::InvalidKey(
                    "Storage key resolves outside storage directory".to_string(),
                ));
            }
        }

        Ok(path)
    }

    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

/// Write `data` to a temporary sibling of `target`, then move it into place.
///
/// A failed write never leaves a partial object at `target`. Without
/// `overwrite` the final move fails with `AlreadyExists` if `target` exists.
fn write_staged(target: &Path, data: &[u8], overwrite: bool) -> std::io::Result<()> {
    let dir = target.parent().unwrap_or_else(|| Path::new("."));
    let mut staged = NamedTempFile::new_in(dir)?;
    staged.write_all(data)?;
    staged.as_file().sync_all()?;

    if overwrite {
        staged.persist(target).map_err(|e| e.error)?;
    } else {
        staged.persist_noclobber(target).map_err(|e| e.error)?;
    }
    Ok(())
}

#[async_trait]
impl Storage for LocalStorage {
    async fn upload(
        &self,
        path: &str,
        data: Bytes,
        _content_type: &str,
        overwrite: bool,
    ) -> StorageResult<String> {
        let file_path = self.key_to_path(path)?;
        let size = data.len();

        self.ensure_parent_dir(&file_path).await?;

        let start = std::time::Instant::now();

        let target = file_path.clone();
        let staged = tokio::task::spawn_blocking(move || write_staged(&target, &data, overwrite))
            .await
            .map_err(|e| StorageError::UploadFailed(format!("Write task failed: {}", e)))?;

        staged.map_err(|e| {
            if e.kind() == ErrorKind::AlreadyExists {
                StorageError::AlreadyExists(path.to_string())
            } else {
                StorageError::UploadFailed(format!(
                    "Failed to write file {}: {}",
                    file_path.display(),
                    e
                ))
            }
        })?;

        tracing::debug!(
            path = %file_path.display(),
            key = %path,
            size_bytes = size,
            overwrite,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(path.to_string())
    }

    async fn download(&self, path: &str) -> StorageResult<Bytes> {
        let file_path = self.key_to_path(path)?;
        let start = std::time::Instant::now();

        let data = match fs::read(&file_path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::NotFound(path.to_string()))
            }
            Err(e) => {
                return Err(StorageError::DownloadFailed(format!(
                    "Failed to read file {}: {}",
                    file_path.display(),
                    e
                )))
            }
        };

        tracing::debug!(
            key = %path,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage download successful"
        );

        Ok(Bytes::from(data))
    }

    fn public_url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    async fn delete(&self, paths: &[String]) -> StorageResult<()> {
        for path in paths {
            let file_path = self.key_to_path(path)?;
            match fs::remove_file(&file_path).await {
                Ok(()) => {
                    tracing::debug!(key = %path, "Local storage delete successful");
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(StorageError::DeleteFailed(format!(
                        "Failed to delete file {}: {}",
                        file_path.display(),
                        e
                    )))
                }
            }
        }
        Ok(())
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        let file_path = self.key_to_path(path)?;
        fs::try_exists(&file_path).await.map_err(|e| {
            StorageError::BackendError(format!(
                "Failed to check {}: {}",
                file_path.display(),
                e
            ))
        })
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn storage(dir: &tempfile::TempDir) -> LocalStorage {
        LocalStorage::new(dir.path(), "http://localhost:3000/media".to_string())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_local_storage_upload_download() {
        let dir = tempdir().unwrap();
        let storage = storage(&dir).await;
        let data = Bytes::from_static(b"jpeg bytes");

        let key = storage
            .upload("originals/c1/a.jpg", data.clone(), "image/jpeg", false)
            .await
            .unwrap();

        assert_eq!(key, "originals/c1/a.jpg");
        assert_eq!(storage.download(&key).await.unwrap(), data);
        assert_eq!(
            storage.public_url(&key),
            "http://localhost:3000/media/originals/c1/a.jpg"
        );
    }

    #[tokio::test]
    async fn test_no_overwrite_conflicts() {
        let dir = tempdir().unwrap();
        let storage = storage(&dir).await;
        let key = "originals/c1/a.jpg";

        storage
            .upload(key, Bytes::from_static(b"one"), "image/jpeg", false)
            .await
            .unwrap();
        let result = storage
            .upload(key, Bytes::from_static(b"two"), "image/jpeg", false)
            .await;
        assert!(matches!(result, Err(StorageError::AlreadyExists(_))));
        assert_eq!(storage.download(key).await.unwrap().as_ref(), b"one");
    }

    #[tokio::test]
    async fn test_overwrite_replaces_contents() {
        let dir = tempdir().unwrap();
        let storage = storage(&dir).await;
        let key = "processed/c1/p1.jpg";

        storage
            .upload(key, Bytes::from_static(b"first render"), "image/jpeg", true)
            .await
            .unwrap();
        storage
            .upload(key, Bytes::from_static(b"second"), "image/jpeg", true)
            .await
            .unwrap();
        assert_eq!(storage.download(key).await.unwrap().as_ref(), b"second");
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempdir().unwrap();
        let storage = storage(&dir).await;

        let result = storage.download("../../../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.delete(&["../etc/passwd".to_string()]).await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.exists("/etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_missing_object_is_not_found() {
        let dir = tempdir().unwrap();
        let storage = storage(&dir).await;

        let result = storage.download("originals/c1/missing.jpg").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_many_ignores_missing() {
        let dir = tempdir().unwrap();
        let storage = storage(&dir).await;
        storage
            .upload("thumbnails/c1/p1.jpg", Bytes::from_static(b"t"), "image/jpeg", true)
            .await
            .unwrap();

        storage
            .delete(&[
                "thumbnails/c1/p1.jpg".to_string(),
                "thumbnails/c1/missing.jpg".to_string(),
            ])
            .await
            .unwrap();
        assert!(!storage.exists("thumbnails/c1/p1.jpg").await.unwrap());
    }

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_rejected_write_leaves_no_staged_files() {
        let dir = tempdir().unwrap();
        let storage = storage(&dir).await;
        let key = "originals/c1/a.jpg";

        storage
            .upload(key, Bytes::from_static(b"complete original"), "image/jpeg", false)
            .await
            .unwrap();
        let result = storage
            .upload(key, Bytes::from_static(b"x"), "image/jpeg", false)
            .await;

        assert!(matches!(result, Err(StorageError::AlreadyExists(_))));
        assert_eq!(entries(&dir.path().join("originals/c1")), vec!["a.jpg"]);
        assert_eq!(
            storage.download(key).await.unwrap().as_ref(),
            b"complete original"
        );
    }

    #[test]
    fn test_staged_write_fails_without_touching_target() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("missing-dir").join("a.jpg");

        let err = write_staged(&target, b"data", false).unwrap_err();
        assert_ne!(err.kind(), ErrorKind::AlreadyExists);
        assert!(!target.exists());
        assert!(entries(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_exists_reports_io_errors() {
        let dir = tempdir().unwrap();
        let storage = storage(&dir).await;
        storage
            .upload("originals/c1", Bytes::from_static(b"file"), "image/jpeg", false)
            .await
            .unwrap();

        assert!(storage.exists("originals/c1").await.unwrap());
        assert!(!storage.exists("originals/other.jpg").await.unwrap());
        // A path below a regular file cannot be resolved.
        let result = storage.exists("originals/c1/a.jpg").await;
        assert!(matches!(result, Err(StorageError::BackendError(_))));
    }
}
