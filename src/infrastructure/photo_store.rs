use crate::domain::error::{AppError, Result};
use crate::domain::ports::PhotoStore;
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use url::Url;
use uuid::Uuid;

/// Photo store backed by a local directory, served elsewhere under `public_base`.
///
/// Blobs live at `<root>/<namespace>/<key>`; the URL mirrors that layout.
pub struct FileSystemPhotoStore {
    root: PathBuf,
    public_base: Url,
}

impl FileSystemPhotoStore {
    pub fn new(root: impl Into<PathBuf>, public_base: &str) -> Result<Self> {
        let mut public_base = Url::parse(public_base).map_err(|e| {
            AppError::ConfigError(format!("Invalid photo public base URL {public_base}: {e}"))
        })?;
        if !public_base.path().ends_with('/') {
            let path = format!("{}/", public_base.path());
            public_base.set_path(&path);
        }

        Ok(Self {
            root: root.into(),
            public_base,
        })
    }

    fn blob_path(&self, namespace: &str, key: &str) -> Result<PathBuf> {
        let relative = relative_key(namespace, key)?;
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl PhotoStore for FileSystemPhotoStore {
    async fn upload(&self, namespace: &str, key: &str, data: &[u8]) -> Result<String> {
        let path = self.blob_path(namespace, key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::StorageError(format!("Failed to create dir {}: {e}", parent.display()))
            })?;
        }

        // Write-then-rename so a reader never sees a half-written photo.
        let tmp_path = path.with_extension(format!("tmp-{}", Uuid::new_v4()));
        fs::write(&tmp_path, data).await.map_err(|e| {
            AppError::StorageError(format!("Failed to write {}: {e}", tmp_path.display()))
        })?;
        if let Err(e) = fs::rename(&tmp_path, &path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(AppError::StorageError(format!(
                "Failed to move photo into {}: {e}",
                path.display()
            )));
        }

        tracing::debug!(namespace, key, bytes = data.len(), "Stored photo");
        Ok(key.to_string())
    }

    async fn resolve_url(&self, namespace: &str, key: &str) -> Result<String> {
        let relative = relative_key(namespace, key)?;
        let relative = relative.to_string_lossy().replace('\\', "/");
        self.public_base
            .join(&relative)
            .map(|url| url.to_string())
            .map_err(|e| AppError::StorageError(format!("Failed to build URL for {key}: {e}")))
    }
}

/// `namespace/key`, refusing anything that could escape the store root.
fn relative_key(namespace: &str, key: &str) -> Result<PathBuf> {
    let relative = Path::new(namespace).join(key);
    let is_plain = !key.is_empty()
        && relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
    if !is_plain {
        return Err(AppError::ValidationError(format!(
            "Photo key must be a relative path without '..': {namespace}/{key}"
        )));
    }
    Ok(relative)
}

#[cfg(test)]
pub(crate) mod memory {
    use super::*;
    use std::collections::{BTreeMap, HashSet};
    use std::sync::Mutex;

    /// In-process store that records every upload and can be told to fail URL lookups.
    #[derive(Default)]
    pub(crate) struct MemoryPhotoStore {
        blobs: Mutex<BTreeMap<String, Vec<u8>>>,
        uploads: Mutex<Vec<String>>,
        broken_urls: Mutex<HashSet<String>>,
        fail_uploads: Mutex<bool>,
    }

    impl MemoryPhotoStore {
        pub(crate) fn upload_count(&self) -> usize {
            self.uploads.lock().unwrap().len()
        }

        pub(crate) fn keys(&self) -> Vec<String> {
            self.blobs.lock().unwrap().keys().cloned().collect()
        }

        pub(crate) fn blob(&self, namespace: &str, key: &str) -> Option<Vec<u8>> {
            self.blobs
                .lock()
                .unwrap()
                .get(&format!("{namespace}/{key}"))
                .cloned()
        }

        pub(crate) fn break_url(&self, key: &str) {
            self.broken_urls.lock().unwrap().insert(key.to_string());
        }

        pub(crate) fn fail_uploads(&self) {
            *self.fail_uploads.lock().unwrap() = true;
        }
    }

    #[async_trait]
    impl PhotoStore for MemoryPhotoStore {
        async fn upload(&self, namespace: &str, key: &str, data: &[u8]) -> Result<String> {
            if *self.fail_uploads.lock().unwrap() {
                return Err(AppError::StorageError(format!("upload refused: {key}")));
            }
            self.blobs
                .lock()
                .unwrap()
                .insert(format!("{namespace}/{key}"), data.to_vec());
            self.uploads.lock().unwrap().push(key.to_string());
            Ok(key.to_string())
        }

        async fn resolve_url(&self, namespace: &str, key: &str) -> Result<String> {
            if self.broken_urls.lock().unwrap().contains(key) {
                return Err(AppError::StorageError(format!("cannot presign {key}")));
            }
            Ok(format!("https://photos.test/{namespace}/{key}"))
        }
    }
}
