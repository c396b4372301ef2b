use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use uuid::Uuid;

/// A stored object: `path` is the key used for deletion, `url` is what clients display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub path: String,
    pub url: String,
}

/// Binary object store backed by a directory. Keys are relative, slash-separated paths.
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
    base_url: String,
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }

    /// Build a fresh key under `prefix`, keeping the original extension.
    pub fn new_key(prefix: &str, original_filename: &str) -> String {
        let ext = Path::new(original_filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .filter(|e| e.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or_else(|| "bin".to_string());
        format!("{}/{}.{}", prefix.trim_matches('/'), Uuid::new_v4(), ext)
    }

    /// Map a key to a file under the root, refusing anything that could escape it.
    pub fn resolve(&self, key: &str) -> anyhow::Result<PathBuf> {
        let relative = Path::new(key);
        let clean = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !clean {
            anyhow::bail!("Invalid storage path: {key}");
        }
        Ok(self.root.join(relative))
    }

    pub async fn put(&self, key: &str, data: Bytes) -> anyhow::Result<StoredObject> {
        let full = self.resolve(key)?;
        if let Some(dir) = full.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(&full, &data).await?;
        tracing::debug!("stored {} ({} bytes)", key, data.len());
        Ok(StoredObject {
            path: key.to_string(),
            url: self.url_for(key),
        })
    }

    pub async fn read(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let full = self.resolve(key)?;
        match tokio::fs::read(&full).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete an object. A missing object is not an error. Returns whether a file was removed.
    pub async fn delete(&self, key: &str) -> anyhow::Result<bool> {
        let full = self.resolve(key)?;
        match tokio::fs::remove_file(&full).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Best-effort cleanup of an object written by a step that then failed.
    /// Failures are logged, never returned.
    pub async fn discard(&self, key: &str) -> bool {
        match self.delete(key).await {
            Ok(removed) => removed,
            Err(e) => {
                tracing::warn!("stored object {} left behind after failed write: {}", key, e);
                false
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::temp_storage;
    use super::*;

    #[tokio::test]
    async fn test_put_read_delete() {
        let (storage, root) = temp_storage();

        let stored = storage
            .put("gallery/a.jpg", Bytes::from_static(b"jpeg"))
            .await
            .unwrap();
        assert_eq!(stored.url, "/media/files/gallery/a.jpg");
        assert_eq!(storage.read("gallery/a.jpg").await.unwrap().as_deref(), Some(&b"jpeg"[..]));

        assert!(storage.delete("gallery/a.jpg").await.unwrap());
        assert_eq!(storage.read("gallery/a.jpg").await.unwrap(), None);

        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn test_delete_missing_is_noop() {
        let (storage, _root) = temp_storage();
        assert!(!storage.delete("gallery/never-uploaded.jpg").await.unwrap());
    }

    #[tokio::test]
    async fn test_discard_swallows_failures() {
        let (storage, root) = temp_storage();
        storage.put("profiles/p.jpg", Bytes::from_static(b"jpeg")).await.unwrap();

        assert!(storage.discard("profiles/p.jpg").await);
        assert!(!storage.discard("profiles/p.jpg").await);
        // An unresolvable key fails inside delete; discard only logs it.
        assert!(!storage.discard("../outside.jpg").await);

        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn test_resolve_rejects_escapes() {
        let storage = MediaStorage::new("/data/media", "/media/files");
        assert!(storage.resolve("../etc/passwd").is_err());
        assert!(storage.resolve("/etc/passwd").is_err());
        assert!(storage.resolve("gallery/../../x").is_err());
        assert!(storage.resolve("").is_err());
        assert_eq!(
            storage.resolve("gallery/a.jpg").unwrap(),
            PathBuf::from("/data/media/gallery/a.jpg")
        );
    }

    #[test]
    fn test_new_key_keeps_extension() {
        let key = MediaStorage::new_key("trips/abc", "Beach.JPG");
        assert!(key.starts_with("trips/abc/"));
        assert!(key.ends_with(".jpg"));

        let key = MediaStorage::new_key("gallery", "noext");
        assert!(key.ends_with(".bin"));
    }
}
