use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{ObjectKey, ObjectStore, ObjectStoreError, StoredObject};

/// Object store rooted at a local directory. Keys map to relative paths.
///
/// The MIME type is not stored; it is recovered from the key's extension,
/// which is derived from the upload's MIME type when the key is minted.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &ObjectKey) -> PathBuf {
        key.as_str()
            .split('/')
            .fold(self.root.clone(), |path, segment| path.join(segment))
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn put_object(
        &self,
        key: &ObjectKey,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(key = %key, content_type, size = bytes.len(), "Object stored");
        Ok(())
    }

    async fn get_object(&self, key: &ObjectKey) -> Result<StoredObject, ObjectStoreError> {
        let path = self.path_for(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ObjectStoreError::NotFound(key.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        let content_type = mime_guess::from_path(&path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok(StoredObject {
            bytes,
            content_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_roundtrips_bytes_and_type() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());
        let key = ObjectKey::parse("patients/p-1/scan.png").unwrap();

        store.put_object(&key, b"\x89PNG...", "image/png").await.unwrap();
        let object = store.get_object(&key).await.unwrap();

        assert_eq!(object.bytes, b"\x89PNG...");
        assert_eq!(object.content_type, "image/png");
        assert!(dir.path().join("patients").join("p-1").join("scan.png").exists());
    }

    #[tokio::test]
    async fn missing_object_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());
        let key = ObjectKey::parse("patients/none.jpg").unwrap();

        assert!(matches!(
            store.get_object(&key).await,
            Err(ObjectStoreError::NotFound(k)) if k == "patients/none.jpg"
        ));
    }

    #[tokio::test]
    async fn unknown_extension_is_octet_stream() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());
        let key = ObjectKey::parse("uploads/blob.bin").unwrap();

        store.put_object(&key, b"raw", "application/octet-stream").await.unwrap();
        assert_eq!(
            store.get_object(&key).await.unwrap().content_type,
            "application/octet-stream"
        );
    }
}
