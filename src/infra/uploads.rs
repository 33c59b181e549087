//! Filesystem storage for post images.

use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use sha2::{Digest, Sha256};
use slug::slugify;
use thiserror::Error;
use tokio::{fs, io::AsyncWriteExt};
use uuid::Uuid;

/// Top-level directory under the upload root that holds post images.
pub const POST_IMAGE_DIR: &str = "posts";

#[derive(Debug, Error)]
pub enum UploadStorageError {
    #[error("invalid stored path")]
    InvalidPath,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("uploaded file is empty")]
    EmptyPayload,
}

/// Result of storing an upload payload.
#[derive(Debug, Clone)]
pub struct StoredUpload {
    /// Path relative to the storage root, always `/`-separated.
    pub stored_path: String,
    pub checksum: String,
    pub size_bytes: u64,
}

#[derive(Debug)]
pub struct UploadStorage {
    root: PathBuf,
}

impl UploadStorage {
    /// Initialise storage rooted at the provided directory, creating it if necessary.
    pub fn new(root: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `data` under a fresh dated path derived from `original_name`.
    pub async fn store(
        &self,
        original_name: &str,
        data: Bytes,
    ) -> Result<StoredUpload, UploadStorageError> {
        if data.is_empty() {
            return Err(UploadStorageError::EmptyPayload);
        }

        let stored_path = build_stored_path(original_name);
        let absolute = self.resolve(&stored_path)?;

        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&absolute).await?;
        if let Err(err) = file.write_all(&data).await {
            drop(file);
            let _ = fs::remove_file(&absolute).await;
            return Err(err.into());
        }
        file.flush().await?;

        let checksum = hex::encode(Sha256::digest(&data));

        Ok(StoredUpload {
            stored_path,
            checksum,
            size_bytes: data.len() as u64,
        })
    }

    pub async fn read(&self, stored_path: &str) -> Result<Bytes, UploadStorageError> {
        let absolute = self.resolve(stored_path)?;
        let data = fs::read(absolute).await?;
        Ok(Bytes::from(data))
    }

    /// Remove the stored payload. Missing files are treated as success.
    pub async fn delete(&self, stored_path: &str) -> Result<(), UploadStorageError> {
        let absolute = self.resolve(stored_path)?;
        match fs::remove_file(&absolute).await {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(UploadStorageError::Io(err)),
        }
    }

    fn resolve(&self, stored_path: &str) -> Result<PathBuf, UploadStorageError> {
        let relative = Path::new(stored_path);
        if stored_path.is_empty()
            || relative.is_absolute()
            || relative.components().any(|component| {
                matches!(
                    component,
                    Component::ParentDir | Component::Prefix(_) | Component::RootDir
                )
            })
        {
            return Err(UploadStorageError::InvalidPath);
        }

        Ok(self.root.join(relative))
    }
}

fn build_stored_path(original_name: &str) -> String {
    let (year, month, day) = time::OffsetDateTime::now_utc().to_calendar_date();
    let identifier = Uuid::new_v4().simple();
    let filename = sanitize_filename(original_name);
    format!(
        "{POST_IMAGE_DIR}/{year}/{:02}/{:02}/{identifier}-{filename}",
        month as u8, day
    )
}

fn sanitize_filename(original: &str) -> String {
    let path = Path::new(original);
    let stem = path
        .file_stem()
        .and_then(|value| value.to_str())
        .unwrap_or("upload");
    let mut base = slugify(stem);
    if base.is_empty() {
        base = "upload".to_string();
    }

    let extension = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.trim_matches('.').to_ascii_lowercase())
        .filter(|value| !value.is_empty());

    match extension {
        Some(ext) => format!("{base}.{ext}"),
        None => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filenames_are_slugified_with_lowercase_extension() {
        assert_eq!(sanitize_filename("My Cat Photo.JPG"), "my-cat-photo.jpg");
        assert_eq!(sanitize_filename("???.png"), "upload.png");
        assert_eq!(sanitize_filename("noext"), "noext");
    }

    #[test]
    fn stored_paths_are_dated_under_posts() {
        let path = build_stored_path("small.gif");
        assert!(path.starts_with("posts/"));
        assert!(path.ends_with("-small.gif"));
        assert_eq!(path.split('/').count(), 5);
    }

    #[tokio::test]
    async fn store_read_delete_cycle() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = UploadStorage::new(dir.path().to_path_buf()).expect("storage");

        let stored = storage
            .store("small.gif", Bytes::from_static(b"GIF89a"))
            .await
            .expect("store");
        assert_eq!(stored.size_bytes, 6);
        assert_eq!(stored.checksum.len(), 64);

        let data = storage.read(&stored.stored_path).await.expect("read");
        assert_eq!(&data[..], b"GIF89a");

        storage.delete(&stored.stored_path).await.expect("delete");
        storage
            .delete(&stored.stored_path)
            .await
            .expect("second delete is a no-op");
        assert!(storage.read(&stored.stored_path).await.is_err());
    }

    #[tokio::test]
    async fn empty_payload_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = UploadStorage::new(dir.path().to_path_buf()).expect("storage");
        let result = storage.store("empty.png", Bytes::new()).await;
        assert!(matches!(result, Err(UploadStorageError::EmptyPayload)));
    }

    #[tokio::test]
    async fn traversal_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = UploadStorage::new(dir.path().to_path_buf()).expect("storage");
        for path in ["../secret", "/etc/passwd", "posts/../../x", ""] {
            assert!(
                matches!(
                    storage.read(path).await,
                    Err(UploadStorageError::InvalidPath)
                ),
                "{path} should be rejected"
            );
        }
    }
}
