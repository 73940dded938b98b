use std::path::{Component, Path, PathBuf};

use repairdesk_shared::clock::MonotonicClock;
use repairdesk_shared::constants::{FALLBACK_UPLOAD_NAME, UPLOADS_PREFIX};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::ServerError;

/// Attempts at finding a free filename before giving up. Only another process
/// writing into the same directory in the same millisecond can use one up.
const MAX_NAME_ATTEMPTS: usize = 16;

/// An uploaded file as written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAttachment {
    /// `{millis}_{sanitized original name}`
    pub file_name: String,
    /// `/uploads/{file_name}`, the value stored in a record's `image` field
    pub reference: String,
}

/// Make a client-supplied filename safe to store: only the last path
/// component is kept, whitespace runs become `_`, and characters that would
/// break the `/uploads/...` URL or the filesystem are replaced with `_`.
pub fn sanitize_file_name(original: &str) -> String {
    let last = original
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();

    let mut out = String::with_capacity(last.len());
    let mut in_whitespace = false;
    for c in last.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                out.push('_');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;
        if c.is_control() || matches!(c, '?' | '#' | '%') {
            out.push('_');
        } else {
            out.push(c);
        }
    }

    match out.as_str() {
        "" | "." | ".." => FALLBACK_UPLOAD_NAME.to_string(),
        _ => out,
    }
}

/// Places uploaded images in a single flat directory.
#[derive(Debug)]
pub struct AttachmentStore {
    base_path: PathBuf,
    max_size: usize,
    clock: MonotonicClock,
}

impl AttachmentStore {
    pub async fn new(base_path: PathBuf, max_size: usize) -> Result<Self, ServerError> {
        fs::create_dir_all(&base_path).await.map_err(|e| {
            ServerError::AttachmentStorage(format!(
                "Failed to create uploads directory '{}': {}",
                base_path.display(),
                e
            ))
        })?;

        info!(path = %base_path.display(), "Attachment store initialized");

        Ok(Self {
            base_path,
            max_size,
            clock: MonotonicClock::new(),
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Write `data` under a fresh `{millis}_{name}` filename. The file is
    /// fully written before this returns.
    pub async fn store(
        &self,
        original_name: &str,
        data: &[u8],
    ) -> Result<StoredAttachment, ServerError> {
        if data.len() > self.max_size {
            return Err(ServerError::UploadTooLarge { max: self.max_size });
        }

        let safe_name = sanitize_file_name(original_name);

        for _ in 0..MAX_NAME_ATTEMPTS {
            let file_name = format!("{}_{}", self.clock.next_millis(), safe_name);
            let path = self.safe_path(&file_name)?;

            let mut file = match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(ServerError::AttachmentStorage(format!(
                        "Failed to create {}: {}",
                        file_name, e
                    )))
                }
            };

            let written = async {
                file.write_all(data).await?;
                file.sync_all().await
            }
            .await;
            if let Err(e) = written {
                let _ = fs::remove_file(&path).await;
                return Err(ServerError::AttachmentStorage(format!(
                    "Failed to write {}: {}",
                    file_name, e
                )));
            }

            debug!(file = %file_name, size = data.len(), "Stored attachment");
            return Ok(StoredAttachment {
                reference: format!("{UPLOADS_PREFIX}/{file_name}"),
                file_name,
            });
        }

        Err(ServerError::AttachmentStorage(format!(
            "No free filename for '{}' after {} attempts",
            safe_name, MAX_NAME_ATTEMPTS
        )))
    }

    /// Delete a stored attachment. Used to undo a write whose record could
    /// not be persisted.
    pub async fn remove(&self, file_name: &str) -> Result<(), ServerError> {
        let path = self.safe_path(file_name)?;
        fs::remove_file(&path).await.map_err(|e| {
            ServerError::AttachmentStorage(format!("Failed to delete {}: {}", file_name, e))
        })?;
        debug!(file = %file_name, "Removed attachment");
        Ok(())
    }

    /// Resolve `file_name` inside the uploads directory. Anything other than
    /// a single plain path component is rejected.
    fn safe_path(&self, file_name: &str) -> Result<PathBuf, ServerError> {
        let mut components = Path::new(file_name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) => Ok(self.base_path.join(name)),
            _ => Err(ServerError::BadRequest(
                "Path traversal detected".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn test_store() -> (AttachmentStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = AttachmentStore::new(dir.path().join("uploads"), 1024)
            .await
            .unwrap();
        (store, dir)
    }

    #[test]
    fn test_sanitize_whitespace_runs() {
        assert_eq!(sanitize_file_name("photo one.png"), "photo_one.png");
        assert_eq!(sanitize_file_name("a  \t b.jpg"), "a_b.jpg");
        assert_eq!(sanitize_file_name(" lead.png"), "_lead.png");
    }

    #[test]
    fn test_sanitize_strips_directories() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\me\\cat.gif"), "cat.gif");
        assert_eq!(sanitize_file_name(".."), "upload");
        assert_eq!(sanitize_file_name("dir/"), "upload");
        assert_eq!(sanitize_file_name(""), "upload");
    }

    #[test]
    fn test_sanitize_url_characters() {
        assert_eq!(sanitize_file_name("100%?#.png"), "100___.png");
    }

    #[tokio::test]
    async fn test_store_writes_bytes() {
        let (store, _dir) = test_store().await;
        let stored = store.store("photo one.png", b"\x89PNG-bytes").await.unwrap();

        let (millis, name) = stored.file_name.split_once('_').unwrap();
        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(name, "photo_one.png");
        assert_eq!(stored.reference, format!("/uploads/{}", stored.file_name));

        let on_disk = std::fs::read(store.base_path().join(&stored.file_name)).unwrap();
        assert_eq!(on_disk, b"\x89PNG-bytes");
    }

    #[tokio::test]
    async fn test_same_name_never_collides() {
        let (store, _dir) = test_store().await;
        let mut names = std::collections::HashSet::new();
        for _ in 0..50 {
            let stored = store.store("same.png", b"x").await.unwrap();
            assert!(names.insert(stored.file_name));
        }
        assert_eq!(std::fs::read_dir(store.base_path()).unwrap().count(), 50);
    }

    #[tokio::test]
    async fn test_too_large_rejected() {
        let (store, _dir) = test_store().await;
        let data = vec![0u8; 1025];
        assert!(matches!(
            store.store("big.png", &data).await,
            Err(ServerError::UploadTooLarge { max: 1024 })
        ));
        assert_eq!(std::fs::read_dir(store.base_path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_remove() {
        let (store, _dir) = test_store().await;
        let stored = store.store("gone.png", b"x").await.unwrap();
        store.remove(&stored.file_name).await.unwrap();
        assert!(!store.base_path().join(&stored.file_name).exists());
    }

    #[tokio::test]
    async fn test_remove_rejects_traversal() {
        let (store, _dir) = test_store().await;
        assert!(store.remove("../submissions.json").await.is_err());
    }
}
