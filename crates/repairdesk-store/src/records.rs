use std::path::{Path, PathBuf};

use repairdesk_shared::SubmissionRecord;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Result, StoreError};

/// Append-only collection of submission records backed by one JSON file.
///
/// Every append rewrites the whole array. Appends within one process are
/// serialized, so two concurrent submissions can never overwrite each
/// other's record. Several processes sharing one file are not supported.
#[derive(Debug)]
pub struct RecordStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl RecordStore {
    /// Use `path` as the records file, creating its parent directory if
    /// needed. The file itself is only created by the first append.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        info!(path = %path.display(), "Record store opened");

        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All records, oldest first. A missing file is an empty store; a file
    /// that does not parse is [`StoreError::Corrupt`].
    pub async fn read_all(&self) -> Result<Vec<SubmissionRecord>> {
        self.parse_file().await
    }

    /// Add `record` to the end of the store.
    ///
    /// Stored entries are carried over as raw JSON, so an entry this version
    /// cannot type (a hand edit, an older priority spelling) is kept as is.
    /// Only a file that is not a JSON array at all is treated as empty; its
    /// old contents are copied aside to a uniquely named `.corrupt` sibling
    /// first.
    pub async fn append(&self, record: &SubmissionRecord) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut entries = match self.read_raw().await {
            Ok(entries) => entries,
            Err(StoreError::Corrupt { source, .. }) => {
                let aside = self.sibling(&format!(".{}.corrupt", Uuid::new_v4()));
                warn!(
                    path = %self.path.display(),
                    error = %source,
                    aside = %aside.display(),
                    "Records file unreadable, starting a fresh array"
                );
                fs::copy(&self.path, &aside).await?;
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        entries.push(serde_json::to_value(record)?);
        self.write_atomic(&entries).await?;

        debug!(id = %record.id, total = entries.len(), "Record appended");
        Ok(())
    }

    /// The stored array without typing its entries.
    async fn read_raw(&self) -> Result<Vec<Value>> {
        self.parse_file().await
    }

    /// Parse the whole file as `T`. A missing file parses as `T::default()`.
    async fn parse_file<T: DeserializeOwned + Default>(&self) -> Result<T> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// Write the full array to a temporary sibling and rename it over the
    /// records file, so readers never see a half-written document.
    async fn write_atomic(&self, entries: &[Value]) -> Result<()> {
        let json = serde_json::to_vec_pretty(entries)?;
        let tmp = self.sibling(&format!(".{}.tmp", Uuid::new_v4()));

        if let Err(e) = fs::write(&tmp, &json).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&tmp, &self.path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(suffix);
        self.path.with_file_name(name)
    }
}
