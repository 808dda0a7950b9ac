//! File-backed slot store with atomic writes.
//!
//! Each slot is persisted as `{slot}.json` inside a single directory. Writes
//! use the temp-file-then-rename pattern: the payload is first written to a
//! `.json.tmp` sibling, flushed, and then renamed over the target. On POSIX
//! systems renames within one filesystem are atomic, so a reader never
//! observes a partially written slot; a crash mid-write leaves the previous
//! payload intact.

use crate::slot::SlotStore;
use crate::{Error, Result};
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

/// A slot store persisting each slot as a JSON file in one directory.
#[derive(Debug, Clone)]
pub struct FileSlotStore {
    dir: PathBuf,
}

impl FileSlotStore {
    /// Open a file slot store rooted at `dir`, creating the directory if
    /// it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the directory cannot be created.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    /// The directory holding the slot files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn slot_path(&self, slot: &str) -> PathBuf {
        self.dir.join(format!("{slot}.json"))
    }
}

/// Creates the temporary sibling path used during an atomic write.
///
/// `issues.json` becomes `issues.json.tmp`; a path without an extension
/// gets a plain `.tmp` extension.
fn make_temp_path(path: &Path) -> PathBuf {
    let mut temp_path = path.to_path_buf();
    let new_extension = match path.extension() {
        Some(ext) => {
            let mut new_ext = ext.to_os_string();
            new_ext.push(".tmp");
            new_ext
        }
        None => std::ffi::OsString::from("tmp"),
    };
    temp_path.set_extension(new_extension);
    temp_path
}

#[async_trait]
impl SlotStore for FileSlotStore {
    async fn read(&self, slot: &str) -> Result<Option<String>> {
        match tokio::fs::read_to_string(self.slot_path(slot)).await {
            Ok(payload) => Ok(Some(payload)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Io(e)),
        }
    }

    async fn write(&self, slot: &str, payload: &str) -> Result<()> {
        let path = self.slot_path(slot);
        let temp_path = make_temp_path(&path);

        let write_result: Result<()> = async {
            let mut file = File::create(&temp_path).await?;
            file.write_all(payload.as_bytes()).await?;
            file.flush().await?;
            Ok(())
        }
        .await;

        // Best-effort cleanup of the temp file on failure; the target slot
        // is untouched either way.
        if let Err(e) = write_result {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e);
        }

        tokio::fs::rename(&temp_path, &path).await?;
        tracing::debug!(slot, bytes = payload.len(), "slot written");
        Ok(())
    }

    async fn remove(&self, slot: &str) -> Result<()> {
        match tokio::fs::remove_file(self.slot_path(slot)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn make_temp_path_with_extension() {
        let path = Path::new("/data/issues.json");
        assert_eq!(make_temp_path(path), Path::new("/data/issues.json.tmp"));
    }

    #[test]
    fn make_temp_path_without_extension() {
        let path = Path::new("/data/issues");
        assert_eq!(make_temp_path(path), Path::new("/data/issues.tmp"));
    }

    #[tokio::test]
    async fn write_then_read_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileSlotStore::open(temp_dir.path()).await.unwrap();

        store.write("issues", r#"[{"id":"1"}]"#).await.unwrap();
        let payload = store.read("issues").await.unwrap();
        assert_eq!(payload.as_deref(), Some(r#"[{"id":"1"}]"#));
    }

    #[tokio::test]
    async fn read_missing_slot_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileSlotStore::open(temp_dir.path()).await.unwrap();

        assert!(store.read("absent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn write_replaces_existing_payload() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileSlotStore::open(temp_dir.path()).await.unwrap();

        store.write("user", r#"{"email":"a@x.edu"}"#).await.unwrap();
        store.write("user", r#"{"email":"b@x.edu"}"#).await.unwrap();

        let payload = store.read("user").await.unwrap();
        assert_eq!(payload.as_deref(), Some(r#"{"email":"b@x.edu"}"#));
    }

    #[tokio::test]
    async fn write_leaves_no_temp_file_behind() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileSlotStore::open(temp_dir.path()).await.unwrap();

        store.write("issues", "[]").await.unwrap();

        assert!(temp_dir.path().join("issues.json").exists());
        assert!(!temp_dir.path().join("issues.json.tmp").exists());
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileSlotStore::open(temp_dir.path()).await.unwrap();

        store.write("user", "{}").await.unwrap();
        store.remove("user").await.unwrap();
        assert!(store.read("user").await.unwrap().is_none());

        // Removing again must not error.
        store.remove("user").await.unwrap();
    }

    #[tokio::test]
    async fn open_creates_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("data").join("slots");

        let store = FileSlotStore::open(&nested).await.unwrap();
        store.write("issues", "[]").await.unwrap();

        assert!(nested.join("issues.json").exists());
    }
}
