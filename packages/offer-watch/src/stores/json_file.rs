//! Seen-set persisted as a single pretty-printed JSON document.
//!
//! Layout:
//!
//! ```json
//! {
//!   "items": {
//!     "<item id>": { "prime_offer": { ... }, "item": { ... } }
//!   }
//! }
//! ```
//!
//! The whole document is loaded at open and rewritten after every mutation.
//! Writes go to a sibling `.tmp` file that is then renamed over the target,
//! so an interrupted write leaves the previous document in place.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::traits::store::SeenStore;
use crate::types::journey::JourneyInfo;

/// Default location of the seen-set document.
pub const DEFAULT_STORE_PATH: &str = "data/seen_offers.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct SeenDocument {
    #[serde(default)]
    items: IndexMap<String, JourneyInfo>,
}

/// Disk-backed seen-set.
pub struct JsonFileStore {
    path: PathBuf,
    document: Mutex<SeenDocument>,
}

impl JsonFileStore {
    /// Load the document at `path`. A missing file is an empty store.
    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();

        let document = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
                    path: path.clone(),
                    source,
                })?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "No seen-set document found, starting empty");
                SeenDocument::default()
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        debug!(
            path = %path.display(),
            count = document.items.len(),
            "Loaded seen-set document"
        );

        Ok(Self {
            path,
            document: Mutex::new(document),
        })
    }

    /// Open the document at [`DEFAULT_STORE_PATH`].
    pub async fn open_default() -> StoreResult<Self> {
        Self::open(DEFAULT_STORE_PATH).await
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// Rewrite the whole document.
    async fn persist(&self, document: &SeenDocument) -> StoreResult<()> {
        let json = serde_json::to_vec_pretty(document)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StoreError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let temp_path = self.temp_path();
        tokio::fs::write(&temp_path, json)
            .await
            .map_err(|source| StoreError::Io {
                path: temp_path.clone(),
                source,
            })?;

        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|source| StoreError::Io {
                path: self.path.clone(),
                source,
            })
    }
}

#[async_trait]
impl SeenStore for JsonFileStore {
    async fn add(&self, info: &JourneyInfo) -> StoreResult<bool> {
        let mut document = self.document.lock().await;
        if document.items.contains_key(info.key()) {
            return Ok(false);
        }

        document.items.insert(info.key().to_string(), info.clone());
        if let Err(e) = self.persist(&document).await {
            // Keep memory in line with what is on disk
            document.items.shift_remove(info.key());
            return Err(e);
        }
        Ok(true)
    }

    async fn remove(&self, info: &JourneyInfo) -> StoreResult<bool> {
        let mut document = self.document.lock().await;
        let Some((index, key, removed)) = document.items.shift_remove_full(info.key()) else {
            return Ok(false);
        };

        if let Err(e) = self.persist(&document).await {
            document.items.shift_insert(index, key, removed);
            return Err(e);
        }
        Ok(true)
    }

    async fn contains(&self, info: &JourneyInfo) -> StoreResult<bool> {
        Ok(self.document.lock().await.items.contains_key(info.key()))
    }

    async fn all(&self) -> StoreResult<Vec<JourneyInfo>> {
        Ok(self.document.lock().await.items.values().cloned().collect())
    }

    async fn len(&self) -> StoreResult<usize> {
        Ok(self.document.lock().await.items.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::journey;
    use chrono::Duration;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path().join("seen.json")).await.unwrap();

        assert_eq!(store.len().await.unwrap(), 0);
        assert!(!dir.path().join("seen.json").exists());
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("seen.json");
        let first = journey("item-1", "Game A", Duration::days(1));
        let second = journey("item-2", "Game B", Duration::days(2));

        {
            let store = JsonFileStore::open(&path).await.unwrap();
            assert!(store.add(&first).await.unwrap());
            assert!(store.add(&second).await.unwrap());
            assert!(!store.add(&first).await.unwrap());
        }

        let reopened = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(reopened.all().await.unwrap(), vec![first.clone(), second]);

        assert!(reopened.remove(&first).await.unwrap());
        let reopened = JsonFileStore::open(&path).await.unwrap();
        assert!(!reopened.contains(&first).await.unwrap());
        assert_eq!(reopened.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_document_layout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("seen.json");
        let store = JsonFileStore::open(&path).await.unwrap();
        store
            .add(&journey("item-1", "Game A", Duration::days(1)))
            .await
            .unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains('\n'), "document should be pretty-printed");

        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            value["items"]["item-1"]["item"]["game"]["assets"]["title"],
            "Game A"
        );
        assert_eq!(
            value["items"]["item-1"]["prime_offer"]["deliveryMethod"],
            "EXTERNAL_OFFER"
        );
        assert!(!dir.path().join("seen.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_document_without_items_key() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("seen.json");
        std::fs::write(&path, "{}").unwrap();

        let store = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("seen.json");
        std::fs::write(&path, "{\"items\": {\"x\": ").unwrap();

        let err = JsonFileStore::open(&path).await.err().unwrap();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn test_failed_write_rolls_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("seen.json");
        let kept = journey("kept", "Game A", Duration::days(1));
        let store = JsonFileStore::open(&path).await.unwrap();
        store.add(&kept).await.unwrap();

        // A directory where the temp file should go makes every write fail
        std::fs::create_dir(dir.path().join("seen.json.tmp")).unwrap();

        let rejected = journey("rejected", "Game B", Duration::days(1));
        let err = store.add(&rejected).await.unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
        assert!(!store.contains(&rejected).await.unwrap());

        assert!(store.remove(&kept).await.is_err());
        assert!(store.contains(&kept).await.unwrap());

        let on_disk = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(on_disk.all().await.unwrap(), vec![kept]);
    }
}
