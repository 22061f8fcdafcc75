use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::platform::common::atomic_write;
use crate::store::KeyValueStore;

/// Current document version
const DOCUMENT_VERSION: &str = "1.0";

/// On-disk shape of the key/value document. Values are stored as base-less
/// JSON strings; every entry this crate writes is itself JSON.
#[derive(Debug, Clone, Deserialize, Serialize)]
struct Document {
    version: String,
    #[serde(default)]
    entries: BTreeMap<String, String>,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            version: DOCUMENT_VERSION.to_string(),
            entries: BTreeMap::new(),
        }
    }
}

/// Key/value store persisted as a single JSON document.
///
/// The whole document is loaded at open and atomically rewritten on every
/// mutation, so a crash can lose at most the write in flight, never corrupt
/// the file.
#[derive(Debug)]
pub struct FileKeyValueStore {
    path: PathBuf,
    document: RwLock<Document>,
}

impl FileKeyValueStore {
    /// Open the store at `path`, creating an empty document if the file does
    /// not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let document = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read data file: {}", path.display()))?;

            let document: Document = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse data file: {}", path.display()))?;

            if document.version != DOCUMENT_VERSION {
                tracing::warn!(
                    "Data file version mismatch (expected {}, got {}). Starting fresh.",
                    DOCUMENT_VERSION,
                    document.version
                );
                Document::default()
            } else {
                document
            }
        } else {
            Document::default()
        };

        Ok(Self {
            path,
            document: RwLock::new(document),
        })
    }

    /// Default data file under the platform data directory.
    pub fn default_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("", "", "app-blocker")
            .context("Failed to resolve a data directory for this platform")?;
        Ok(dirs.data_dir().join("state.json"))
    }

    fn persist(&self, document: &Document) -> Result<()> {
        let content =
            serde_json::to_string_pretty(document).context("Failed to serialize data file")?;
        atomic_write(&self.path, content.as_bytes())
            .with_context(|| format!("Failed to write data file: {}", self.path.display()))
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let document = self.document.read().await;
        Ok(document.entries.get(key).map(|v| v.as_bytes().to_vec()))
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let value = std::str::from_utf8(value)
            .context("Refusing to store non-UTF-8 value")?
            .to_string();

        let mut document = self.document.write().await;
        document.entries.insert(key.to_string(), value);
        self.persist(&document)
    }

    async fn remove_many(&self, keys: &[&str]) -> Result<()> {
        let mut document = self.document.write().await;
        let mut changed = false;
        for key in keys {
            changed |= document.entries.remove(*key).is_some();
        }
        if changed {
            self.persist(&document)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn set_get_roundtrip_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        {
            let store = FileKeyValueStore::open(&path).unwrap();
            store.set("blocked_apps", b"[\"a\",\"b\"]").await.unwrap();
        }

        let store = FileKeyValueStore::open(&path).unwrap();
        assert_eq!(
            store.get("blocked_apps").await.unwrap().as_deref(),
            Some(&b"[\"a\",\"b\"]"[..])
        );
    }

    #[tokio::test]
    async fn missing_key_is_none() {
        let dir = tempdir().unwrap();
        let store = FileKeyValueStore::open(dir.path().join("state.json")).unwrap();

        assert!(store.get("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn remove_many_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        {
            let store = FileKeyValueStore::open(&path).unwrap();
            store.set("a", b"1").await.unwrap();
            store.set("b", b"2").await.unwrap();
            store.remove_many(&["a"]).await.unwrap();
        }

        let store = FileKeyValueStore::open(&path).unwrap();
        assert!(store.get("a").await.unwrap().is_none());
        assert_eq!(store.get("b").await.unwrap().as_deref(), Some(&b"2"[..]));
    }

    #[tokio::test]
    async fn version_mismatch_starts_fresh() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        std::fs::write(
            &path,
            r#"{"version":"99.0","entries":{"old":"value"}}"#,
        )
        .unwrap();

        let store = FileKeyValueStore::open(&path).unwrap();
        assert!(store.get("old").await.unwrap().is_none());
    }
}
