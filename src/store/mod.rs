//! Storage capabilities consumed by the managers.
//!
//! Both stores are injected at construction rather than reached through
//! globals, so a host can hand the managers its platform-backed stores while
//! the unit tests substitute the in-memory ones.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

pub mod file;
pub mod secure;

pub use file::FileKeyValueStore;
pub use secure::KeyringSecretStore;

/// Durable, encrypted-at-rest holder for named secrets.
///
/// The host platform provides the actual protection (OS keychain or
/// equivalent); this crate only reads and writes through it.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch a secret, `None` if it was never stored or has been cleared.
    async fn get(&self, id: &str) -> Result<Option<String>>;

    /// Store or overwrite a secret.
    async fn set(&self, id: &str, secret: &str) -> Result<()>;

    /// Remove a secret. Clearing an absent secret is not an error.
    async fn clear(&self, id: &str) -> Result<()>;
}

/// Durable key/value map for non-secret state: settings, the failed-attempt
/// count, the blocked set, and dashboard statistics.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn set(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Remove several keys at once; missing keys are skipped.
    async fn remove_many(&self, keys: &[&str]) -> Result<()>;
}

/// In-memory secret store for tests and hosts without a keychain.
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    secrets: Mutex<HashMap<String, String>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn get(&self, id: &str) -> Result<Option<String>> {
        Ok(self.secrets.lock().unwrap().get(id).cloned())
    }

    async fn set(&self, id: &str, secret: &str) -> Result<()> {
        self.secrets
            .lock()
            .unwrap()
            .insert(id.to_string(), secret.to_string());
        Ok(())
    }

    async fn clear(&self, id: &str) -> Result<()> {
        self.secrets.lock().unwrap().remove(id);
        Ok(())
    }
}

/// In-memory key/value store for tests.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn remove_many(&self, keys: &[&str]) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_secret_store_roundtrip() {
        let store = MemorySecretStore::new();

        assert!(store.get("password").await.unwrap().is_none());

        store.set("password", "hunter2").await.unwrap();
        assert_eq!(
            store.get("password").await.unwrap().as_deref(),
            Some("hunter2")
        );

        store.clear("password").await.unwrap();
        assert!(store.get("password").await.unwrap().is_none());

        // Clearing again is fine
        store.clear("password").await.unwrap();
    }

    #[tokio::test]
    async fn memory_kv_store_remove_many() {
        let store = MemoryKeyValueStore::new();

        store.set("a", b"1").await.unwrap();
        store.set("b", b"2").await.unwrap();
        store.set("c", b"3").await.unwrap();

        store.remove_many(&["a", "b", "missing"]).await.unwrap();

        assert!(store.get("a").await.unwrap().is_none());
        assert!(store.get("b").await.unwrap().is_none());
        assert_eq!(store.get("c").await.unwrap().as_deref(), Some(&b"3"[..]));
    }
}
