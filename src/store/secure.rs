use anyhow::{Result, anyhow};
use async_trait::async_trait;
use keyring::Entry;

use crate::store::SecretStore;

const SERVICE_NAME: &str = "AppBlocker";

/// Secret store backed by the OS credential store.
///
/// Each secret id maps to one keyring entry under a fixed service name. The
/// keyring is only readable while the user session is unlocked, which is the
/// protection boundary this crate relies on for the stored password.
#[derive(Debug, Default)]
pub struct KeyringSecretStore;

impl KeyringSecretStore {
    pub fn new() -> Self {
        Self
    }

    fn entry(id: &str) -> Result<Entry> {
        Entry::new(SERVICE_NAME, id).map_err(|e| anyhow!("keyring init: {e}"))
    }
}

#[async_trait]
impl SecretStore for KeyringSecretStore {
    async fn get(&self, id: &str) -> Result<Option<String>> {
        match Self::entry(id)?.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(anyhow!("load secret: {e}")),
        }
    }

    async fn set(&self, id: &str, secret: &str) -> Result<()> {
        Self::entry(id)?
            .set_password(secret)
            .map_err(|e| anyhow!("store secret: {e}"))
    }

    async fn clear(&self, id: &str) -> Result<()> {
        match Self::entry(id)?.delete_password() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(anyhow!("delete secret: {e}")),
        }
    }
}
