use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::store::KeyValueStore;

pub(crate) const SETTINGS_KEY: &str = "settings";

/// Non-secret configuration persisted in the key/value store.
///
/// Every field is optional on disk so a partial update written by an older
/// build never invalidates the document.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    /// Plain question text shown during recovery.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_question: Option<String>,

    /// Lowercase hex SHA-256 of the normalized security answer. One-way;
    /// recovery recomputes and compares, never reverses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_answer_hash: Option<String>,

    /// Whether block notifications are shown. Unset means enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notifications_enabled: Option<bool>,
}

/// Typed view over the key/value store for the settings document.
///
/// Writes are read-modify-write merges: updating one field leaves the others
/// exactly as persisted.
#[derive(Clone)]
pub struct SettingsStore {
    store: Arc<dyn KeyValueStore>,
}

impl SettingsStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn load(&self) -> Result<Settings> {
        match self.store.get(SETTINGS_KEY).await? {
            Some(bytes) => {
                serde_json::from_slice(&bytes).context("Failed to parse settings document")
            }
            None => Ok(Settings::default()),
        }
    }

    async fn save(&self, settings: &Settings) -> Result<()> {
        let bytes = serde_json::to_vec(settings).context("Failed to serialize settings")?;
        self.store.set(SETTINGS_KEY, &bytes).await
    }

    /// Merge-update: load, apply `apply`, persist.
    pub async fn update(&self, apply: impl FnOnce(&mut Settings)) -> Result<Settings> {
        let mut settings = self.load().await?;
        apply(&mut settings);
        self.save(&settings).await?;
        Ok(settings)
    }

    pub async fn security_question(&self) -> Result<Option<String>> {
        Ok(self.load().await?.security_question)
    }

    pub async fn security_answer_hash(&self) -> Result<Option<String>> {
        Ok(self.load().await?.security_answer_hash)
    }

    pub async fn notifications_enabled(&self) -> Result<bool> {
        Ok(self.load().await?.notifications_enabled.unwrap_or(true))
    }

    pub async fn set_notifications_enabled(&self, enabled: bool) -> Result<()> {
        self.update(|s| s.notifications_enabled = Some(enabled))
            .await?;
        Ok(())
    }
}
