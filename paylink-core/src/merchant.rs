//! Merchant settings
//!
//! Settings are passed around explicitly through a [`MerchantContext`]
//! backed by a [`SettingsStore`]. Stored documents may be partial; missing
//! keys take their defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::SettingsError;

/// Network the merchant operates on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Devnet,
    Mainnet,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MerchantSettings {
    pub pubkey: String,
    pub display_name: String,
    pub accent_color: String,
    pub environment: Environment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
}

impl Default for MerchantSettings {
    fn default() -> Self {
        Self {
            pubkey: String::new(),
            display_name: "Demo Merchant".to_string(),
            accent_color: "#2dd4bf".to_string(),
            environment: Environment::Devnet,
            webhook_url: None,
        }
    }
}

/// Partial update; `None` leaves a value unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    pub pubkey: Option<String>,
    pub display_name: Option<String>,
    pub accent_color: Option<String>,
    pub environment: Option<Environment>,
    pub webhook_url: Option<String>,
}

impl MerchantSettings {
    pub fn apply(&mut self, patch: SettingsPatch) {
        if let Some(pubkey) = patch.pubkey {
            self.pubkey = pubkey;
        }
        if let Some(name) = patch.display_name {
            self.display_name = name;
        }
        if let Some(color) = patch.accent_color {
            self.accent_color = color;
        }
        if let Some(environment) = patch.environment {
            self.environment = environment;
        }
        if let Some(url) = patch.webhook_url {
            self.webhook_url = Some(url).filter(|u| !u.trim().is_empty());
        }
    }
}

/// Persistence for merchant settings
pub trait SettingsStore: Send + Sync {
    fn load(&self) -> Result<MerchantSettings, SettingsError>;

    fn save(&self, settings: &MerchantSettings) -> Result<(), SettingsError>;
}

// ==================== Stores ====================

/// JSON document on disk
#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for FileSettingsStore {
    fn load(&self) -> Result<MerchantSettings, SettingsError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No settings file, using defaults");
                return Ok(MerchantSettings::default());
            }
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str(&contents) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring unreadable settings file");
                Ok(MerchantSettings::default())
            }
        }
    }

    fn save(&self, settings: &MerchantSettings) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(settings)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

/// Process-local store
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    saved: Mutex<Option<MerchantSettings>>,
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> Result<MerchantSettings, SettingsError> {
        let saved = self.saved.lock().unwrap_or_else(|e| e.into_inner());
        Ok(saved.clone().unwrap_or_default())
    }

    fn save(&self, settings: &MerchantSettings) -> Result<(), SettingsError> {
        let mut saved = self.saved.lock().unwrap_or_else(|e| e.into_inner());
        *saved = Some(settings.clone());
        Ok(())
    }
}

// ==================== Context ====================

/// Loaded settings plus the store they persist to
pub struct MerchantContext<S: SettingsStore> {
    store: S,
    settings: MerchantSettings,
}

impl<S: SettingsStore> MerchantContext<S> {
    pub fn load(store: S) -> Result<Self, SettingsError> {
        let settings = store.load()?;
        Ok(Self { store, settings })
    }

    pub fn settings(&self) -> &MerchantSettings {
        &self.settings
    }

    /// Apply `patch` and persist the result
    pub fn update(&mut self, patch: SettingsPatch) -> Result<&MerchantSettings, SettingsError> {
        let mut next = self.settings.clone();
        next.apply(patch);
        self.store.save(&next)?;
        self.settings = next;
        Ok(&self.settings)
    }

    /// Configured merchant identity, if any
    pub fn pubkey(&self) -> Option<&str> {
        Some(self.settings.pubkey.as_str()).filter(|p| !p.is_empty())
    }
}

impl MerchantContext<FileSettingsStore> {
    /// Settings from the document at `config.settings_path`
    pub fn from_config(config: &ClientConfig) -> Result<Self, SettingsError> {
        Self::load(FileSettingsStore::new(&config.settings_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_partial_document_merges_over_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("merchant.json");
        std::fs::write(&path, r#"{"pubkey": "Merchant111", "environment": "mainnet"}"#).unwrap();

        let settings = FileSettingsStore::new(&path).load().unwrap();
        assert_eq!(settings.pubkey, "Merchant111");
        assert_eq!(settings.environment, Environment::Mainnet);
        assert_eq!(settings.display_name, "Demo Merchant");
        assert_eq!(settings.accent_color, "#2dd4bf");
    }

    #[test]
    fn test_missing_or_corrupt_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let missing = FileSettingsStore::new(dir.path().join("absent.json"));
        assert_eq!(missing.load().unwrap(), MerchantSettings::default());

        let path = dir.path().join("corrupt.json");
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(
            FileSettingsStore::new(&path).load().unwrap(),
            MerchantSettings::default()
        );
    }

    #[test]
    fn test_update_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("merchant.json");

        let mut context = MerchantContext::load(FileSettingsStore::new(&path)).unwrap();
        assert_eq!(context.pubkey(), None);

        context
            .update(SettingsPatch {
                pubkey: Some("Merchant111".to_string()),
                display_name: Some("Coffee Cart".to_string()),
                ..Default::default()
            })
            .unwrap();

        let reloaded = MerchantContext::load(FileSettingsStore::new(&path)).unwrap();
        assert_eq!(reloaded.pubkey(), Some("Merchant111"));
        assert_eq!(reloaded.settings().display_name, "Coffee Cart");
        assert_eq!(reloaded.settings().accent_color, "#2dd4bf");
    }

    #[test]
    fn test_context_from_config_uses_settings_path() {
        let dir = tempdir().unwrap();
        let config = ClientConfig {
            settings_path: dir.path().join("merchant.json"),
            ..ClientConfig::default()
        };

        let mut context = MerchantContext::from_config(&config).unwrap();
        context
            .update(SettingsPatch {
                pubkey: Some("Merchant222".to_string()),
                ..Default::default()
            })
            .unwrap();

        assert!(config.settings_path.exists());
        let reloaded = MerchantContext::from_config(&config).unwrap();
        assert_eq!(reloaded.pubkey(), Some("Merchant222"));
    }

    #[test]
    fn test_memory_store() {
        let mut context = MerchantContext::load(MemorySettingsStore::default()).unwrap();
        context
            .update(SettingsPatch {
                webhook_url: Some("https://example.com/hook".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(
            context.settings().webhook_url.as_deref(),
            Some("https://example.com/hook")
        );

        context
            .update(SettingsPatch {
                webhook_url: Some(String::new()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(context.settings().webhook_url, None);
    }
}
