use serde::{Deserialize, Serialize};
use tokio::fs;
use std::path::{Path, PathBuf};
use directories::ProjectDirs;
use keyring::Entry;

use crate::shared::error::{AppError, AppResult};
use crate::shared::types::Language;

const KEYRING_SERVICE: &str = "plantcare-client";
const KEYRING_TRANSLATOR_KEY: &str = "translator_key";
const TRANSLATOR_KEY_ENV: &str = "PLANTCARE_TRANSLATOR_KEY";
const MASK: &str = "********";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub endpoints: EndpointSettings,
    pub api_keys: ApiKeys,
    pub preferences: UserPreferences,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointSettings {
    /// "azure" or "google"
    pub translator_provider: String,
    pub translator_url: String,
    pub translator_region: String,
    /// Backend serving auth and disease detection
    pub api_base_url: String,
    pub detection_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ApiKeys {
    pub translator_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct UserPreferences {
    pub language: Language,
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            translator_provider: "azure".to_string(),
            translator_url: "https://api.cognitive.microsofttranslator.com".to_string(),
            translator_region: "centralindia".to_string(),
            api_base_url: "http://localhost:5000".to_string(),
            detection_path: "/plantdisease".to_string(),
        }
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            endpoints: EndpointSettings::default(),
            api_keys: ApiKeys::default(),
            preferences: UserPreferences::default(),
        }
    }
}

impl AppSettings {
    pub fn get_settings_path() -> AppResult<PathBuf> {
        ProjectDirs::from("com", "plantcare", "plantcare-client")
            .map(|dirs| dirs.config_dir().join("settings.json"))
            .ok_or_else(|| AppError::Config("Failed to determine config directory".to_string()))
    }

    /// Load settings from the platform config directory, then pull the
    /// translator key from the environment or keyring.
    pub async fn load() -> AppResult<Self> {
        let path = Self::get_settings_path()?;
        let mut settings = Self::load_from(&path).await?;
        settings.load_translator_key();
        Ok(settings)
    }

    /// Read settings from `path`. A missing file yields defaults.
    pub async fn load_from(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .await
            .map_err(|e| AppError::Config(format!("Failed to read settings file: {}", e)))?;

        serde_json::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse settings: {}", e)))
    }

    /// Save to the platform config directory (secrets go to the keyring).
    pub async fn save(&self) -> AppResult<()> {
        self.save_translator_key()?;
        let path = Self::get_settings_path()?;
        self.save_to(&path).await
    }

    /// Write settings to `path` with secrets stripped.
    pub async fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Config(format!("Failed to create config directory: {}", e)))?;
        }

        let mut disk_copy = self.clone();
        disk_copy.clear_secrets();

        let content = serde_json::to_string_pretty(&disk_copy)
            .map_err(|e| AppError::Config(format!("Failed to serialize settings: {}", e)))?;

        fs::write(path, content)
            .await
            .map_err(|e| AppError::Config(format!("Failed to write settings file: {}", e)))
    }

    /// Return a copy of settings with secrets masked (for display/logging)
    pub fn masked(&self) -> Self {
        let mut copy = self.clone();
        if !copy.api_keys.translator_key.is_empty() {
            copy.api_keys.translator_key = MASK.to_string();
        }
        copy
    }

    fn clear_secrets(&mut self) {
        self.api_keys.translator_key = String::new();
    }

    fn load_translator_key(&mut self) {
        if let Ok(env_key) = std::env::var(TRANSLATOR_KEY_ENV) {
            if !env_key.trim().is_empty() {
                self.api_keys.translator_key = env_key;
                return;
            }
        }

        match Entry::new(KEYRING_SERVICE, KEYRING_TRANSLATOR_KEY) {
            Ok(entry) => match entry.get_password() {
                Ok(pw) => self.api_keys.translator_key = pw,
                Err(keyring::Error::NoEntry) => {}
                Err(e) => tracing::warn!("[Settings] Keyring error for {}: {}", KEYRING_TRANSLATOR_KEY, e),
            },
            Err(e) => tracing::warn!("[Settings] Failed to access keyring: {}", e),
        }
    }

    fn save_translator_key(&self) -> AppResult<()> {
        let value = &self.api_keys.translator_key;
        if value.is_empty() || value == MASK {
            return Ok(());
        }
        let entry = Entry::new(KEYRING_SERVICE, KEYRING_TRANSLATOR_KEY)
            .map_err(|e| AppError::Config(format!("Keyring init error: {}", e)))?;
        entry
            .set_password(value)
            .map_err(|e| AppError::Config(format!("Failed to save translator key to keyring: {}", e)))
    }
}
