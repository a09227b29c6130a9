// src/settings_store.rs
//
// Persisted filter settings. The file is plain pretty-printed JSON with
// camelCase keys; a missing or unreadable file means factory defaults.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{debug, error, info};

use crate::models::FilterSettings;

pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load settings from disk, falling back to defaults.
    pub async fn load(&self) -> FilterSettings {
        info!("Loading filter settings from {:?}", self.path);

        if !self.path.exists() {
            debug!("No settings file found, using defaults");
            return FilterSettings::default();
        }

        let data = match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(e) => {
                error!("Failed to read settings file: {}", e);
                return FilterSettings::default();
            }
        };

        if data.trim().is_empty() {
            return FilterSettings::default();
        }

        match serde_json::from_str::<FilterSettings>(&data) {
            Ok(settings) => settings,
            Err(e) => {
                error!("Failed to parse settings file, using defaults: {}", e);
                FilterSettings::default()
            }
        }
    }

    /// Validate and write settings. Returns the normalized snapshot that was saved.
    pub async fn save(&self, settings: FilterSettings) -> Result<FilterSettings> {
        let settings = settings.normalized()?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .context("Failed to create directory for settings file")?;
            }
        }

        let json = serde_json::to_string_pretty(&settings).context("Failed to serialize settings")?;
        tokio::fs::write(&self.path, json)
            .await
            .context("Failed to write settings file")?;

        debug!("Saved filter settings to {:?}", self.path);
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn temp_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("token-screener-{}", Uuid::new_v4()))
            .join("settings.json")
    }

    #[tokio::test]
    async fn test_missing_file_gives_defaults() {
        let store = SettingsStore::new(temp_path());
        assert_eq!(store.load().await, FilterSettings::default());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let path = temp_path();
        let store = SettingsStore::new(&path);

        let mut settings = FilterSettings::default();
        settings.avg_cap.enabled = true;
        settings.avg_cap.value = 25_000.0;
        settings.migration.percent = 120;
        settings.dev.addresses.insert(" DevWallet ".to_string());

        let saved = store.save(settings).await.unwrap();
        assert_eq!(saved.migration.percent, 100);

        let loaded = store.load().await;
        assert_eq!(loaded, saved);
        assert!(loaded.dev.is_tracked("DevWallet"));

        let raw = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(raw.contains("\"avgCap\""));

        let _ = tokio::fs::remove_dir_all(path.parent().unwrap()).await;
    }

    #[tokio::test]
    async fn test_invalid_settings_are_not_written() {
        let path = temp_path();
        let store = SettingsStore::new(&path);

        let mut settings = FilterSettings::default();
        settings.min_cap.min_value = f64::NAN;

        assert!(store.save(settings).await.is_err());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_gives_defaults() {
        let path = temp_path();
        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(&path, "{ not json").await.unwrap();

        let store = SettingsStore::new(&path);
        assert_eq!(store.load().await, FilterSettings::default());

        let _ = tokio::fs::remove_dir_all(path.parent().unwrap()).await;
    }

    #[tokio::test]
    async fn test_loads_file_from_previous_client() {
        let path = temp_path();
        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(
            &path,
            r#"{ "MinCap": { "Enabled": true, "N": -1, "MinValue": 12000 }, "AutoOpenAxiom": false }"#,
        )
        .await
        .unwrap();

        let settings = SettingsStore::new(&path).load().await;
        assert!(settings.min_cap.enabled);
        assert_eq!(settings.min_cap.min_value, 12_000.0);
        assert_eq!(settings.min_cap.n, 0);

        let _ = tokio::fs::remove_dir_all(path.parent().unwrap()).await;
    }
}
