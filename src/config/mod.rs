// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Configuration management for ScanVault

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main application configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    /// Where collection state is persisted
    #[serde(default)]
    pub storage: StorageConfig,

    /// Scan upload settings
    #[serde(default)]
    pub upload: UploadConfig,
}

/// Persistence backend
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Key-value table in a SQLite database
    #[default]
    Sqlite,
    /// Slots in a single JSON file
    Json,
    /// Nothing survives the process
    Memory,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default = "default_storage_path")]
    pub path: String,
    /// Fixed slot key holding the serialized state
    #[serde(default = "default_storage_key")]
    pub key: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct UploadConfig {
    /// Accepted image file extensions
    #[serde(default = "default_formats")]
    pub formats: Vec<String>,
    /// Largest file accepted for embedding, in bytes
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,
}

fn default_storage_path() -> String { "scanvault.db".to_string() }
fn default_storage_key() -> String { "scanvault-storage".to_string() }
fn default_max_bytes() -> u64 { 20 * 1024 * 1024 }

fn default_formats() -> Vec<String> {
    vec!["jpg", "jpeg", "png", "webp", "gif", "bmp", "tiff", "tif", "avif", "ico"]
        .into_iter().map(String::from).collect()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: default_storage_path(),
            key: default_storage_key(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            formats: default_formats(),
            max_bytes: default_max_bytes(),
        }
    }
}

impl UploadConfig {
    /// Check an extension against the accepted formats (case-insensitive)
    pub fn accepts_extension(&self, ext: &str) -> bool {
        self.formats.iter().any(|f| f.eq_ignore_ascii_case(ext))
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&content)
                .map_err(|e| crate::ScanVaultError::Config(format!("Failed to parse config: {}", e)))?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings that cannot work
    pub fn validate(&self) -> crate::Result<()> {
        if self.storage.key.trim().is_empty() {
            return Err(crate::ScanVaultError::Config("storage.key must not be empty".to_string()));
        }
        if self.storage.backend != StorageBackend::Memory && self.storage.path.trim().is_empty() {
            return Err(crate::ScanVaultError::Config("storage.path must not be empty".to_string()));
        }
        if self.upload.formats.is_empty() {
            return Err(crate::ScanVaultError::Config("upload.formats must list at least one format".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.storage.key, "scanvault-storage");
        assert!(config.upload.accepts_extension("PNG"));
        assert!(!config.upload.accepts_extension("pdf"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"storage":{"backend":"json","path":"state.json"}}"#).unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Json);
        assert_eq!(config.storage.path, "state.json");
        assert_eq!(config.storage.key, "scanvault-storage");
        assert_eq!(config.upload.max_bytes, 20 * 1024 * 1024);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config.storage.path, "scanvault.db");
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"storage":{"backend":"floppy"}}"#).unwrap();
        assert!(matches!(AppConfig::load(&path), Err(crate::ScanVaultError::Config(_))));

        std::fs::write(&path, r#"{"storage":{"key":"  "}}"#).unwrap();
        assert!(matches!(AppConfig::load(&path), Err(crate::ScanVaultError::Config(_))));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = AppConfig::default();
        config.storage.backend = StorageBackend::Memory;
        config.upload.max_bytes = 1024;
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.storage.backend, StorageBackend::Memory);
        assert_eq!(loaded.upload.max_bytes, 1024);
    }
}
