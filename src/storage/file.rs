// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! JSON file slot storage

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::StateStorage;
use crate::{Result, ScanVaultError};

/// Slots kept as a JSON object in a single file
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn read_slots(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content)
            .map_err(|e| ScanVaultError::Persistence(format!("Failed to parse {:?}: {}", self.path, e)))
    }

    /// Write to a sibling temp file, then rename over the target
    fn write_slots(&self, slots: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(slots)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, content)?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }
}

impl StateStorage for JsonFileStorage {
    fn name(&self) -> &'static str {
        "json"
    }

    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_slots()?.remove(key))
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        // unreadable files are replaced
        let mut slots = match self.read_slots() {
            Ok(slots) => slots,
            Err(e) => {
                tracing::warn!("Overwriting unreadable storage file: {}", e);
                BTreeMap::new()
            }
        };
        slots.insert(key.to_string(), value.to_string());
        self.write_slots(&slots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_reads_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("state.json"));
        assert_eq!(storage.read("slot").unwrap(), None);
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("nested").join("state.json"));

        storage.write("slot", r#"{"a":1}"#).unwrap();
        storage.write("other", "x").unwrap();

        assert_eq!(storage.read("slot").unwrap(), Some(r#"{"a":1}"#.to_string()));
        assert_eq!(storage.read("other").unwrap(), Some("x".to_string()));
        assert!(!dir.path().join("nested").join("state.json.tmp").exists());
    }

    #[test]
    fn test_corrupt_file_is_an_error_on_read_and_replaced_on_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "garbage").unwrap();

        let storage = JsonFileStorage::new(&path);
        assert!(matches!(storage.read("slot"), Err(ScanVaultError::Persistence(_))));

        storage.write("slot", "fresh").unwrap();
        assert_eq!(storage.read("slot").unwrap(), Some("fresh".to_string()));
    }

    #[test]
    fn test_failed_rename_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        // a non-empty directory cannot be replaced by a file
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), "x").unwrap();

        let storage = JsonFileStorage::new(&path);
        assert!(storage.write("slot", "value").is_err());
        assert!(!dir.path().join("state.json.tmp").exists());
        assert!(path.join("keep").exists());
    }
}
