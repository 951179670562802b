// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Durable key-value slots holding the serialized collection state

pub mod file;
pub mod sqlite;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::config::{StorageBackend, StorageConfig};
use crate::models::Collection;
use crate::{Result, ScanVaultError};

pub use file::JsonFileStorage;
pub use sqlite::SqliteStorage;

/// Layout version written alongside the state
pub const STATE_VERSION: u32 = 0;

/// A durable string slot addressed by key
pub trait StateStorage: Send {
    /// Short backend name for logging
    fn name(&self) -> &'static str;

    /// Read the value stored under `key`, if any
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value stored under `key`
    fn write(&self, key: &str, value: &str) -> Result<()>;
}

/// Persisted form of the store, as read back
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PersistedState {
    pub state: StateBody,
    #[serde(default)]
    pub version: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
pub struct StateBody {
    #[serde(default)]
    pub collections: Vec<Collection>,
}

impl PersistedState {
    /// Parse a stored JSON value
    pub fn decode(raw: &str) -> Result<Self> {
        let parsed: Self = serde_json::from_str(raw)?;
        if parsed.version > STATE_VERSION {
            return Err(ScanVaultError::Persistence(format!(
                "stored state version {} is newer than supported version {}",
                parsed.version, STATE_VERSION
            )));
        }
        Ok(parsed)
    }

    pub fn into_collections(self) -> Vec<Collection> {
        self.state.collections
    }
}

/// Load collections from `storage`, falling back to an empty list when the
/// slot is missing, unreadable or corrupt
pub fn load_collections(storage: &dyn StateStorage, key: &str) -> Vec<Collection> {
    let raw = match storage.read(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            tracing::debug!("No persisted state under '{}' in {} storage", key, storage.name());
            return Vec::new();
        }
        Err(e) => {
            tracing::warn!("Failed to read persisted state: {}, starting empty", e);
            return Vec::new();
        }
    };

    match PersistedState::decode(&raw) {
        Ok(state) => state.into_collections(),
        Err(e) => {
            tracing::warn!("Discarding corrupt persisted state: {}", e);
            Vec::new()
        }
    }
}

#[derive(Serialize)]
struct StateView<'a> {
    state: BodyView<'a>,
    version: u32,
}

#[derive(Serialize)]
struct BodyView<'a> {
    collections: &'a [Collection],
}

/// Serialize borrowed collections in the persisted layout
pub fn encode_collections(collections: &[Collection]) -> Result<String> {
    let view = StateView {
        state: BodyView { collections },
        version: STATE_VERSION,
    };
    Ok(serde_json::to_string(&view)?)
}

/// Serialize `collections` and write them under `key`
pub fn save_collections(storage: &dyn StateStorage, key: &str, collections: &[Collection]) -> Result<()> {
    let raw = encode_collections(collections)?;
    storage.write(key, &raw)
}

/// Open the backend selected in configuration.
///
/// A database that cannot be opened even after recovery yields
/// [`UnavailableStorage`], so startup never fails on storage.
pub fn open_storage(config: &StorageConfig) -> Box<dyn StateStorage> {
    match config.backend {
        StorageBackend::Sqlite => match SqliteStorage::open_or_recover(&config.path) {
            Ok(storage) => Box::new(storage),
            Err(e) => {
                tracing::warn!("Storage at {} is unavailable, changes will not be saved: {}", config.path, e);
                Box::new(UnavailableStorage::new(e.to_string()))
            }
        },
        StorageBackend::Json => Box::new(JsonFileStorage::new(&config.path)),
        StorageBackend::Memory => Box::new(MemoryStorage::new()),
    }
}

/// Stand-in for a backend that failed to open: reads nothing, rejects writes
#[derive(Debug, Clone)]
pub struct UnavailableStorage {
    reason: String,
}

impl UnavailableStorage {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

impl StateStorage for UnavailableStorage {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    fn read(&self, _key: &str) -> Result<Option<String>> {
        Ok(None)
    }

    fn write(&self, _key: &str, _value: &str) -> Result<()> {
        Err(ScanVaultError::Persistence(format!("storage unavailable: {}", self.reason)))
    }
}

/// In-process slot map; clones share the same slots
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    slots: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStorage for MemoryStorage {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn read(&self, key: &str) -> Result<Option<String>> {
        let slots = self.slots.lock()
            .map_err(|_| ScanVaultError::Persistence("Memory storage lock poisoned".to_string()))?;
        Ok(slots.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let mut slots = self.slots.lock()
            .map_err(|_| ScanVaultError::Persistence("Memory storage lock poisoned".to_string()))?;
        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
