// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Write-through store owning all collections and their scans
//!
//! Every effective mutation is applied to the in-memory list and then the
//! whole list is written to the configured [`StateStorage`] slot. A failed
//! write never rolls back the in-memory change; it is handed back to the
//! caller as a warning on [`Applied`].
//!
//! Operations that reference an unknown collection or scan id are no-ops.
//! They do not write and report the miss through their return value.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::StorageConfig;
use crate::models::{count_label, Collection, NewScan, Scan};
use crate::storage::{self, StateStorage};
use crate::{Result, ScanVaultError};

/// Result of a mutation: the operation's value plus any persistence warning
#[derive(Debug)]
#[must_use]
pub struct Applied<T> {
    pub value: T,
    pub warning: Option<ScanVaultError>,
}

impl<T> Applied<T> {
    fn new(value: T, warning: Option<ScanVaultError>) -> Self {
        Self { value, warning }
    }

    /// Whether the new state reached durable storage
    pub fn is_persisted(&self) -> bool {
        self.warning.is_none()
    }

    /// Drop the warning and keep the value
    pub fn into_value(self) -> T {
        self.value
    }

    /// Turn a persistence warning into a hard error
    pub fn into_result(self) -> Result<T> {
        match self.warning {
            Some(e) => Err(e),
            None => Ok(self.value),
        }
    }
}

/// Collection and scan counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub collection_count: usize,
    pub scan_count: usize,
}

/// Owner of all collections; construct once and pass by reference
pub struct CollectionStore {
    collections: Vec<Collection>,
    storage: Box<dyn StateStorage>,
    key: String,
}

impl CollectionStore {
    /// Rehydrate from `storage`; missing or corrupt state starts empty
    pub fn open(storage: Box<dyn StateStorage>, key: impl Into<String>) -> Self {
        let key = key.into();
        let collections = storage::load_collections(storage.as_ref(), &key);
        info!(
            "Loaded {} from {} storage",
            count_label(collections.len(), "collection", "collections"),
            storage.name()
        );
        Self { collections, storage, key }
    }

    /// Open the backend named in configuration and rehydrate from it.
    ///
    /// Never fails: an unusable backend opens empty and every mutation then
    /// carries a persistence warning.
    pub fn from_config(config: &StorageConfig) -> Self {
        let storage = storage::open_storage(config);
        Self::open(storage, config.key.clone())
    }

    /// All collections in creation order
    pub fn collections(&self) -> &[Collection] {
        &self.collections
    }

    /// Find a collection by id
    pub fn get_collection(&self, id: &str) -> Option<&Collection> {
        self.collections.iter().find(|c| c.id == id)
    }

    /// Scans of a collection in insertion order
    pub fn scans(&self, collection_id: &str) -> Option<&[Scan]> {
        self.get_collection(collection_id).map(|c| c.scans.as_slice())
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            collection_count: self.collections.len(),
            scan_count: self.collections.iter().map(|c| c.scans.len()).sum(),
        }
    }

    /// Create a collection and append it.
    ///
    /// The name is stored as given; use [`crate::models::validate_name`] first.
    pub fn add_collection(&mut self, name: &str, description: Option<&str>) -> Applied<Collection> {
        let collection = Collection::create(name.to_string(), description.map(String::from));
        debug!("Adding collection {} ({})", collection.id, collection.name);

        self.collections.push(collection.clone());
        let warning = self.persist();
        Applied::new(collection, warning)
    }

    /// Remove a collection together with all of its scans.
    ///
    /// Returns the removed collection, or `None` when the id is unknown.
    pub fn delete_collection(&mut self, id: &str) -> Applied<Option<Collection>> {
        let Some(index) = self.collections.iter().position(|c| c.id == id) else {
            debug!("delete_collection: no collection {}", id);
            return Applied::new(None, None);
        };

        let removed = self.collections.remove(index);
        debug!(
            "Deleted collection {} with {}",
            removed.id,
            removed.scan_count_label()
        );
        let warning = self.persist();
        Applied::new(Some(removed), warning)
    }

    /// Append a new scan to a collection.
    ///
    /// The first scan ever added sets the cover image; later scans leave it alone.
    pub fn add_scan_to_collection(&mut self, collection_id: &str, scan: NewScan) -> Applied<Option<Scan>> {
        let Some(collection) = self.collections.iter_mut().find(|c| c.id == collection_id) else {
            debug!("add_scan_to_collection: no collection {}", collection_id);
            return Applied::new(None, None);
        };

        let scan = Scan::create(scan);
        // an empty cover counts as unset
        if collection.cover_image.as_deref().map_or(true, str::is_empty) {
            collection.cover_image = Some(scan.image_url.clone());
        }
        collection.scans.push(scan.clone());
        debug!("Added scan {} to collection {}", scan.id, collection_id);

        let warning = self.persist();
        Applied::new(Some(scan), warning)
    }

    /// Remove one scan from a collection. The cover image is not recomputed.
    pub fn delete_scan(&mut self, collection_id: &str, scan_id: &str) -> Applied<Option<Scan>> {
        let removed = self
            .collections
            .iter_mut()
            .find(|c| c.id == collection_id)
            .and_then(|c| {
                let index = c.scans.iter().position(|s| s.id == scan_id)?;
                Some(c.scans.remove(index))
            });

        match removed {
            Some(scan) => {
                debug!("Deleted scan {} from collection {}", scan.id, collection_id);
                let warning = self.persist();
                Applied::new(Some(scan), warning)
            }
            None => {
                debug!("delete_scan: no scan {} in collection {}", scan_id, collection_id);
                Applied::new(None, None)
            }
        }
    }

    /// Overwrite the cover image of a collection; returns false when the id is unknown
    pub fn update_collection_cover(&mut self, collection_id: &str, image_url: &str) -> Applied<bool> {
        let Some(collection) = self.collections.iter_mut().find(|c| c.id == collection_id) else {
            debug!("update_collection_cover: no collection {}", collection_id);
            return Applied::new(false, None);
        };

        collection.cover_image = Some(image_url.to_string());
        let warning = self.persist();
        Applied::new(true, warning)
    }

    fn persist(&self) -> Option<ScanVaultError> {
        match storage::save_collections(self.storage.as_ref(), &self.key, &self.collections) {
            Ok(()) => None,
            Err(e) => {
                warn!("Failed to persist collections to {} storage: {}", self.storage.name(), e);
                Some(ScanVaultError::Persistence(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageBackend;
    use crate::storage::MemoryStorage;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const KEY: &str = "scanvault-storage";

    /// Counts writes and can be told to fail them
    #[derive(Clone, Default)]
    struct RecordingStorage {
        inner: MemoryStorage,
        writes: Arc<AtomicUsize>,
        fail: bool,
    }

    impl StateStorage for RecordingStorage {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn read(&self, key: &str) -> Result<Option<String>> {
            self.inner.read(key)
        }

        fn write(&self, key: &str, value: &str) -> Result<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ScanVaultError::FileSystem(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "read-only",
                )));
            }
            self.inner.write(key, value)
        }
    }

    fn memory_store() -> (CollectionStore, MemoryStorage) {
        let storage = MemoryStorage::new();
        let store = CollectionStore::open(Box::new(storage.clone()), KEY);
        (store, storage)
    }

    #[test]
    fn test_add_collection_preserves_call_order() {
        let (mut store, _) = memory_store();
        let names = ["Physics", "Chemistry", "Biology", "Maths"];

        for name in names {
            store.add_collection(name, None).into_value();
        }

        assert_eq!(store.len(), names.len());
        let stored: Vec<&str> = store.collections().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(stored, names);
    }

    #[test]
    fn test_new_collection_defaults() {
        let (mut store, _) = memory_store();
        let collection = store.add_collection("Physics", Some("Semester 1")).into_value();

        assert!(collection.scans.is_empty());
        assert_eq!(collection.cover_image, None);
        assert_eq!(collection.description.as_deref(), Some("Semester 1"));
        assert_eq!(store.get_collection(&collection.id), Some(&collection));
    }

    #[test]
    fn test_delete_collection_is_idempotent() {
        let (mut store, _) = memory_store();
        let keep = store.add_collection("Keep", None).into_value();
        let gone = store.add_collection("Gone", None).into_value();

        let first = store.delete_collection(&gone.id);
        assert!(first.is_persisted());
        assert_eq!(first.value.map(|c| c.id), Some(gone.id.clone()));

        let second = store.delete_collection(&gone.id);
        assert!(second.value.is_none());
        assert!(second.warning.is_none());

        assert_eq!(store.len(), 1);
        assert_eq!(store.collections()[0].id, keep.id);
    }

    #[test]
    fn test_first_scan_sets_cover_only_once() {
        let (mut store, _) = memory_store();
        let collection = store.add_collection("Physics", None).into_value();

        store.add_scan_to_collection(&collection.id, NewScan::new("p1", "data:img1")).into_value();
        assert_eq!(
            store.get_collection(&collection.id).unwrap().cover_image.as_deref(),
            Some("data:img1")
        );

        store.add_scan_to_collection(&collection.id, NewScan::new("p2", "data:img2")).into_value();
        assert_eq!(
            store.get_collection(&collection.id).unwrap().cover_image.as_deref(),
            Some("data:img1")
        );
    }

    #[test]
    fn test_add_scan_to_unknown_collection_is_noop() {
        let storage = RecordingStorage::default();
        let writes = storage.writes.clone();
        let mut store = CollectionStore::open(Box::new(storage), KEY);

        let applied = store.add_scan_to_collection("missing", NewScan::new("p1", "data:img1"));
        assert!(applied.value.is_none());
        assert!(store.is_empty());
        assert_eq!(writes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_delete_scan_removes_exactly_one() {
        let (mut store, _) = memory_store();
        let collection = store.add_collection("Physics", None).into_value();
        let ids: Vec<String> = ["a", "b", "c", "d"]
            .iter()
            .map(|n| {
                store
                    .add_scan_to_collection(&collection.id, NewScan::new(*n, format!("data:{}", n)))
                    .into_value()
                    .unwrap()
                    .id
            })
            .collect();

        let removed = store.delete_scan(&collection.id, &ids[1]).into_value();
        assert_eq!(removed.map(|s| s.name), Some("b".to_string()));

        let remaining: Vec<&str> = store
            .scans(&collection.id)
            .unwrap()
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(remaining, ["a", "c", "d"]);

        assert!(store.delete_scan(&collection.id, &ids[1]).value.is_none());
        assert!(store.delete_scan("missing", &ids[0]).value.is_none());
        assert_eq!(store.scans(&collection.id).unwrap().len(), 3);
    }

    #[test]
    fn test_delete_scan_keeps_cover() {
        let (mut store, _) = memory_store();
        let collection = store.add_collection("Physics", None).into_value();
        let first = store
            .add_scan_to_collection(&collection.id, NewScan::new("p1", "data:img1"))
            .into_value()
            .unwrap();

        store.delete_scan(&collection.id, &first.id).into_value();

        let collection = store.get_collection(&collection.id).unwrap();
        assert!(collection.scans.is_empty());
        assert_eq!(collection.cover_image.as_deref(), Some("data:img1"));
    }

    #[test]
    fn test_update_cover_overrides() {
        let (mut store, _) = memory_store();
        let collection = store.add_collection("Physics", None).into_value();
        store.add_scan_to_collection(&collection.id, NewScan::new("p1", "data:img1")).into_value();

        assert!(store.update_collection_cover(&collection.id, "https://example.com/c.png").into_value());
        assert_eq!(
            store.get_collection(&collection.id).unwrap().cover_image.as_deref(),
            Some("https://example.com/c.png")
        );

        assert!(!store.update_collection_cover("missing", "x").into_value());
    }

    #[test]
    fn test_manual_cover_is_not_replaced_by_first_scan() {
        let (mut store, _) = memory_store();
        let collection = store.add_collection("Physics", None).into_value();

        store.update_collection_cover(&collection.id, "data:manual").into_value();
        store.add_scan_to_collection(&collection.id, NewScan::new("p1", "data:img1")).into_value();

        assert_eq!(
            store.get_collection(&collection.id).unwrap().cover_image.as_deref(),
            Some("data:manual")
        );
    }

    #[test]
    fn test_empty_cover_is_replaced_by_next_scan() {
        let (mut store, _) = memory_store();
        let collection = store.add_collection("Physics", None).into_value();

        store.update_collection_cover(&collection.id, "").into_value();
        store.add_scan_to_collection(&collection.id, NewScan::new("p1", "data:img1")).into_value();
        store.add_scan_to_collection(&collection.id, NewScan::new("p2", "data:img2")).into_value();

        assert_eq!(
            store.get_collection(&collection.id).unwrap().cover_image.as_deref(),
            Some("data:img1")
        );
    }

    #[test]
    fn test_ids_unique_across_deletions() {
        let (mut store, _) = memory_store();
        let mut seen = HashSet::new();

        for round in 0..5 {
            let collection = store.add_collection(&format!("c{}", round), None).into_value();
            assert!(seen.insert(collection.id.clone()));
            for i in 0..3 {
                let scan = store
                    .add_scan_to_collection(&collection.id, NewScan::new(format!("s{}", i), "data:x"))
                    .into_value()
                    .unwrap();
                assert!(seen.insert(scan.id));
            }
            store.delete_collection(&collection.id).into_value();
        }

        assert!(store.is_empty());
    }

    #[test]
    fn test_state_survives_reopen() {
        let (mut store, storage) = memory_store();
        let collection = store.add_collection("Physics", Some("notes")).into_value();
        store.add_scan_to_collection(&collection.id, NewScan::new("p1", "data:img1")).into_value();
        let expected = store.collections().to_vec();
        drop(store);

        let reopened = CollectionStore::open(Box::new(storage), KEY);
        assert_eq!(reopened.collections(), expected.as_slice());
    }

    #[test]
    fn test_corrupt_storage_opens_empty() {
        let storage = MemoryStorage::new();
        storage.write(KEY, "[1, 2, 3]").unwrap();

        let store = CollectionStore::open(Box::new(storage), KEY);
        assert!(store.is_empty());
    }

    #[test]
    fn test_from_config_recovers_corrupt_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scanvault.db");
        std::fs::write(&path, vec![b'x'; 4096]).unwrap();
        let config = StorageConfig {
            backend: StorageBackend::Sqlite,
            path: path.to_string_lossy().to_string(),
            key: KEY.to_string(),
        };

        let mut store = CollectionStore::from_config(&config);
        assert!(store.is_empty());
        assert!(store.add_collection("Physics", None).is_persisted());
        drop(store);

        let reopened = CollectionStore::from_config(&config);
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.collections()[0].name, "Physics");
    }

    #[test]
    fn test_from_config_unopenable_database_warns_on_write() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            backend: StorageBackend::Sqlite,
            path: dir.path().join("absent").join("scanvault.db").to_string_lossy().to_string(),
            key: KEY.to_string(),
        };

        let mut store = CollectionStore::from_config(&config);
        assert!(store.is_empty());
        let applied = store.add_collection("Physics", None);
        assert!(matches!(applied.warning, Some(ScanVaultError::Persistence(_))));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_write_failure_is_a_warning() {
        let storage = RecordingStorage { fail: true, ..Default::default() };
        let writes = storage.writes.clone();
        let mut store = CollectionStore::open(Box::new(storage), KEY);

        let applied = store.add_collection("Physics", None);
        assert!(!applied.is_persisted());
        assert!(matches!(applied.warning, Some(ScanVaultError::Persistence(_))));
        assert_eq!(writes.load(Ordering::SeqCst), 1);

        // in-memory state is kept
        assert_eq!(store.len(), 1);
        assert_eq!(store.collections()[0].name, "Physics");
    }

    #[test]
    fn test_into_result_surfaces_warning() {
        let storage = RecordingStorage { fail: true, ..Default::default() };
        let mut store = CollectionStore::open(Box::new(storage), KEY);
        assert!(store.add_collection("Physics", None).into_result().is_err());
    }

    #[test]
    fn test_each_mutation_writes_once() {
        let storage = RecordingStorage::default();
        let writes = storage.writes.clone();
        let mut store = CollectionStore::open(Box::new(storage), KEY);

        let c = store.add_collection("Physics", None).into_value();
        let s = store.add_scan_to_collection(&c.id, NewScan::new("p1", "data:img1")).into_value().unwrap();
        store.update_collection_cover(&c.id, "data:other").into_value();
        store.delete_scan(&c.id, &s.id).into_value();
        store.delete_collection(&c.id).into_value();

        assert_eq!(writes.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_stats() {
        let (mut store, _) = memory_store();
        let a = store.add_collection("A", None).into_value();
        store.add_collection("B", None).into_value();
        store.add_scan_to_collection(&a.id, NewScan::new("1", "data:1")).into_value();
        store.add_scan_to_collection(&a.id, NewScan::new("2", "data:2")).into_value();

        assert_eq!(store.stats(), StoreStats { collection_count: 2, scan_count: 2 });
    }

    #[test]
    fn test_physics_scenario() {
        let (mut store, _) = memory_store();

        let c = store.add_collection("Physics", None).into_value();
        assert!(c.scans.is_empty());
        assert_eq!(c.cover_image, None);

        let p1 = store
            .add_scan_to_collection(&c.id, NewScan::new("p1", "data:img1"))
            .into_value()
            .unwrap();
        let current = store.get_collection(&c.id).unwrap();
        assert_eq!(current.scans.len(), 1);
        assert_eq!(current.cover_image.as_deref(), Some("data:img1"));

        store.add_scan_to_collection(&c.id, NewScan::new("p2", "data:img2")).into_value();
        let current = store.get_collection(&c.id).unwrap();
        assert_eq!(current.scans.len(), 2);
        assert_eq!(current.cover_image.as_deref(), Some("data:img1"));

        store.delete_scan(&c.id, &p1.id).into_value();
        let current = store.get_collection(&c.id).unwrap();
        assert_eq!(current.scans.len(), 1);
        assert_eq!(current.scans[0].name, "p2");
        assert_eq!(current.cover_image.as_deref(), Some("data:img1"));

        store.delete_collection(&c.id).into_value();
        assert!(store.get_collection(&c.id).is_none());
    }
}
