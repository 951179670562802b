// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! ScanVault: Local Scan Gallery Organizer
//!
//! Collections of image scans kept in a write-through in-memory store,
//! persisted to a local key-value slot and restored on startup.

pub mod config;
pub mod error;
pub mod models;
pub mod storage;
pub mod store;
pub mod upload;

pub use config::AppConfig;
pub use error::{Result, ScanVaultError};
pub use models::{Collection, NewScan, Scan};
pub use store::{Applied, CollectionStore, StoreStats};
