// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Error types for ScanVault

use thiserror::Error;

/// Result type alias for ScanVault operations
pub type Result<T> = std::result::Result<T, ScanVaultError>;

/// ScanVault error types
#[derive(Error, Debug)]
pub enum ScanVaultError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ScanVaultError {
    /// Missing collection, reported by id
    pub fn collection_not_found(id: &str) -> Self {
        Self::NotFound(format!("collection {}", id))
    }

    /// Missing scan within a collection
    pub fn scan_not_found(collection_id: &str, scan_id: &str) -> Self {
        Self::NotFound(format!("scan {} in collection {}", scan_id, collection_id))
    }
}
