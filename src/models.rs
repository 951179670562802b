// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Collection and scan records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Result, ScanVaultError};

/// A single named image entry owned by one collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scan {
    pub id: String,
    pub name: String,
    /// Data URL or external URL, treated as an opaque string
    pub image_url: String,
    pub created_at: DateTime<Utc>,
}

/// A named, ordered group of scans
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub scans: Vec<Scan>,
    pub created_at: DateTime<Utc>,
}

/// Caller-supplied part of a scan; id and timestamp are assigned by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewScan {
    pub name: String,
    pub image_url: String,
}

impl NewScan {
    pub fn new(name: impl Into<String>, image_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image_url: image_url.into(),
        }
    }
}

impl Scan {
    pub(crate) fn create(input: NewScan) -> Self {
        Self {
            id: new_id(),
            name: input.name,
            image_url: input.image_url,
            created_at: Utc::now(),
        }
    }
}

impl Collection {
    pub(crate) fn create(name: String, description: Option<String>) -> Self {
        Self {
            id: new_id(),
            name,
            description,
            cover_image: None,
            scans: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Scan count with the matching noun, e.g. "1 scan" or "3 scans"
    pub fn scan_count_label(&self) -> String {
        count_label(self.scans.len(), "scan", "scans")
    }
}

/// Generate a fresh opaque id for collections and scans
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Format a count with a singular or plural noun
pub fn count_label(count: usize, singular: &str, plural: &str) -> String {
    format!("{} {}", count, if count == 1 { singular } else { plural })
}

/// Trim a display name and reject it when nothing is left
pub fn validate_name(raw: &str) -> Result<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ScanVaultError::InvalidInput("name must not be empty".to_string()));
    }
    Ok(name.to_string())
}

/// Trim an optional description; blank text becomes `None`
pub fn normalize_description(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|d| !d.is_empty())
        .map(String::from)
}
