// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Scan upload intake: turn a selected image into an embeddable reference

use base64::{engine::general_purpose, Engine as _};
use image::ImageFormat;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::UploadConfig;
use crate::models::NewScan;
use crate::{Result, ScanVaultError};

/// Where a scan's image comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// External or already-embedded reference, stored verbatim
    Url(String),
    /// Local file to embed as a data URL
    File(PathBuf),
}

impl ImageSource {
    /// `http(s)://` and `data:` arguments are references; anything else is a path
    pub fn parse(arg: &str) -> Self {
        let lower = arg.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("data:") {
            Self::Url(arg.to_string())
        } else {
            Self::File(PathBuf::from(arg))
        }
    }
}

/// An image ready to be handed to the store
#[derive(Debug, Clone)]
pub struct PreparedImage {
    /// Name derived from the file or URL, used when the caller gives none
    pub suggested_name: String,
    pub image_url: String,
    pub mime: Option<&'static str>,
    pub size: Option<u64>,
}

impl PreparedImage {
    /// Build the scan input, preferring an explicit name over the suggestion
    pub fn into_new_scan(self, name: Option<&str>) -> Result<NewScan> {
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(String::from)
            .unwrap_or(self.suggested_name);
        let name = crate::models::validate_name(&name)?;
        Ok(NewScan::new(name, self.image_url))
    }
}

/// Resolve a source into an image reference; files are read asynchronously
pub async fn prepare(source: &ImageSource, config: &UploadConfig) -> Result<PreparedImage> {
    match source {
        ImageSource::Url(url) => Ok(PreparedImage {
            suggested_name: url_scan_name(url),
            image_url: url.clone(),
            mime: None,
            size: None,
        }),
        ImageSource::File(path) => read_image_file(path, config).await,
    }
}

/// Read an image file and embed it as a base64 data URL
pub async fn read_image_file(path: &Path, config: &UploadConfig) -> Result<PreparedImage> {
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        if !config.accepts_extension(ext) {
            return Err(ScanVaultError::UnsupportedFileType(format!("{:?}", path)));
        }
    }

    let size = tokio::fs::metadata(path).await?.len();
    if size == 0 {
        return Err(ScanVaultError::InvalidInput(format!("{:?} is empty", path)));
    }
    if size > config.max_bytes {
        return Err(ScanVaultError::InvalidInput(format!(
            "{:?} is {} bytes, limit is {}",
            path, size, config.max_bytes
        )));
    }

    let data = tokio::fs::read(path).await?;
    let format = image::guess_format(&data)
        .or_else(|_| ImageFormat::from_path(path))
        .map_err(|_| ScanVaultError::UnsupportedFileType(format!("{:?} is not an image", path)))?;
    let mime = format.to_mime_type();
    debug!("Detected {:?} ({}) for {:?}", format, mime, path);

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("scan");

    info!("Embedded {:?} ({} bytes)", path, size);
    Ok(PreparedImage {
        suggested_name: default_scan_name(file_name),
        image_url: encode_data_url(mime, &data),
        mime: Some(mime),
        size: Some(size),
    })
}

/// `data:<mime>;base64,<payload>`
pub fn encode_data_url(mime: &str, data: &[u8]) -> String {
    format!("data:{};base64,{}", mime, general_purpose::STANDARD.encode(data))
}

/// File name with its final extension removed ("notes.v2.png" -> "notes.v2").
/// A name that would become empty is kept whole.
pub fn default_scan_name(file_name: &str) -> String {
    let stem = match file_name.rfind('.') {
        Some(idx) if idx + 1 < file_name.len() && !file_name[idx..].contains('/') => &file_name[..idx],
        _ => file_name,
    };
    if stem.is_empty() {
        file_name.to_string()
    } else {
        stem.to_string()
    }
}

/// Suggested name for a URL reference: its last path segment without extension
pub fn url_scan_name(url: &str) -> String {
    if url.to_ascii_lowercase().starts_with("data:") {
        return "scan".to_string();
    }
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let without_scheme = path.split_once("://").map(|(_, rest)| rest).unwrap_or(path);
    match without_scheme.split_once('/') {
        Some((_, rest)) => match rest.rsplit('/').find(|s| !s.is_empty()) {
            Some(segment) => default_scan_name(segment),
            None => "scan".to_string(),
        },
        None => "scan".to_string(),
    }
}
