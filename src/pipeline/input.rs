//! Input resolution: turn a user-supplied path or URL into bytes.
//!
//! Extraction works on in-memory buffers, so a download never touches the
//! file system. The file type is decided later from the returned name.

use crate::error::ScanError;
use std::path::PathBuf;
use tracing::{debug, info};

/// A document read into memory, with the name used to detect its type.
#[derive(Debug, Clone)]
pub struct LoadedInput {
    /// File name or last URL path segment.
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Read a local file, or download a URL with a `timeout_secs` budget.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<LoadedInput, ScanError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(input).await
    }
}

async fn read_local(path_str: &str) -> Result<LoadedInput, ScanError> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(ScanError::InputNotFound { path });
    }

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ScanError::PermissionDenied { path });
        }
        Err(_) => return Err(ScanError::InputNotFound { path }),
    };

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path_str.to_string());

    debug!("Read {} bytes from {}", bytes.len(), path.display());
    Ok(LoadedInput { name, bytes })
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<LoadedInput, ScanError> {
    info!("Downloading from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ScanError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            ScanError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            ScanError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(ScanError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ScanError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    info!("Downloaded {} bytes", bytes.len());
    Ok(LoadedInput {
        name: filename_from_url(url),
        bytes: bytes.to_vec(),
    })
}

/// Last path segment with an extension, or `"download"`.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "download".to_string()
}
