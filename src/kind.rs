//! Upload classification: file name → [`DocumentKind`].
//!
//! The extraction router dispatches purely on the kind it is handed; deciding
//! that kind from a file name is the host's job and lives here. Several
//! accepted extensions (SVG, HEIC/HEIF, camera RAW) have no decoder in the
//! image pipeline and come back as an empty extraction.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Every extension accepted for upload, lower-case, without the dot.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "pdf", "jpg", "jpeg", "png", "gif", "bmp", "tiff", "tif", "webp", "svg", "ico", "heic", "heif",
    "raw", "cr2", "nef", "arw", "dng", "orf", "rw2", "pef", "srw",
];

/// Declared kind of an uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Image,
}

impl DocumentKind {
    /// Classify a bare extension (`"PDF"`, `"jpg"`, `".png"`).
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            other if SUPPORTED_EXTENSIONS.contains(&other) => Some(DocumentKind::Image),
            _ => None,
        }
    }

    /// Classify a file name or path by its extension.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Image => "image",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comma-separated `.ext` list for user-facing messages.
pub fn supported_extensions_display() -> String {
    SUPPORTED_EXTENSIONS
        .iter()
        .map(|e| format!(".{e}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// An uploaded document: bytes plus the kind the host classified it as.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub bytes: Vec<u8>,
    pub kind: DocumentKind,
}

impl RawDocument {
    pub fn new(bytes: Vec<u8>, kind: DocumentKind) -> Self {
        Self { bytes, kind }
    }
}
