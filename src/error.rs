//! Error types for the rxscan library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ScanError`]: **Fatal** for one operation: the PDF cannot be opened,
//!   the OCR engine is missing, the explanation provider is not configured.
//!   The extraction pipelines never hand these to their caller; they are
//!   folded into an [`crate::ExtractionOutcome`] at the router boundary.
//!   Host-facing helpers (input resolution, explanation) return them as
//!   `Err(ScanError)`.
//!
//! * [`PageError`]: **Non-fatal**: one page or one OCR profile failed while
//!   the others are fine. Page and profile loops collect these, log them and
//!   move on.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors produced inside the rxscan library.
#[derive(Debug, Error)]
pub enum ScanError {
    // ── Engine errors ─────────────────────────────────────────────────────
    /// The pdfium shared library could not be bound.
    #[error(
        "PDF backend unavailable: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide."
    )]
    BackendUnavailable(String),

    /// The Tesseract executable is missing or not runnable.
    #[error("Tesseract OCR not installed or not found in PATH: {0}")]
    OcrUnavailable(String),

    /// A Tesseract invocation ran but did not produce usable output.
    #[error("OCR failed: {0}")]
    OcrFailed(String),

    // ── Document errors ───────────────────────────────────────────────────
    /// The bytes could not be parsed as a PDF.
    #[error("PDF is malformed: {0}")]
    MalformedPdf(String),

    /// pdfium returned an error while rasterising a page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// The bytes could not be decoded as any supported image format.
    #[error("Image could not be decoded: {0}")]
    ImageDecode(String),

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    InputNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file extension is not one of the accepted upload types.
    #[error("Unsupported file type '{name}'. Supported: {supported}")]
    UnsupportedFileType { name: String, supported: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The LLM API kept failing after all retries.
    #[error("LLM API error after {attempts} attempts: {message}")]
    LlmApiError { attempts: u32, message: String },

    /// Nothing to explain.
    #[error("Empty prompt provided")]
    EmptyPrompt,

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page or OCR profile.
///
/// Loops that produce these skip the failing item and keep going.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// Reading the embedded text layer of a page failed.
    #[error("Page {page}: text extraction failed: {detail}")]
    TextLayer { page: usize, detail: String },

    /// Preprocessing or OCR of a rasterised page failed.
    #[error("Page {page}: OCR failed: {detail}")]
    Ocr { page: usize, detail: String },

    /// Both the scored and the plain-text attempt failed for a profile.
    #[error("OCR profile '{profile}' failed: {detail}")]
    Profile { profile: String, detail: String },
}
