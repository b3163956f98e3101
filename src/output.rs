//! Output types returned by the extraction router and the dependency probe.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Text a host sees when no OCR engine could be run.
///
/// Kept distinct from an empty string so "no OCR engine" never reads as
/// "no text found".
pub const OCR_UNAVAILABLE_MESSAGE: &str = "Error: Tesseract OCR not installed or not found in PATH";

/// The result of one extraction call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "text", rename_all = "snake_case")]
pub enum ExtractionOutcome {
    /// Non-empty, trimmed text.
    Text(String),
    /// Nothing usable was found (empty input, undecodable bytes, blank page).
    Empty,
    /// The OCR engine is not installed or not runnable.
    OcrUnavailable,
}

impl ExtractionOutcome {
    /// Wrap extracted text, mapping whitespace-only text to [`ExtractionOutcome::Empty`].
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            ExtractionOutcome::Empty
        } else if trimmed.len() == text.len() {
            ExtractionOutcome::Text(text)
        } else {
            ExtractionOutcome::Text(trimmed.to_string())
        }
    }

    /// The string contract: text, `""`, or [`OCR_UNAVAILABLE_MESSAGE`].
    pub fn as_text(&self) -> &str {
        match self {
            ExtractionOutcome::Text(t) => t,
            ExtractionOutcome::Empty => "",
            ExtractionOutcome::OcrUnavailable => OCR_UNAVAILABLE_MESSAGE,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            ExtractionOutcome::Text(t) => t,
            other => other.as_text().to_string(),
        }
    }

    /// `true` only for the engine-unavailable sentinel.
    pub fn is_error(&self) -> bool {
        matches!(self, ExtractionOutcome::OcrUnavailable)
    }

    /// `true` when real text was extracted.
    pub fn has_text(&self) -> bool {
        matches!(self, ExtractionOutcome::Text(_))
    }
}

impl fmt::Display for ExtractionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_text())
    }
}

/// Availability of every external component extraction relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyReport {
    /// The OCR engine answers.
    pub tesseract: bool,
    /// The PDF rasteriser is loaded.
    pub pdf_renderer: bool,
    /// Images can be encoded and decoded.
    pub image_library: bool,
    /// PDF bytes can be parsed.
    pub pdf_parser: bool,
}

impl DependencyReport {
    pub fn all_available(&self) -> bool {
        self.tesseract && self.pdf_renderer && self.image_library && self.pdf_parser
    }

    /// `(name, available)` pairs in display order.
    pub fn entries(&self) -> [(&'static str, bool); 4] {
        [
            ("tesseract", self.tesseract),
            ("pdf_renderer", self.pdf_renderer),
            ("image_library", self.image_library),
            ("pdf_parser", self.pdf_parser),
        ]
    }
}
