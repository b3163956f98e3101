//! # rxscan
//!
//! Recover text from uploaded prescriptions and medicine labels: digitally
//! authored PDFs, scanned PDFs and phone photos.
//!
//! ## Why layered extraction?
//!
//! A PDF's embedded text layer is exact and cheap to read, so it always goes
//! first. Scans and photos have no text layer; for those the page is
//! rasterised, cleaned up (contrast, sharpness, median filter) and recognised
//! by Tesseract under several segmentation profiles, keeping whichever result
//! scores best. Labels mix tiny print, odd layouts and glare, and no single
//! profile wins on all of them.
//!
//! ## Pipeline Overview
//!
//! ```text
//! bytes + kind
//!  │
//!  ├─ pdf    text layer (≤ 50 pages) ──▶ done if non-empty
//!  │          └─ else render (≤ 20 pages, 300 DPI) ──┐
//!  ├─ image  decode, size check, colour normalise ───┤
//!  │                                                 ▼
//!  │                         preprocess ──▶ multi-profile OCR ──▶ cleanup
//!  └─ ExtractionOutcome::{Text, Empty, OcrUnavailable}
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rxscan::{DocumentKind, ExtractionConfig, Extractor};
//!
//! let extractor = Extractor::with_defaults(ExtractionConfig::default());
//! let bytes = std::fs::read("label.jpg").unwrap();
//! let outcome = extractor.extract(&bytes, DocumentKind::Image);
//! println!("{}", outcome.as_text());
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `rxscan` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod explain;
pub mod extract;
pub mod kind;
pub mod output;
pub mod pipeline;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExplainConfig, ExtractionConfig, ExtractionConfigBuilder};
pub use error::{PageError, ScanError};
pub use explain::{explain_text, Explanation};
pub use extract::{extract_async, Extractor};
pub use kind::{supported_extensions_display, DocumentKind, RawDocument, SUPPORTED_EXTENSIONS};
pub use output::{DependencyReport, ExtractionOutcome, OCR_UNAVAILABLE_MESSAGE};
pub use pipeline::input::{resolve_input, LoadedInput};
pub use pipeline::ocr::{OcrEngine, OcrProfile};
pub use pipeline::pdf::{PdfBackend, PdfHandle};
pub use pipeline::render::PdfiumBackend;
pub use pipeline::tesseract::TesseractCli;
