//! Pipeline stages for document text extraction.
//!
//! Each submodule implements one step, and the external engines sit behind
//! the [`pdf::PdfBackend`] and [`ocr::OcrEngine`] traits so every stage can be
//! tested with fakes.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ pdf ──(text layer)──────────────────────────▶ postprocess
//!            │
//!            └─(render)─▶ image ──▶ preprocess ──▶ ocr ──▶ postprocess
//! ```
//!
//! 1. [`input`]: read a local path or download a URL into memory
//! 2. [`pdf`]: embedded text first, rasterise-and-OCR as the fallback
//! 3. [`image`]: decode, validate and normalise one image, then OCR it
//! 4. [`preprocess`]: contrast, sharpness and median filtering
//! 5. [`ocr`]: try every profile and keep the best-scoring text
//! 6. [`postprocess`]: strip control characters and normalise whitespace
//!
//! [`render`] and [`tesseract`] hold the production engines (pdfium and the
//! `tesseract` executable).

pub mod image;
pub mod input;
pub mod ocr;
pub mod pdf;
pub mod postprocess;
pub mod preprocess;
pub mod render;
pub mod tesseract;
