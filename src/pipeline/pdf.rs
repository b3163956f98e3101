//! PDF pipeline: text layer first, OCR of rasterised pages as the fallback.
//!
//! Digitally authored PDFs carry their text; reading it is exact and cheap,
//! so OCR only runs when the text layer is empty (scans, photos saved as
//! PDF). Both passes are capped: `max_pages` for the text layer and
//! `min(max_pages, max_ocr_pages)` for rasterisation.

use crate::config::ExtractionConfig;
use crate::error::{PageError, ScanError};
use crate::output::ExtractionOutcome;
use crate::pipeline::image::recognize_page;
use crate::pipeline::ocr::OcrEngine;
use crate::pipeline::postprocess::clean_ocr_text;
use image::DynamicImage;
use tracing::{debug, error, info, warn};

/// Something that can open PDF bytes.
pub trait PdfBackend: Send + Sync {
    /// Whether the underlying library is loaded.
    fn is_available(&self) -> bool;

    /// Parse `bytes` into a document handle.
    fn open<'a>(&'a self, bytes: &'a [u8]) -> Result<Box<dyn PdfHandle + 'a>, ScanError>;
}

/// An opened PDF document.
pub trait PdfHandle {
    fn page_count(&self) -> usize;

    /// Embedded text of page `index` (0-based).
    fn page_text(&self, index: usize) -> Result<String, ScanError>;

    /// Rasterise page `index` (0-based) at `dpi`.
    fn render_page(&self, index: usize, dpi: u32) -> Result<DynamicImage, ScanError>;
}

/// Extract text from PDF bytes.
pub fn extract_from_pdf(
    backend: &dyn PdfBackend,
    engine: &dyn OcrEngine,
    bytes: &[u8],
    config: &ExtractionConfig,
) -> ExtractionOutcome {
    if bytes.is_empty() {
        error!("Empty PDF file bytes provided");
        return ExtractionOutcome::Empty;
    }

    // ── Method 1: embedded text layer ────────────────────────────────────
    info!("Attempting direct PDF text extraction...");
    let document = match backend.open(bytes) {
        Ok(doc) => {
            let total = doc.page_count();
            if total == 0 {
                warn!("PDF has no pages");
                return ExtractionOutcome::Empty;
            }

            let text = read_text_layer(doc.as_ref(), config.max_pages);
            if !text.is_empty() {
                info!(
                    "Successfully extracted {} characters via direct extraction",
                    text.len()
                );
                return ExtractionOutcome::Text(text);
            }
            info!("No text extracted via direct method, trying OCR...");
            Some(doc)
        }
        Err(e) => {
            warn!("Direct PDF text extraction failed: {}", e);
            None
        }
    };

    // ── Method 2: rasterise and OCR ──────────────────────────────────────
    let document = match document {
        Some(doc) => doc,
        None => match backend.open(bytes) {
            Ok(doc) => doc,
            Err(e) => {
                error!("Failed to convert PDF to images: {}", e);
                return ExtractionOutcome::Empty;
            }
        },
    };

    ocr_pages(document.as_ref(), engine, config)
}

/// Read up to `max_pages` text layers; failing pages contribute nothing.
fn read_text_layer(doc: &dyn PdfHandle, max_pages: usize) -> String {
    let total = doc.page_count();
    let pages = total.min(max_pages);
    if total > max_pages {
        warn!(
            "PDF has {} pages, processing only first {}",
            total, max_pages
        );
    }

    let results: Vec<Result<String, PageError>> = (0..pages)
        .map(|idx| {
            doc.page_text(idx).map_err(|e| PageError::TextLayer {
                page: idx + 1,
                detail: e.to_string(),
            })
        })
        .collect();

    collect_pages(results)
}

fn ocr_pages(
    doc: &dyn PdfHandle,
    engine: &dyn OcrEngine,
    config: &ExtractionConfig,
) -> ExtractionOutcome {
    let pages = doc.page_count().min(config.max_ocr_pages());
    if pages == 0 {
        error!("No images generated from PDF");
        return ExtractionOutcome::Empty;
    }
    info!(
        "Converting {} PDF pages to images at {} DPI for OCR...",
        pages, config.ocr_dpi
    );

    if !engine.is_available() {
        return ExtractionOutcome::OcrUnavailable;
    }

    // Pages are rendered one at a time so only one bitmap is alive.
    let mut results = Vec::with_capacity(pages);
    for idx in 0..pages {
        let image = match doc.render_page(idx, config.ocr_dpi) {
            Ok(image) => image,
            Err(e) => {
                error!("Failed to convert PDF to images: {}", e);
                return ExtractionOutcome::Empty;
            }
        };
        debug!("Processing image {}/{} for OCR...", idx + 1, pages);
        results.push(recognize_page(engine, image, idx + 1, config));
    }

    let text = collect_pages(results);
    if text.is_empty() {
        warn!("No text extracted via OCR");
        return ExtractionOutcome::Empty;
    }
    info!("Successfully extracted {} characters via OCR", text.len());
    ExtractionOutcome::Text(text)
}

/// Clean each page, drop failures and blanks, join with newlines.
fn collect_pages(results: Vec<Result<String, PageError>>) -> String {
    results
        .into_iter()
        .enumerate()
        .filter_map(|(idx, result)| match result {
            Ok(text) => {
                let text = clean_ocr_text(&text);
                if text.is_empty() {
                    debug!("No text found on page {}", idx + 1);
                    None
                } else {
                    debug!("Extracted {} characters from page {}", text.len(), idx + 1);
                    Some(text)
                }
            }
            Err(e) => {
                warn!("{}", e);
                None
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
