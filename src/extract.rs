//! Extraction router: bytes + declared kind → [`ExtractionOutcome`].
//!
//! The router dispatches on the declared [`DocumentKind`] only; deciding the
//! kind from a file name is the host's job ([`DocumentKind::from_path`]).
//! Nothing below this layer propagates an error: every failure becomes
//! [`ExtractionOutcome::Empty`] or [`ExtractionOutcome::OcrUnavailable`].

use crate::config::ExtractionConfig;
use crate::error::ScanError;
use crate::kind::{DocumentKind, RawDocument};
use crate::output::{DependencyReport, ExtractionOutcome};
use crate::pipeline::ocr::OcrEngine;
use crate::pipeline::pdf::{extract_from_pdf, PdfBackend};
use crate::pipeline::image::extract_from_image;
use crate::pipeline::render::PdfiumBackend;
use crate::pipeline::tesseract::TesseractCli;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Text extractor over an injected PDF backend and OCR engine.
///
/// Holds no per-request state; share it behind an [`Arc`] across requests.
pub struct Extractor {
    pdf: Box<dyn PdfBackend>,
    ocr: Box<dyn OcrEngine>,
    config: ExtractionConfig,
}

impl Extractor {
    pub fn new(
        pdf: Box<dyn PdfBackend>,
        ocr: Box<dyn OcrEngine>,
        config: ExtractionConfig,
    ) -> Self {
        Self { pdf, ocr, config }
    }

    /// pdfium for PDFs and the `tesseract` executable for OCR.
    pub fn with_defaults(config: ExtractionConfig) -> Self {
        let ocr = TesseractCli::new(config.language.clone());
        Self::new(Box::new(PdfiumBackend::new()), Box::new(ocr), config)
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Extract text from `bytes` declared as `kind`.
    pub fn extract(&self, bytes: &[u8], kind: DocumentKind) -> ExtractionOutcome {
        if bytes.is_empty() {
            error!("Empty {} bytes provided", kind);
            return ExtractionOutcome::Empty;
        }

        debug!("Extracting {} ({} bytes)", kind, bytes.len());
        let outcome = match kind {
            DocumentKind::Pdf => {
                extract_from_pdf(self.pdf.as_ref(), self.ocr.as_ref(), bytes, &self.config)
            }
            DocumentKind::Image => extract_from_image(self.ocr.as_ref(), bytes, &self.config),
        };

        match &outcome {
            ExtractionOutcome::Text(t) => info!("Extracted {} characters from {}", t.len(), kind),
            ExtractionOutcome::Empty => warn!("No text extracted from {}", kind),
            ExtractionOutcome::OcrUnavailable => error!("{}", outcome),
        }
        outcome
    }

    pub fn extract_document(&self, document: &RawDocument) -> ExtractionOutcome {
        self.extract(&document.bytes, document.kind)
    }

    /// Probe every external component extraction relies on.
    pub fn check_dependencies(&self) -> DependencyReport {
        let pdf_parser = match self.pdf.open(b"dummy") {
            Err(ScanError::MalformedPdf(_)) => true,
            Err(e) => {
                debug!("PDF parser probe: {}", e);
                false
            }
            Ok(_) => true,
        };

        DependencyReport {
            tesseract: self.ocr.is_available(),
            pdf_renderer: self.pdf.is_available(),
            image_library: image_round_trip(),
            pdf_parser,
        }
    }
}

/// Encode a 1×1 RGB image to PNG and decode it back.
fn image_round_trip() -> bool {
    let mut buf = Cursor::new(Vec::new());
    if let Err(e) = DynamicImage::new_rgb8(1, 1).write_to(&mut buf, ImageFormat::Png) {
        debug!("Image library probe: {}", e);
        return false;
    }
    match image::load_from_memory_with_format(buf.get_ref(), ImageFormat::Png) {
        Ok(img) => img.width() == 1 && img.height() == 1,
        Err(e) => {
            debug!("Image library probe: {}", e);
            false
        }
    }
}

/// Run [`Extractor::extract`] on the blocking thread pool.
///
/// OCR and rasterisation are CPU-bound and block, so async hosts must not
/// run them on a runtime worker.
pub async fn extract_async(
    extractor: Arc<Extractor>,
    bytes: Vec<u8>,
    kind: DocumentKind,
) -> Result<ExtractionOutcome, ScanError> {
    tokio::task::spawn_blocking(move || extractor.extract(&bytes, kind))
        .await
        .map_err(|e| ScanError::Internal(format!("Extraction task panicked: {}", e)))
}
