//! [`PdfBackend`] backed by pdfium: text layers and rasterisation.
//!
//! ## Binding
//!
//! pdfium is loaded at runtime. `PDFIUM_LIB_PATH` (a library file or the
//! directory holding it) is tried first, then the system library. A missing
//! library is reported as [`ScanError::BackendUnavailable`] instead of the
//! panic `Pdfium::default()` would raise.
//!
//! ## DPI
//!
//! PDF user space is 72 units per inch, so rendering at `dpi` scales every
//! page by `dpi / 72`. 300 DPI keeps small print on labels legible to OCR.

use crate::error::ScanError;
use crate::pipeline::pdf::{PdfBackend, PdfHandle};
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use tracing::{debug, info};

/// Environment variable pointing at an existing pdfium library.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// PDF backend using the pdfium C++ library through `pdfium-render`.
pub struct PdfiumBackend {
    pdfium: Option<Pdfium>,
    bind_error: Option<String>,
}

impl PdfiumBackend {
    /// Bind pdfium now; a failure is remembered and reported per call.
    pub fn new() -> Self {
        match bind_pdfium() {
            Ok(pdfium) => {
                info!("pdfium bound");
                Self {
                    pdfium: Some(pdfium),
                    bind_error: None,
                }
            }
            Err(e) => {
                tracing::warn!("{}", e);
                Self {
                    pdfium: None,
                    bind_error: Some(e.to_string()),
                }
            }
        }
    }

    fn pdfium(&self) -> Result<&Pdfium, ScanError> {
        self.pdfium.as_ref().ok_or_else(|| {
            ScanError::BackendUnavailable(
                self.bind_error
                    .clone()
                    .unwrap_or_else(|| "pdfium not bound".to_string()),
            )
        })
    }
}

impl Default for PdfiumBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn bind_pdfium() -> Result<Pdfium, ScanError> {
    if let Some(path) = std::env::var_os(PDFIUM_LIB_PATH_ENV).map(PathBuf::from) {
        let lib = if path.is_dir() {
            Pdfium::pdfium_platform_library_name_at_path(&path)
        } else {
            path.clone()
        };
        let bindings = Pdfium::bind_to_library(&lib).map_err(|e| {
            ScanError::BackendUnavailable(format!("{}: {:?}", lib.display(), e))
        })?;
        return Ok(Pdfium::new(bindings));
    }

    let bindings = Pdfium::bind_to_system_library()
        .map_err(|e| ScanError::BackendUnavailable(format!("system library: {:?}", e)))?;
    Ok(Pdfium::new(bindings))
}

impl PdfBackend for PdfiumBackend {
    fn is_available(&self) -> bool {
        self.pdfium.is_some()
    }

    fn open<'a>(&'a self, bytes: &'a [u8]) -> Result<Box<dyn PdfHandle + 'a>, ScanError> {
        let pdfium = self.pdfium()?;
        let document = pdfium
            .load_pdf_from_byte_slice(bytes, None)
            .map_err(|e| ScanError::MalformedPdf(format!("{:?}", e)))?;
        debug!("PDF loaded: {} pages", document.pages().len());
        Ok(Box::new(PdfiumDocument { document }))
    }
}

struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
}

impl PdfHandle for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn page_text(&self, index: usize) -> Result<String, ScanError> {
        let page = self
            .document
            .pages()
            .get(index as u16)
            .map_err(|e| ScanError::MalformedPdf(format!("page {}: {:?}", index + 1, e)))?;
        let text = page
            .text()
            .map_err(|e| ScanError::MalformedPdf(format!("page {} text: {:?}", index + 1, e)))?;
        Ok(text.all())
    }

    fn render_page(&self, index: usize, dpi: u32) -> Result<DynamicImage, ScanError> {
        let page = self
            .document
            .pages()
            .get(index as u16)
            .map_err(|e| ScanError::RenderFailed {
                page: index + 1,
                detail: format!("{:?}", e),
            })?;

        let render_config = PdfRenderConfig::new().scale_page_by_factor(dpi as f32 / 72.0);

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| ScanError::RenderFailed {
                page: index + 1,
                detail: format!("{:?}", e),
            })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            index + 1,
            image.width(),
            image.height()
        );
        Ok(image)
    }
}
