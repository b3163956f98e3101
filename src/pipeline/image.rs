//! Image pipeline: one uploaded photo or scan → text.
//!
//! Also hosts [`recognize_page`], the preprocess-and-score step the PDF
//! pipeline reuses for every rasterised page.

use crate::config::ExtractionConfig;
use crate::error::{PageError, ScanError};
use crate::output::ExtractionOutcome;
use crate::pipeline::ocr::{score_profiles, OcrEngine};
use crate::pipeline::postprocess::clean_ocr_text;
use crate::pipeline::preprocess::preprocess;
use image::DynamicImage;
use tracing::{debug, error, info, warn};

/// Extract text from encoded image bytes.
pub fn extract_from_image(
    engine: &dyn OcrEngine,
    bytes: &[u8],
    config: &ExtractionConfig,
) -> ExtractionOutcome {
    if bytes.is_empty() {
        error!("Empty image file bytes provided");
        return ExtractionOutcome::Empty;
    }

    if !engine.is_available() {
        return ExtractionOutcome::OcrUnavailable;
    }

    info!("Processing image for text extraction...");

    let image = match decode_image(bytes) {
        Ok(image) => image,
        Err(e) => {
            error!("Failed to load image: {}", e);
            return ExtractionOutcome::Empty;
        }
    };
    info!(
        "Image loaded: {}x{} pixels, color: {:?}",
        image.width(),
        image.height(),
        image.color()
    );

    if is_too_small(&image, config.min_image_dimension) {
        error!("Image too small for OCR");
        return ExtractionOutcome::Empty;
    }

    let image = normalize_color(image);

    match recognize_page(engine, image, 1, config) {
        Ok(text) if !text.is_empty() => {
            info!("Successfully extracted {} characters from image", text.len());
            ExtractionOutcome::Text(text)
        }
        Ok(_) => {
            warn!("No text found in image");
            ExtractionOutcome::Empty
        }
        Err(e) => {
            warn!("{}", e);
            ExtractionOutcome::Empty
        }
    }
}

/// Preprocess `image`, score it under every configured profile and clean the
/// winning text.
///
/// Fails only when every profile failed outright; "nothing recognised" is an
/// `Ok` empty string.
pub fn recognize_page(
    engine: &dyn OcrEngine,
    image: DynamicImage,
    page: usize,
    config: &ExtractionConfig,
) -> Result<String, PageError> {
    let processed = preprocess(image, &config.preprocess_settings());
    let profiles = config.profiles();
    let round = score_profiles(engine, &processed, &profiles);

    if round.all_failed() {
        let detail = round
            .failures
            .last()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no OCR profiles configured".to_string());
        return Err(PageError::Ocr { page, detail });
    }

    debug!(
        "Page {}: best of {} profiles ({} failed), score {:?}",
        page,
        round.attempts,
        round.failures.len(),
        round.best.score
    );
    Ok(clean_ocr_text(&round.best.text))
}

pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, ScanError> {
    image::load_from_memory(bytes).map_err(|e| ScanError::ImageDecode(e.to_string()))
}

fn is_too_small(image: &DynamicImage, min_dimension: u32) -> bool {
    image.width() < min_dimension || image.height() < min_dimension
}

/// Bring 16-bit and float pixel formats down to 8-bit RGB.
fn normalize_color(image: DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageRgb8(_)
        | DynamicImage::ImageRgba8(_)
        | DynamicImage::ImageLuma8(_)
        | DynamicImage::ImageLumaA8(_) => image,
        other => {
            debug!("Converting {:?} image to RGB8", other.color());
            DynamicImage::ImageRgb8(other.to_rgb8())
        }
    }
}
