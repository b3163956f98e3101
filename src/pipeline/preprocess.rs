//! Image preprocessing ahead of OCR.
//!
//! Phone photos of medicine labels are typically low-contrast, slightly
//! blurred and noisy. Four cheap, deterministic steps help Tesseract:
//!
//! 1. convert to 8-bit RGB
//! 2. stretch contrast around the mean luminance
//! 3. sharpen against a smoothed copy
//! 4. median filter to knock out speckle noise
//!
//! Preprocessing is best-effort: if it cannot run, the untouched image goes
//! to OCR instead.

use crate::error::ScanError;
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::filter::median_filter;
use tracing::{debug, warn};

/// Enhancement parameters. See [`crate::ExtractionConfig`] for defaults.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreprocessSettings {
    pub contrast_factor: f32,
    pub sharpness_factor: f32,
    pub median_radius: u32,
}

impl Default for PreprocessSettings {
    fn default() -> Self {
        Self {
            contrast_factor: 2.0,
            sharpness_factor: 2.0,
            median_radius: 1,
        }
    }
}

/// Enhance `image` for OCR, or hand it back untouched if enhancement fails.
pub fn preprocess(image: DynamicImage, settings: &PreprocessSettings) -> DynamicImage {
    match try_preprocess(&image, settings) {
        Ok(enhanced) => DynamicImage::ImageRgb8(enhanced),
        Err(e) => {
            warn!("Image preprocessing failed: {}", e);
            image
        }
    }
}

fn try_preprocess(image: &DynamicImage, settings: &PreprocessSettings) -> Result<RgbImage, ScanError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(ScanError::Internal("cannot enhance a zero-area image".into()));
    }
    if !settings.contrast_factor.is_finite() || !settings.sharpness_factor.is_finite() {
        return Err(ScanError::Internal(format!(
            "non-finite enhancement factor: {:?}",
            settings
        )));
    }

    let rgb = image.to_rgb8();
    let rgb = enhance_contrast(&rgb, settings.contrast_factor);
    let rgb = enhance_sharpness(&rgb, settings.sharpness_factor);
    let rgb = if settings.median_radius > 0 {
        median_filter(&rgb, settings.median_radius, settings.median_radius)
    } else {
        rgb
    };

    debug!("Preprocessed {}x{} image", rgb.width(), rgb.height());
    Ok(rgb)
}

fn clamp_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// ITU-R 601-2 luma, the weighting used for greyscale conversion.
fn luma(p: &Rgb<u8>) -> f64 {
    (p[0] as f64 * 299.0 + p[1] as f64 * 587.0 + p[2] as f64 * 114.0) / 1000.0
}

/// Push every channel away from (factor > 1) or toward the mean luminance.
fn enhance_contrast(img: &RgbImage, factor: f32) -> RgbImage {
    let n = img.width() as f64 * img.height() as f64;
    let mean = (img.pixels().map(luma).sum::<f64>() / n + 0.5).floor() as f32;

    let mut out = img.clone();
    for p in out.pixels_mut() {
        for c in p.0.iter_mut() {
            *c = clamp_u8(mean + factor * (*c as f32 - mean));
        }
    }
    out
}

/// Blend against a 3×3 smoothed copy (centre weight 5, neighbours 1).
///
/// The one-pixel border is copied from the input unchanged rather than
/// convolved against clamped or reflected edges, which is why this does not
/// use `imageops::filter3x3`: that filter would smear the border and shift
/// OCR results on tightly cropped labels.
fn enhance_sharpness(img: &RgbImage, factor: f32) -> RgbImage {
    const KERNEL: [f32; 9] = [1.0, 1.0, 1.0, 1.0, 5.0, 1.0, 1.0, 1.0, 1.0];
    const KERNEL_SUM: f32 = 13.0;

    let (w, h) = img.dimensions();
    let mut out = img.clone();
    if w < 3 || h < 3 {
        return out;
    }

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let mut acc = [0.0f32; 3];
            for (k, weight) in KERNEL.iter().enumerate() {
                let px = img.get_pixel(x + (k as u32 % 3) - 1, y + (k as u32 / 3) - 1);
                for (a, &ch) in acc.iter_mut().zip(px.0.iter()) {
                    *a += weight * ch as f32;
                }
            }

            let original = img.get_pixel(x, y);
            let mut sharpened = [0u8; 3];
            for c in 0..3 {
                let smooth = acc[c] / KERNEL_SUM;
                sharpened[c] = clamp_u8(smooth + factor * (original[c] as f32 - smooth));
            }
            out.put_pixel(x, y, Rgb(sharpened));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn output_is_rgb8() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(12, 12, Rgba([10, 20, 30, 255])));
        let out = preprocess(img, &PreprocessSettings::default());
        assert!(matches!(out, DynamicImage::ImageRgb8(_)));
        assert_eq!((out.width(), out.height()), (12, 12));
    }

    #[test]
    fn flat_grey_is_unchanged() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 16, Rgb([128, 128, 128])));
        let out = preprocess(img, &PreprocessSettings::default()).to_rgb8();
        assert!(out.pixels().all(|p| *p == Rgb([128, 128, 128])));
    }

    #[test]
    fn contrast_spreads_values_around_mean() {
        let img = RgbImage::from_fn(10, 10, |x, _| {
            if x < 5 {
                Rgb([100, 100, 100])
            } else {
                Rgb([200, 200, 200])
            }
        });
        let out = enhance_contrast(&img, 2.0);
        assert_eq!(*out.get_pixel(0, 0), Rgb([50, 50, 50]));
        assert_eq!(*out.get_pixel(9, 9), Rgb([250, 250, 250]));
    }

    #[test]
    fn contrast_saturates() {
        let img = RgbImage::from_fn(4, 1, |x, _| if x < 2 { Rgb([0, 0, 0]) } else { Rgb([255, 255, 255]) });
        let out = enhance_contrast(&img, 2.0);
        assert_eq!(*out.get_pixel(0, 0), Rgb([0, 0, 0]));
        assert_eq!(*out.get_pixel(3, 0), Rgb([255, 255, 255]));
    }

    #[test]
    fn sharpness_amplifies_a_dot() {
        let mut img = RgbImage::from_pixel(5, 5, Rgb([100, 100, 100]));
        img.put_pixel(2, 2, Rgb([150, 150, 150]));
        let out = enhance_sharpness(&img, 2.0);
        assert!(out.get_pixel(2, 2)[0] > 150);
        // Border untouched.
        assert_eq!(*out.get_pixel(0, 0), Rgb([100, 100, 100]));
    }

    #[test]
    fn sharpness_copies_border_next_to_detail() {
        let mut img = RgbImage::from_pixel(6, 6, Rgb([100, 100, 100]));
        img.put_pixel(1, 1, Rgb([220, 220, 220]));
        let out = enhance_sharpness(&img, 2.0);
        for x in 0..6 {
            assert_eq!(*out.get_pixel(x, 0), Rgb([100, 100, 100]));
        }
        for y in 0..6 {
            assert_eq!(*out.get_pixel(0, y), Rgb([100, 100, 100]));
        }
        // Interior neighbours of the dot are pulled away from it.
        assert!(out.get_pixel(2, 2)[0] < 100);
    }

    #[test]
    fn median_removes_speckle() {
        let mut img = RgbImage::from_pixel(9, 9, Rgb([0, 0, 0]));
        img.put_pixel(4, 4, Rgb([255, 255, 255]));
        let settings = PreprocessSettings {
            contrast_factor: 1.0,
            sharpness_factor: 1.0,
            median_radius: 1,
        };
        let out = preprocess(DynamicImage::ImageRgb8(img), &settings).to_rgb8();
        assert_eq!(*out.get_pixel(4, 4), Rgb([0, 0, 0]));
    }

    #[test]
    fn zero_area_image_is_returned_untouched() {
        let img = DynamicImage::ImageLuma8(image::GrayImage::new(0, 0));
        let out = preprocess(img, &PreprocessSettings::default());
        assert!(matches!(out, DynamicImage::ImageLuma8(_)));
    }

    #[test]
    fn non_finite_factor_falls_back() {
        let img = DynamicImage::ImageLuma8(image::GrayImage::new(4, 4));
        let settings = PreprocessSettings {
            contrast_factor: f32::NAN,
            ..Default::default()
        };
        let out = preprocess(img, &settings);
        assert!(matches!(out, DynamicImage::ImageLuma8(_)));
    }
}
