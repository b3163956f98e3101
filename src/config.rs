//! Configuration types for extraction and explanation.
//!
//! Extraction knobs live in [`ExtractionConfig`], built through
//! [`ExtractionConfigBuilder`]; the downstream LLM client is configured with
//! [`ExplainConfig`]. Both default to the values the upload service has always
//! used, so `Default::default()` is a working configuration.

use crate::error::ScanError;
use crate::pipeline::ocr::OcrProfile;
use crate::pipeline::preprocess::PreprocessSettings;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Configuration for text extraction.
///
/// # Example
/// ```rust
/// use rxscan::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .max_pages(10)
///     .ocr_dpi(200)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_ocr_pages(), 10);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Pages read through the embedded text layer. Default: 50.
    ///
    /// Pages past the cap are skipped with a warning, never an error.
    pub max_pages: usize,

    /// Upper bound on pages rasterised for OCR. Default: 20.
    ///
    /// The effective OCR cap is `min(max_pages, max_ocr_pages)`; rasterising
    /// and recognising a page costs far more than reading its text layer.
    pub max_ocr_pages: usize,

    /// Rasterisation resolution for the OCR fallback. Range: 72–600. Default: 300.
    pub ocr_dpi: u32,

    /// Images narrower or shorter than this (in pixels) are not OCR'd. Default: 10.
    pub min_image_dimension: u32,

    /// Contrast enhancement factor applied before OCR. Default: 2.0.
    pub contrast_factor: f32,

    /// Sharpness enhancement factor applied before OCR. Default: 2.0.
    pub sharpness_factor: f32,

    /// Median filter radius (1 → 3×3 window). Default: 1.
    pub median_radius: u32,

    /// First OCR profile tried; the built-in segmentation modes follow it.
    pub custom_profile: OcrProfile,

    /// Tesseract language code(s), e.g. `eng` or `eng+spa`. Default: `eng`.
    pub language: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_pages: 50,
            max_ocr_pages: 20,
            ocr_dpi: 300,
            min_image_dimension: 10,
            contrast_factor: 2.0,
            sharpness_factor: 2.0,
            median_radius: 1,
            custom_profile: OcrProfile::whitelisted(),
            language: "eng".to_string(),
        }
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Effective number of pages rasterised for OCR.
    pub fn max_ocr_pages(&self) -> usize {
        self.max_pages.min(self.max_ocr_pages)
    }

    /// The ordered profile list the scorer walks for every image.
    pub fn profiles(&self) -> Vec<OcrProfile> {
        OcrProfile::chain(&self.custom_profile)
    }

    pub fn preprocess_settings(&self) -> PreprocessSettings {
        PreprocessSettings {
            contrast_factor: self.contrast_factor,
            sharpness_factor: self.sharpness_factor,
            median_radius: self.median_radius,
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn max_pages(mut self, n: usize) -> Self {
        self.config.max_pages = n;
        self
    }

    pub fn max_ocr_pages(mut self, n: usize) -> Self {
        self.config.max_ocr_pages = n;
        self
    }

    pub fn ocr_dpi(mut self, dpi: u32) -> Self {
        self.config.ocr_dpi = dpi.clamp(72, 600);
        self
    }

    pub fn min_image_dimension(mut self, px: u32) -> Self {
        self.config.min_image_dimension = px;
        self
    }

    pub fn contrast_factor(mut self, f: f32) -> Self {
        self.config.contrast_factor = f;
        self
    }

    pub fn sharpness_factor(mut self, f: f32) -> Self {
        self.config.sharpness_factor = f;
        self
    }

    pub fn median_radius(mut self, r: u32) -> Self {
        self.config.median_radius = r;
        self
    }

    pub fn custom_profile(mut self, profile: OcrProfile) -> Self {
        self.config.custom_profile = profile;
        self
    }

    pub fn language(mut self, lang: impl Into<String>) -> Self {
        self.config.language = lang.into();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ScanError> {
        let c = &self.config;
        if c.max_pages == 0 {
            return Err(ScanError::InvalidConfig("max_pages must be ≥ 1".into()));
        }
        if c.max_ocr_pages == 0 {
            return Err(ScanError::InvalidConfig("max_ocr_pages must be ≥ 1".into()));
        }
        if c.min_image_dimension == 0 {
            return Err(ScanError::InvalidConfig(
                "min_image_dimension must be ≥ 1".into(),
            ));
        }
        if c.contrast_factor <= 0.0 || c.sharpness_factor <= 0.0 {
            return Err(ScanError::InvalidConfig(format!(
                "enhancement factors must be > 0, got contrast={} sharpness={}",
                c.contrast_factor, c.sharpness_factor
            )));
        }
        if c.language.trim().is_empty() {
            return Err(ScanError::InvalidConfig("language must not be empty".into()));
        }
        Ok(self.config)
    }
}

/// Configuration for the downstream explanation client.
#[derive(Clone)]
pub struct ExplainConfig {
    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// LLM provider name (e.g. "gemini", "openai").
    pub provider_name: Option<String>,

    /// Model identifier. If None, uses `gemini-2.0-flash`.
    pub model: Option<String>,

    /// Retries after the first failed call. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per retry. Default: 1000.
    pub retry_backoff_ms: u64,

    /// Sampling temperature. Default: 0.7.
    pub temperature: f32,

    /// Maximum tokens generated for the explanation. Default: 2048.
    pub max_tokens: usize,

    /// Prompts longer than this many characters are truncated. Default: 30 000.
    pub max_prompt_chars: usize,
}

/// Model used when neither the caller nor the environment names one.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

impl Default for ExplainConfig {
    fn default() -> Self {
        Self {
            provider: None,
            provider_name: None,
            model: None,
            max_retries: 3,
            retry_backoff_ms: 1000,
            temperature: 0.7,
            max_tokens: 2048,
            max_prompt_chars: 30_000,
        }
    }
}

impl fmt::Debug for ExplainConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExplainConfig")
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("provider_name", &self.provider_name)
            .field("model", &self.model)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_prompt_chars", &self.max_prompt_chars)
            .finish()
    }
}

impl ExplainConfig {
    pub fn model_or_default(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}
