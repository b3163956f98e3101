//! Multi-profile OCR scoring.
//!
//! One image is recognised under several engine profiles and the best
//! attempt wins. A profile that reports per-token confidences is judged by
//! its mean confidence; one whose confidence report fails is judged by text
//! length instead. The walk is a fold over [`ProfileAttempt`] values with a
//! [`BestCandidate`] accumulator.
//!
//! Length judgements only ever compare against the best text so far, so a
//! long unscored result can displace an earlier, shorter high-confidence one.

use crate::error::{PageError, ScanError};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

/// Characters the label-oriented profile restricts recognition to.
pub const LABEL_WHITELIST: &str =
    "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz.,:-() ";

/// An immutable set of engine options for one recognition attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrProfile {
    /// Tesseract `--oem` value.
    pub engine_mode: u8,
    /// Tesseract `--psm` value.
    pub page_seg_mode: u8,
    /// Restricts recognised characters when set.
    pub char_whitelist: Option<String>,
}

impl OcrProfile {
    pub fn new(engine_mode: u8, page_seg_mode: u8) -> Self {
        Self {
            engine_mode,
            page_seg_mode,
            char_whitelist: None,
        }
    }

    pub fn with_whitelist(mut self, chars: impl Into<String>) -> Self {
        self.char_whitelist = Some(chars.into());
        self
    }

    /// Uniform block of text, restricted to label characters.
    pub fn whitelisted() -> Self {
        Self::new(3, 6).with_whitelist(LABEL_WHITELIST)
    }

    /// Built-in segmentation modes tried after the custom profile:
    /// uniform block, fully automatic, single word, raw line.
    pub fn builtin() -> [OcrProfile; 4] {
        [
            Self::new(3, 6),
            Self::new(3, 3),
            Self::new(3, 8),
            Self::new(3, 13),
        ]
    }

    /// `custom` followed by the built-in profiles.
    pub fn chain(custom: &OcrProfile) -> Vec<OcrProfile> {
        std::iter::once(custom.clone())
            .chain(Self::builtin())
            .collect()
    }

    /// Command-line arguments selecting this profile.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "--oem".to_string(),
            self.engine_mode.to_string(),
            "--psm".to_string(),
            self.page_seg_mode.to_string(),
        ];
        if let Some(ref wl) = self.char_whitelist {
            args.push("-c".to_string());
            args.push(format!("tessedit_char_whitelist={wl}"));
        }
        args
    }
}

impl fmt::Display for OcrProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "--oem {} --psm {}", self.engine_mode, self.page_seg_mode)?;
        if self.char_whitelist.is_some() {
            f.write_str(" +whitelist")?;
        }
        Ok(())
    }
}

/// An OCR engine the pipelines can drive.
///
/// Implementations must be shareable across concurrent requests; every call
/// is independent.
pub trait OcrEngine: Send + Sync {
    /// Whether the engine can be invoked at all.
    fn is_available(&self) -> bool;

    /// Per-token confidences (0–100, negative or zero for non-words) for
    /// `image` under `profile`.
    fn token_confidences(
        &self,
        image: &DynamicImage,
        profile: &OcrProfile,
    ) -> Result<Vec<f32>, ScanError>;

    /// Recognised text for `image` under `profile`.
    fn recognize(&self, image: &DynamicImage, profile: &OcrProfile) -> Result<String, ScanError>;
}

/// How a candidate's quality was judged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Score {
    /// Mean confidence over positive-confidence tokens.
    Confidence(f32),
    /// Confidence unavailable; judged by text length.
    Unscored,
}

/// The outcome of one profile on one image.
#[derive(Debug, Clone)]
pub enum ProfileAttempt {
    Scored { text: String, confidence: f32 },
    Unscored { text: String },
    Failed(PageError),
}

/// Best-so-far accumulator of the scoring fold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestCandidate {
    pub text: String,
    /// Highest confidence accepted through the confidence rule.
    pub confidence: f32,
    /// How the current `text` won, `None` while nothing has.
    pub score: Option<Score>,
}

impl Default for BestCandidate {
    fn default() -> Self {
        Self {
            text: String::new(),
            confidence: 0.0,
            score: None,
        }
    }
}

impl BestCandidate {
    /// Fold one attempt into the accumulator.
    pub fn absorb(mut self, profile: &OcrProfile, attempt: ProfileAttempt) -> Self {
        match attempt {
            ProfileAttempt::Scored { text, confidence } => {
                if !text.is_empty() && confidence > self.confidence {
                    info!(
                        "Better OCR result with profile '{}', confidence: {:.2}",
                        profile, confidence
                    );
                    self.text = text;
                    self.confidence = confidence;
                    self.score = Some(Score::Confidence(confidence));
                }
            }
            ProfileAttempt::Unscored { text } => {
                if !text.is_empty() && text.chars().count() > self.text.chars().count() {
                    info!("OCR result with profile '{}' (no confidence)", profile);
                    self.text = text;
                    self.score = Some(Score::Unscored);
                }
            }
            ProfileAttempt::Failed(e) => {
                warn!("{}", e);
            }
        }
        self
    }
}

/// Mean of the strictly positive confidences, 0 when there are none.
pub fn mean_confidence(confidences: &[f32]) -> f32 {
    let (sum, n) = confidences
        .iter()
        .filter(|&&c| c > 0.0)
        .fold((0.0f32, 0usize), |(s, n), &c| (s + c, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f32
    }
}

/// Run one profile: confidence branch first, plain text as the fallback.
pub fn attempt_profile(
    engine: &dyn OcrEngine,
    image: &DynamicImage,
    profile: &OcrProfile,
) -> ProfileAttempt {
    let scored = engine
        .token_confidences(image, profile)
        .and_then(|confs| {
            let text = engine.recognize(image, profile)?;
            Ok((text, mean_confidence(&confs)))
        });

    match scored {
        Ok((text, confidence)) => ProfileAttempt::Scored {
            text: text.trim().to_string(),
            confidence,
        },
        Err(e) => {
            debug!("Profile '{}': confidence unavailable ({}), falling back", profile, e);
            match engine.recognize(image, profile) {
                Ok(text) => ProfileAttempt::Unscored {
                    text: text.trim().to_string(),
                },
                Err(e) => ProfileAttempt::Failed(PageError::Profile {
                    profile: profile.to_string(),
                    detail: e.to_string(),
                }),
            }
        }
    }
}

/// Every attempt on one image, folded.
#[derive(Debug, Clone)]
pub struct ScoringRound {
    pub best: BestCandidate,
    pub failures: Vec<PageError>,
    pub attempts: usize,
}

impl ScoringRound {
    /// No profile produced any answer at all.
    pub fn all_failed(&self) -> bool {
        self.attempts > 0 && self.failures.len() == self.attempts
    }
}

/// Run every profile in order, then fold the attempts.
pub fn score_profiles(
    engine: &dyn OcrEngine,
    image: &DynamicImage,
    profiles: &[OcrProfile],
) -> ScoringRound {
    let attempts: Vec<ProfileAttempt> = profiles
        .iter()
        .map(|profile| attempt_profile(engine, image, profile))
        .collect();

    let failures = attempts
        .iter()
        .filter_map(|a| match a {
            ProfileAttempt::Failed(e) => Some(e.clone()),
            _ => None,
        })
        .collect();

    let best = profiles
        .iter()
        .zip(attempts)
        .fold(BestCandidate::default(), |best, (profile, attempt)| {
            best.absorb(profile, attempt)
        });

    ScoringRound {
        best,
        failures,
        attempts: profiles.len(),
    }
}

/// Try every profile in order and keep the best result.
///
/// Returns an empty candidate when every profile failed or found nothing.
pub fn ocr_best(
    engine: &dyn OcrEngine,
    image: &DynamicImage,
    profiles: &[OcrProfile],
) -> BestCandidate {
    score_profiles(engine, image, profiles).best
}
