//! [`OcrEngine`] backed by the `tesseract` executable.
//!
//! Each call pipes a PNG-encoded image into `tesseract stdin stdout` with the
//! profile's options. Confidences come from the `tsv` output config (one row
//! per layout element, `conf` column, `-1` for non-word rows); plain text
//! comes from the default text output.
//!
//! The executable defaults to `tesseract` on `PATH`; `TESSERACT_CMD`
//! overrides it.

use crate::error::ScanError;
use crate::pipeline::ocr::{OcrEngine, OcrProfile};
use image::DynamicImage;
use std::io::{Cursor, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::{debug, error, info};

/// Environment variable naming the tesseract executable.
pub const TESSERACT_CMD_ENV: &str = "TESSERACT_CMD";

#[derive(Debug, Clone)]
pub struct TesseractCli {
    command: PathBuf,
    language: String,
}

impl TesseractCli {
    /// Use `$TESSERACT_CMD` or `tesseract` with the given language.
    pub fn new(language: impl Into<String>) -> Self {
        let command = std::env::var_os(TESSERACT_CMD_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("tesseract"));
        Self {
            command,
            language: language.into(),
        }
    }

    pub fn with_command(mut self, command: impl Into<PathBuf>) -> Self {
        self.command = command.into();
        self
    }

    /// First line of `tesseract --version`.
    pub fn version(&self) -> Result<String, ScanError> {
        let output = Command::new(&self.command)
            .arg("--version")
            .output()
            .map_err(|e| ScanError::OcrUnavailable(format!("{}: {}", self.command.display(), e)))?;

        if !output.status.success() {
            return Err(ScanError::OcrUnavailable(format!(
                "{} --version exited with {}",
                self.command.display(),
                output.status
            )));
        }

        // Older releases print the banner on stderr.
        let banner = if output.stdout.is_empty() {
            output.stderr
        } else {
            output.stdout
        };
        Ok(String::from_utf8_lossy(&banner)
            .lines()
            .next()
            .unwrap_or_default()
            .trim()
            .to_string())
    }

    /// Run tesseract on `image`; `config` names an output config such as `tsv`.
    fn run(
        &self,
        image: &DynamicImage,
        profile: &OcrProfile,
        config: Option<&str>,
    ) -> Result<String, ScanError> {
        let mut png = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .map_err(|e| ScanError::OcrFailed(format!("PNG encoding failed: {e}")))?;

        let mut cmd = Command::new(&self.command);
        cmd.arg("stdin")
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .args(profile.to_args());
        if let Some(config) = config {
            cmd.arg(config);
        }

        let mut child = cmd
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ScanError::OcrUnavailable(format!("{}: {}", self.command.display(), e)))?;

        // Tesseract reads the whole image before writing anything, so a
        // plain write-then-wait cannot deadlock. It may also exit before
        // reading at all (unknown language, bad option); the child is
        // reaped either way and its stderr reported.
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(&png),
            None => Ok(()),
        };

        let output = child
            .wait_with_output()
            .map_err(|e| ScanError::OcrFailed(format!("waiting for tesseract: {e}")))?;

        if !output.status.success() {
            return Err(ScanError::OcrFailed(format!(
                "tesseract exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        written.map_err(|e| ScanError::OcrFailed(format!("writing image to tesseract: {e}")))?;

        debug!(
            "tesseract {} produced {} bytes",
            profile,
            output.stdout.len()
        );
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for TesseractCli {
    fn default() -> Self {
        Self::new("eng")
    }
}

impl OcrEngine for TesseractCli {
    fn is_available(&self) -> bool {
        match self.version() {
            Ok(v) => {
                info!("Tesseract OCR is available ({})", v);
                true
            }
            Err(e) => {
                error!("Tesseract not found: {}", e);
                false
            }
        }
    }

    fn token_confidences(
        &self,
        image: &DynamicImage,
        profile: &OcrProfile,
    ) -> Result<Vec<f32>, ScanError> {
        let tsv = self.run(image, profile, Some("tsv"))?;
        parse_tsv_confidences(&tsv)
    }

    fn recognize(&self, image: &DynamicImage, profile: &OcrProfile) -> Result<String, ScanError> {
        self.run(image, profile, None)
    }
}

/// Extract the `conf` column from tesseract TSV output.
pub fn parse_tsv_confidences(tsv: &str) -> Result<Vec<f32>, ScanError> {
    let mut lines = tsv.lines();
    let header = lines
        .next()
        .ok_or_else(|| ScanError::OcrFailed("empty TSV output".into()))?;
    let conf_col = header
        .split('\t')
        .position(|c| c == "conf")
        .ok_or_else(|| ScanError::OcrFailed(format!("TSV header has no conf column: {header:?}")))?;

    lines
        .filter(|l| !l.trim().is_empty())
        .map(|line| {
            let field = line.split('\t').nth(conf_col).unwrap_or("");
            field
                .trim()
                .parse::<f32>()
                .map_err(|e| ScanError::OcrFailed(format!("bad conf value {field:?}: {e}")))
        })
        .collect()
}
