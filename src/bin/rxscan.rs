//! CLI binary for rxscan.
//!
//! A thin shim over the library crate: classify each input by extension,
//! extract its text, optionally ask an LLM to explain it, and map the
//! outcome to an exit code.
//!
//! Exit codes: 0 on success, 2 when no text could be extracted (or OCR is
//! unavailable), 1 on any other failure.

use anyhow::{Context, Result};
use clap::Parser;
use futures::stream::{self, StreamExt};
use rxscan::{
    explain_text, extract_async, resolve_input, supported_extensions_display, DocumentKind,
    ExplainConfig, Explanation, ExtractionConfig, ExtractionOutcome, Extractor, ScanError,
};
use serde::Serialize;
use std::io::{self, Write};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  rxscan label.jpg
  rxscan prescription.pdf --explain
  rxscan https://example.com/scan.png --json
  rxscan --check-deps

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key (used by --explain)
  EDGEQUAKE_LLM_PROVIDER  Override provider (gemini, openai, anthropic, ollama)
  EDGEQUAKE_MODEL         Override model ID
  TESSERACT_CMD           Path to the tesseract executable
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  RUST_LOG                Log filter, overrides --verbose/--quiet

EXIT CODES:
  0  text extracted
  1  input or configuration error
  2  no text could be extracted, or OCR is not installed
"#;

/// Extract text from prescription and medicine-label scans.
#[derive(Parser, Debug)]
#[command(
    name = "rxscan",
    version,
    about = "Extract text from prescription and medicine-label PDFs and images",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local file paths or HTTP/HTTPS URLs.
    #[arg(required_unless_present = "check_deps")]
    inputs: Vec<String>,

    /// Report availability of OCR, PDF and image components, then exit.
    #[arg(long)]
    check_deps: bool,

    /// Ask an LLM to explain the extracted text.
    #[arg(long, env = "RXSCAN_EXPLAIN")]
    explain: bool,

    /// LLM provider for --explain: gemini, openai, anthropic, ollama.
    #[arg(long, env = "RXSCAN_PROVIDER")]
    provider: Option<String>,

    /// LLM model ID for --explain. Default: gemini-2.0-flash.
    #[arg(long, env = "RXSCAN_MODEL")]
    model: Option<String>,

    /// Number of inputs processed concurrently.
    #[arg(short, long, env = "RXSCAN_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Pages read from a PDF text layer (OCR reads at most 20).
    #[arg(long, env = "RXSCAN_MAX_PAGES", default_value_t = 50)]
    max_pages: usize,

    /// Tesseract language code(s), e.g. eng or eng+spa.
    #[arg(long, env = "RXSCAN_LANG", default_value = "eng")]
    lang: String,

    /// OCR rendering DPI for scanned PDFs (72–600).
    #[arg(long, env = "RXSCAN_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Output structured JSON instead of plain text.
    #[arg(long, env = "RXSCAN_JSON")]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "RXSCAN_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "RXSCAN_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "RXSCAN_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

/// Result for one input, as printed with `--json`.
#[derive(Debug, Serialize)]
struct FileReport {
    input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<DocumentKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<ExtractionOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    explanation: Option<Explanation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl FileReport {
    fn failed(input: &str, kind: Option<DocumentKind>, err: impl ToString) -> Self {
        Self {
            input: input.to_string(),
            kind,
            outcome: None,
            explanation: None,
            error: Some(err.to_string()),
        }
    }

    fn exit_code(&self) -> i32 {
        match (&self.outcome, &self.error) {
            (Some(ExtractionOutcome::Text(_)), None) => 0,
            (Some(_), None) => 2,
            _ => 1,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || cli.json {
        "error"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;
    let extractor = Arc::new(
        tokio::task::spawn_blocking(move || Extractor::with_defaults(config))
            .await
            .context("Failed to initialise extraction engines")?,
    );

    // ── Dependency check ─────────────────────────────────────────────────
    if cli.check_deps {
        let report = extractor.check_dependencies();
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("Failed to serialise report")?
            );
        } else {
            for (name, ok) in report.entries() {
                let mark = if ok { green("✓") } else { red("✗") };
                println!("{mark} {name}");
            }
        }
        std::process::exit(if report.all_available() { 0 } else { 1 });
    }

    // ── Process inputs ───────────────────────────────────────────────────
    let explain_config = cli.explain.then(|| ExplainConfig {
        provider_name: cli.provider.clone(),
        model: cli.model.clone(),
        ..Default::default()
    });

    let mut reports: Vec<(usize, FileReport)> = stream::iter(cli.inputs.iter().enumerate())
        .map(|(idx, input)| {
            let extractor = Arc::clone(&extractor);
            let explain_config = explain_config.as_ref();
            let timeout = cli.download_timeout;
            async move {
                let report = process_input(extractor, input, timeout, explain_config).await;
                (idx, report)
            }
        })
        .buffer_unordered(cli.concurrency.max(1))
        .collect()
        .await;
    reports.sort_by_key(|(idx, _)| *idx);
    let reports: Vec<FileReport> = reports.into_iter().map(|(_, r)| r).collect();

    // ── Output ───────────────────────────────────────────────────────────
    if cli.json {
        let json = if reports.len() == 1 {
            serde_json::to_string_pretty(&reports[0])
        } else {
            serde_json::to_string_pretty(&reports)
        }
        .context("Failed to serialise output")?;
        println!("{json}");
    } else {
        print_reports(&reports, cli.quiet).context("Failed to write to stdout")?;
    }

    let exit_code = reports.iter().map(FileReport::exit_code).max().unwrap_or(0);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}

async fn process_input(
    extractor: Arc<Extractor>,
    input: &str,
    timeout_secs: u64,
    explain_config: Option<&ExplainConfig>,
) -> FileReport {
    let loaded = match resolve_input(input, timeout_secs).await {
        Ok(loaded) => loaded,
        Err(e) => return FileReport::failed(input, None, e),
    };

    let Some(kind) = DocumentKind::from_path(&loaded.name) else {
        let err = ScanError::UnsupportedFileType {
            name: loaded.name,
            supported: supported_extensions_display(),
        };
        return FileReport::failed(input, None, err);
    };

    let outcome = match extract_async(extractor, loaded.bytes, kind).await {
        Ok(outcome) => outcome,
        Err(e) => return FileReport::failed(input, Some(kind), e),
    };

    let mut report = FileReport {
        input: input.to_string(),
        kind: Some(kind),
        outcome: None,
        explanation: None,
        error: None,
    };

    if let (ExtractionOutcome::Text(text), Some(cfg)) = (&outcome, explain_config) {
        match explain_text(text, cfg).await {
            Ok(explanation) => report.explanation = Some(explanation),
            Err(e) => report.error = Some(e.to_string()),
        }
    }

    report.outcome = Some(outcome);
    report
}

fn print_reports(reports: &[FileReport], quiet: bool) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let many = reports.len() > 1;

    for report in reports {
        if many && !quiet {
            writeln!(out, "{}", bold(&format!("── {} ──", report.input)))?;
        }

        match &report.outcome {
            Some(ExtractionOutcome::Text(text)) => writeln!(out, "{text}")?,
            Some(ExtractionOutcome::Empty) => {
                eprintln!(
                    "{} {}: could not extract text from the file",
                    red("✗"),
                    report.input
                );
            }
            Some(outcome @ ExtractionOutcome::OcrUnavailable) => {
                eprintln!("{} {}: {}", red("✗"), report.input, outcome);
            }
            None => {}
        }

        if let Some(ref explanation) = report.explanation {
            writeln!(out)?;
            writeln!(out, "{}", bold("Explanation"))?;
            writeln!(out, "{}", explanation.text)?;
            if !quiet {
                eprintln!(
                    "   {} tokens in  /  {} tokens out",
                    dim(&explanation.input_tokens.to_string()),
                    dim(&explanation.output_tokens.to_string()),
                );
            }
        }

        if let Some(ref err) = report.error {
            eprintln!("{} {}: {}", red("✗"), report.input, err);
        }

        if many {
            writeln!(out)?;
        }
    }
    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(cli: &Cli) -> Result<ExtractionConfig> {
    ExtractionConfig::builder()
        .max_pages(cli.max_pages)
        .ocr_dpi(cli.dpi)
        .language(cli.lang.clone())
        .build()
        .context("Invalid configuration")
}
