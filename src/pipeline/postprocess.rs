//! Post-processing: deterministic cleanup of extracted text.
//!
//! Text coming out of Tesseract or a PDF text layer carries artefacts the
//! downstream prompt must not see: the form feed Tesseract appends to every
//! page, stray control bytes from broken font maps, Windows line endings,
//! zero-width characters and runs of blank lines. Each rule below is a pure
//! `&str → String` pass.
//!
//! Rules (applied in order):
//! 1. Normalise line endings (CRLF/CR → LF)
//! 2. Strip control characters other than `\n` and `\t`
//! 3. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens, etc.)
//! 4. Trim trailing whitespace per line
//! 5. Collapse 3+ consecutive newlines down to one blank line
//! 6. Trim the whole text

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to one page of extracted text.
pub fn clean_ocr_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = strip_control_chars(&s);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    s.trim().to_string()
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Strip control characters ─────────────────────────────────────────

static RE_CONTROL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\x00-\x08\x0B-\x1F\x7F]").unwrap());

fn strip_control_chars(input: &str) -> String {
    RE_CONTROL.replace_all(input, "").to_string()
}

// ── Rule 3: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 4: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 5: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_feed_removed() {
        assert_eq!(clean_ocr_text("Take 1 tablet\n\x0c"), "Take 1 tablet");
    }

    #[test]
    fn test_normalise_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_tabs_and_newlines_survive() {
        assert_eq!(clean_ocr_text("Dose:\t5ml\nTwice"), "Dose:\t5ml\nTwice");
    }

    #[test]
    fn test_control_bytes_stripped() {
        assert_eq!(strip_control_chars("a\x00b\x07c\x1bd\x7f"), "abcd");
    }

    #[test]
    fn test_invisible_chars_stripped() {
        assert_eq!(remove_invisible_chars("\u{FEFF}Aspi\u{00AD}rin\u{200B}"), "Aspirin");
    }

    #[test]
    fn test_trim_trailing_whitespace() {
        assert_eq!(
            trim_trailing_whitespace("  hello   \nworld  "),
            "  hello\nworld"
        );
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(collapse_blank_lines("a\n\n\n\n\nb"), "a\n\nb");
        assert_eq!(collapse_blank_lines("a\n\nb"), "a\n\nb");
    }

    #[test]
    fn test_whitespace_only_becomes_empty() {
        assert_eq!(clean_ocr_text(" \n\x0c\n \t "), "");
    }
}
