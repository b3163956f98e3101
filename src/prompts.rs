//! Prompts sent to the explanation model.
//!
//! Kept in one place so tests can inspect them without a live provider.

/// Template for explaining a prescription or label. `{text}` is replaced
/// with the extracted text.
pub const MEDICAL_PROMPT: &str = r#"You are a medical assistant. Analyze this prescription or label:

{text}

Tell me:
1. What is the medicine for?
2. What are the correct dosages?
3. Any important warnings or advice?

Explain clearly."#;

/// Marker appended to prompts cut at the length limit.
pub const TRUNCATION_MARKER: &str = "...[truncated]";

/// Build the explanation prompt for `text`.
pub fn medical_prompt(text: &str) -> String {
    MEDICAL_PROMPT.replace("{text}", text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_text() {
        let p = medical_prompt("Amoxicillin 500mg, 3x daily");
        assert!(p.starts_with("You are a medical assistant."));
        assert!(p.contains("\n\nAmoxicillin 500mg, 3x daily\n\n"));
        assert!(p.ends_with("Explain clearly."));
        assert!(!p.contains("{text}"));
    }

    #[test]
    fn prompt_asks_three_questions() {
        for q in ["1. What is the medicine for?", "2. What are the correct dosages?", "3. Any important warnings"] {
            assert!(MEDICAL_PROMPT.contains(q), "missing: {q}");
        }
    }
}
