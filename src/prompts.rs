//! Prompt sent to the normalizer model.
//!
//! Kept in one place so tests can inspect it without a running model.

/// Instruction block placed before the OCR text.
pub const CLEANUP_INSTRUCTIONS: &str = r#"You are an expert at organizing messy OCR text into clear, structured markdown.

The text below was extracted from a document using OCR and is poorly formatted.
Your task: Organize this into clean, well-structured markdown that clearly shows:
- What the main categories are
- What subcategories exist
- What data belongs to each category
- The relationships between different pieces of information

Use markdown headings (# ## ###), lists, and simple formatting to make the structure crystal clear.
If there's a table, you can use markdown table syntax, but focus on CLARITY and CORRECT DATA PLACEMENT over perfect formatting."#;

/// Closing instruction placed after the OCR text.
pub const CLEANUP_RESPONSE_RULE: &str =
    "Respond ONLY with the cleaned, structured markdown. No explanations.";

/// Build the full prompt for `ocr_text`, which is interpolated verbatim.
pub fn cleanup_prompt(ocr_text: &str) -> String {
    format!(
        "{}\n\nOCR Output:\n{}\n\n{}",
        CLEANUP_INSTRUCTIONS, ocr_text, CLEANUP_RESPONSE_RULE
    )
}
