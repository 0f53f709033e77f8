//! Result types returned by the extraction pipeline.

use crate::error::RecognitionError;
use serde::{Deserialize, Serialize};

/// Separator placed between pages in [`DocumentResult::full_text`].
pub const PAGE_BREAK: &str = "\n\n--- Page Break ---\n\n";

/// Outcome of OCR for one page.
///
/// Every page of a document yields exactly one `PageResult`, whether or not
/// recognition succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResult {
    /// 1-indexed page number.
    pub page_number: usize,
    /// Recognised text, verbatim. For a failed page, a readable error
    /// description.
    pub text: String,
    /// Whether recognition succeeded.
    pub ok: bool,
    /// Backend error message for a failed page.
    pub error_message: Option<String>,
}

impl PageResult {
    pub fn recognized(page_number: usize, text: impl Into<String>) -> Self {
        Self {
            page_number,
            text: text.into(),
            ok: true,
            error_message: None,
        }
    }

    pub fn failed(page_number: usize, error: &RecognitionError) -> Self {
        let message = error.to_string();
        Self {
            page_number,
            text: format!("Error during OCR: {message}"),
            ok: false,
            error_message: Some(message),
        }
    }
}

/// Outcome of a whole extraction run.
///
/// `success == false` only for document-level failures; pages that failed
/// OCR are reported through [`PageResult::ok`] and leave `success` true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentResult {
    pub success: bool,
    /// One entry per page, ascending by page number. Empty on failure.
    pub pages: Vec<PageResult>,
    /// All pages joined by [`join_pages`]. Empty on failure.
    pub full_text: String,
    /// Reason the run failed.
    pub error_message: Option<String>,
}

impl DocumentResult {
    /// Build the result of a completed run; `pages` must already be in
    /// page order.
    pub fn completed(pages: Vec<PageResult>) -> Self {
        let full_text = join_pages(&pages);
        Self {
            success: true,
            pages,
            full_text,
            error_message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            pages: Vec::new(),
            full_text: String::new(),
            error_message: Some(message.into()),
        }
    }

    /// Number of pages whose recognition succeeded.
    pub fn recognized_pages(&self) -> usize {
        self.pages.iter().filter(|p| p.ok).count()
    }
}

/// Join page texts as `"Page N:\n<text>"` blocks separated by [`PAGE_BREAK`].
pub fn join_pages(pages: &[PageResult]) -> String {
    pages
        .iter()
        .map(|p| format!("Page {}:\n{}", p.page_number, p.text))
        .collect::<Vec<_>>()
        .join(PAGE_BREAK)
}

/// Basic facts about a document, gathered without running OCR.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub page_count: usize,
    pub size_bytes: usize,
}
