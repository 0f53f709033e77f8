//! Error types for the ocr2md library.
//!
//! Three error types mirror the three places a run can go wrong:
//!
//! * [`Ocr2MdError`] — **Fatal**: the document cannot be processed at all
//!   (not a PDF, corrupt file, pdfium missing). The pipeline reports it in
//!   [`crate::output::DocumentResult::error_message`].
//!
//! * [`RecognitionError`] — **Page-local**: OCR failed for one page. The
//!   message is written into that page's [`crate::output::PageResult`] and
//!   the remaining pages are still processed.
//!
//! * [`NormalizationError`] — the optional markdown clean-up call failed.
//!   [`crate::normalize::normalize`] hands it back to the caller as a plain
//!   string since the clean-up step is best-effort.

use std::path::PathBuf;
use thiserror::Error;

/// All document-level errors returned by the ocr2md pipeline.
#[derive(Debug, Error)]
pub enum Ocr2MdError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The byte stream does not start with the `%PDF` header.
    #[error("Input is not a PDF document (first bytes: {magic:?})")]
    NotAPdf { magic: Vec<u8> },

    /// The PDF could not be parsed.
    #[error("Failed to open document: {detail}")]
    DocumentOpen { detail: String },

    /// PDF requires a password but none was provided.
    #[error("Document is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired,

    /// A password was provided but it is wrong.
    #[error("Wrong password for encrypted document")]
    WrongPassword,

    // ── Rendering errors ──────────────────────────────────────────────────
    /// A page index at or past the page count was requested.
    #[error("Page index {index} is out of range (document has {total} pages)")]
    PageIndex { index: usize, total: usize },

    /// pdfium returned an error while rendering a page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium, pass --pdfium-lib, or place the\n\
library next to the ocr2md executable.\n"
    )]
    PdfiumBindingFailed(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// The temporary copy of the document could not be created or written.
    #[error("Failed to stage document in temporary storage: {source}")]
    TempStorage {
        #[source]
        source: std::io::Error,
    },

    /// Could not write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// OCR failure for a single page.
///
/// Never aborts the document: [`crate::pipeline::recognize::recognize_page`]
/// converts it into a failed [`crate::output::PageResult`].
#[derive(Debug, Error)]
pub enum RecognitionError {
    /// Pixel buffer length does not match `width * height * 4`.
    #[error("Invalid pixel buffer: {width}x{height} BGRA needs {expected} bytes, got {actual}")]
    InvalidBuffer {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    /// PNG encoding of the page image failed.
    #[error("Image encoding failed: {0}")]
    Encode(#[from] image::ImageError),

    /// The OCR executable could not be started.
    #[error("OCR engine '{binary}' could not be started: {detail}")]
    EngineUnavailable { binary: String, detail: String },

    /// The OCR engine ran but reported failure.
    #[error("OCR engine exited with status {}: {stderr}", exit_status(.status))]
    Backend { status: Option<i32>, stderr: String },

    /// I/O error while talking to the OCR engine.
    #[error("I/O error talking to OCR engine: {0}")]
    Io(#[from] std::io::Error),

    /// The recognizer panicked.
    #[error("Recognizer panicked: {0}")]
    Panicked(String),
}

fn exit_status(status: &Option<i32>) -> String {
    status.map_or_else(|| "unknown".to_string(), |code| code.to_string())
}

/// Failure of the optional markdown clean-up call.
///
/// The `Display` text of each variant is what [`crate::normalize::normalize`]
/// returns to the caller in place of markdown.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NormalizationError {
    /// Endpoint answered with a non-success HTTP status.
    #[error("Error calling Ollama API: {status} - {body}")]
    Http { status: u16, body: String },

    /// Connection, DNS or body-read failure.
    #[error("Exception during AI cleanup: {0}")]
    Transport(String),

    /// The request did not finish within the configured timeout.
    #[error("Text normalization timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The body was not JSON or had no `response` field.
    #[error("Unexpected response format:\n{body}")]
    MalformedResponse { body: String },
}
