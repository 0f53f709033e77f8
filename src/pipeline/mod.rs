//! Pipeline stages for PDF-to-text extraction.
//!
//! Each submodule implements one step:
//!
//! ```text
//! stage ──▶ render ──▶ encode ──▶ recognize          postprocess
//! (tmpfile)  (pdfium)   (PNG)      (tesseract)        (normalizer output)
//! ```
//!
//! 1. [`stage`]  — check the `%PDF` header and copy the bytes to a temporary
//!    file that is deleted when the run ends
//! 2. [`render`] — open the document and rasterise pages to BGRA; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 3. [`encode`] — BGRA → RGBA PNG for the OCR engine
//! 4. [`recognize`] — run OCR for one page, isolating any failure to that
//!    page
//! 5. [`postprocess`] — optional deterministic tidy-up of markdown returned
//!    by [`crate::normalize`]

pub mod encode;
pub mod postprocess;
pub mod recognize;
pub mod render;
pub mod stage;
