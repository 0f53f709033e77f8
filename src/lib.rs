//! # ocr2md
//!
//! Turn scanned PDF documents into text with OCR, then optionally ask a
//! local Ollama model to restructure that text as markdown.
//!
//! Scans carry no text layer, so each page is rasterised and read by an OCR
//! engine. A page the engine chokes on is reported in its own
//! [`PageResult`] and the rest of the document is still processed.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF bytes
//!  │
//!  ├─ 1. Stage      %PDF check, copy to a temp file (deleted on drop)
//!  ├─ 2. Render     rasterise pages via pdfium, BGRA (spawn_blocking)
//!  ├─ 3. Encode     BGRA → RGBA PNG
//!  ├─ 4. Recognize  tesseract per page, failures stay page-local
//!  ├─ 5. Join       "Page N:\n<text>" blocks + page-break separators
//!  └─ 6. Normalize  optional: Ollama /api/generate → markdown
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ocr2md::{extract_text, normalize, NormalizerConfig, OcrConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bytes = std::fs::read("scan.pdf")?;
//!     let result = extract_text(&bytes, &OcrConfig::default()).await;
//!     if !result.success {
//!         eprintln!("failed: {:?}", result.error_message);
//!         return Ok(());
//!     }
//!     println!("{}", result.full_text);
//!
//!     let markdown = normalize(&result.full_text, &NormalizerConfig::default()).await;
//!     println!("{markdown}");
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `ocr2md` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! ocr2md = { version = "0.1", default-features = false }
//! ```
//!
//! ## Runtime requirements
//!
//! The default backends need a pdfium shared library (see
//! [`pipeline::render::bind_pdfium`]) and a `tesseract` executable with the
//! configured language data. Both can be replaced through
//! [`OcrConfigBuilder::rasterizer`] and [`OcrConfigBuilder::recognizer`].

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{NormalizerConfig, NormalizerConfigBuilder, OcrConfig, OcrConfigBuilder};
pub use error::{NormalizationError, Ocr2MdError, RecognitionError};
pub use extract::{extract_text, extract_text_sync, extract_text_to_file, inspect, write_output};
pub use normalize::{normalize, try_normalize};
pub use output::{DocumentInfo, DocumentResult, PageResult, PAGE_BREAK};
pub use pipeline::recognize::{PageRecognizer, TesseractRecognizer};
pub use pipeline::render::{
    PageImage, PageRasterizer, PdfiumRasterizer, RasterDocument, RenderTarget,
};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use stream::{extract_text_stream, PageStream};
