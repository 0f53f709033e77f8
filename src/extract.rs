//! Eager (whole-document) extraction entry points.
//!
//! [`extract_text`] waits for every page and assembles a [`DocumentResult`].
//! Document-level failures never escape as `Err`; they come back as a result
//! with `success == false` so callers have one shape to handle. Use
//! [`crate::stream::extract_text_stream`] to receive pages progressively.

use crate::config::OcrConfig;
use crate::error::Ocr2MdError;
use crate::output::{DocumentInfo, DocumentResult, PageResult};
use crate::pipeline::render::RasterDocument;
use crate::pipeline::stage::stage_document;
use crate::stream::{open_page_stream, resolve_rasterizer};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// Extract text from every page of a PDF.
///
/// This is the primary entry point for the library.
///
/// Returns `success == true` with one [`PageResult`] per page even when
/// some pages failed OCR (check [`PageResult::ok`]). Returns
/// `success == false`, no pages and an `error_message` when the input is not
/// a PDF, cannot be opened, or a page cannot be rendered.
///
/// # Example
/// ```rust,no_run
/// use ocr2md::{extract_text, OcrConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes = std::fs::read("scan.pdf")?;
/// let result = extract_text(&bytes, &OcrConfig::default()).await;
/// if result.success {
///     println!("{}", result.full_text);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn extract_text(bytes: &[u8], config: &OcrConfig) -> DocumentResult {
    let start = Instant::now();
    match run(bytes, config).await {
        Ok(result) => {
            info!(
                "Extraction complete: {}/{} pages recognised, {}ms",
                result.recognized_pages(),
                result.pages.len(),
                start.elapsed().as_millis()
            );
            result
        }
        Err(e) => {
            warn!("Extraction failed: {}", e);
            DocumentResult::failed(e.to_string())
        }
    }
}

async fn run(bytes: &[u8], config: &OcrConfig) -> Result<DocumentResult, Ocr2MdError> {
    let (total, mut stream) = open_page_stream(bytes, config).await?;

    let mut pages: Vec<PageResult> = Vec::with_capacity(total);
    let mut first_error: Option<Ocr2MdError> = None;

    // Drain the stream fully so the render worker (and the temp file it
    // owns) is finished before we return.
    while let Some(item) = stream.next().await {
        match item {
            Ok(page) => pages.push(page),
            Err(e) => {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }

    if let Some(e) = first_error {
        return Err(e);
    }
    if pages.len() != total {
        return Err(Ocr2MdError::Internal(format!(
            "expected {} pages, got {}",
            total,
            pages.len()
        )));
    }

    Ok(DocumentResult::completed(pages))
}

/// Synchronous wrapper around [`extract_text`].
///
/// Creates a temporary tokio runtime internally; must not be called from
/// inside an async context.
pub fn extract_text_sync(bytes: &[u8], config: &OcrConfig) -> DocumentResult {
    match tokio::runtime::Runtime::new() {
        Ok(rt) => rt.block_on(extract_text(bytes, config)),
        Err(e) => DocumentResult::failed(
            Ocr2MdError::Internal(format!("Failed to create tokio runtime: {}", e)).to_string(),
        ),
    }
}

/// Extract text and write `full_text` to `output_path`.
///
/// The file is only written for a successful run. Uses an atomic write
/// (temp file + rename) so readers never see a partial file.
pub async fn extract_text_to_file(
    bytes: &[u8],
    output_path: impl AsRef<Path>,
    config: &OcrConfig,
) -> Result<DocumentResult, Ocr2MdError> {
    let result = extract_text(bytes, config).await;
    if result.success {
        write_output(output_path.as_ref(), &result.full_text).await?;
    }
    Ok(result)
}

/// Atomically write `contents` to `path`, creating parent directories.
pub async fn write_output(path: &Path, contents: &str) -> Result<(), Ocr2MdError> {
    let write_failed = |source| Ocr2MdError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_failed)?;
    }

    let tmp_path = temp_sibling(path);
    tokio::fs::write(&tmp_path, contents)
        .await
        .map_err(write_failed)?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_failed(e));
    }
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Open a document and report its page count without running OCR.
pub async fn inspect(bytes: &[u8], config: &OcrConfig) -> Result<DocumentInfo, Ocr2MdError> {
    let staged = stage_document(bytes, config.temp_dir.as_deref())?;
    let rasterizer = resolve_rasterizer(config);
    let size_bytes = staged.size();

    let page_count = tokio::task::spawn_blocking(move || {
        let mut count = 0;
        rasterizer.with_document(staged.path(), &mut |document: &dyn RasterDocument| {
            count = document.page_count();
            Ok(())
        })?;
        Ok::<usize, Ocr2MdError>(count)
    })
    .await
    .map_err(|e| Ocr2MdError::Internal(format!("inspect worker failed: {e}")))??;

    info!("Inspected document: {} pages, {} bytes", page_count, size_bytes);
    Ok(DocumentInfo {
        page_count,
        size_bytes,
    })
}
