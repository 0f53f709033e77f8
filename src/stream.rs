//! Streaming extraction API: emit pages as they are recognised.
//!
//! Large scans take a while. [`extract_text_stream`] yields one
//! [`PageResult`] per page, in page order, as soon as that page (and every
//! page before it) is done, so callers can show partial output or write
//! pages incrementally. [`crate::extract::extract_text`] is built on the same
//! stream.
//!
//! ## Layout
//!
//! ```text
//! spawn_blocking: render_document ──mpsc(n)──▶ map(recognize_page) ──▶ buffered(n) ──▶ caller
//!                  (owns the temp file)                (spawn_blocking per page)
//! ```
//!
//! The render thread owns the staged temp file and the open document, so
//! both are released as soon as rendering ends or the consumer drops the
//! stream. The channel capacity bounds how many page buffers are in memory.

use crate::config::OcrConfig;
use crate::error::Ocr2MdError;
use crate::output::PageResult;
use crate::pipeline::recognize::{recognize_page, PageRecognizer, TesseractRecognizer};
use crate::pipeline::render::{self, PageImage, PageRasterizer, PdfiumRasterizer};
use crate::pipeline::stage::stage_document;
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;
use tracing::{debug, info};

/// A boxed stream of page results.
pub type PageStream = Pin<Box<dyn Stream<Item = Result<PageResult, Ocr2MdError>> + Send>>;

/// Extract text from PDF bytes, streaming pages in page order.
///
/// Page-level OCR failures arrive as `Ok(PageResult { ok: false, .. })`. An
/// `Err` item means the run itself failed part-way (a page could not be
/// rendered) and no further pages follow.
///
/// The configured progress callback sees `on_extraction_complete` once the
/// stream has yielded every page and rendering finished cleanly. Dropping
/// the stream early skips it.
///
/// # Errors
/// Returns `Err` before any page is produced when the bytes are not a PDF,
/// cannot be staged, or the document cannot be opened.
///
/// # Example
/// ```rust,no_run
/// use futures::StreamExt;
/// use ocr2md::{extract_text_stream, OcrConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes = std::fs::read("scan.pdf")?;
/// let mut pages = extract_text_stream(&bytes, &OcrConfig::default()).await?;
/// while let Some(page) = pages.next().await {
///     let page = page?;
///     println!("page {}: {} chars", page.page_number, page.text.len());
/// }
/// # Ok(())
/// # }
/// ```
pub async fn extract_text_stream(
    bytes: &[u8],
    config: &OcrConfig,
) -> Result<PageStream, Ocr2MdError> {
    let (_, stream) = open_page_stream(bytes, config).await?;
    Ok(stream)
}

/// Stage the document, start rendering, and return the page count together
/// with the ordered page stream.
pub(crate) async fn open_page_stream(
    bytes: &[u8],
    config: &OcrConfig,
) -> Result<(usize, PageStream), Ocr2MdError> {
    info!("Starting extraction: {} bytes", bytes.len());

    let staged = stage_document(bytes, config.temp_dir.as_deref())?;
    let rasterizer = resolve_rasterizer(config);
    let recognizer = resolve_recognizer(config);
    let target = config.render_target();
    let concurrency = config.concurrency.max(1);

    let (count_tx, count_rx) = oneshot::channel();
    let (page_tx, page_rx) = mpsc::channel::<Result<PageImage, Ocr2MdError>>(concurrency);

    let render_task: JoinHandle<Result<(), Ocr2MdError>> =
        tokio::task::spawn_blocking(move || {
            let result = render::render_document(
                rasterizer.as_ref(),
                staged.path(),
                target,
                count_tx,
                page_tx,
            );
            drop(staged);
            result
        });

    let total = match count_rx.await {
        Ok(total) => total,
        // The sender is dropped unsent only when opening failed.
        Err(_) => return Err(render_failure(render_task.await)),
    };
    info!("Extracting {} pages (concurrency {})", total, concurrency);

    let progress = config.progress_callback.clone();
    if let Some(cb) = &progress {
        cb.on_extraction_start(total);
    }

    let tally = Arc::new(PageTally::default());
    let page_tally = Arc::clone(&tally);
    let page_progress = progress.clone();

    let pages = ReceiverStream::new(page_rx)
        .map(move |rendered| {
            let recognizer = Arc::clone(&recognizer);
            let progress = page_progress.clone();
            let tally = Arc::clone(&page_tally);
            async move {
                match rendered {
                    Ok(image) => {
                        let page = recognize_page(recognizer, image, total, progress).await;
                        tally.record(page.ok);
                        Ok(page)
                    }
                    Err(e) => Err(e),
                }
            }
        })
        .buffered(concurrency);

    let finish = stream::once(render_task).filter_map(move |joined| {
        let progress = progress.clone();
        let tally = Arc::clone(&tally);
        async move {
            match joined {
                Ok(Ok(())) => {
                    debug!("Render worker finished");
                    let (attempted, recognized) = tally.counts();
                    if attempted == total {
                        if let Some(cb) = &progress {
                            cb.on_extraction_complete(total, recognized);
                        }
                    }
                    None
                }
                other => Some(Err::<PageResult, _>(render_failure(other))),
            }
        }
    });

    Ok((total, Box::pin(pages.chain(finish))))
}

/// Pages yielded so far, and how many of them were recognised.
#[derive(Default)]
struct PageTally {
    attempted: AtomicUsize,
    recognized: AtomicUsize,
}

impl PageTally {
    fn record(&self, ok: bool) {
        self.attempted.fetch_add(1, Ordering::SeqCst);
        if ok {
            self.recognized.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn counts(&self) -> (usize, usize) {
        (
            self.attempted.load(Ordering::SeqCst),
            self.recognized.load(Ordering::SeqCst),
        )
    }
}

fn render_failure(
    joined: Result<Result<(), Ocr2MdError>, tokio::task::JoinError>,
) -> Ocr2MdError {
    match joined {
        Ok(Err(e)) => e,
        Ok(Ok(())) => {
            Ocr2MdError::Internal("render worker exited without reporting a page count".into())
        }
        Err(join_err) => Ocr2MdError::Internal(format!("render worker failed: {join_err}")),
    }
}

/// The injected rasterizer, or pdfium with the configured library and password.
pub(crate) fn resolve_rasterizer(config: &OcrConfig) -> Arc<dyn PageRasterizer> {
    match &config.rasterizer {
        Some(r) => Arc::clone(r),
        None => Arc::new(PdfiumRasterizer::new(
            config.pdfium_library.clone(),
            config.password.clone(),
        )),
    }
}

fn resolve_recognizer(config: &OcrConfig) -> Arc<dyn PageRecognizer> {
    match &config.recognizer {
        Some(r) => Arc::clone(r),
        None => Arc::new(TesseractRecognizer::new(
            config
                .tesseract_path
                .clone()
                .unwrap_or_else(|| "tesseract".into()),
            config.language.clone(),
            config.tessdata_dir.clone(),
        )),
    }
}
