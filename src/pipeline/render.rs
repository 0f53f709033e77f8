//! PDF rasterisation: open a document and render its pages to BGRA buffers.
//!
//! [`PageRasterizer`] is the seam between the pipeline and the rendering
//! backend. A rasterizer opens a document for the duration of one closure
//! call ([`PageRasterizer::with_document`]) so the backend handle is always
//! released, whatever the closure returns. [`PdfiumRasterizer`] is the
//! production implementation; tests substitute stubs.
//!
//! Rendering is CPU-bound and pdfium keeps thread-local state, so the
//! pipeline drives it from a `spawn_blocking` thread via [`render_document`].

use crate::error::Ocr2MdError;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

/// Bytes per pixel in a [`PageImage`] buffer (B, G, R, A).
pub const BYTES_PER_PIXEL: usize = 4;

/// One rendered page: a row-major BGRA buffer without row padding.
#[derive(Clone, PartialEq, Eq)]
pub struct PageImage {
    /// 0-based page index within the document.
    pub page_index: usize,
    pub width: u32,
    pub height: u32,
    /// `width * height * 4` bytes, channel order B, G, R, A.
    pub data: Vec<u8>,
}

impl PageImage {
    pub fn new(page_index: usize, width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            page_index,
            width,
            height,
            data,
        }
    }

    /// Buffer length implied by `width` and `height`.
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * BYTES_PER_PIXEL
    }
}

impl std::fmt::Debug for PageImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageImage")
            .field("page_index", &self.page_index)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("data", &format_args!("<{} bytes>", self.data.len()))
            .finish()
    }
}

/// The box pages are scaled into, preserving aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTarget {
    pub width: u32,
    pub height: u32,
}

/// An open document.
pub trait RasterDocument {
    fn page_count(&self) -> usize;

    /// Render the page at 0-based `index` to fit inside `target`.
    ///
    /// Fails with [`Ocr2MdError::PageIndex`] when `index >= page_count()`.
    fn render_page(&self, index: usize, target: RenderTarget) -> Result<PageImage, Ocr2MdError>;
}

/// Opens documents for rendering.
pub trait PageRasterizer: Send + Sync {
    /// Open the document at `path`, pass it to `visit`, then close it.
    ///
    /// Returns [`Ocr2MdError::DocumentOpen`] (or a password error) when the
    /// file cannot be parsed; otherwise whatever `visit` returns.
    fn with_document(
        &self,
        path: &Path,
        visit: &mut dyn FnMut(&dyn RasterDocument) -> Result<(), Ocr2MdError>,
    ) -> Result<(), Ocr2MdError>;
}

/// [`PageRasterizer`] backed by the pdfium library.
#[derive(Debug, Clone, Default)]
pub struct PdfiumRasterizer {
    library_path: Option<PathBuf>,
    password: Option<String>,
}

impl PdfiumRasterizer {
    pub fn new(library_path: Option<PathBuf>, password: Option<String>) -> Self {
        Self {
            library_path,
            password,
        }
    }
}

impl PageRasterizer for PdfiumRasterizer {
    fn with_document(
        &self,
        path: &Path,
        visit: &mut dyn FnMut(&dyn RasterDocument) -> Result<(), Ocr2MdError>,
    ) -> Result<(), Ocr2MdError> {
        let pdfium = bind_pdfium(self.library_path.as_deref())?;

        let document = pdfium
            .load_pdf_from_file(path, self.password.as_deref())
            .map_err(|e| classify_load_error(e, self.password.is_some()))?;

        let document = PdfiumDocument { document };
        visit(&document)
    }
}

struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
}

impl RasterDocument for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn render_page(&self, index: usize, target: RenderTarget) -> Result<PageImage, Ocr2MdError> {
        let total = self.page_count();
        if index >= total {
            return Err(Ocr2MdError::PageIndex { index, total });
        }

        let render_config = PdfRenderConfig::new()
            .set_target_width(target.width as i32)
            .set_maximum_height(target.height as i32)
            .set_format(PdfBitmapFormat::BGRA);

        let page = self
            .document
            .pages()
            .get(index as u16)
            .map_err(|e| Ocr2MdError::RasterisationFailed {
                page: index + 1,
                detail: format!("{:?}", e),
            })?;

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| Ocr2MdError::RasterisationFailed {
                page: index + 1,
                detail: format!("{:?}", e),
            })?;

        let width = bitmap.width() as u32;
        let height = bitmap.height() as u32;
        let data = bitmap.as_raw_bytes().to_vec();

        debug!("Rendered page {} → {}x{} px", index + 1, width, height);

        Ok(PageImage::new(index, width, height, data))
    }
}

/// Map a pdfium load failure onto the document-level error taxonomy.
fn classify_load_error(e: PdfiumError, password_given: bool) -> Ocr2MdError {
    let detail = format!("{:?}", e);
    if detail.contains("Password") || detail.contains("password") {
        if password_given {
            Ocr2MdError::WrongPassword
        } else {
            Ocr2MdError::PasswordRequired
        }
    } else {
        Ocr2MdError::DocumentOpen { detail }
    }
}

/// Bind to a pdfium shared library.
///
/// Lookup order (first match wins):
///
/// 1. `explicit` — a path from [`crate::config::OcrConfig::pdfium_library`]
/// 2. `PDFIUM_LIB_PATH` environment variable
/// 3. the platform library name next to the running executable
/// 4. the system library search path
pub fn bind_pdfium(explicit: Option<&Path>) -> Result<Pdfium, Ocr2MdError> {
    if let Some(path) = explicit {
        return bind_from_path(path);
    }

    if let Ok(env_path) = std::env::var("PDFIUM_LIB_PATH") {
        if !env_path.is_empty() {
            return bind_from_path(Path::new(&env_path));
        }
    }

    if let Some(dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        let candidate = Pdfium::pdfium_platform_library_name_at_path(&dir);
        if candidate.exists() {
            return bind_from_path(&candidate);
        }
    }

    Pdfium::bind_to_system_library()
        .map(Pdfium::new)
        .map_err(|e| Ocr2MdError::PdfiumBindingFailed(format!("system library: {e:?}")))
}

fn bind_from_path(path: &Path) -> Result<Pdfium, Ocr2MdError> {
    Pdfium::bind_to_library(path)
        .map(Pdfium::new)
        .map_err(|e| Ocr2MdError::PdfiumBindingFailed(format!("'{}': {e:?}", path.display())))
}

/// Render every page of the document at `path`, in ascending order.
///
/// Runs on a blocking thread. The page count is reported through `count_tx`
/// as soon as the document is open; each rendered page (or the error that
/// stopped rendering) is sent through `page_tx`, whose bounded capacity
/// keeps at most that many buffers in flight. Returns an error only when
/// the document could not be opened; in that case `count_tx` is dropped
/// unsent.
pub(crate) fn render_document(
    rasterizer: &dyn PageRasterizer,
    path: &Path,
    target: RenderTarget,
    count_tx: oneshot::Sender<usize>,
    page_tx: mpsc::Sender<Result<PageImage, Ocr2MdError>>,
) -> Result<(), Ocr2MdError> {
    let mut count_tx = Some(count_tx);

    rasterizer.with_document(path, &mut |document: &dyn RasterDocument| {
        let total = document.page_count();
        info!("Document opened: {} pages", total);
        if let Some(tx) = count_tx.take() {
            // Receiver gone means the caller stopped waiting; nothing to do.
            let _ = tx.send(total);
        }

        for index in 0..total {
            // Results are numbered by the index requested, whatever the
            // backend wrote into the image.
            let rendered = document.render_page(index, target).map(|mut image| {
                image.page_index = index;
                image
            });
            let failed = rendered.is_err();
            if page_tx.blocking_send(rendered).is_err() {
                debug!("Page consumer dropped; stopping render at page {}", index + 1);
                break;
            }
            if failed {
                break;
            }
        }
        Ok(())
    })
}
