//! Configuration types for OCR extraction and markdown normalization.
//!
//! Extraction is controlled through [`OcrConfig`], built via its
//! [`OcrConfigBuilder`]; the optional clean-up call through
//! [`NormalizerConfig`]. Both are plain values: cheap to clone, safe to share
//! across tasks, and printable for logging.

use crate::error::Ocr2MdError;
use crate::pipeline::recognize::PageRecognizer;
use crate::pipeline::render::{PageRasterizer, RenderTarget};
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default render box width in pixels.
pub const DEFAULT_PAGE_WIDTH: u32 = 2160;

/// Default render box height in pixels.
pub const DEFAULT_PAGE_HEIGHT: u32 = 3840;

/// Default Tesseract language model.
pub const DEFAULT_LANGUAGE: &str = "eng";

/// Default Ollama endpoint.
pub const DEFAULT_OLLAMA_ENDPOINT: &str = "http://localhost:11434";

/// Default Ollama model.
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2:latest";

/// Configuration for a PDF-to-text OCR run.
///
/// Built via [`OcrConfig::builder()`] or using [`OcrConfig::default()`].
///
/// # Example
/// ```rust
/// use ocr2md::OcrConfig;
///
/// let config = OcrConfig::builder()
///     .concurrency(4)
///     .language("deu")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct OcrConfig {
    /// Width of the render box in pixels. Default: 2160.
    ///
    /// Each page is scaled to fit inside `page_width × page_height` keeping
    /// its aspect ratio, independent of the page's physical size. Tesseract
    /// reads small print reliably at this size; larger boxes mostly cost
    /// memory (a 2160×3840 BGRA buffer is ~33 MB).
    pub page_width: u32,

    /// Height of the render box in pixels. Default: 3840.
    pub page_height: u32,

    /// Number of pages recognised at the same time. Default: 1 (sequential).
    ///
    /// Recognition is CPU-bound and independent per page. Values above 1
    /// run that many Tesseract processes at once; results are still returned
    /// in page order.
    pub concurrency: usize,

    /// Tesseract language model, e.g. "eng" or "eng+deu". Default: "eng".
    pub language: String,

    /// Path to the `tesseract` executable. If None, looked up on `PATH`.
    pub tesseract_path: Option<PathBuf>,

    /// Directory holding `*.traineddata` files. If None, Tesseract's default.
    pub tessdata_dir: Option<PathBuf>,

    /// Path to the pdfium shared library. If None, see
    /// [`crate::pipeline::render::bind_pdfium`] for the lookup order.
    pub pdfium_library: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Directory for the transient copy of the document. If None, the
    /// system temp directory.
    pub temp_dir: Option<PathBuf>,

    /// Receives per-page progress events.
    pub progress_callback: Option<ProgressCallback>,

    /// Pre-constructed rasterizer. Takes precedence over pdfium.
    pub rasterizer: Option<Arc<dyn PageRasterizer>>,

    /// Pre-constructed recognizer. Takes precedence over Tesseract.
    pub recognizer: Option<Arc<dyn PageRecognizer>>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            page_width: DEFAULT_PAGE_WIDTH,
            page_height: DEFAULT_PAGE_HEIGHT,
            concurrency: 1,
            language: DEFAULT_LANGUAGE.to_string(),
            tesseract_path: None,
            tessdata_dir: None,
            pdfium_library: None,
            password: None,
            temp_dir: None,
            progress_callback: None,
            rasterizer: None,
            recognizer: None,
        }
    }
}

impl fmt::Debug for OcrConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OcrConfig")
            .field("page_width", &self.page_width)
            .field("page_height", &self.page_height)
            .field("concurrency", &self.concurrency)
            .field("language", &self.language)
            .field("tesseract_path", &self.tesseract_path)
            .field("tessdata_dir", &self.tessdata_dir)
            .field("pdfium_library", &self.pdfium_library)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("temp_dir", &self.temp_dir)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn callback>"),
            )
            .field(
                "rasterizer",
                &self.rasterizer.as_ref().map(|_| "<dyn PageRasterizer>"),
            )
            .field(
                "recognizer",
                &self.recognizer.as_ref().map(|_| "<dyn PageRecognizer>"),
            )
            .finish()
    }
}

impl OcrConfig {
    /// Create a new builder for `OcrConfig`.
    pub fn builder() -> OcrConfigBuilder {
        OcrConfigBuilder {
            config: Self::default(),
        }
    }

    /// The box every page is scaled into.
    pub fn render_target(&self) -> RenderTarget {
        RenderTarget {
            width: self.page_width,
            height: self.page_height,
        }
    }
}

/// Builder for [`OcrConfig`].
#[derive(Debug)]
pub struct OcrConfigBuilder {
    config: OcrConfig,
}

impl OcrConfigBuilder {
    /// Set the render box; each side is clamped to 16–10 000 px.
    pub fn page_size(mut self, width: u32, height: u32) -> Self {
        self.config.page_width = width.clamp(16, 10_000);
        self.config.page_height = height.clamp(16, 10_000);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.config.language = language.into();
        self
    }

    pub fn tesseract_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.tesseract_path = Some(path.into());
        self
    }

    pub fn tessdata_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.tessdata_dir = Some(dir.into());
        self
    }

    pub fn pdfium_library(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library = Some(path.into());
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.temp_dir = Some(dir.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn rasterizer(mut self, rasterizer: Arc<dyn PageRasterizer>) -> Self {
        self.config.rasterizer = Some(rasterizer);
        self
    }

    pub fn recognizer(mut self, recognizer: Arc<dyn PageRecognizer>) -> Self {
        self.config.recognizer = Some(recognizer);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<OcrConfig, Ocr2MdError> {
        let c = &self.config;
        if c.language.trim().is_empty() {
            return Err(Ocr2MdError::InvalidConfig(
                "OCR language must not be empty".into(),
            ));
        }
        if c.concurrency == 0 {
            return Err(Ocr2MdError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if let Some(ref dir) = c.temp_dir {
            if !dir.is_dir() {
                return Err(Ocr2MdError::InvalidConfig(format!(
                    "Temp directory '{}' does not exist",
                    dir.display()
                )));
            }
        }
        Ok(self.config)
    }
}

/// Configuration for the markdown clean-up call.
///
/// # Example
/// ```rust
/// use ocr2md::NormalizerConfig;
///
/// let config = NormalizerConfig::builder()
///     .endpoint("http://gpu-box:11434")
///     .model("qwen2.5:14b")
///     .timeout_secs(300)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizerConfig {
    /// Base URL of the Ollama server. Default: `http://localhost:11434`.
    pub endpoint: String,

    /// Model name. Default: `llama3.2:latest`.
    pub model: String,

    /// Sampling temperature. Default: 0.1.
    ///
    /// Clean-up should reorganise what OCR found, not invent content, so
    /// the temperature stays close to 0.
    pub temperature: f32,

    /// Upper bound for the whole request in seconds. Default: 120.
    ///
    /// Local models can take minutes on a long document; past this bound the
    /// call is abandoned and [`crate::error::NormalizationError::Timeout`]
    /// is reported.
    pub timeout_secs: u64,

    /// Run [`crate::pipeline::postprocess::clean_markdown`] on the model's
    /// answer. Default: false (the answer is returned untouched).
    pub clean_output: bool,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_OLLAMA_ENDPOINT.to_string(),
            model: DEFAULT_OLLAMA_MODEL.to_string(),
            temperature: 0.1,
            timeout_secs: 120,
            clean_output: false,
        }
    }
}

impl NormalizerConfig {
    /// Create a new builder for `NormalizerConfig`.
    pub fn builder() -> NormalizerConfigBuilder {
        NormalizerConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`NormalizerConfig`].
#[derive(Debug)]
pub struct NormalizerConfigBuilder {
    config: NormalizerConfig,
}

impl NormalizerConfigBuilder {
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs.max(1);
        self
    }

    pub fn clean_output(mut self, v: bool) -> Self {
        self.config.clean_output = v;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<NormalizerConfig, Ocr2MdError> {
        let c = &self.config;
        if !(c.endpoint.starts_with("http://") || c.endpoint.starts_with("https://")) {
            return Err(Ocr2MdError::InvalidConfig(format!(
                "Endpoint must be an http:// or https:// URL, got '{}'",
                c.endpoint
            )));
        }
        if c.model.trim().is_empty() {
            return Err(Ocr2MdError::InvalidConfig(
                "Model name must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}
