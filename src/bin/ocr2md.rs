//! CLI binary for ocr2md.
//!
//! A thin shim over the library crate that maps CLI flags to `OcrConfig`
//! and `NormalizerConfig` and prints results.

use anyhow::{bail, Context, Result};
use clap::Parser;
use ocr2md::{
    extract_text, inspect, normalize, write_output, DocumentResult, ExtractionProgressCallback,
    NormalizerConfig, OcrConfig, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live progress bar plus one log line per page.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner until `on_extraction_start` tells us the page count.
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn elapsed_secs(&self, page_num: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut times| times.remove(&page_num))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, total_pages: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total_pages as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Recognising");
        self.bar.reset_eta();
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Running OCR on {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total_pages: usize) {
        if let Ok(mut times) = self.start_times.lock() {
            times.insert(page_num, Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total_pages: usize, text_len: usize) {
        let secs = self.elapsed_secs(page_num);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            page_num,
            total_pages,
            dim(&format!("{text_len:>5} chars")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let secs = self.elapsed_secs(page_num);
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(std::iter::once('…')).collect()
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total_pages,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_extraction_complete(&self, total_pages: usize, success_count: usize) {
        self.bar.finish_and_clear();
        eprintln!("{}", self.summary(total_pages, success_count));
    }
}

impl CliProgressCallback {
    /// One-line run summary. The failure count is the number of
    /// `on_page_error` events seen, not `total - success`.
    fn summary(&self, total_pages: usize, success_count: usize) -> String {
        let failed = self.errors.load(Ordering::SeqCst);
        if failed == 0 {
            format!(
                "{} {} pages recognised",
                green("✔"),
                bold(&success_count.to_string())
            )
        } else {
            format!(
                "{} {}/{} pages recognised  ({} failed)",
                if failed >= total_pages { red("✘") } else { cyan("⚠") },
                bold(&success_count.to_string()),
                total_pages,
                red(&failed.to_string()),
            )
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Plain OCR text to stdout
  ocr2md scan.pdf

  # OCR, then restructure as markdown with a local Ollama model
  ocr2md --normalize scan.pdf -o scan.md

  # Another model / host, tidy the model output
  ocr2md --normalize --ollama-model mistral:latest \
         --ollama-endpoint http://gpu-box:11434 --clean scan.pdf

  # German + English, four pages in parallel
  ocr2md --language deu+eng --concurrency 4 scan.pdf

  # Per-page results as JSON
  ocr2md --json scan.pdf > scan.json

  # Page count only
  ocr2md --inspect-only scan.pdf

REQUIREMENTS:
  tesseract   on PATH (or --tesseract), with language data for --language
  pdfium      shared library: --pdfium-lib, PDFIUM_LIB_PATH, next to the
              ocr2md executable, or on the system library path
  ollama      only for --normalize (default http://localhost:11434)

ENVIRONMENT VARIABLES:
  OCR2MD_*          every flag has an OCR2MD_<FLAG> variable
  PDFIUM_LIB_PATH   path to libpdfium
  RUST_LOG          overrides the log filter (e.g. RUST_LOG=ocr2md=debug)
"#;

/// Extract text from scanned PDFs with OCR and optionally tidy it into markdown.
#[derive(Parser, Debug)]
#[command(
    name = "ocr2md",
    version,
    about = "Extract text from scanned PDFs with Tesseract OCR, optionally restructured as markdown by Ollama",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF file to read.
    input: PathBuf,

    /// Write output to this file instead of stdout.
    #[arg(short, long, env = "OCR2MD_OUTPUT")]
    output: Option<PathBuf>,

    /// Send the OCR text to Ollama and output the markdown it returns.
    #[arg(long, env = "OCR2MD_NORMALIZE")]
    normalize: bool,

    /// Ollama base URL.
    #[arg(
        long,
        env = "OCR2MD_OLLAMA_ENDPOINT",
        default_value = ocr2md::config::DEFAULT_OLLAMA_ENDPOINT
    )]
    ollama_endpoint: String,

    /// Ollama model name.
    #[arg(long, env = "OCR2MD_OLLAMA_MODEL", default_value = ocr2md::config::DEFAULT_OLLAMA_MODEL)]
    ollama_model: String,

    /// Seconds to wait for the Ollama answer.
    #[arg(long, env = "OCR2MD_NORMALIZE_TIMEOUT", default_value_t = 120)]
    normalize_timeout: u64,

    /// Tidy the model's markdown (strip fences, blank-line runs, stray characters).
    #[arg(long, env = "OCR2MD_CLEAN")]
    clean: bool,

    /// Pages recognised in parallel.
    #[arg(short, long, env = "OCR2MD_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// Tesseract language(s), e.g. eng or deu+eng.
    #[arg(short, long, env = "OCR2MD_LANGUAGE", default_value = ocr2md::config::DEFAULT_LANGUAGE)]
    language: String,

    /// Directory holding tesseract's .traineddata files.
    #[arg(long, env = "OCR2MD_TESSDATA_DIR")]
    tessdata_dir: Option<PathBuf>,

    /// Path to the tesseract executable.
    #[arg(long, env = "OCR2MD_TESSERACT")]
    tesseract: Option<PathBuf>,

    /// Path to the pdfium shared library.
    #[arg(long, env = "OCR2MD_PDFIUM_LIB")]
    pdfium_lib: Option<PathBuf>,

    /// Password for encrypted documents.
    #[arg(long, env = "OCR2MD_PASSWORD")]
    password: Option<String>,

    /// Render box width in pixels.
    #[arg(long, env = "OCR2MD_WIDTH", default_value_t = ocr2md::config::DEFAULT_PAGE_WIDTH)]
    width: u32,

    /// Render box height in pixels.
    #[arg(long, env = "OCR2MD_HEIGHT", default_value_t = ocr2md::config::DEFAULT_PAGE_HEIGHT)]
    height: u32,

    /// Output JSON (per-page results, plus markdown with --normalize).
    #[arg(long, env = "OCR2MD_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "OCR2MD_NO_PROGRESS")]
    no_progress: bool,

    /// Print page count and size only, no OCR.
    #[arg(long)]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "OCR2MD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "OCR2MD_QUIET")]
    quiet: bool,
}

/// Shape of `--json` output.
#[derive(Serialize)]
struct JsonOutput<'a> {
    #[serde(flatten)]
    document: &'a DocumentResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    markdown: Option<&'a str>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar gives all the feedback needed, so library INFO logs
    // are hidden while it is active.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let bytes = tokio::fs::read(&cli.input)
        .await
        .with_context(|| format!("Failed to read {}", cli.input.display()))?;

    let progress = show_progress.then(CliProgressCallback::new);
    let config = build_ocr_config(&cli, progress.clone().map(|cb| cb as ProgressCallback))?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let info = inspect(&bytes, &config).await.context("Failed to inspect PDF")?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&info).context("Failed to serialise document info")?
            );
        } else {
            println!("File:   {}", cli.input.display());
            println!("Pages:  {}", info.page_count);
            println!("Size:   {} bytes", info.size_bytes);
        }
        return Ok(());
    }

    // ── OCR ──────────────────────────────────────────────────────────────
    let start = Instant::now();
    let result = extract_text(&bytes, &config).await;
    if let Some(cb) = &progress {
        cb.bar.finish_and_clear();
    }
    if !result.success {
        bail!(
            "OCR failed: {}",
            result.error_message.as_deref().unwrap_or("unknown error")
        );
    }

    // ── Normalize ────────────────────────────────────────────────────────
    let markdown = if cli.normalize {
        let normalizer = build_normalizer_config(&cli)?;
        if !cli.quiet {
            eprintln!(
                "{} Normalizing with {} …",
                cyan("◆"),
                bold(&normalizer.model)
            );
        }
        Some(normalize(&result.full_text, &normalizer).await)
    } else {
        None
    };

    // ── Output ───────────────────────────────────────────────────────────
    let rendered = if cli.json {
        let out = JsonOutput {
            document: &result,
            markdown: markdown.as_deref(),
        };
        serde_json::to_string_pretty(&out).context("Failed to serialise output")?
    } else {
        markdown.unwrap_or_else(|| result.full_text.clone())
    };

    match &cli.output {
        Some(path) => {
            write_output(path, &rendered)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            if !cli.quiet {
                eprintln!(
                    "{}  {}/{} pages  {}ms  →  {}",
                    if result.recognized_pages() == result.pages.len() {
                        green("✔")
                    } else {
                        cyan("⚠")
                    },
                    result.recognized_pages(),
                    result.pages.len(),
                    start.elapsed().as_millis(),
                    bold(&path.display().to_string()),
                );
            }
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(rendered.as_bytes())
                .context("Failed to write to stdout")?;
            if !rendered.ends_with('\n') {
                handle.write_all(b"\n").context("Failed to write to stdout")?;
            }
            if !cli.quiet && !show_progress && !cli.json {
                eprintln!(
                    "Recognised {}/{} pages in {}ms",
                    result.recognized_pages(),
                    result.pages.len(),
                    start.elapsed().as_millis()
                );
            }
        }
    }

    Ok(())
}

/// Map CLI args to `OcrConfig`.
fn build_ocr_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<OcrConfig> {
    let mut builder = OcrConfig::builder()
        .page_size(cli.width, cli.height)
        .concurrency(cli.concurrency)
        .language(&cli.language);

    if let Some(path) = &cli.tesseract {
        builder = builder.tesseract_path(path);
    }
    if let Some(dir) = &cli.tessdata_dir {
        builder = builder.tessdata_dir(dir);
    }
    if let Some(path) = &cli.pdfium_lib {
        builder = builder.pdfium_library(path);
    }
    if let Some(pwd) = &cli.password {
        builder = builder.password(pwd);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid OCR configuration")
}

/// Map CLI args to `NormalizerConfig`.
fn build_normalizer_config(cli: &Cli) -> Result<NormalizerConfig> {
    NormalizerConfig::builder()
        .endpoint(&cli.ollama_endpoint)
        .model(&cli.ollama_model)
        .timeout_secs(cli.normalize_timeout)
        .clean_output(cli.clean)
        .build()
        .context("Invalid normalizer configuration")
}
