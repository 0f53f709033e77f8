//! Page recognition: turn one rendered page into text.
//!
//! [`PageRecognizer`] is the seam for the OCR backend.
//! [`TesseractRecognizer`] drives the `tesseract` command-line tool: the page
//! is encoded as PNG, piped to `tesseract stdin stdout`, and the plain-text
//! output is returned verbatim.
//!
//! [`recognize_page`] wraps any recognizer so that failures, including
//! panics, stay local to the page: it always produces a [`PageResult`].

use crate::error::RecognitionError;
use crate::output::PageResult;
use crate::pipeline::encode::encode_png;
use crate::pipeline::render::PageImage;
use crate::progress::ProgressCallback;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Recognises the text on one page image.
///
/// Implementations are called from blocking threads, possibly several at
/// once when `concurrency > 1`.
pub trait PageRecognizer: Send + Sync {
    fn recognize(&self, image: &PageImage) -> Result<String, RecognitionError>;
}

/// [`PageRecognizer`] that shells out to the `tesseract` CLI.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    binary: PathBuf,
    language: String,
    tessdata_dir: Option<PathBuf>,
}

impl TesseractRecognizer {
    pub fn new(
        binary: impl Into<PathBuf>,
        language: impl Into<String>,
        tessdata_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            binary: binary.into(),
            language: language.into(),
            tessdata_dir,
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("stdin").arg("stdout").arg("-l").arg(&self.language);
        if let Some(dir) = &self.tessdata_dir {
            cmd.arg("--tessdata-dir").arg(dir);
        }
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

impl Default for TesseractRecognizer {
    fn default() -> Self {
        Self::new("tesseract", crate::config::DEFAULT_LANGUAGE, None)
    }
}

impl PageRecognizer for TesseractRecognizer {
    fn recognize(&self, image: &PageImage) -> Result<String, RecognitionError> {
        let png = encode_png(image)?;

        let mut child = self
            .command()
            .spawn()
            .map_err(|e| RecognitionError::EngineUnavailable {
                binary: self.binary.display().to_string(),
                detail: e.to_string(),
            })?;

        // A write error usually means tesseract exited early; its exit status
        // and stderr describe the failure better, so check those first.
        let write_result = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(&png),
            None => Ok(()),
        };

        let output = child.wait_with_output()?;

        if !output.status.success() {
            return Err(RecognitionError::Backend {
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        write_result?;

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Recognise one page on a blocking thread and package the outcome.
///
/// Never fails: recognizer errors and panics become a failed [`PageResult`]
/// carrying the error text, and the progress callback is told either way.
pub async fn recognize_page(
    recognizer: Arc<dyn PageRecognizer>,
    image: PageImage,
    total_pages: usize,
    progress: Option<ProgressCallback>,
) -> PageResult {
    let page_num = image.page_index + 1;
    if let Some(cb) = &progress {
        cb.on_page_start(page_num, total_pages);
    }

    let start = Instant::now();
    let outcome = tokio::task::spawn_blocking(move || recognizer.recognize(&image))
        .await
        .unwrap_or_else(|join_err| Err(RecognitionError::Panicked(join_err.to_string())));

    match outcome {
        Ok(text) => {
            debug!(
                "Page {}/{}: {} chars in {}ms",
                page_num,
                total_pages,
                text.len(),
                start.elapsed().as_millis()
            );
            if let Some(cb) = &progress {
                cb.on_page_complete(page_num, total_pages, text.len());
            }
            PageResult::recognized(page_num, text)
        }
        Err(e) => {
            warn!("Page {}/{} OCR failed: {}", page_num, total_pages, e);
            if let Some(cb) = &progress {
                cb.on_page_error(page_num, total_pages, &e.to_string());
            }
            PageResult::failed(page_num, &e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ExtractionProgressCallback;
    use std::sync::Mutex;

    struct EchoRecognizer;

    impl PageRecognizer for EchoRecognizer {
        fn recognize(&self, image: &PageImage) -> Result<String, RecognitionError> {
            Ok(format!("text of page {}\n", image.page_index + 1))
        }
    }

    struct FailingRecognizer;

    impl PageRecognizer for FailingRecognizer {
        fn recognize(&self, _image: &PageImage) -> Result<String, RecognitionError> {
            Err(RecognitionError::Backend {
                status: Some(1),
                stderr: "Error, could not create TXT output file".into(),
            })
        }
    }

    struct PanickingRecognizer;

    impl PageRecognizer for PanickingRecognizer {
        fn recognize(&self, _image: &PageImage) -> Result<String, RecognitionError> {
            panic!("engine exploded");
        }
    }

    #[derive(Default)]
    struct EventLog(Mutex<Vec<String>>);

    impl ExtractionProgressCallback for EventLog {
        fn on_page_start(&self, page_num: usize, _total_pages: usize) {
            self.0.lock().unwrap().push(format!("start {page_num}"));
        }
        fn on_page_complete(&self, page_num: usize, _total_pages: usize, _text_len: usize) {
            self.0.lock().unwrap().push(format!("done {page_num}"));
        }
        fn on_page_error(&self, page_num: usize, _total_pages: usize, _error: &str) {
            self.0.lock().unwrap().push(format!("error {page_num}"));
        }
    }

    fn blank_page(index: usize) -> PageImage {
        PageImage::new(index, 2, 2, vec![255; 16])
    }

    #[tokio::test]
    async fn successful_page_keeps_text_verbatim() {
        let log = Arc::new(EventLog::default());
        let result = recognize_page(
            Arc::new(EchoRecognizer),
            blank_page(1),
            3,
            Some(log.clone() as ProgressCallback),
        )
        .await;

        assert!(result.ok);
        assert_eq!(result.page_number, 2);
        assert_eq!(result.text, "text of page 2\n");
        assert_eq!(*log.0.lock().unwrap(), vec!["start 2", "done 2"]);
    }

    #[tokio::test]
    async fn backend_failure_becomes_failed_page() {
        let log = Arc::new(EventLog::default());
        let result = recognize_page(
            Arc::new(FailingRecognizer),
            blank_page(0),
            1,
            Some(log.clone() as ProgressCallback),
        )
        .await;

        assert!(!result.ok);
        assert!(result.text.starts_with("Error during OCR:"));
        assert!(result.text.contains("could not create TXT output file"));
        assert_eq!(*log.0.lock().unwrap(), vec!["start 1", "error 1"]);
    }

    #[tokio::test]
    async fn panic_is_contained_to_the_page() {
        let result = recognize_page(Arc::new(PanickingRecognizer), blank_page(0), 1, None).await;
        assert!(!result.ok);
        assert!(result.error_message.unwrap().contains("panicked"));
    }

    #[test]
    fn missing_binary_is_engine_unavailable() {
        let recognizer = TesseractRecognizer::new("/no/such/tesseract-binary", "eng", None);
        match recognizer.recognize(&blank_page(0)).unwrap_err() {
            RecognitionError::EngineUnavailable { binary, .. } => {
                assert_eq!(binary, "/no/such/tesseract-binary");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn invalid_buffer_is_reported_before_spawning() {
        let recognizer = TesseractRecognizer::new("/no/such/tesseract-binary", "eng", None);
        let bad = PageImage::new(0, 10, 10, vec![0; 3]);
        assert!(matches!(
            recognizer.recognize(&bad),
            Err(RecognitionError::InvalidBuffer { .. })
        ));
    }

    #[test]
    fn command_line_includes_language_and_tessdata() {
        let recognizer =
            TesseractRecognizer::new("tesseract", "deu+eng", Some(PathBuf::from("/opt/tessdata")));
        let cmd = recognizer.command();
        let args: Vec<String> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            vec!["stdin", "stdout", "-l", "deu+eng", "--tessdata-dir", "/opt/tessdata"]
        );
    }
}
