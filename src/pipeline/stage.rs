//! Staging: copy the caller's bytes into a temporary file pdfium can open.
//!
//! pdfium reads documents from a file-system path. The bytes are written to
//! a [`NamedTempFile`] that lives exactly as long as the
//! [`StagedDocument`]; dropping it deletes the file on every exit path,
//! including errors, panics, and cancelled futures. The `%PDF` magic bytes
//! are checked first so garbage input fails fast with a clear error instead
//! of reaching pdfium.

use crate::error::Ocr2MdError;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// A document copied to temporary storage for the duration of one run.
#[derive(Debug)]
pub struct StagedDocument {
    file: NamedTempFile,
    size: usize,
}

impl StagedDocument {
    /// Path of the temporary copy.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Size of the staged document in bytes.
    pub fn size(&self) -> usize {
        self.size
    }
}

/// Check that `bytes` start with the PDF header.
pub fn check_magic(bytes: &[u8]) -> Result<(), Ocr2MdError> {
    if bytes.starts_with(PDF_MAGIC) {
        Ok(())
    } else {
        Err(Ocr2MdError::NotAPdf {
            magic: bytes.iter().take(PDF_MAGIC.len()).copied().collect(),
        })
    }
}

/// Validate `bytes` and write them to a new temporary file.
///
/// The file is created in `temp_dir`, or the system temp directory when
/// `None`.
pub fn stage_document(
    bytes: &[u8],
    temp_dir: Option<&Path>,
) -> Result<StagedDocument, Ocr2MdError> {
    check_magic(bytes)?;

    let mut builder = tempfile::Builder::new();
    builder.prefix("ocr2md-").suffix(".pdf");
    let mut file = match temp_dir {
        Some(dir) => builder.tempfile_in(dir),
        None => builder.tempfile(),
    }
    .map_err(|source| Ocr2MdError::TempStorage { source })?;

    file.write_all(bytes)
        .and_then(|_| file.flush())
        .map_err(|source| Ocr2MdError::TempStorage { source })?;

    debug!(
        "Staged {} bytes at {}",
        bytes.len(),
        file.path().display()
    );

    Ok(StagedDocument {
        file,
        size: bytes.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_pdf_bytes() {
        let err = stage_document(b"PK\x03\x04zipfile", None).unwrap_err();
        match err {
            Ocr2MdError::NotAPdf { magic } => assert_eq!(magic, b"PK\x03\x04"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rejects_empty_input() {
        let err = stage_document(b"", None).unwrap_err();
        assert!(matches!(err, Ocr2MdError::NotAPdf { ref magic } if magic.is_empty()));
    }

    #[test]
    fn staged_file_holds_bytes_and_is_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = b"%PDF-1.7\n%fake body";

        let staged = stage_document(bytes, Some(dir.path())).unwrap();
        let path = staged.path().to_path_buf();
        assert!(path.starts_with(dir.path()));
        assert_eq!(std::fs::read(&path).unwrap(), bytes);
        assert_eq!(staged.size(), bytes.len());

        drop(staged);
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn staged_file_name_is_recognisable() {
        let staged = stage_document(b"%PDF-1.4", None).unwrap();
        let name = staged.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("ocr2md-"), "got {name}");
        assert!(name.ends_with(".pdf"), "got {name}");
    }
}
