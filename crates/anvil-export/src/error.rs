//! # Export Errors
//!
//! Failures while producing a file. A failed export never leaves a
//! partial file at the final path (see [`crate::write_atomically`]).

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    /// Reading or writing the export directory failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The workbook writer rejected the content.
    #[error("Workbook error: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),

    /// The PDF writer failed.
    #[error("PDF error: {0}")]
    Pdf(String),

    /// The configured export directory does not exist.
    #[error("Export directory not found: {}", .0.display())]
    MissingDirectory(PathBuf),

    /// Handing a file to a share target failed.
    #[error("Share failed: {0}")]
    Share(String),
}

impl ExportError {
    pub(crate) fn pdf(err: impl std::fmt::Display) -> Self {
        ExportError::Pdf(err.to_string())
    }
}

pub type ExportResult<T> = Result<T, ExportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = ExportError::MissingDirectory(PathBuf::from("/nowhere"));
        assert_eq!(err.to_string(), "Export directory not found: /nowhere");
        assert_eq!(ExportError::pdf("bad font").to_string(), "PDF error: bad font");
    }
}
