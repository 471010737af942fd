//! # anvil-export: Workbooks, PDFs and Sharing
//!
//! Turns loaded entities into files: spreadsheet exports, the thermal
//! invoice, report PDFs. This crate never touches the database; callers
//! load the rows and pass them in.
//!
//! ## File Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  entities ──► render to bytes ──► <dir>/<name>.part ──► rename ──► path │
//! │                    │                     │                              │
//! │                    └── error ────────────┴──► .part removed, Err(..)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`workbook`] - Products / Sales / Purchases / Stock `.xlsx` exports
//! - [`pdf`] - 80mm invoice and A4 report
//! - [`share`] - Share payloads and the [`ShareTarget`] seam
//! - [`error`] - Export error types

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, warn};

pub mod error;
pub mod pdf;
pub mod share;
pub mod workbook;

pub use error::{ExportError, ExportResult};
pub use pdf::{invoice_pdf, report_pdf, write_invoice, write_report, ReportDocument};
pub use share::{SharePayload, ShareTarget, PDF_MIME, XLSX_MIME};
pub use workbook::{export_products, export_purchases, export_sales, export_stock_report};

/// `<stem>_<unix millis>.<ext>`, the naming every export uses.
pub fn timestamped_name(stem: &str, ext: &str) -> String {
    format!("{}_{}.{}", stem, Utc::now().timestamp_millis(), ext)
}

/// Writes `bytes` to `dir/name` through a `.part` sibling and a rename.
///
/// On any failure the `.part` file is removed and the final path is
/// never created.
pub fn write_atomically(dir: &Path, name: &str, bytes: &[u8]) -> ExportResult<PathBuf> {
    if !dir.is_dir() {
        return Err(ExportError::MissingDirectory(dir.to_path_buf()));
    }

    let path = dir.join(name);
    let part = dir.join(format!("{}.part", name));

    let written = fs::File::create(&part).and_then(|mut file| {
        file.write_all(bytes)?;
        file.sync_all()
    });
    let result = written.and_then(|_| fs::rename(&part, &path));

    if let Err(e) = result {
        if let Err(cleanup) = fs::remove_file(&part) {
            warn!(path = %part.display(), error = %cleanup, "Could not remove partial export");
        }
        return Err(e.into());
    }

    debug!(path = %path.display(), bytes = bytes.len(), "Export written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_atomically_leaves_only_final_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_atomically(dir.path(), "out.bin", b"hello").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"hello");
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["out.bin".to_string()]);
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = write_atomically(&missing, "out.bin", b"x").unwrap_err();
        assert!(matches!(err, ExportError::MissingDirectory(_)));
    }

    #[test]
    fn test_timestamped_name() {
        let name = timestamped_name("Stock_Report", "xlsx");
        assert!(name.starts_with("Stock_Report_"));
        assert!(name.ends_with(".xlsx"));
    }
}
