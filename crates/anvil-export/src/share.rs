//! # Sharing
//!
//! A generated file is handed to whatever can deliver it (a chat app,
//! mail, a printer spooler) as a [`SharePayload`]. Delivery lives behind
//! [`ShareTarget`] so the front end chooses how.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ExportError, ExportResult};

pub const PDF_MIME: &str = "application/pdf";
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharePayload {
    pub path: PathBuf,
    pub mime_type: String,
    /// Short caption ("Invoice KH-0002").
    pub subject: String,
}

impl SharePayload {
    pub fn pdf(path: impl Into<PathBuf>, subject: impl Into<String>) -> Self {
        SharePayload {
            path: path.into(),
            mime_type: PDF_MIME.to_string(),
            subject: subject.into(),
        }
    }

    pub fn workbook(path: impl Into<PathBuf>, subject: impl Into<String>) -> Self {
        SharePayload {
            path: path.into(),
            mime_type: XLSX_MIME.to_string(),
            subject: subject.into(),
        }
    }

    /// Fails if the file is gone.
    pub fn check(&self) -> ExportResult<&Path> {
        if self.path.is_file() {
            Ok(&self.path)
        } else {
            Err(ExportError::Share(format!(
                "{} does not exist",
                self.path.display()
            )))
        }
    }
}

/// Something that can deliver a file to the user or a third party.
pub trait ShareTarget {
    fn share(&self, payload: &SharePayload) -> ExportResult<()>;
}

/// Records the share in the log and leaves the file where it is.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogShareTarget;

impl ShareTarget for LogShareTarget {
    fn share(&self, payload: &SharePayload) -> ExportResult<()> {
        let path = payload.check()?;
        info!(
            path = %path.display(),
            mime = %payload.mime_type,
            subject = %payload.subject,
            "File ready to share"
        );
        Ok(())
    }
}
