//! Delivery of composed documents: filename and share-text conventions plus
//! the save-to-folder target. The platform share sheet itself is
//! infrastructure; targets that cannot take a file attachment report
//! [`ExportError::Unsupported`] and the caller shows a notice instead.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ExportError;

pub const PDF_MIME: &str = "application/pdf";

/// Filename pattern every emitted document uses, e.g. `rekins_2501.pdf`.
pub fn pdf_filename(invoice_number: i64) -> String {
    format!("rekins_{invoice_number}.pdf")
}

/// Title/text string handed to the platform share facility.
pub fn share_title(invoice_number: i64) -> String {
    format!("Rēķins Nr. {invoice_number}")
}

/// A destination for one named byte buffer. `deliver` returning `Ok` is the
/// confirmation the emission flow waits for before advancing the counter.
pub trait ExportTarget {
    fn deliver(&mut self, filename: &str, bytes: &[u8]) -> Result<(), ExportError>;
}

/// Writes documents into a directory, creating it if needed.
#[derive(Debug)]
pub struct DirectoryExport {
    dir: PathBuf,
    last_written: Option<PathBuf>,
}

impl DirectoryExport {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            last_written: None,
        }
    }

    /// Full path of the most recently delivered document.
    pub fn last_written(&self) -> Option<&Path> {
        self.last_written.as_deref()
    }
}

impl ExportTarget for DirectoryExport {
    fn deliver(&mut self, filename: &str, bytes: &[u8]) -> Result<(), ExportError> {
        fs::create_dir_all(&self.dir).map_err(|source| ExportError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let path = self.dir.join(filename);
        fs::write(&path, bytes).map_err(|source| ExportError::Io {
            path: path.clone(),
            source,
        })?;

        tracing::info!(path = %path.display(), "wrote invoice pdf");
        self.last_written = Some(path);
        Ok(())
    }
}
