use std::path::PathBuf;

use thiserror::Error;

/// Top-level error for draft validation, composition and emission.
#[derive(Debug, Error)]
pub enum Error {
    /// The draft has no line items; generation and sharing both require at
    /// least one.
    #[error("invoice draft has no line items")]
    EmptyDraft,

    #[error("line item {index} is invalid: {reason}")]
    InvalidItem { index: usize, reason: &'static str },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("pdf rendering failed: {0}")]
    Pdf(String),

    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Failures talking to the remote counter store.
///
/// Any of these block document generation entirely: the invoice number is
/// embedded in the rendered output and the filename, so there is nothing
/// useful to produce without it.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("counter store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("counter store returned an unexpected response: {0}")]
    Unexpected(String),
}

/// Failures delivering a composed document to its destination.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The platform offers no way to share a file attachment.
    #[error("file sharing is not supported on this device")]
    Unsupported,

    /// The user backed out of the platform share dialog.
    #[error("sharing was cancelled")]
    Cancelled,

    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
