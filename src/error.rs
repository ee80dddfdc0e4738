//! Error types for the pagebypage library.
//!
//! Every variant of [`PageByPageError`] is fatal to the run that raised it.
//! They fall into two groups by *when* they surface:
//!
//! * **Validation errors** (`EmptyPageSelection`, `InvalidPageNumber`,
//!   `DocumentNotFound`, `OutputIsDirectory`, …) are checked eagerly,
//!   before any model call is made and before the output file is touched.
//!
//! * **Runtime errors** (`CompletionFailed`, `OutputWriteFailed`) abort the
//!   run in the middle. Pages already written to the output file stay there.
//!
//! A model refusal is deliberately *not* an error. It is a normal terminal
//! state of a run, reported as [`crate::output::RunOutcome::Stopped`].

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the pagebypage library.
#[derive(Debug, Error)]
pub enum PageByPageError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Document was not found at the given path.
    #[error("Document not found: '{path}'\nCheck the path exists and is a file.")]
    DocumentNotFound { path: PathBuf },

    /// Process does not have read permission on the document.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// PDF structure could not be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// A page selection was given but contains no pages.
    #[error("No pages selected.\nPass at least one page, or omit the selection to process all pages.")]
    EmptyPageSelection,

    /// A page selection names page 0; pages are numbered from 1.
    #[error("Invalid page number {page}: pages are numbered from 1.")]
    InvalidPageNumber { page: usize },

    // ── Output errors ─────────────────────────────────────────────────────
    /// The configured output path is an existing directory.
    #[error("The output path '{path}' is a directory.")]
    OutputIsDirectory { path: PathBuf },

    /// Could not remove, create or append to the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider could not be constructed.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The completion stream for a page failed.
    #[error("Completion failed on page {page}: {detail}")]
    CompletionFailed { page: usize, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure reported by a [`crate::pipeline::llm::CompletionStreamer`].
///
/// Carries no page number; the orchestrator attaches it when converting to
/// [`PageByPageError::CompletionFailed`].
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct CompletionError(pub String);

impl CompletionError {
    pub fn new(detail: impl Into<String>) -> Self {
        Self(detail.into())
    }

    pub(crate) fn on_page(self, page: usize) -> PageByPageError {
        PageByPageError::CompletionFailed {
            page,
            detail: self.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_is_directory_display() {
        let e = PageByPageError::OutputIsDirectory {
            path: PathBuf::from("/tmp/out"),
        };
        let msg = e.to_string();
        assert!(msg.contains("/tmp/out"), "got: {msg}");
        assert!(msg.contains("directory"), "got: {msg}");
    }

    #[test]
    fn invalid_page_number_display() {
        let msg = PageByPageError::InvalidPageNumber { page: 0 }.to_string();
        assert!(msg.contains("page number 0"), "got: {msg}");
    }

    #[test]
    fn empty_selection_display() {
        let msg = PageByPageError::EmptyPageSelection.to_string();
        assert!(msg.starts_with("No pages selected."), "got: {msg}");
    }

    #[test]
    fn completion_error_gains_page_number() {
        let e = CompletionError::new("connection reset").on_page(7);
        let msg = e.to_string();
        assert!(msg.contains("page 7"), "got: {msg}");
        assert!(msg.contains("connection reset"), "got: {msg}");
    }

    #[test]
    fn output_write_failed_keeps_source() {
        use std::error::Error as _;
        let e = PageByPageError::OutputWriteFailed {
            path: PathBuf::from("out.txt"),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        };
        assert!(e.source().is_some());
        assert!(e.to_string().contains("disk full"));
    }
}
