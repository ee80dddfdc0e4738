//! Document loading: turn a PDF path into an ordered list of page texts.
//!
//! ## Why a trait?
//!
//! The orchestrator only needs "page number + text, in order". Keeping that
//! contract behind [`DocumentLoader`] lets tests feed scripted pages without
//! touching the file system, and keeps the lopdf specifics in one place.
//!
//! ## Why spawn_blocking?
//!
//! Parsing a PDF and decoding its content streams is CPU-bound and can take
//! seconds on large documents. [`load_pages`] moves the work onto Tokio's
//! blocking pool so the runtime's worker threads stay free.

use crate::config::PageSelection;
use crate::error::PageByPageError;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One page of extracted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// 1-indexed page number from the document's page tree.
    pub number: usize,
    pub text: String,
}

impl Page {
    pub fn new(number: usize, text: impl Into<String>) -> Self {
        Self {
            number,
            text: text.into(),
        }
    }
}

/// Produces the pages of a document, ordered by page number ascending.
pub trait DocumentLoader: Send + Sync {
    /// Load every page of the document at `path`.
    ///
    /// # Errors
    /// [`PageByPageError::DocumentNotFound`] if `path` is not a readable
    /// file; implementations may return other input errors for files they
    /// cannot parse.
    fn load(&self, path: &Path) -> Result<Vec<Page>, PageByPageError>;
}

/// [`DocumentLoader`] backed by lopdf text extraction.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfLoader;

impl DocumentLoader for PdfLoader {
    fn load(&self, path: &Path) -> Result<Vec<Page>, PageByPageError> {
        check_document(path)?;

        let document = lopdf::Document::load(path).map_err(|e| PageByPageError::CorruptPdf {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;

        // BTreeMap keyed by page number, so iteration is already ascending.
        let page_ids = document.get_pages();
        info!("PDF loaded: {} pages", page_ids.len());

        let mut pages = Vec::with_capacity(page_ids.len());
        for &number in page_ids.keys() {
            let text = match document.extract_text(&[number]) {
                Ok(text) => text,
                Err(e) => {
                    warn!("Page {}: text extraction failed, using empty text: {}", number, e);
                    String::new()
                }
            };
            debug!("Page {}: {} chars", number, text.len());
            pages.push(Page::new(number as usize, text));
        }

        Ok(pages)
    }
}

/// Validate that `path` is a readable PDF file.
///
/// Checks existence, read permission and the `%PDF` magic bytes so callers
/// get a meaningful error instead of a parser failure.
pub fn check_document(path: &Path) -> Result<(), PageByPageError> {
    if !path.is_file() {
        return Err(PageByPageError::DocumentNotFound {
            path: path.to_path_buf(),
        });
    }

    match std::fs::File::open(path) {
        Ok(mut f) => {
            use std::io::Read;
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(PageByPageError::NotAPdf {
                    path: path.to_path_buf(),
                    magic,
                });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(PageByPageError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(PageByPageError::DocumentNotFound {
                path: path.to_path_buf(),
            });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(())
}

/// Display name used in prompts: the file name, or the whole path if it
/// has none.
pub fn document_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Keep only the pages in `selection`, preserving order.
pub fn select_pages(pages: Vec<Page>, selection: &PageSelection) -> Vec<Page> {
    pages
        .into_iter()
        .filter(|p| selection.contains(p.number))
        .collect()
}

/// Run `loader` on the blocking pool.
pub async fn load_pages(
    loader: Arc<dyn DocumentLoader>,
    path: &Path,
) -> Result<Vec<Page>, PageByPageError> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || loader.load(&path))
        .await
        .map_err(|e| PageByPageError::Internal(format!("Load task panicked: {}", e)))?
}
