//! Output persistence: append accepted pages to a plain-text file.
//!
//! The artifact is fresh per run. [`OutputSink::open`] deletes any existing
//! file, and every [`OutputSink::append`] opens the file in append mode,
//! writes one record, and closes it again. No handle is held between pages,
//! so a run that aborts midway leaves every record written so far intact.

use crate::error::PageByPageError;
use crate::output::{PageResult, RunReport};
use crate::progress::PageObserver;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Line written after every page record.
pub const RECORD_SEPARATOR: &str = "--------------------------------";

/// Format one page record exactly as it appears in the output file.
pub fn format_record(page_num: usize, response: &str) -> String {
    format!("Page {page_num}:\n\n{response}\n\n{RECORD_SEPARATOR}\n\n")
}

/// Destination for accepted page responses, or nothing.
#[derive(Debug, Clone, Default)]
pub struct OutputSink {
    path: Option<PathBuf>,
}

impl OutputSink {
    /// A sink that discards every record.
    pub fn disabled() -> Self {
        Self { path: None }
    }

    /// Prepare `path` for a new run.
    ///
    /// # Errors
    /// - [`PageByPageError::OutputIsDirectory`] if `path` is a directory.
    /// - [`PageByPageError::OutputWriteFailed`] if an existing file cannot
    ///   be removed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PageByPageError> {
        let path = path.as_ref();
        check_output_path(path)?;

        if path.exists() {
            info!("Removing previous output {}", path.display());
            std::fs::remove_file(path).map_err(|e| PageByPageError::OutputWriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        Ok(Self {
            path: Some(path.to_path_buf()),
        })
    }

    /// [`OutputSink::open`] if `path` is set, otherwise [`OutputSink::disabled`].
    pub fn open_optional(path: Option<&Path>) -> Result<Self, PageByPageError> {
        match path {
            Some(p) => Self::open(p),
            None => Ok(Self::disabled()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_enabled(&self) -> bool {
        self.path.is_some()
    }

    /// Append one page record. No-op when the sink is disabled.
    pub fn append(&self, page_num: usize, response: &str) -> Result<(), PageByPageError> {
        let Some(ref path) = self.path else {
            return Ok(());
        };

        let write_failed = |e: std::io::Error| PageByPageError::OutputWriteFailed {
            path: path.clone(),
            source: e,
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(write_failed)?;
        file.write_all(format_record(page_num, response).as_bytes())
            .map_err(write_failed)?;

        debug!("Page {}: appended to {}", page_num, path.display());
        Ok(())
    }
}

/// Reject an output path that is an existing directory.
///
/// Does not touch the file system beyond a metadata lookup.
pub fn check_output_path(path: &Path) -> Result<(), PageByPageError> {
    if path.is_dir() {
        return Err(PageByPageError::OutputIsDirectory {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

/// Observer that appends each accepted page to an [`OutputSink`] and then
/// forwards every event to `inner`.
pub struct PersistingObserver<'a> {
    sink: OutputSink,
    inner: &'a mut dyn PageObserver,
}

impl<'a> PersistingObserver<'a> {
    pub fn new(sink: OutputSink, inner: &'a mut dyn PageObserver) -> Self {
        Self { sink, inner }
    }
}

impl PageObserver for PersistingObserver<'_> {
    fn on_run_start(&mut self, selected_pages: usize) {
        self.inner.on_run_start(selected_pages);
    }

    fn on_page_start(&mut self, page_num: usize) {
        self.inner.on_page_start(page_num);
    }

    fn on_fragment(&mut self, page_num: usize, fragment: &str) {
        self.inner.on_fragment(page_num, fragment);
    }

    fn on_page_result(&mut self, result: &PageResult) -> Result<(), PageByPageError> {
        self.sink.append(result.page_num, &result.response)?;
        self.inner.on_page_result(result)
    }

    fn on_refusal(&mut self, page_num: usize, response: &str) {
        self.inner.on_refusal(page_num, response);
    }

    fn on_run_complete(&mut self, report: &RunReport) {
        self.inner.on_run_complete(report);
    }
}
