//! Observer trait for run and page events.
//!
//! The orchestrator never decides what happens to a page's response. It
//! reports events to a [`PageObserver`], and the observer decides whether to
//! print them or persist them. The same loop drives the CLI and the tests.
//!
//! Pages are processed one at a time, so observers take `&mut self` and need
//! no synchronisation.
//!
//! # Example
//!
//! ```rust
//! use pagebypage::{PageObserver, PageResult, PageByPageError};
//!
//! #[derive(Default)]
//! struct Collect {
//!     pages: Vec<usize>,
//! }
//!
//! impl PageObserver for Collect {
//!     fn on_page_result(&mut self, result: &PageResult) -> Result<(), PageByPageError> {
//!         self.pages.push(result.page_num);
//!         Ok(())
//!     }
//! }
//! ```

use crate::error::PageByPageError;
use crate::output::{PageResult, RunReport};

/// Receives events from [`crate::Pipeline::iterate`].
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait PageObserver {
    /// Called once after the document is loaded and filtered, before any
    /// page is streamed.
    ///
    /// # Arguments
    /// * `selected_pages`: number of pages that may be processed
    fn on_run_start(&mut self, selected_pages: usize) {
        let _ = selected_pages;
    }

    /// Called just before the prompt for `page_num` is sent.
    fn on_page_start(&mut self, page_num: usize) {
        let _ = page_num;
    }

    /// Called for every fragment as it arrives, before the response is
    /// complete. Fragments arrive in order and are never repeated.
    fn on_fragment(&mut self, page_num: usize, fragment: &str) {
        let _ = (page_num, fragment);
    }

    /// Called when a page response has been accepted.
    ///
    /// Returning an error aborts the run; pages after this one are not
    /// processed and the error is returned from `iterate`.
    fn on_page_result(&mut self, result: &PageResult) -> Result<(), PageByPageError> {
        let _ = result;
        Ok(())
    }

    /// Called when the model refused on `page_num`. No further page events
    /// follow.
    ///
    /// # Arguments
    /// * `page_num`: the page that was refused
    /// * `response`: the raw refusal text
    fn on_refusal(&mut self, page_num: usize, response: &str) {
        let _ = (page_num, response);
    }

    /// Called once when the run reaches `Finished` or `Stopped`.
    fn on_run_complete(&mut self, report: &RunReport) {
        let _ = report;
    }
}

/// An observer that ignores every event.
pub struct NoopObserver;

impl PageObserver for NoopObserver {}
