//! Result types produced by a run.

use serde::{Deserialize, Serialize};

/// The accepted response for one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResult {
    /// 1-indexed page number, as numbered in the document.
    pub page_num: usize,
    /// The full model response, concatenated from every streamed fragment.
    pub response: String,
    /// Number of fragments the response arrived in.
    pub fragments: usize,
    /// Wall-clock time spent streaming this page.
    pub duration_ms: u64,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every selected page was processed.
    Finished,
    /// The model refused on `page`; later pages were not touched.
    Stopped { page: usize },
}

impl RunOutcome {
    pub fn is_stopped(&self) -> bool {
        matches!(self, RunOutcome::Stopped { .. })
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Display name of the document (its file name).
    pub document: String,
    /// Pages left after applying the selection.
    pub selected_pages: usize,
    /// Accepted pages, in processing order.
    pub pages: Vec<PageResult>,
    pub outcome: RunOutcome,
    pub total_duration_ms: u64,
}
