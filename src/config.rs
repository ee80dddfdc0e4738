//! Configuration types for a page-by-page run.
//!
//! Everything a run needs besides the document path lives in [`RunConfig`],
//! built via [`RunConfigBuilder`]. `build()` enforces the same invariants the
//! pipeline checks again at run time, so a bad selection is caught as early
//! as possible.

use crate::error::PageByPageError;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Provider used when nothing else is configured.
pub const DEFAULT_PROVIDER: &str = "ollama";

/// Model used when a provider is named without one.
pub const DEFAULT_MODEL: &str = "llama3.2";

/// Configuration for one run over one document.
///
/// # Example
/// ```rust
/// use pagebypage::{PageSelection, RunConfig};
///
/// let config = RunConfig::builder()
///     .task("List every date mentioned on this page.")
///     .pages(PageSelection::only([1, 2, 5]))
///     .output("dates.txt")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone, Default)]
pub struct RunConfig {
    /// The user's instruction, appended verbatim to every page prompt.
    pub task: String,

    /// Which pages to process. Default: all.
    pub pages: PageSelection,

    /// Append accepted pages to this file. The file is recreated at the
    /// start of every run. `None` disables persistence.
    pub output: Option<PathBuf>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// LLM provider name (e.g. "ollama", "openai", "anthropic").
    pub provider_name: Option<String>,

    /// Model identifier. If None, uses [`DEFAULT_MODEL`].
    pub model: Option<String>,
}

impl fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfig")
            .field("task", &self.task)
            .field("pages", &self.pages)
            .field("output", &self.output)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("provider_name", &self.provider_name)
            .field("model", &self.model)
            .finish()
    }
}

impl RunConfig {
    /// Create a new builder for `RunConfig`.
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`RunConfig`].
#[derive(Debug)]
pub struct RunConfigBuilder {
    config: RunConfig,
}

impl RunConfigBuilder {
    pub fn task(mut self, task: impl Into<String>) -> Self {
        self.config.task = task.into();
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output = Some(path.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<RunConfig, PageByPageError> {
        let c = &self.config;
        if c.task.trim().is_empty() {
            return Err(PageByPageError::InvalidConfig(
                "Task must not be empty".into(),
            ));
        }
        c.pages.validate()?;
        Ok(self.config)
    }
}

// ── Page selection ───────────────────────────────────────────────────────

/// Which pages of the document to process.
///
/// Page numbers are 1-indexed and refer to the document's own numbering.
/// Numbers that do not exist in the document are simply never matched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Process every page (default).
    #[default]
    All,
    /// Process only these pages. Must be non-empty.
    Only(BTreeSet<usize>),
}

impl PageSelection {
    /// Convenience constructor for [`PageSelection::Only`].
    pub fn only(pages: impl IntoIterator<Item = usize>) -> Self {
        PageSelection::Only(pages.into_iter().collect())
    }

    /// Reject an explicit selection with no pages in it, or one that
    /// names page 0.
    pub fn validate(&self) -> Result<(), PageByPageError> {
        match self {
            PageSelection::Only(pages) if pages.is_empty() => {
                Err(PageByPageError::EmptyPageSelection)
            }
            PageSelection::Only(pages) if pages.contains(&0) => {
                Err(PageByPageError::InvalidPageNumber { page: 0 })
            }
            _ => Ok(()),
        }
    }

    pub fn contains(&self, page: usize) -> bool {
        match self {
            PageSelection::All => true,
            PageSelection::Only(pages) => pages.contains(&page),
        }
    }
}
