//! The page loop: load, prompt, stream, classify, report.
//!
//! [`Pipeline`] owns the two external collaborators (document loader and
//! completion streamer) and runs pages strictly one after another in
//! document order. Each page ends in a [`PageOutcome`]: either a result to
//! hand to the observer and continue, or a reason to stop. A refusal stops
//! the run after the current page; later pages are never prompted.
//!
//! [`process`] is the batteries-included entry point: it builds a pipeline
//! from a [`RunConfig`], writes accepted pages to the configured output file
//! and forwards all events to the caller's observer.

use crate::config::{PageSelection, RunConfig};
use crate::error::PageByPageError;
use crate::output::{PageResult, RunOutcome, RunReport};
use crate::pipeline::llm::{self, CompletionStreamer, LlmStreamer};
use crate::pipeline::load::{self, DocumentLoader, Page, PdfLoader};
use crate::pipeline::sink::{self, OutputSink, PersistingObserver};
use crate::progress::PageObserver;
use crate::prompts::PromptContext;
use crate::refusal::is_refusal;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// What the loop does after a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// The response was accepted; keep going.
    Continue(PageResult),
    /// End the run here.
    Stop(StopReason),
}

/// Why a run stopped early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The model answered with the refusal sentinel.
    Refused { page: usize, response: String },
}

/// A document loader and a completion streamer wired together.
#[derive(Clone)]
pub struct Pipeline {
    loader: Arc<dyn DocumentLoader>,
    streamer: Arc<dyn CompletionStreamer>,
}

impl Pipeline {
    pub fn new(loader: Arc<dyn DocumentLoader>, streamer: Arc<dyn CompletionStreamer>) -> Self {
        Self { loader, streamer }
    }

    /// Validate `selection`, load the document and keep the selected pages.
    ///
    /// An empty selection is rejected before the loader is called.
    pub async fn load(
        &self,
        document: &Path,
        selection: &PageSelection,
    ) -> Result<Vec<Page>, PageByPageError> {
        selection.validate()?;

        let pages = load::load_pages(Arc::clone(&self.loader), document).await?;
        let total = pages.len();
        let selected = load::select_pages(pages, selection);
        debug!("Selected {} of {} pages", selected.len(), total);

        if selected.is_empty() {
            warn!("No page of {} matches the selection", document.display());
        }
        Ok(selected)
    }

    /// Process the selected pages of `document` with `task`.
    ///
    /// Persistence is the observer's business; see [`PersistingObserver`].
    pub async fn iterate(
        &self,
        document: &Path,
        task: &str,
        selection: &PageSelection,
        observer: &mut dyn PageObserver,
    ) -> Result<RunReport, PageByPageError> {
        let start = Instant::now();
        let pages = self.load(document, selection).await?;
        self.run_pages(&load::document_name(document), &pages, task, observer, start)
            .await
    }

    /// Like [`Pipeline::iterate`], but also writes every accepted page to
    /// `config.output`.
    ///
    /// The output file is only removed once the selection, output path and
    /// document have all been validated.
    pub async fn run(
        &self,
        document: &Path,
        config: &RunConfig,
        observer: &mut dyn PageObserver,
    ) -> Result<RunReport, PageByPageError> {
        let start = Instant::now();
        config.pages.validate()?;
        if let Some(ref output) = config.output {
            sink::check_output_path(output)?;
        }

        let pages = self.load(document, &config.pages).await?;
        let sink = OutputSink::open_optional(config.output.as_deref())?;

        let mut persisting = PersistingObserver::new(sink, observer);
        self.run_pages(
            &load::document_name(document),
            &pages,
            &config.task,
            &mut persisting,
            start,
        )
        .await
    }

    /// Prompt, stream and classify a single page.
    ///
    /// Fragments are forwarded to `observer` as they arrive. The observer is
    /// not told about the outcome; that is the caller's job.
    pub async fn process_page(
        &self,
        filename: &str,
        page: &Page,
        task: &str,
        observer: &mut dyn PageObserver,
    ) -> Result<PageOutcome, PageByPageError> {
        let start = Instant::now();
        observer.on_page_start(page.number);

        let prompt = PromptContext {
            filename,
            page: page.number,
            content: &page.text,
            task,
        }
        .render();

        let fragments = self.streamer.stream(&prompt);
        let (response, count) = llm::accumulate(fragments, |fragment| {
            observer.on_fragment(page.number, fragment)
        })
        .await
        .map_err(|e| e.on_page(page.number))?;

        debug!(
            "Page {}: {} fragments, {} bytes, {:?}",
            page.number,
            count,
            response.len(),
            start.elapsed()
        );

        if is_refusal(&response) {
            return Ok(PageOutcome::Stop(StopReason::Refused {
                page: page.number,
                response,
            }));
        }

        Ok(PageOutcome::Continue(PageResult {
            page_num: page.number,
            response,
            fragments: count,
            duration_ms: start.elapsed().as_millis() as u64,
        }))
    }

    async fn run_pages(
        &self,
        filename: &str,
        pages: &[Page],
        task: &str,
        observer: &mut dyn PageObserver,
        start: Instant,
    ) -> Result<RunReport, PageByPageError> {
        info!("Processing {} pages of {}", pages.len(), filename);
        observer.on_run_start(pages.len());

        let mut accepted = Vec::with_capacity(pages.len());
        let mut outcome = RunOutcome::Finished;

        for page in pages {
            match self.process_page(filename, page, task, observer).await? {
                PageOutcome::Continue(result) => {
                    observer.on_page_result(&result)?;
                    accepted.push(result);
                }
                PageOutcome::Stop(StopReason::Refused { page, response }) => {
                    warn!("Page {}: model refused the task, stopping", page);
                    observer.on_refusal(page, &response);
                    outcome = RunOutcome::Stopped { page };
                    break;
                }
            }
        }

        let report = RunReport {
            document: filename.to_string(),
            selected_pages: pages.len(),
            pages: accepted,
            outcome,
            total_duration_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            "Run {:?}: {}/{} pages accepted in {}ms",
            report.outcome,
            report.pages.len(),
            report.selected_pages,
            report.total_duration_ms
        );
        observer.on_run_complete(&report);
        Ok(report)
    }
}

/// Process a PDF page by page with the provider settings in `config`.
///
/// This is the primary entry point for the library. Accepted pages are
/// appended to `config.output` when set; every event is also forwarded to
/// `observer`.
///
/// # Errors
/// Validation errors (`EmptyPageSelection`, `OutputIsDirectory`,
/// `DocumentNotFound`, …) are returned before any model call and before the
/// output file is touched. Streaming and write failures abort the run.
/// A refusal is not an error: check `report.outcome`.
pub async fn process(
    document: impl AsRef<Path>,
    config: &RunConfig,
    observer: &mut dyn PageObserver,
) -> Result<RunReport, PageByPageError> {
    let document = document.as_ref();
    info!("Starting run: {}", document.display());

    let streamer = LlmStreamer::from_config(config)?;
    let pipeline = Pipeline::new(Arc::new(PdfLoader), Arc::new(streamer));
    pipeline.run(document, config, observer).await
}

/// Synchronous wrapper around [`process`].
///
/// Creates a temporary tokio runtime internally.
pub fn process_sync(
    document: impl AsRef<Path>,
    config: &RunConfig,
    observer: &mut dyn PageObserver,
) -> Result<RunReport, PageByPageError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PageByPageError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(process(document, config, observer))
}
