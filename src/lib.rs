//! # pagebypage
//!
//! Run one natural-language task over a PDF, one page at a time.
//!
//! ## Why this crate?
//!
//! Long documents do not fit a model's context window, and many tasks
//! ("list every date", "translate", "extract the table") are naturally
//! per-page anyway. This crate extracts the text of each page, wraps it in a
//! fixed instruction template together with the user's task, streams the
//! model's answer back, and appends it to a plain-text file. The template
//! tells the model to answer `I cannot complete this task.` when it cannot
//! or should not comply; that answer stops the run.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Load     extract page text via lopdf (CPU-bound, spawn_blocking)
//!  ├─ 2. Select   keep only the requested page numbers
//!  ├─ 3. Prompt   fill the page template with filename, page, text, task
//!  ├─ 4. Stream   fragments from the LLM, forwarded live to the observer
//!  ├─ 5. Classify refusal sentinel → stop; anything else → accept
//!  └─ 6. Persist  append "Page N:" record to the output file
//! ```
//!
//! Pages run strictly in order and never concurrently: a refusal on page N
//! must prevent any request for page N+1.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pagebypage::{process, NoopObserver, RunConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Defaults to a local ollama model unless PAGEBYPAGE_PROVIDER/MODEL are set
//!     let config = RunConfig::builder()
//!         .task("Summarise this page in one sentence.")
//!         .output("summary.txt")
//!         .build()?;
//!     let report = process("document.pdf", &config, &mut NoopObserver).await?;
//!     eprintln!("{} pages accepted, outcome {:?}", report.pages.len(), report.outcome);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pagebypage` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pagebypage = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod iterate;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod refusal;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PageSelection, RunConfig, RunConfigBuilder};
pub use error::{CompletionError, PageByPageError};
pub use iterate::{process, process_sync, PageOutcome, Pipeline, StopReason};
pub use output::{PageResult, RunOutcome, RunReport};
pub use pipeline::llm::{CompletionStreamer, FragmentStream, LlmStreamer};
pub use pipeline::load::{DocumentLoader, Page, PdfLoader};
pub use pipeline::sink::{OutputSink, PersistingObserver};
pub use progress::{NoopObserver, PageObserver};
pub use refusal::is_refusal;
