//! CLI binary for pagebypage.
//!
//! A thin shim over the library crate that maps CLI flags to `RunConfig`,
//! echoes each page's response as it streams, and prints a summary.

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use indicatif::{ProgressBar, ProgressStyle};
use pagebypage::{
    process, PageByPageError, PageObserver, PageResult, PageSelection, RunConfig, RunOutcome,
    RunReport,
};
use std::collections::BTreeSet;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── Terminal observer ────────────────────────────────────────────────────────

/// Prints every page as it streams: a `Page N:` heading, then the fragments
/// verbatim on stdout. A spinner on stderr covers the wait for the first
/// fragment of each page.
struct CliObserver {
    /// Echo headings and fragments to stdout.
    live: bool,
    /// Suppress the spinner and the closing summary.
    quiet: bool,
    /// Active while waiting for the first fragment of a page.
    spinner: Option<ProgressBar>,
}

impl CliObserver {
    fn new(live: bool, quiet: bool) -> Self {
        Self {
            live,
            quiet,
            spinner: None,
        }
    }

    fn start_spinner(&mut self, page_num: usize) {
        if self.quiet {
            return;
        }
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_message(format!("waiting for page {page_num}…"));
        bar.enable_steady_tick(Duration::from_millis(80));
        self.spinner = Some(bar);
    }

    fn stop_spinner(&mut self) {
        if let Some(bar) = self.spinner.take() {
            bar.finish_and_clear();
        }
    }
}

impl PageObserver for CliObserver {
    fn on_page_start(&mut self, page_num: usize) {
        if self.live {
            println!("{}\n", bold(&format!("Page {page_num}:")));
        }
        self.start_spinner(page_num);
    }

    fn on_fragment(&mut self, _page_num: usize, fragment: &str) {
        self.stop_spinner();
        if self.live {
            let mut stdout = io::stdout().lock();
            // A closed stdout should not abort the run; the file still gets written.
            let _ = stdout.write_all(fragment.as_bytes());
            let _ = stdout.flush();
        }
    }

    fn on_page_result(&mut self, _result: &PageResult) -> Result<(), PageByPageError> {
        self.stop_spinner();
        if self.live {
            println!("\n");
        }
        Ok(())
    }

    fn on_refusal(&mut self, page_num: usize, _response: &str) {
        self.stop_spinner();
        if self.live {
            println!();
        }
        eprintln!(
            "{} The model declined the task on page {page_num}.",
            yellow("⚠")
        );
        eprintln!("Please try a different prompt.");
    }

    fn on_run_complete(&mut self, report: &RunReport) {
        self.stop_spinner();
        if self.quiet {
            return;
        }
        let mark = match report.outcome {
            RunOutcome::Finished => green("✔"),
            RunOutcome::Stopped { .. } => yellow("⚠"),
        };
        eprintln!(
            "{}  {}/{} pages  {}",
            mark,
            report.pages.len(),
            report.selected_pages,
            dim(&format!("{}ms", report.total_duration_ms)),
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Summarise every page with the local default model
  pagebypage report.pdf "Summarise this page in one sentence."

  # Only some pages, saved to a file
  pagebypage --pages 1-3,5 -o dates.txt report.pdf "List every date on this page."

  # Use a hosted provider
  pagebypage --provider openai --model gpt-4.1-nano report.pdf "Translate to French."

  # Machine-readable run report
  pagebypage --json report.pdf "Extract all email addresses." > run.json

OUTPUT FILE FORMAT:
  Page 1:

  <response>

  --------------------------------

  The file is recreated on every run. A page the model refuses is not
  written, and no later page is processed.

ENVIRONMENT VARIABLES:
  PAGEBYPAGE_PROVIDER     Provider name (ollama, openai, anthropic, gemini, …)
  PAGEBYPAGE_MODEL        Model ID for that provider
  RUST_LOG                Overrides the log filter (logs go to stderr)
"#;

/// Run a task over a PDF, one page at a time.
#[derive(Parser, Debug)]
#[command(
    name = "pagebypage",
    version,
    about = "Run a task over a PDF, one page at a time",
    long_about = "Extract the text of each PDF page, ask an LLM to complete your task on it, \
and stream the answers to the terminal and an optional output file. The model may decline \
a task; the run then stops at that page.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF document to process.
    document: PathBuf,

    /// Task to perform on every page.
    prompt: String,

    /// Page selection: all, or a list such as 1-3,5,7-10.
    #[arg(long, env = "PAGEBYPAGE_PAGES", default_value = "all")]
    pages: String,

    /// Append each accepted page to this file (recreated per run).
    #[arg(short, long, env = "PAGEBYPAGE_OUTPUT")]
    output: Option<PathBuf>,

    /// Overwrite an existing output file without asking.
    #[arg(short, long)]
    yes: bool,

    /// LLM provider: ollama, openai, anthropic, gemini, …
    #[arg(long, env = "PAGEBYPAGE_PROVIDER")]
    provider: Option<String>,

    /// LLM model ID (e.g. llama3.2, gpt-4.1-nano).
    #[arg(long, env = "PAGEBYPAGE_MODEL")]
    model: Option<String>,

    /// Print the run report as JSON instead of streaming responses.
    #[arg(long)]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PAGEBYPAGE_VERBOSE")]
    verbose: bool,

    /// Suppress everything except responses and errors.
    #[arg(short, long, env = "PAGEBYPAGE_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // stdout is reserved for model output, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_log_filter(cli.verbose, cli.quiet))),
        )
        .with_writer(io::stderr)
        .init();

    // ── Usage checks ─────────────────────────────────────────────────────
    if !cli.document.is_file() {
        usage_error(
            ErrorKind::InvalidValue,
            format!("document '{}' does not exist", cli.document.display()),
        );
    }

    let pages = match parse_pages(&cli.pages) {
        Ok(pages) => pages,
        Err(e) => usage_error(ErrorKind::InvalidValue, format!("--pages: {e:#}")),
    };

    if let Some(ref output) = cli.output {
        if output.is_dir() {
            usage_error(
                ErrorKind::InvalidValue,
                format!("The output path '{}' is a directory.", output.display()),
            );
        }
        if output.exists() && !cli.yes {
            let confirmed = confirm_overwrite(output, &mut io::stdin().lock(), &mut io::stderr())
                .context("Failed to ask for overwrite confirmation")?;
            if !confirmed {
                eprintln!("Aborted. The existing file was left untouched.");
                std::process::exit(1);
            }
        }
    }

    // ── Build config ─────────────────────────────────────────────────────
    let config = build_config(&cli, pages)?;

    // ── Run ──────────────────────────────────────────────────────────────
    let mut observer = CliObserver::new(!cli.json, cli.quiet || cli.json);
    let report = process(&cli.document, &config, &mut observer)
        .await
        .with_context(|| format!("Failed to process {}", cli.document.display()))?;

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else if !cli.quiet {
        if let Some(ref output) = cli.output {
            eprintln!("   saved to {}", bold(&output.display().to_string()));
        }
    }

    Ok(())
}

/// Print a clap-formatted usage error and exit with status 2.
fn usage_error(kind: ErrorKind, message: String) -> ! {
    Cli::command().error(kind, message).exit()
}

/// Default log filter when `RUST_LOG` is unset.
///
/// lopdf warns about every standard font without an explicit encoding, so it
/// stays at `error` unless `-v` is given.
fn default_log_filter(verbose: bool, quiet: bool) -> &'static str {
    if verbose {
        "pagebypage=debug,lopdf=warn,warn"
    } else if quiet {
        "error"
    } else {
        "pagebypage=warn,lopdf=error,warn"
    }
}

/// Ask before clobbering an existing output file.
///
/// An empty line means yes. Unrecognised answers repeat the question, and
/// end of input counts as no, so a closed stdin never deletes anything.
fn confirm_overwrite<R: BufRead, W: Write>(
    path: &Path,
    input: &mut R,
    prompt: &mut W,
) -> Result<bool> {
    loop {
        write!(
            prompt,
            "The file '{}' already exists. Overwrite? [Y/n] ",
            path.display()
        )?;
        prompt.flush()?;

        let mut answer = String::new();
        let read = input
            .read_line(&mut answer)
            .context("Failed to read confirmation from stdin")?;
        if read == 0 {
            writeln!(prompt)?;
            writeln!(prompt, "No answer on stdin; pass --yes to overwrite non-interactively.")?;
            return Ok(false);
        }

        match parse_answer(&answer) {
            Some(yes) => return Ok(yes),
            None => writeln!(prompt, "Please answer y or n.")?,
        }
    }
}

fn parse_answer(answer: &str) -> Option<bool> {
    match answer.trim().to_lowercase().as_str() {
        "" | "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

/// Map CLI args to `RunConfig`.
fn build_config(cli: &Cli, pages: PageSelection) -> Result<RunConfig> {
    let mut builder = RunConfig::builder().task(cli.prompt.as_str()).pages(pages);

    if let Some(ref output) = cli.output {
        builder = builder.output(output);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }

    builder.build().context("Invalid configuration")
}

/// Widest range a single `A-B` part of `--pages` may span.
const MAX_RANGE_PAGES: usize = 100_000;

/// Parse `--pages` into a `PageSelection`.
///
/// Accepts `all`, or comma-separated parts that are each a page `N` or an
/// inclusive range `A-B`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    let mut pages = BTreeSet::new();
    for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        if let Some((start, end)) = part.split_once('-') {
            let start = parse_page_number(start)?;
            let end = parse_page_number(end)?;
            if start > end {
                anyhow::bail!(
                    "Invalid page range '{}-{}': start must be <= end",
                    start,
                    end
                );
            }
            if end - start >= MAX_RANGE_PAGES {
                anyhow::bail!(
                    "Page range '{}-{}' spans more than {} pages",
                    start,
                    end,
                    MAX_RANGE_PAGES
                );
            }
            pages.extend(start..=end);
        } else {
            pages.insert(parse_page_number(part)?);
        }
    }

    if pages.is_empty() {
        anyhow::bail!("No pages selected");
    }

    Ok(PageSelection::Only(pages))
}

fn parse_page_number(s: &str) -> Result<usize> {
    let page: usize = s
        .trim()
        .parse()
        .with_context(|| format!("Invalid page number: '{}'", s.trim()))?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }
    Ok(page)
}
