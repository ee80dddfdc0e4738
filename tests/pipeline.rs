//! Integration tests for the page loop, using scripted fakes.
//!
//! The loader returns fixed pages and counts its calls; the streamer replays
//! one script of fragments per page and records every prompt it is given.
//! No PDF parsing or network access happens here.

use pagebypage::{
    CompletionError, CompletionStreamer, DocumentLoader, FragmentStream, Page, PageByPageError,
    PageObserver, PageResult, PageSelection, Pipeline, PersistingObserver, OutputSink, RunConfig,
    RunOutcome, RunReport,
};
use futures::stream;
use std::collections::{BTreeSet, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Fakes ────────────────────────────────────────────────────────────────────

struct FakeLoader {
    pages: Vec<Page>,
    calls: AtomicUsize,
}

impl FakeLoader {
    fn with_pages(texts: &[&str]) -> Arc<Self> {
        let pages = texts
            .iter()
            .enumerate()
            .map(|(i, t)| Page::new(i + 1, *t))
            .collect();
        Arc::new(Self {
            pages,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DocumentLoader for FakeLoader {
    fn load(&self, _path: &Path) -> Result<Vec<Page>, PageByPageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.pages.clone())
    }
}

type Script = Vec<Result<String, CompletionError>>;

#[derive(Default)]
struct ScriptedStreamer {
    scripts: Mutex<VecDeque<Script>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedStreamer {
    fn new(scripts: Vec<Script>) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts.into()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl CompletionStreamer for ScriptedStreamer {
    fn stream(&self, prompt: &str) -> FragmentStream {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .expect("streamer called more often than scripted");
        Box::pin(stream::iter(script))
    }
}

fn ok(fragments: &[&str]) -> Script {
    fragments.iter().map(|f| Ok(f.to_string())).collect()
}

#[derive(Default)]
struct Recorder {
    started: Vec<usize>,
    fragments: Vec<(usize, String)>,
    results: Vec<PageResult>,
    refused: Vec<usize>,
    completed: Option<RunReport>,
}

impl PageObserver for Recorder {
    fn on_page_start(&mut self, page_num: usize) {
        self.started.push(page_num);
    }

    fn on_fragment(&mut self, page_num: usize, fragment: &str) {
        self.fragments.push((page_num, fragment.to_string()));
    }

    fn on_page_result(&mut self, result: &PageResult) -> Result<(), PageByPageError> {
        self.results.push(result.clone());
        Ok(())
    }

    fn on_refusal(&mut self, page_num: usize, _response: &str) {
        self.refused.push(page_num);
    }

    fn on_run_complete(&mut self, report: &RunReport) {
        self.completed = Some(report.clone());
    }
}

fn viewing(prompt: &str) -> usize {
    let rest = prompt
        .split("You are viewing page ")
        .nth(1)
        .expect("prompt names a page");
    rest.split('.').next().unwrap().parse().unwrap()
}

// ── Selection ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn selection_processes_only_listed_pages_in_order() {
    let loader = FakeLoader::with_pages(&["p1", "p2", "p3", "p4", "p5"]);
    let streamer = ScriptedStreamer::new(vec![ok(&["two"]), ok(&["four"])]);
    let pipeline = Pipeline::new(loader.clone(), streamer.clone());

    let mut rec = Recorder::default();
    let report = pipeline
        .iterate(
            Path::new("doc.pdf"),
            "Summarise.",
            &PageSelection::only([4, 2]),
            &mut rec,
        )
        .await
        .unwrap();

    assert_eq!(rec.started, vec![2, 4]);
    let seen: Vec<usize> = streamer.prompts().iter().map(|p| viewing(p)).collect();
    assert_eq!(seen, vec![2, 4]);
    assert!(streamer.prompts()[0].contains("\n\np2\n"));
    assert_eq!(report.selected_pages, 2);
    assert_eq!(report.outcome, RunOutcome::Finished);
    assert_eq!(rec.completed.unwrap().pages.len(), 2);
}

#[tokio::test]
async fn selection_beyond_document_finishes_without_prompts() {
    let loader = FakeLoader::with_pages(&["p1", "p2"]);
    let streamer = ScriptedStreamer::new(vec![]);
    let pipeline = Pipeline::new(loader.clone(), streamer.clone());

    let report = pipeline
        .iterate(
            Path::new("doc.pdf"),
            "Summarise.",
            &PageSelection::only([9]),
            &mut Recorder::default(),
        )
        .await
        .unwrap();

    assert_eq!(report.outcome, RunOutcome::Finished);
    assert_eq!(report.selected_pages, 0);
    assert!(streamer.prompts().is_empty());
}

#[tokio::test]
async fn empty_selection_is_rejected_before_loading() {
    let loader = FakeLoader::with_pages(&["p1"]);
    let streamer = ScriptedStreamer::new(vec![]);
    let pipeline = Pipeline::new(loader.clone(), streamer.clone());

    let err = pipeline
        .iterate(
            Path::new("doc.pdf"),
            "Summarise.",
            &PageSelection::Only(BTreeSet::new()),
            &mut Recorder::default(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, PageByPageError::EmptyPageSelection));
    assert_eq!(loader.calls(), 0);
    assert!(streamer.prompts().is_empty());
}

#[tokio::test]
async fn page_zero_is_rejected_before_loading() {
    let loader = FakeLoader::with_pages(&["p1"]);
    let streamer = ScriptedStreamer::new(vec![]);
    let pipeline = Pipeline::new(loader.clone(), streamer.clone());

    let err = pipeline
        .iterate(
            Path::new("doc.pdf"),
            "Summarise.",
            &PageSelection::Only(BTreeSet::from([0, 1])),
            &mut Recorder::default(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, PageByPageError::InvalidPageNumber { page: 0 }));
    assert_eq!(loader.calls(), 0);
    assert!(streamer.prompts().is_empty());
}

// ── Refusal ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn refusal_stops_run_and_is_not_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.txt");

    let loader = FakeLoader::with_pages(&["p1", "p2", "p3"]);
    let streamer = ScriptedStreamer::new(vec![
        ok(&["Page one ", "summary"]),
        ok(&["I cannot ", "complete this task."]),
        ok(&["never requested"]),
    ]);
    let pipeline = Pipeline::new(loader.clone(), streamer.clone());

    let config = RunConfig::builder()
        .task("Summarise.")
        .output(&out)
        .build()
        .unwrap();
    let mut rec = Recorder::default();
    let report = pipeline
        .run(Path::new("doc.pdf"), &config, &mut rec)
        .await
        .unwrap();

    assert_eq!(report.outcome, RunOutcome::Stopped { page: 2 });
    assert_eq!(streamer.prompts().len(), 2, "page 3 must never be streamed");
    assert_eq!(rec.refused, vec![2]);
    assert_eq!(rec.results.len(), 1);
    assert_eq!(rec.results[0].response, "Page one summary");

    let written = std::fs::read_to_string(&out).unwrap();
    assert_eq!(
        written,
        "Page 1:\n\nPage one summary\n\n--------------------------------\n\n"
    );
    assert!(!written.contains("cannot"));
}

#[tokio::test]
async fn refusal_on_first_page_leaves_empty_output() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.txt");
    std::fs::write(&out, "previous run").unwrap();

    let loader = FakeLoader::with_pages(&["p1", "p2"]);
    let streamer = ScriptedStreamer::new(vec![ok(&["  i CANNOT complete this task!! \n"])]);
    let pipeline = Pipeline::new(loader, streamer.clone());

    let config = RunConfig::builder()
        .task("Do something dubious.")
        .output(&out)
        .build()
        .unwrap();
    let report = pipeline
        .run(Path::new("doc.pdf"), &config, &mut Recorder::default())
        .await
        .unwrap();

    assert_eq!(report.outcome, RunOutcome::Stopped { page: 1 });
    assert!(report.pages.is_empty());
    assert!(!out.exists(), "stale output must be removed, nothing appended");
}

#[tokio::test]
async fn sentinel_inside_longer_answer_is_accepted() {
    let loader = FakeLoader::with_pages(&["p1"]);
    let streamer = ScriptedStreamer::new(vec![ok(&[
        "I cannot complete this task. The page is blank.",
    ])]);
    let pipeline = Pipeline::new(loader, streamer);

    let report = pipeline
        .iterate(
            Path::new("doc.pdf"),
            "Summarise.",
            &PageSelection::All,
            &mut Recorder::default(),
        )
        .await
        .unwrap();

    assert_eq!(report.outcome, RunOutcome::Finished);
    assert_eq!(report.pages.len(), 1);
}

// ── Persistence ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn output_file_has_one_block_per_accepted_page() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.txt");

    let loader = FakeLoader::with_pages(&["first", "second", "third"]);
    let streamer = ScriptedStreamer::new(vec![ok(&["Hel", "lo"]), ok(&["World"])]);
    let pipeline = Pipeline::new(loader, streamer);

    let config = RunConfig::builder()
        .task("Echo.")
        .pages(PageSelection::only([1, 3]))
        .output(&out)
        .build()
        .unwrap();
    let report = pipeline
        .run(Path::new("doc.pdf"), &config, &mut Recorder::default())
        .await
        .unwrap();

    assert_eq!(report.outcome, RunOutcome::Finished);
    let expected = "Page 1:\n\nHello\n\n--------------------------------\n\n\
                    Page 3:\n\nWorld\n\n--------------------------------\n\n";
    assert_eq!(std::fs::read_to_string(&out).unwrap(), expected);
}

#[tokio::test]
async fn persisting_observer_works_with_iterate() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.txt");

    let loader = FakeLoader::with_pages(&["only"]);
    let streamer = ScriptedStreamer::new(vec![ok(&["answer"])]);
    let pipeline = Pipeline::new(loader, streamer);

    let mut rec = Recorder::default();
    let mut persisting = PersistingObserver::new(OutputSink::open(&out).unwrap(), &mut rec);
    pipeline
        .iterate(
            Path::new("doc.pdf"),
            "Echo.",
            &PageSelection::All,
            &mut persisting,
        )
        .await
        .unwrap();

    assert_eq!(rec.results.len(), 1);
    assert!(std::fs::read_to_string(&out)
        .unwrap()
        .starts_with("Page 1:\n\nanswer\n\n"));
}

#[tokio::test]
async fn output_directory_is_rejected_before_loading() {
    let dir = tempfile::tempdir().unwrap();

    let loader = FakeLoader::with_pages(&["p1"]);
    let streamer = ScriptedStreamer::new(vec![]);
    let pipeline = Pipeline::new(loader.clone(), streamer.clone());

    let config = RunConfig::builder()
        .task("Echo.")
        .output(dir.path())
        .build()
        .unwrap();
    let err = pipeline
        .run(Path::new("doc.pdf"), &config, &mut Recorder::default())
        .await
        .unwrap_err();

    assert!(matches!(err, PageByPageError::OutputIsDirectory { .. }));
    assert_eq!(loader.calls(), 0);
    assert!(dir.path().is_dir());
}

#[tokio::test]
async fn missing_document_leaves_existing_output_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.txt");
    std::fs::write(&out, "keep me").unwrap();

    struct Missing;
    impl DocumentLoader for Missing {
        fn load(&self, path: &Path) -> Result<Vec<Page>, PageByPageError> {
            Err(PageByPageError::DocumentNotFound {
                path: path.to_path_buf(),
            })
        }
    }

    let pipeline = Pipeline::new(Arc::new(Missing), ScriptedStreamer::new(vec![]));
    let config = RunConfig::builder()
        .task("Echo.")
        .output(&out)
        .build()
        .unwrap();
    let err = pipeline
        .run(Path::new("nope.pdf"), &config, &mut Recorder::default())
        .await
        .unwrap_err();

    assert!(matches!(err, PageByPageError::DocumentNotFound { .. }));
    assert_eq!(std::fs::read_to_string(&out).unwrap(), "keep me");
}

// ── Streaming ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn fragments_reach_observer_in_order() {
    let loader = FakeLoader::with_pages(&["p1", "p2"]);
    let streamer = ScriptedStreamer::new(vec![ok(&["a", "b", "c"]), ok(&["d"])]);
    let pipeline = Pipeline::new(loader, streamer);

    let mut rec = Recorder::default();
    let report = pipeline
        .iterate(Path::new("doc.pdf"), "Echo.", &PageSelection::All, &mut rec)
        .await
        .unwrap();

    let seen: Vec<(usize, &str)> = rec
        .fragments
        .iter()
        .map(|(p, f)| (*p, f.as_str()))
        .collect();
    assert_eq!(seen, vec![(1, "a"), (1, "b"), (1, "c"), (2, "d")]);
    assert_eq!(report.pages[0].response, "abc");
    assert_eq!(report.pages[0].fragments, 3);
}

#[tokio::test]
async fn streaming_error_aborts_run() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.txt");

    let loader = FakeLoader::with_pages(&["p1", "p2", "p3"]);
    let streamer = ScriptedStreamer::new(vec![
        ok(&["fine"]),
        vec![Ok("half".into()), Err(CompletionError::new("connection reset"))],
        ok(&["unreached"]),
    ]);
    let pipeline = Pipeline::new(loader, streamer.clone());

    let config = RunConfig::builder()
        .task("Echo.")
        .output(&out)
        .build()
        .unwrap();
    let mut rec = Recorder::default();
    let err = pipeline
        .run(Path::new("doc.pdf"), &config, &mut rec)
        .await
        .unwrap_err();

    match err {
        PageByPageError::CompletionFailed { page, detail } => {
            assert_eq!(page, 2);
            assert_eq!(detail, "connection reset");
        }
        other => panic!("expected CompletionFailed, got {other:?}"),
    }
    assert_eq!(streamer.prompts().len(), 2);
    assert!(rec.completed.is_none());
    assert_eq!(
        std::fs::read_to_string(&out).unwrap(),
        "Page 1:\n\nfine\n\n--------------------------------\n\n"
    );
}

#[tokio::test]
async fn prompt_carries_filename_and_task() {
    let loader = FakeLoader::with_pages(&["Quarterly revenue rose."]);
    let streamer = ScriptedStreamer::new(vec![ok(&["ok"])]);
    let pipeline = Pipeline::new(loader, streamer.clone());

    pipeline
        .iterate(
            Path::new("/data/reports/q3.pdf"),
            "List every number.",
            &PageSelection::All,
            &mut Recorder::default(),
        )
        .await
        .unwrap();

    let prompt = &streamer.prompts()[0];
    assert!(prompt.contains("Filename: q3.pdf\n"));
    assert!(prompt.contains("You are viewing page 1.\n\nQuarterly revenue rose.\n"));
    assert!(prompt.contains("please complete this task:\nList every number.\n"));
}
