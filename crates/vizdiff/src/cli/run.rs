//! The `vizdiff run` command: diff every captured page of a project run.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use clap::{Args, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};

use vizdiff_core::{
    AtomicSignals, BatchSummary, Config, DiffEngine, DirectoryStore, JobKey, JsonResultSink,
    OutputFormat, PageDiscovery, PageRecord, PageStatus, PageTask, PipelineResult, ProgressSink,
    ProgressStage, ProgressUpdate, ResultSink, Viewport,
};

/// Record formats written by `run`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum RecordFormat {
    /// A single JSON array
    Json,
    /// One JSON object per page (newline-delimited)
    Jsonl,
}

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Project identifier
    #[arg(long)]
    pub project: String,

    /// Run identifier
    #[arg(long)]
    pub run: String,

    /// Only diff these pages (repeatable)
    #[arg(long = "page")]
    pub pages: Vec<String>,

    /// Only diff at these viewports (repeatable)
    #[arg(long = "viewport")]
    pub viewports: Vec<Viewport>,

    /// Output file for page records (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Record format (defaults to `output.format` from config)
    #[arg(short, long, value_enum)]
    pub format: Option<RecordFormat>,

    /// Screenshot root, overriding `output.screenshot_dir`
    #[arg(long)]
    pub screenshots: Option<PathBuf>,

    /// Diff output root, overriding `output.diff_dir`
    #[arg(long)]
    pub diffs: Option<PathBuf>,
}

/// Execute the run command.
pub async fn execute(args: RunArgs, mut config: Config) -> anyhow::Result<()> {
    if let Some(dir) = &args.screenshots {
        config.output.screenshot_dir = dir.clone();
    }
    if let Some(dir) = &args.diffs {
        config.output.diff_dir = dir.clone();
    }
    let format = resolve_format(args.format, &config.output.format);
    let engine = DiffEngine::new(config)?;
    let job = JobKey::new(&args.project, &args.run);

    let store = Arc::new(DirectoryStore::from_config(engine.config()));
    let screenshot_dir = store.screenshot_root();
    let discovered = PageDiscovery::new(screenshot_dir).discover(&job);
    for page in &args.pages {
        if !discovered.iter().any(|t| &t.page == page) {
            tracing::warn!("Page {:?} has no staging capture, skipping", page);
        }
    }
    let pages = select_pages(discovered, &args.pages, &args.viewports);
    if pages.is_empty() {
        anyhow::bail!(
            "No pages to diff for {} under {}",
            job,
            screenshot_dir.display()
        );
    }

    let signals = Arc::new(AtomicSignals::new());
    let interrupt = {
        let signals = Arc::clone(&signals);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, stopping before the next chunk");
                signals.request_stop();
            }
        })
    };

    let writer: Box<dyn Write + Send> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout()),
    };
    let sink = Arc::new(RunSink::new(JsonResultSink::new(writer, format)));
    let progress = Arc::new(BarProgress::new(pages.len() as u64));
    tracing::debug!("Writing diffs under {:?}", store.diff_root());

    let start = std::time::Instant::now();
    let summary = engine
        .runner(store.clone())
        .with_signals(signals)
        .with_progress(progress.clone())
        .with_results(sink.clone())
        .run(&job, pages)
        .await;
    interrupt.abort();
    progress.finish();

    let sink = Arc::try_unwrap(sink)
        .map_err(|_| anyhow::anyhow!("result sink still referenced after the run"))?;
    let changed = sink.changed();
    sink.finish()?;
    if let Some(path) = &args.output {
        tracing::info!("Records written to {:?}", path);
    }

    print_summary(&summary, changed, start.elapsed());

    if summary.stopped {
        anyhow::bail!("Run stopped with {} pages untouched", summary.untouched);
    }
    if summary.failed > 0 {
        anyhow::bail!("{} of {} pages failed", summary.failed, summary.processed());
    }
    Ok(())
}

fn resolve_format(requested: Option<RecordFormat>, configured: &str) -> OutputFormat {
    match requested {
        Some(RecordFormat::Json) => OutputFormat::Json,
        Some(RecordFormat::Jsonl) => OutputFormat::JsonLines,
        None => OutputFormat::parse(configured).unwrap_or(OutputFormat::JsonLines),
    }
}

/// Apply the `--page` and `--viewport` filters. Empty filters keep everything.
fn select_pages(
    discovered: Vec<PageTask>,
    pages: &[String],
    viewports: &[Viewport],
) -> Vec<PageTask> {
    discovered
        .into_iter()
        .filter(|task| pages.is_empty() || pages.contains(&task.page))
        .filter_map(|mut task| {
            if !viewports.is_empty() {
                task.viewports.retain(|vp| viewports.contains(vp));
                if task.viewports.is_empty() {
                    return None;
                }
            }
            Some(task)
        })
        .collect()
}

/// Forwards page records to the JSON writer and counts pages with changes.
struct RunSink {
    inner: JsonResultSink<Box<dyn Write + Send>>,
    changed: AtomicUsize,
}

impl RunSink {
    fn new(inner: JsonResultSink<Box<dyn Write + Send>>) -> Self {
        Self {
            inner,
            changed: AtomicUsize::new(0),
        }
    }

    fn changed(&self) -> usize {
        self.changed.load(Ordering::SeqCst)
    }

    fn finish(self) -> io::Result<Box<dyn Write + Send>> {
        self.inner.finish()
    }
}

impl ResultSink for RunSink {
    fn record_page(&self, job: &JobKey, record: &PageRecord) -> PipelineResult<()> {
        self.inner.record_page(job, record)?;
        if record.has_changes() {
            self.changed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Terminal progress bar fed by the batch driver.
struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new(total: u64) -> Self {
        let bar = ProgressBar::new(total);
        let style = ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-");
        bar.set_style(style);
        bar.set_message("starting...");
        Self { bar }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressSink for BarProgress {
    fn report(&self, _job: &JobKey, update: ProgressUpdate) {
        match update.stage {
            ProgressStage::Paused => self.bar.set_message("paused"),
            ProgressStage::Stopped => self.bar.set_message("stopped"),
            ProgressStage::Processing | ProgressStage::Completed => {}
        }
    }

    fn page_status(&self, _job: &JobKey, page: &str, status: PageStatus) {
        match status {
            PageStatus::Running => self.bar.set_message(page.to_string()),
            PageStatus::Completed | PageStatus::Failed => self.bar.inc(1),
        }
    }
}

/// Print a formatted summary table after the run.
fn print_summary(summary: &BatchSummary, changed: usize, elapsed: std::time::Duration) {
    let total = summary.processed() + summary.untouched;
    let rate = if elapsed.as_secs_f64() > 0.0 {
        summary.processed() as f64 / elapsed.as_secs_f64()
    } else {
        0.0
    };

    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Succeeded:    {:>8}", summary.succeeded);
    eprintln!("    Changed:      {:>8}", changed);
    if summary.failed > 0 {
        eprintln!("    Failed:       {:>8}", summary.failed);
    }
    if summary.untouched > 0 {
        eprintln!("    Untouched:    {:>8}", summary.untouched);
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Total:        {:>8}", total);
    eprintln!("    Duration:     {:>7.1}s", elapsed.as_secs_f64());
    eprintln!("    Rate:         {:>7.1} pages/sec", rate);
    eprintln!("  ====================================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};
    use std::path::Path;

    fn task(page: &str, viewports: &[Viewport]) -> PageTask {
        PageTask::new(page, viewports.to_vec())
    }

    fn capture(root: &Path, env: &str, viewport: &str, page: &str, color: [u8; 3]) {
        let dir = root.join("shop/r1").join(env).join(viewport);
        std::fs::create_dir_all(&dir).unwrap();
        DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 24, Rgb(color)))
            .save(dir.join(format!("{page}.png")))
            .unwrap();
    }

    fn args(root: &Path) -> RunArgs {
        RunArgs {
            project: "shop".to_string(),
            run: "r1".to_string(),
            pages: Vec::new(),
            viewports: Vec::new(),
            output: Some(root.join("records.jsonl")),
            format: Some(RecordFormat::Jsonl),
            screenshots: Some(root.join("shots")),
            diffs: Some(root.join("diffs")),
        }
    }

    #[test]
    fn test_select_pages_filters() {
        let discovered = vec![
            task("cart", &[Viewport::Desktop]),
            task("home", &[Viewport::Desktop, Viewport::Mobile]),
        ];

        let all = select_pages(discovered.clone(), &[], &[]);
        assert_eq!(all, discovered);

        let home = select_pages(discovered.clone(), &["home".to_string()], &[]);
        assert_eq!(home, vec![discovered[1].clone()]);

        let mobile = select_pages(discovered, &[], &[Viewport::Mobile]);
        assert_eq!(mobile, vec![task("home", &[Viewport::Mobile])]);
    }

    #[test]
    fn test_run_sink_counts_changed_pages() {
        use std::collections::BTreeMap;
        use vizdiff_core::{DiffStatus, ViewportRecord};

        let page = |name: &str, status: DiffStatus| {
            let record = ViewportRecord {
                status,
                metrics: None,
                highlighted_path: None,
                raw_path: None,
                overlay_path: None,
                error: None,
            };
            PageRecord::from_viewports(name, BTreeMap::from([(Viewport::Desktop, record)]))
        };
        let writer: Box<dyn Write + Send> = Box::new(Vec::new());
        let sink = RunSink::new(JsonResultSink::new(writer, OutputFormat::JsonLines));
        let job = JobKey::new("shop", "r1");

        sink.record_page(&job, &page("home", DiffStatus::Changed)).unwrap();
        sink.record_page(&job, &page("cart", DiffStatus::NoChanges)).unwrap();
        sink.record_page(&job, &page("faq", DiffStatus::Failed)).unwrap();

        assert_eq!(sink.changed(), 1);
        sink.finish().unwrap();
    }

    #[test]
    fn test_resolve_format() {
        assert_eq!(
            resolve_format(Some(RecordFormat::Json), "jsonl"),
            OutputFormat::Json
        );
        assert_eq!(resolve_format(None, "json"), OutputFormat::Json);
        assert_eq!(resolve_format(None, "bogus"), OutputFormat::JsonLines);
    }

    #[tokio::test]
    async fn test_run_writes_records() {
        let dir = tempfile::tempdir().unwrap();
        let shots = dir.path().join("shots");
        capture(&shots, "staging", "desktop", "home", [255, 255, 255]);
        capture(&shots, "production", "desktop", "home", [255, 255, 255]);
        capture(&shots, "staging", "mobile", "home", [0, 0, 0]);
        capture(&shots, "production", "mobile", "home", [255, 255, 255]);

        execute(args(dir.path()), Config::default()).await.unwrap();

        let output = std::fs::read_to_string(dir.path().join("records.jsonl")).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 1);
        let record: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(record["page"], "home");
        assert_eq!(record["status"], "completed");
        assert_eq!(record["viewports"]["desktop"]["status"], "no_changes");
        assert_eq!(record["viewports"]["mobile"]["status"], "changed");
        assert!(dir
            .path()
            .join("diffs/shop/r1/mobile/home_diff.png")
            .is_file());
        assert!(!dir.path().join("diffs/shop/r1/desktop").exists());
    }

    #[tokio::test]
    async fn test_run_fails_when_a_page_fails() {
        let dir = tempfile::tempdir().unwrap();
        let shots = dir.path().join("shots");
        capture(&shots, "staging", "desktop", "home", [255, 255, 255]);

        let err = execute(args(dir.path()), Config::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("1 of 1 pages failed"));

        let output = std::fs::read_to_string(dir.path().join("records.jsonl")).unwrap();
        assert!(output.contains("File not found"));
    }

    #[tokio::test]
    async fn test_run_without_pages_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = execute(args(dir.path()), Config::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("No pages"));
    }
}
