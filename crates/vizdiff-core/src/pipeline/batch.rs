//! Chunked batch driver with cooperative stop and pause.
//!
//! Pages run one at a time on the blocking pool. Stop and pause are polled
//! before every chunk, so an in-flight page always finishes before a stop
//! takes effect. Nothing that goes wrong with a single page (missing file,
//! corrupt capture, store failure, panic) ends the run.

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use image::DynamicImage;

use crate::collab::{
    NoProgress, NoSignals, ProgressSink, ProgressStage, ProgressUpdate, ResultSink, SignalSource,
};
use crate::config::{BatchConfig, Config};
use crate::error::{PipelineError, PipelineResult};
use crate::store::ImageStore;
use crate::types::{
    BatchSummary, DiffStatus, Environment, JobKey, PageRecord, PageStatus, PageTask, Viewport,
    ViewportRecord,
};

use super::processor::DiffProcessor;

/// Drives a list of pages through the processor and its collaborators.
pub struct BatchRunner {
    processor: Arc<DiffProcessor>,
    store: Arc<dyn ImageStore>,
    signals: Arc<dyn SignalSource>,
    progress: Arc<dyn ProgressSink>,
    results: Option<Arc<dyn ResultSink>>,
    batch: BatchConfig,
    write_unchanged: bool,
}

impl BatchRunner {
    /// Runner with no signals, no progress reporting and no result sink.
    pub fn new(processor: Arc<DiffProcessor>, store: Arc<dyn ImageStore>, config: &Config) -> Self {
        Self {
            processor,
            store,
            signals: Arc::new(NoSignals),
            progress: Arc::new(NoProgress),
            results: None,
            batch: config.batch.clone(),
            write_unchanged: config.output.write_unchanged,
        }
    }

    pub fn with_signals(mut self, signals: Arc<dyn SignalSource>) -> Self {
        self.signals = signals;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_results(mut self, results: Arc<dyn ResultSink>) -> Self {
        self.results = Some(results);
        self
    }

    /// Process `pages` in chunks of `batch.batch_size`.
    ///
    /// Returns once every page is done or a stop signal was seen. Pages that
    /// were never started are counted as untouched.
    pub async fn run(&self, job: &JobKey, pages: Vec<PageTask>) -> BatchSummary {
        let total = pages.len();
        let start = std::time::Instant::now();
        let mut summary = BatchSummary::default();

        tracing::info!(
            "Starting diff of {} pages for {} (batch size {})",
            total,
            job,
            self.batch.batch_size
        );
        self.progress.report(
            job,
            ProgressUpdate::new(
                ProgressStage::Processing,
                0,
                format!("Diffing {total} pages"),
            ),
        );

        for (index, chunk) in pages.chunks(self.batch.batch_size.max(1)).enumerate() {
            if self.signals.should_stop(job)
                || !self.wait_while_paused(job, percent(summary.processed(), total)).await
            {
                tracing::warn!("Stop requested for {}, halting before chunk {}", job, index + 1);
                summary.stopped = true;
                break;
            }
            tracing::debug!("Chunk {}: {} pages", index + 1, chunk.len());

            for task in chunk {
                self.progress
                    .page_status(job, &task.page, PageStatus::Running);

                let mut record = self.run_page(job, task.clone()).await;
                if let Some(results) = &self.results {
                    if let Err(e) = results.record_page(job, &record) {
                        tracing::error!("Failed to record {} for {}: {}", task.page, job, e);
                        record.status = PageStatus::Failed;
                    }
                }

                match record.status {
                    PageStatus::Completed => summary.succeeded += 1,
                    _ => summary.failed += 1,
                }
                self.progress.page_status(job, &task.page, record.status);

                let done = summary.processed();
                self.progress.report(
                    job,
                    ProgressUpdate::new(
                        ProgressStage::Processing,
                        percent(done, total),
                        format!("{done}/{total} pages"),
                    ),
                );
            }
        }

        summary.untouched = total - summary.processed();

        let stage = if summary.stopped {
            ProgressStage::Stopped
        } else {
            ProgressStage::Completed
        };
        self.progress.report(
            job,
            ProgressUpdate::new(
                stage,
                percent(summary.processed(), total),
                format!(
                    "{} succeeded, {} failed, {} untouched",
                    summary.succeeded, summary.failed, summary.untouched
                ),
            ),
        );
        tracing::info!(
            "Finished {}: {} succeeded, {} failed, {} untouched in {:?}",
            job,
            summary.succeeded,
            summary.failed,
            summary.untouched,
            start.elapsed()
        );

        summary
    }

    /// Sleep while paused. Returns false if a stop arrived during the pause.
    async fn wait_while_paused(&self, job: &JobKey, done_percent: u8) -> bool {
        if !self.signals.should_pause(job) {
            return true;
        }

        tracing::warn!("Job {} paused", job);
        self.progress.report(
            job,
            ProgressUpdate::new(ProgressStage::Paused, done_percent, "Paused"),
        );

        let interval = Duration::from_millis(self.batch.pause_poll_ms);
        while self.signals.should_pause(job) {
            if self.signals.should_stop(job) {
                return false;
            }
            tokio::time::sleep(interval).await;
        }
        if self.signals.should_stop(job) {
            return false;
        }

        tracing::info!("Job {} resumed", job);
        true
    }

    /// Run one page on the blocking pool, turning a panic into a failed page.
    async fn run_page(&self, job: &JobKey, task: PageTask) -> PageRecord {
        let worker = PageWorker {
            processor: Arc::clone(&self.processor),
            store: Arc::clone(&self.store),
            job: job.clone(),
            write_unchanged: self.write_unchanged,
        };
        let page = task.page.clone();
        let viewports = requested_viewports(&task);

        match tokio::task::spawn_blocking(move || worker.diff_page(&task)).await {
            Ok(record) => record,
            Err(e) => {
                let err = PipelineError::Panicked {
                    message: if e.is_panic() {
                        panic_message(e.into_panic())
                    } else {
                        e.to_string()
                    },
                };
                tracing::error!("Failed: {}/{} - {}", job, page, err);
                let records = viewports
                    .into_iter()
                    .map(|vp| (vp, ViewportRecord::failed(err.to_string())))
                    .collect();
                PageRecord::from_viewports(page, records)
            }
        }
    }
}

/// The part of the runner moved onto the blocking pool.
struct PageWorker {
    processor: Arc<DiffProcessor>,
    store: Arc<dyn ImageStore>,
    job: JobKey,
    write_unchanged: bool,
}

impl PageWorker {
    fn diff_page(&self, task: &PageTask) -> PageRecord {
        let mut records = BTreeMap::new();
        for viewport in requested_viewports(task) {
            let record = match self.diff_viewport(&task.page, viewport) {
                Ok(record) => record,
                Err(e) => {
                    tracing::error!("Failed: {}/{} [{}] - {}", self.job, task.page, viewport, e);
                    ViewportRecord::failed(e.to_string())
                }
            };
            records.insert(viewport, record);
        }
        PageRecord::from_viewports(task.page.clone(), records)
    }

    fn diff_viewport(&self, page: &str, viewport: Viewport) -> PipelineResult<ViewportRecord> {
        let staging_path =
            self.store
                .screenshot_path(&self.job, page, viewport, Environment::Staging)?;
        let production_path =
            self.store
                .screenshot_path(&self.job, page, viewport, Environment::Production)?;

        let staging = self.store.open(&staging_path)?;
        let production = self.store.open(&production_path)?;
        let output = self.processor.diff_images(&staging, &production);

        let mut record = ViewportRecord {
            status: output.status,
            metrics: Some(output.metrics),
            highlighted_path: None,
            raw_path: None,
            overlay_path: None,
            error: None,
        };

        if output.status == DiffStatus::Changed || self.write_unchanged {
            let paths = self.store.diff_paths(&self.job, page, viewport)?;
            self.store
                .write(&DynamicImage::ImageRgb8(output.highlighted), &paths.highlighted)?;
            self.store
                .write(&DynamicImage::ImageRgb8(output.raw), &paths.raw)?;
            record.highlighted_path = Some(paths.highlighted);
            record.raw_path = Some(paths.raw);

            if let Some(overlay) = output.overlay {
                self.store
                    .write(&DynamicImage::ImageRgb8(overlay), &paths.overlay)?;
                record.overlay_path = Some(paths.overlay);
            }
        }

        Ok(record)
    }
}

/// Viewports to diff for a task. An empty request means all of them.
fn requested_viewports(task: &PageTask) -> Vec<Viewport> {
    if task.viewports.is_empty() {
        return Viewport::ALL.to_vec();
    }
    let mut viewports = task.viewports.clone();
    viewports.sort();
    viewports.dedup();
    viewports
}

fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    (done * 100 / total) as u8
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("page task panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("page task panicked: {s}")
    } else {
        "page task panicked".to_string()
    }
}
