//! Collaborator contracts polled or fed by the batch driver.
//!
//! Every trait method has a no-op default so a caller only implements the
//! capabilities it actually has. The `No*` types are the fully inert versions.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};
use crate::types::{JobKey, PageRecord, PageStatus};

/// External stop/pause flags for a job.
pub trait SignalSource: Send + Sync {
    fn should_stop(&self, _job: &JobKey) -> bool {
        false
    }

    fn should_pause(&self, _job: &JobKey) -> bool {
        false
    }
}

/// A signal source that never stops or pauses.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSignals;

impl SignalSource for NoSignals {}

/// In-process flags, shared between the driver and whoever controls the run.
#[derive(Debug, Default)]
pub struct AtomicSignals {
    stop: AtomicBool,
    pause: AtomicBool,
}

impl AtomicSignals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn pause(&self) {
        self.pause.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.pause.store(false, Ordering::SeqCst);
    }
}

impl SignalSource for AtomicSignals {
    fn should_stop(&self, _job: &JobKey) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    fn should_pause(&self, _job: &JobKey) -> bool {
        self.pause.load(Ordering::SeqCst)
    }
}

/// Coarse stage of a running job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStage {
    Processing,
    Paused,
    Completed,
    Stopped,
}

/// One progress report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub stage: ProgressStage,
    /// 0..=100
    pub percent: u8,
    pub message: String,
}

impl ProgressUpdate {
    pub fn new(stage: ProgressStage, percent: u8, message: impl Into<String>) -> Self {
        Self {
            stage,
            percent: percent.min(100),
            message: message.into(),
        }
    }
}

/// Best-effort progress reporting. Implementations must not block.
pub trait ProgressSink: Send + Sync {
    fn report(&self, _job: &JobKey, _update: ProgressUpdate) {}

    fn page_status(&self, _job: &JobKey, _page: &str, _status: PageStatus) {}
}

/// Discards all progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {}

/// Persists finished page records.
pub trait ResultSink: Send + Sync {
    fn record_page(&self, job: &JobKey, record: &PageRecord) -> PipelineResult<()>;
}

/// Keeps every record in memory, in completion order.
#[derive(Debug, Default)]
pub struct CollectingSink {
    records: Mutex<Vec<PageRecord>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the records collected so far.
    pub fn records(&self) -> Vec<PageRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}

impl ResultSink for CollectingSink {
    fn record_page(&self, _job: &JobKey, record: &PageRecord) -> PipelineResult<()> {
        self.records
            .lock()
            .map_err(|_| PipelineError::Store {
                message: "result collector poisoned".to_string(),
            })?
            .push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_atomic_signals() {
        let job = JobKey::new("shop", "r1");
        let signals = AtomicSignals::new();
        assert!(!signals.should_stop(&job));
        assert!(!signals.should_pause(&job));

        signals.pause();
        assert!(signals.should_pause(&job));
        signals.resume();
        assert!(!signals.should_pause(&job));

        signals.request_stop();
        assert!(signals.should_stop(&job));
    }

    #[test]
    fn test_no_signals_is_inert() {
        let job = JobKey::new("shop", "r1");
        assert!(!NoSignals.should_stop(&job));
        assert!(!NoSignals.should_pause(&job));
    }

    #[test]
    fn test_progress_percent_clamped() {
        let update = ProgressUpdate::new(ProgressStage::Processing, 250, "over");
        assert_eq!(update.percent, 100);
    }

    #[test]
    fn test_collecting_sink() {
        let sink = CollectingSink::new();
        let job = JobKey::new("shop", "r1");
        let record = PageRecord::from_viewports("home", BTreeMap::new());
        sink.record_page(&job, &record).unwrap();
        sink.record_page(&job, &record).unwrap();
        assert_eq!(sink.records().len(), 2);
        assert_eq!(sink.records()[0].page, "home");
    }
}
