//! Vizdiff Core - visual regression diffing for UI screenshots.
//!
//! Compares a staging capture of a page against its production capture and
//! reports what changed: a binary change mask, bounding boxes of the changed
//! regions, scalar metrics, and rendered visualizations.
//!
//! # Architecture
//!
//! ```text
//! Decode → Normalize → Mask → Regions → Metrics → Render → ResultSink
//! ```
//!
//! Storage, stop/pause signals, progress and result persistence are
//! collaborator traits ([`ImageStore`], [`SignalSource`], [`ProgressSink`],
//! [`ResultSink`]) so the engine runs with or without a job scheduler.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vizdiff_core::{Config, DiffEngine, DirectoryStore, JobKey, PageDiscovery};
//!
//! #[tokio::main]
//! async fn main() -> vizdiff_core::Result<()> {
//!     let config = Config::load()?;
//!     let engine = DiffEngine::new(config)?;
//!     let job = JobKey::new("shop", "nightly-42");
//!
//!     let pages = PageDiscovery::new(engine.config().screenshot_dir()).discover(&job);
//!     let store = Arc::new(DirectoryStore::from_config(engine.config()));
//!     let summary = engine.runner(store).run(&job, pages).await;
//!     println!("{} succeeded, {} failed", summary.succeeded, summary.failed);
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod collab;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod store;
pub mod types;

use std::sync::Arc;

// Re-exports for convenient access
pub use collab::{
    AtomicSignals, CollectingSink, NoProgress, NoSignals, ProgressSink, ProgressStage,
    ProgressUpdate, ResultSink, SignalSource,
};
pub use config::Config;
pub use error::{ConfigError, DiffError, PipelineError, PipelineResult, Result};
pub use output::{JsonResultSink, OutputFormat, OutputWriter};
pub use pipeline::{BatchRunner, DiffOutput, DiffProcessor, DiffResult, PageDiscovery};
pub use store::{DiffPaths, DirectoryStore, ImageStore};
pub use types::{
    BatchSummary, BoundingBox, DiffMetrics, DiffStatus, Environment, JobKey, PageRecord,
    PageStatus, PageTask, Viewport, ViewportRecord,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Entry point holding a validated configuration and a shared processor.
pub struct DiffEngine {
    config: Config,
    processor: Arc<DiffProcessor>,
}

impl DiffEngine {
    /// Create an engine, validating the configuration first.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        tracing::debug!("Initializing vizdiff v{}", VERSION);
        let processor = Arc::new(DiffProcessor::new(&config));
        Ok(Self { config, processor })
    }

    /// Get a reference to the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn processor(&self) -> &DiffProcessor {
        &self.processor
    }

    /// Batch runner over `store`, sharing this engine's processor.
    pub fn runner(&self, store: Arc<dyn ImageStore>) -> BatchRunner {
        BatchRunner::new(Arc::clone(&self.processor), store, &self.config)
    }
}
