//! Screenshot and artifact storage.
//!
//! The engine never builds paths itself: it asks an [`ImageStore`] where the
//! captures for a key live and where the rendered diffs should go.

use std::path::{Path, PathBuf};

use image::DynamicImage;

use crate::config::{Config, LimitsConfig};
use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::decode::{encode_png, ImageDecoder};
use crate::pipeline::discovery::SUPPORTED_EXTENSIONS;
use crate::types::{Environment, JobKey, Viewport};

/// Output locations for one page at one viewport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffPaths {
    pub highlighted: PathBuf,
    pub raw: PathBuf,
    pub overlay: PathBuf,
}

/// Resolves, reads and writes images for the batch driver.
pub trait ImageStore: Send + Sync {
    /// Path of the capture for a page at a viewport in one environment.
    fn screenshot_path(
        &self,
        job: &JobKey,
        page: &str,
        viewport: Viewport,
        env: Environment,
    ) -> PipelineResult<PathBuf>;

    /// Where the rendered diffs for a page at a viewport are written.
    fn diff_paths(&self, job: &JobKey, page: &str, viewport: Viewport)
        -> PipelineResult<DiffPaths>;

    fn open(&self, path: &Path) -> PipelineResult<DynamicImage>;

    fn write(&self, image: &DynamicImage, path: &Path) -> PipelineResult<()>;
}

/// Filesystem store.
///
/// Captures live at `{screenshots}/{project}/{run}/{env}/{viewport}/{page}.{ext}`
/// and diffs are written to `{diffs}/{project}/{run}/{viewport}/{page}_diff*.png`.
pub struct DirectoryStore {
    screenshot_root: PathBuf,
    diff_root: PathBuf,
    decoder: ImageDecoder,
}

impl DirectoryStore {
    pub fn new(
        screenshot_root: impl Into<PathBuf>,
        diff_root: impl Into<PathBuf>,
        limits: LimitsConfig,
    ) -> Self {
        Self {
            screenshot_root: screenshot_root.into(),
            diff_root: diff_root.into(),
            decoder: ImageDecoder::new(limits),
        }
    }

    /// Store rooted at the configured screenshot and diff directories.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.screenshot_dir(),
            config.diff_dir(),
            config.limits.clone(),
        )
    }

    pub fn screenshot_root(&self) -> &Path {
        &self.screenshot_root
    }

    pub fn diff_root(&self) -> &Path {
        &self.diff_root
    }

    fn job_dir(root: &Path, job: &JobKey) -> PipelineResult<PathBuf> {
        check_component("project", &job.project)?;
        check_component("run", &job.run)?;
        Ok(root.join(&job.project).join(&job.run))
    }
}

/// Reject names that would escape their directory.
fn check_component(kind: &str, name: &str) -> PipelineResult<()> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.contains('\0');
    if bad {
        return Err(PipelineError::Store {
            message: format!("invalid {kind} name: {name:?}"),
        });
    }
    Ok(())
}

impl ImageStore for DirectoryStore {
    fn screenshot_path(
        &self,
        job: &JobKey,
        page: &str,
        viewport: Viewport,
        env: Environment,
    ) -> PipelineResult<PathBuf> {
        check_component("page", page)?;
        let dir = Self::job_dir(&self.screenshot_root, job)?
            .join(env.as_str())
            .join(viewport.as_str());

        let found = SUPPORTED_EXTENSIONS
            .iter()
            .map(|ext| dir.join(format!("{page}.{ext}")))
            .find(|p| p.is_file());
        Ok(found.unwrap_or_else(|| dir.join(format!("{page}.png"))))
    }

    fn diff_paths(
        &self,
        job: &JobKey,
        page: &str,
        viewport: Viewport,
    ) -> PipelineResult<DiffPaths> {
        check_component("page", page)?;
        let dir = Self::job_dir(&self.diff_root, job)?.join(viewport.as_str());
        Ok(DiffPaths {
            highlighted: dir.join(format!("{page}_diff.png")),
            raw: dir.join(format!("{page}_diff_raw.png")),
            overlay: dir.join(format!("{page}_diff_overlay.png")),
        })
    }

    fn open(&self, path: &Path) -> PipelineResult<DynamicImage> {
        self.decoder.decode(path)
    }

    fn write(&self, image: &DynamicImage, path: &Path) -> PipelineResult<()> {
        encode_png(image, path)
    }
}
