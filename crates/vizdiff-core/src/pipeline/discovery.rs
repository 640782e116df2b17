//! Page discovery from the staging capture tree.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::types::{Environment, JobKey, PageTask, Viewport};

/// Capture file extensions looked up, in preference order.
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

/// Finds the pages captured for a run.
pub struct PageDiscovery {
    root: PathBuf,
}

impl PageDiscovery {
    /// Create a discovery rooted at the screenshot directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// List the pages under `{root}/{project}/{run}/staging/{viewport}/`.
    ///
    /// Each page carries every viewport it was captured at in staging.
    /// Directories that are not a known viewport are ignored. Pages are
    /// sorted by name for deterministic ordering.
    pub fn discover(&self, job: &JobKey) -> Vec<PageTask> {
        let staging = self
            .root
            .join(&job.project)
            .join(&job.run)
            .join(Environment::Staging.as_str());

        let mut pages: BTreeMap<String, BTreeSet<Viewport>> = BTreeMap::new();

        for entry in WalkDir::new(&staging)
            .min_depth(2)
            .max_depth(2)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() || !Self::is_supported(path) {
                continue;
            }
            let viewport = path
                .parent()
                .and_then(|p| p.file_name())
                .and_then(|n| n.to_str())
                .and_then(|n| n.parse::<Viewport>().ok());
            let page = path.file_stem().and_then(|s| s.to_str());

            match (viewport, page) {
                (Some(viewport), Some(page)) => {
                    pages.entry(page.to_string()).or_default().insert(viewport);
                }
                _ => tracing::debug!("Skipping {:?}: not under a viewport directory", path),
            }
        }

        tracing::debug!("Discovered {} pages under {:?}", pages.len(), staging);

        pages
            .into_iter()
            .map(|(page, viewports)| PageTask::new(page, viewports.into_iter().collect::<Vec<_>>()))
            .collect()
    }

    /// Check if a file has a supported extension.
    fn is_supported(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext_lower = ext.to_lowercase();
                SUPPORTED_EXTENSIONS.iter().any(|fmt| *fmt == ext_lower)
            })
            .unwrap_or(false)
    }
}
