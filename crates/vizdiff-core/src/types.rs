//! Core data types for the diff engine.
//!
//! These are the values handed across the engine boundary: change regions,
//! metrics, and the per-page/per-viewport records persisted by a result sink.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// One of the fixed rendering widths a page is captured at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Viewport {
    Desktop,
    Tablet,
    Mobile,
}

impl Viewport {
    /// All viewports in processing order.
    pub const ALL: [Viewport; 3] = [Viewport::Desktop, Viewport::Tablet, Viewport::Mobile];

    /// Directory/serialized name of the viewport.
    pub fn as_str(self) -> &'static str {
        match self {
            Viewport::Desktop => "desktop",
            Viewport::Tablet => "tablet",
            Viewport::Mobile => "mobile",
        }
    }
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Viewport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "desktop" => Ok(Viewport::Desktop),
            "tablet" => Ok(Viewport::Tablet),
            "mobile" => Ok(Viewport::Mobile),
            other => Err(format!("unknown viewport: {other}")),
        }
    }
}

/// The two environments whose rendered output is compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Staging,
    Production,
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

/// Identifies one diff run of one project. Signals are keyed by this.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobKey {
    pub project: String,
    pub run: String,
}

impl JobKey {
    pub fn new(project: impl Into<String>, run: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            run: run.into(),
        }
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.project, self.run)
    }
}

/// A page and the viewports it must be verified at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTask {
    /// Page identifier, also the screenshot file stem
    pub page: String,

    /// Viewports the page was requested at
    pub viewports: Vec<Viewport>,
}

impl PageTask {
    pub fn new(page: impl Into<String>, viewports: impl Into<Vec<Viewport>>) -> Self {
        Self {
            page: page.into(),
            viewports: viewports.into(),
        }
    }
}

/// One connected change region, in mask-pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    /// Box area as `width * height`.
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Quantitative change metrics for one image pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffMetrics {
    /// Number of mask pixels marked changed
    pub changed_pixel_count: u64,

    /// Changed pixels as a percentage of the canvas, rounded to 3 decimals
    pub mismatch_percentage: f64,

    /// Change regions that passed the minimum-area filter
    pub bounding_boxes: Vec<BoundingBox>,

    /// Largest box area, 0 when there are no boxes
    pub largest_region_area: u64,
}

/// Outcome of one viewport diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffStatus {
    /// At least one pixel changed
    Changed,
    /// Both captures are visually identical at the configured threshold
    NoChanges,
    /// The pair could not be diffed
    Failed,
}

impl DiffStatus {
    pub fn is_success(self) -> bool {
        !matches!(self, DiffStatus::Failed)
    }
}

/// Persisted result for one page at one viewport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewportRecord {
    pub status: DiffStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<DiffMetrics>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlighted_path: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_path: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlay_path: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ViewportRecord {
    /// A failed viewport carrying the error text.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: DiffStatus::Failed,
            metrics: None,
            highlighted_path: None,
            raw_path: None,
            overlay_path: None,
            error: Some(error.into()),
        }
    }
}

/// Lifecycle states reported for a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageStatus {
    Running,
    Completed,
    Failed,
}

/// Persisted result for one page across all its requested viewports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    pub page: String,
    pub status: PageStatus,
    pub viewports: BTreeMap<Viewport, ViewportRecord>,
}

impl PageRecord {
    /// Build a record from per-viewport results. The page is completed only
    /// when every requested viewport succeeded.
    pub fn from_viewports(
        page: impl Into<String>,
        viewports: BTreeMap<Viewport, ViewportRecord>,
    ) -> Self {
        let all_ok = !viewports.is_empty() && viewports.values().all(|r| r.status.is_success());
        Self {
            page: page.into(),
            status: if all_ok {
                PageStatus::Completed
            } else {
                PageStatus::Failed
            },
            viewports,
        }
    }

    /// True if any viewport found a change.
    pub fn has_changes(&self) -> bool {
        self.viewports
            .values()
            .any(|r| r.status == DiffStatus::Changed)
    }
}

/// Aggregate counts returned by the batch driver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Pages whose every viewport diffed successfully
    pub succeeded: usize,

    /// Pages with at least one failed viewport
    pub failed: usize,

    /// Pages never started because the run was stopped
    pub untouched: usize,

    /// Whether a stop signal ended the run early
    pub stopped: bool,
}

impl BatchSummary {
    /// Pages that were actually processed.
    pub fn processed(&self) -> usize {
        self.succeeded + self.failed
    }

    /// The `(successful_count, failed_count)` pair.
    pub fn counts(&self) -> (usize, usize) {
        (self.succeeded, self.failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_record(status: DiffStatus) -> ViewportRecord {
        ViewportRecord {
            status,
            metrics: None,
            highlighted_path: None,
            raw_path: None,
            overlay_path: None,
            error: None,
        }
    }

    #[test]
    fn test_viewport_parse_and_display() {
        assert_eq!("Tablet".parse::<Viewport>().unwrap(), Viewport::Tablet);
        assert_eq!(Viewport::Mobile.to_string(), "mobile");
        assert!("watch".parse::<Viewport>().is_err());
    }

    #[test]
    fn test_bounding_box_area_does_not_overflow() {
        let b = BoundingBox {
            x: 0,
            y: 0,
            width: u32::MAX,
            height: 2,
        };
        assert_eq!(b.area(), u64::from(u32::MAX) * 2);
    }

    #[test]
    fn test_page_requires_every_viewport() {
        let mut viewports = BTreeMap::new();
        viewports.insert(Viewport::Desktop, ok_record(DiffStatus::Changed));
        viewports.insert(Viewport::Mobile, ok_record(DiffStatus::NoChanges));
        assert_eq!(
            PageRecord::from_viewports("home", viewports.clone()).status,
            PageStatus::Completed
        );

        viewports.insert(Viewport::Tablet, ViewportRecord::failed("boom"));
        let record = PageRecord::from_viewports("home", viewports);
        assert_eq!(record.status, PageStatus::Failed);
        assert!(record.has_changes());
    }

    #[test]
    fn test_page_without_viewports_is_failed() {
        let record = PageRecord::from_viewports("empty", BTreeMap::new());
        assert_eq!(record.status, PageStatus::Failed);
    }

    #[test]
    fn test_viewport_map_serializes_by_name() {
        let mut viewports = BTreeMap::new();
        viewports.insert(Viewport::Desktop, ok_record(DiffStatus::NoChanges));
        let record = PageRecord::from_viewports("about", viewports);
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"desktop\":{\"status\":\"no_changes\"}"));
    }

    #[test]
    fn test_batch_summary_counts() {
        let summary = BatchSummary {
            succeeded: 12,
            failed: 3,
            untouched: 5,
            stopped: true,
        };
        assert_eq!(summary.processed(), 15);
        assert_eq!(summary.counts(), (12, 3));
    }
}
