//! Sub-configuration structs with the engine's documented defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Thresholds and toggles for mask computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    /// Luma-weighted per-pixel difference above which a pixel counts as changed
    pub per_pixel_threshold: f32,

    /// Minimum bounding-box area (width * height) for a reported region
    pub min_diff_area: u32,

    /// Alpha of the red overlay in the overlay rendering
    pub overlay_alpha: u8,

    /// Blur both canvases before comparison to suppress anti-aliasing noise
    pub enable_blur: bool,

    /// Gaussian sigma used when `enable_blur` is set
    pub blur_radius: f32,

    /// Render the raw diff as red-on-black instead of the plain mask
    pub enable_heatmap: bool,

    /// Dilation passes requested. Any value above zero runs exactly one pass.
    pub dilate_iterations: u32,

    /// Erosion passes requested. Only honoured after dilation, capped at one pass.
    pub erode_iterations: u32,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            per_pixel_threshold: 12.0,
            min_diff_area: 24,
            overlay_alpha: 140,
            enable_blur: false,
            blur_radius: 0.5,
            enable_heatmap: false,
            dilate_iterations: 2,
            erode_iterations: 1,
        }
    }
}

/// Batch driver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Pages per chunk; stop and pause are polled before each chunk
    pub batch_size: usize,

    /// Sleep between pause re-checks in milliseconds
    pub pause_poll_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 15,
            pause_poll_ms: 1000,
        }
    }
}

/// Highlighted-diff rendering settings.
///
/// The outline thresholds are fixed constants of the renderer; they live here
/// so deployments can tune them, but the defaults reproduce the stock output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Boxes are outlined only when their area exceeds `factor * min_diff_area`
    pub outline_area_factor: u32,

    /// Area above which the outline is thick red
    pub major_area: u64,

    /// Area above which the outline is medium orange
    pub moderate_area: u64,

    /// Also write the alpha-composited overlay artifact
    pub write_overlay: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            outline_area_factor: 4,
            major_area: 10_000,
            moderate_area: 2_500,
            write_overlay: false,
        }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum screenshot file size in megabytes
    pub max_file_size_mb: u64,

    /// Maximum image dimension (width or height)
    pub max_image_dimension: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 100,
            max_image_dimension: 20_000,
        }
    }
}

/// Where screenshots are read from and artifacts are written to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Root directory for rendered diff images
    pub diff_dir: PathBuf,

    /// Root directory holding captured screenshots
    pub screenshot_dir: PathBuf,

    /// Default record format ("json" or "jsonl")
    pub format: String,

    /// Write rendered images for viewports without any changed pixel
    pub write_unchanged: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            diff_dir: PathBuf::from("./diffs"),
            screenshot_dir: PathBuf::from("./screenshots"),
            format: "jsonl".to_string(),
            write_unchanged: false,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
