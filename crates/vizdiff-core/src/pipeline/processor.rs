//! Per-pair orchestration: normalize, mask, regions, metrics, renders.

use std::path::Path;

use image::{DynamicImage, RgbImage};

use crate::config::{Config, DiffConfig};
use crate::error::PipelineResult;
use crate::types::{DiffMetrics, DiffStatus};

use super::decode::ImageDecoder;
use super::mask::compute_mask;
use super::metrics::calculate;
use super::normalize::normalize;
use super::regions::extract_boxes;
use super::render::DiffRenderer;
use super::validate::check_pair;

/// Everything produced for one successfully diffed pair.
#[derive(Debug, Clone)]
pub struct DiffOutput {
    pub status: DiffStatus,
    pub metrics: DiffMetrics,
    pub highlighted: RgbImage,
    pub raw: RgbImage,
    /// Present only when `render.write_overlay` is enabled
    pub overlay: Option<RgbImage>,
}

/// Result of diffing one pair. Errors are recorded by the caller, never raised
/// past the batch driver.
pub type DiffResult = PipelineResult<DiffOutput>;

/// Runs the diff stages for a staging/production pair.
pub struct DiffProcessor {
    diff: DiffConfig,
    renderer: DiffRenderer,
    decoder: ImageDecoder,
    overlay: bool,
}

impl DiffProcessor {
    /// Create a new processor with the given configuration.
    pub fn new(config: &Config) -> Self {
        Self {
            diff: config.diff.clone(),
            renderer: DiffRenderer::new(config.diff.clone(), config.render.clone()),
            decoder: ImageDecoder::new(config.limits.clone()),
            overlay: config.render.write_overlay,
        }
    }

    /// Diff two decoded images.
    pub fn diff_images(&self, staging: &DynamicImage, production: &DynamicImage) -> DiffOutput {
        let start = std::time::Instant::now();
        check_pair(staging, production);

        let pair = normalize(staging, production, &self.diff);
        let mask = compute_mask(&pair.staging, &pair.production, &self.diff);
        let boxes = extract_boxes(&mask, &self.diff);
        let metrics = calculate(&mask, &boxes);
        tracing::trace!("  Mask + regions: {:?}", start.elapsed());

        let highlighted =
            self.renderer
                .render_highlighted(&pair.staging, &pair.production, &mask, &boxes);
        let raw = self.renderer.render_raw(&mask);
        let overlay = self
            .overlay
            .then(|| self.renderer.render_overlay(&pair.production, &mask, &boxes));

        let status = if metrics.mismatch_percentage == 0.0 {
            DiffStatus::NoChanges
        } else {
            DiffStatus::Changed
        };

        tracing::info!(
            "Diff: {:.3}% changed, {} regions, {} pixels in {:?}",
            metrics.mismatch_percentage,
            metrics.bounding_boxes.len(),
            metrics.changed_pixel_count,
            start.elapsed()
        );

        DiffOutput {
            status,
            metrics,
            highlighted,
            raw,
            overlay,
        }
    }

    /// Decode both files and diff them.
    pub fn diff_files(&self, staging: &Path, production: &Path) -> DiffResult {
        let staging = self.decoder.decode(staging)?;
        let production = self.decoder.decode(production)?;
        Ok(self.diff_images(&staging, &production))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use image::{Rgb, RgbImage};

    fn white(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([255, 255, 255])))
    }

    fn with_red_square(mut base: RgbImage) -> DynamicImage {
        for y in 50..150 {
            for x in 50..150 {
                base.put_pixel(x, y, Rgb([255, 0, 0]));
            }
        }
        DynamicImage::ImageRgb8(base)
    }

    #[test]
    fn test_identical_images_have_no_changes() {
        let processor = DiffProcessor::new(&Config::default());
        let out = processor.diff_images(&white(800, 600), &white(800, 600));

        assert_eq!(out.status, DiffStatus::NoChanges);
        assert_eq!(out.metrics.changed_pixel_count, 0);
        assert_eq!(out.metrics.mismatch_percentage, 0.0);
        assert!(out.metrics.bounding_boxes.is_empty());
        assert_eq!(out.highlighted.dimensions(), (800, 600));
        assert_eq!(out.raw.dimensions(), (800, 600));
        assert!(out.overlay.is_none());
    }

    #[test]
    fn test_red_square_is_one_region() {
        let processor = DiffProcessor::new(&Config::default());
        let staging = with_red_square(RgbImage::from_pixel(300, 300, Rgb([255, 255, 255])));
        let out = processor.diff_images(&staging, &white(300, 300));

        assert_eq!(out.status, DiffStatus::Changed);
        assert_eq!(out.metrics.changed_pixel_count, 10_000);
        assert_eq!(out.metrics.largest_region_area, 10_000);
        assert_eq!(out.metrics.bounding_boxes.len(), 1);
        let b = out.metrics.bounding_boxes[0];
        assert_eq!((b.x, b.y, b.width, b.height), (50, 50, 100, 100));
    }

    #[test]
    fn test_overlay_rendered_when_enabled() {
        let mut config = Config::default();
        config.render.write_overlay = true;
        let processor = DiffProcessor::new(&config);
        let staging = with_red_square(RgbImage::from_pixel(200, 200, Rgb([255, 255, 255])));
        let out = processor.diff_images(&staging, &white(200, 200));

        let overlay = out.overlay.expect("overlay enabled");
        assert_eq!(overlay.dimensions(), (200, 200));
    }

    #[test]
    fn test_mismatched_sizes_render_at_canvas_size() {
        let processor = DiffProcessor::new(&Config::default());
        let out = processor.diff_images(&white(800, 600), &white(400, 300));
        assert_eq!(out.highlighted.dimensions(), (800, 600));
        assert_eq!(out.raw.dimensions(), (800, 600));
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join("staging.png");
        white(20, 20).save(&staging).unwrap();

        let processor = DiffProcessor::new(&Config::default());
        let err = processor
            .diff_files(&staging, &dir.path().join("production.png"))
            .unwrap_err();
        assert!(matches!(err, PipelineError::FileNotFound(_)));
        assert!(err.to_string().contains("production.png"));
    }
}
