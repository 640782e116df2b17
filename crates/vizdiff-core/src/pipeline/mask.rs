//! Binary change mask from two normalized canvases.
//!
//! A pixel is changed when its luma-weighted channel difference
//! `0.299*|dR| + 0.587*|dG| + 0.114*|dB|` exceeds the configured threshold.
//! The raw mask is then optionally cleaned with a single 3x3 dilation and a
//! single 3x3 erosion. Both passes are capped at one iteration no matter what
//! count is configured, and erosion only runs after a dilation. Pixels
//! outside the canvas count as unchanged for the erosion, so changes touching
//! the border lose their outer ring.

use image::{imageops, GrayImage, Luma, Rgba, RgbaImage};
use imageproc::distance_transform::Norm;
use imageproc::morphology;

use crate::config::DiffConfig;

/// Mask value for a changed pixel. Unchanged pixels are 0.
pub const CHANGED: u8 = 255;

const LUMA_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

/// Perceptual difference between two pixels (alpha is ignored).
pub fn perceptual_difference(a: &Rgba<u8>, b: &Rgba<u8>) -> f32 {
    LUMA_WEIGHTS
        .iter()
        .enumerate()
        .map(|(c, w)| w * f32::from(a.0[c].abs_diff(b.0[c])))
        .sum()
}

/// Compute the change mask for two same-sized canvases.
///
/// Every output pixel is either 0 or [`CHANGED`].
pub fn compute_mask(
    staging: &RgbaImage,
    production: &RgbaImage,
    config: &DiffConfig,
) -> GrayImage {
    debug_assert_eq!(staging.dimensions(), production.dimensions());
    let width = staging.width().min(production.width());
    let height = staging.height().min(production.height());
    let threshold = config.per_pixel_threshold;

    let mut mask = GrayImage::from_fn(width, height, |x, y| {
        let d = perceptual_difference(staging.get_pixel(x, y), production.get_pixel(x, y));
        Luma([if d > threshold { CHANGED } else { 0 }])
    });

    let dilated = config.dilate_iterations > 0;
    if dilated {
        if config.dilate_iterations > 1 {
            tracing::trace!(
                "dilate_iterations={} capped to a single pass",
                config.dilate_iterations
            );
        }
        mask = morphology::dilate(&mask, Norm::LInf, 1);
    }
    if dilated && config.erode_iterations > 0 {
        mask = erode_with_zero_border(&mask);
    }

    mask
}

/// 3x3 erosion where out-of-canvas pixels are background.
fn erode_with_zero_border(mask: &GrayImage) -> GrayImage {
    let (width, height) = mask.dimensions();
    let mut padded = GrayImage::new(width + 2, height + 2);
    imageops::replace(&mut padded, mask, 1, 1);
    let eroded = morphology::erode(&padded, Norm::LInf, 1);
    imageops::crop_imm(&eroded, 1, 1, width, height).to_image()
}

/// Number of changed pixels in a mask.
pub fn changed_pixels(mask: &GrayImage) -> u64 {
    mask.pixels().filter(|p| p.0[0] > 0).count() as u64
}
