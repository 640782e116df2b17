//! Scalar change metrics derived from a mask and its regions.

use image::GrayImage;

use crate::types::{BoundingBox, DiffMetrics};

use super::mask::changed_pixels;

/// Compute metrics for a mask and its filtered boxes.
///
/// An empty canvas yields 0% instead of dividing by zero.
pub fn calculate(mask: &GrayImage, boxes: &[BoundingBox]) -> DiffMetrics {
    let total = u64::from(mask.width()) * u64::from(mask.height());
    let changed = changed_pixels(mask);

    let mismatch_percentage = if total == 0 {
        0.0
    } else {
        round3(changed as f64 / total as f64 * 100.0)
    };

    DiffMetrics {
        changed_pixel_count: changed,
        mismatch_percentage,
        bounding_boxes: boxes.to_vec(),
        largest_region_area: boxes.iter().map(BoundingBox::area).max().unwrap_or(0),
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_empty_canvas_is_zero_percent() {
        let metrics = calculate(&GrayImage::new(0, 0), &[]);
        assert_eq!(metrics.changed_pixel_count, 0);
        assert_eq!(metrics.mismatch_percentage, 0.0);
        assert_eq!(metrics.largest_region_area, 0);
    }

    #[test]
    fn test_percentage_rounded_to_three_decimals() {
        // 1 of 7 pixels = 14.2857...%
        let mut mask = GrayImage::new(7, 1);
        mask.put_pixel(3, 0, Luma([255]));
        let metrics = calculate(&mask, &[]);
        assert_eq!(metrics.changed_pixel_count, 1);
        assert_eq!(metrics.mismatch_percentage, 14.286);
    }

    #[test]
    fn test_full_mask_is_hundred_percent() {
        let mask = GrayImage::from_pixel(9, 9, Luma([255]));
        assert_eq!(calculate(&mask, &[]).mismatch_percentage, 100.0);
    }

    #[test]
    fn test_largest_region() {
        let boxes = [
            BoundingBox {
                x: 0,
                y: 0,
                width: 10,
                height: 4,
            },
            BoundingBox {
                x: 20,
                y: 0,
                width: 7,
                height: 7,
            },
        ];
        let metrics = calculate(&GrayImage::new(40, 40), &boxes);
        assert_eq!(metrics.largest_region_area, 49);
        assert_eq!(metrics.bounding_boxes.len(), 2);
    }

    #[test]
    fn test_count_matches_mask() {
        let mask = GrayImage::from_fn(50, 20, |x, y| Luma([if (x + y) % 3 == 0 { 255 } else { 0 }]));
        let expected = mask.pixels().filter(|p| p.0[0] > 0).count() as u64;
        let metrics = calculate(&mask, &[]);
        assert_eq!(metrics.changed_pixel_count, expected);
        assert_eq!(
            metrics.mismatch_percentage,
            round3(expected as f64 / 1000.0 * 100.0)
        );
    }
}
