//! Diff visualizations.
//!
//! - **Highlighted**: the production capture with unchanged pixels dimmed
//!   toward grayscale, changed pixels replaced by a severity color, and large
//!   regions outlined.
//! - **Raw**: the mask itself, or a red-on-black heatmap.
//! - **Overlay**: production with a translucent red wash over changed pixels.

use image::{GrayImage, Rgb, RgbImage, Rgba, RgbaImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::config::{DiffConfig, RenderConfig};
use crate::types::BoundingBox;

/// Weight of the grayscale value when dimming an unchanged pixel.
pub const DIM_FACTOR: f32 = 0.15;

/// Normalized color distance above which a changed pixel is major.
pub const MAJOR_TIER: f32 = 0.7;

/// Normalized color distance above which a changed pixel is moderate.
pub const MODERATE_TIER: f32 = 0.4;

pub const RED: Rgb<u8> = Rgb([255, 0, 0]);
pub const ORANGE: Rgb<u8> = Rgb([255, 165, 0]);
pub const YELLOW: Rgb<u8> = Rgb([255, 255, 0]);

const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

/// Severity of a changed pixel or region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Minor,
    Moderate,
    Major,
}

impl Severity {
    /// Classify a color distance already normalized to `[0, 1]`.
    pub fn from_normalized(distance: f32) -> Self {
        if distance > MAJOR_TIER {
            Severity::Major
        } else if distance > MODERATE_TIER {
            Severity::Moderate
        } else {
            Severity::Minor
        }
    }

    pub fn color(self) -> Rgb<u8> {
        match self {
            Severity::Major => RED,
            Severity::Moderate => ORANGE,
            Severity::Minor => YELLOW,
        }
    }
}

/// Renders the highlighted, raw and overlay images for a diffed pair.
#[derive(Debug, Clone)]
pub struct DiffRenderer {
    diff: DiffConfig,
    render: RenderConfig,
}

impl DiffRenderer {
    pub fn new(diff: DiffConfig, render: RenderConfig) -> Self {
        Self { diff, render }
    }

    /// Highlighted diff, based on the production capture.
    pub fn render_highlighted(
        &self,
        staging: &RgbaImage,
        production: &RgbaImage,
        mask: &GrayImage,
        boxes: &[BoundingBox],
    ) -> RgbImage {
        let (width, height) = mask.dimensions();
        let changed = |x: u32, y: u32| mask.get_pixel(x, y).0[0] > 0;

        let max_distance = mask
            .enumerate_pixels()
            .filter(|(_, _, m)| m.0[0] > 0)
            .map(|(x, y, _)| color_distance(staging.get_pixel(x, y), production.get_pixel(x, y)))
            .fold(0.0f32, f32::max);

        let mut out = RgbImage::from_fn(width, height, |x, y| {
            let base = production.get_pixel(x, y);
            if !changed(x, y) {
                return dim(base);
            }
            let distance = color_distance(staging.get_pixel(x, y), base);
            let normalized = if max_distance > 0.0 {
                distance / max_distance
            } else {
                0.0
            };
            Severity::from_normalized(normalized).color()
        });

        let outline_floor =
            u64::from(self.render.outline_area_factor) * u64::from(self.diff.min_diff_area);
        for b in boxes.iter().filter(|b| b.area() > outline_floor) {
            let (color, thickness) = self.outline_style(b.area());
            draw_outline(&mut out, b, color, thickness);
        }

        out
    }

    /// Outline color and width for a box of the given area.
    pub fn outline_style(&self, area: u64) -> (Rgb<u8>, u32) {
        if area > self.render.major_area {
            (RED, 3)
        } else if area > self.render.moderate_area {
            (ORANGE, 2)
        } else {
            (YELLOW, 1)
        }
    }

    /// Raw diff: red-on-black heatmap when enabled, else the mask as RGB.
    pub fn render_raw(&self, mask: &GrayImage) -> RgbImage {
        let heatmap = self.diff.enable_heatmap;
        RgbImage::from_fn(mask.width(), mask.height(), |x, y| {
            let v = mask.get_pixel(x, y).0[0];
            match (heatmap, v > 0) {
                (true, true) => RED,
                (true, false) => BLACK,
                (false, _) => Rgb([v, v, v]),
            }
        })
    }

    /// Production capture with a red wash of `overlay_alpha` over changed
    /// pixels and every box outlined in red.
    pub fn render_overlay(
        &self,
        production: &RgbaImage,
        mask: &GrayImage,
        boxes: &[BoundingBox],
    ) -> RgbImage {
        let alpha = f32::from(self.diff.overlay_alpha) / 255.0;
        let mut out = RgbImage::from_fn(mask.width(), mask.height(), |x, y| {
            let base = production.get_pixel(x, y);
            if mask.get_pixel(x, y).0[0] == 0 {
                return Rgb([base.0[0], base.0[1], base.0[2]]);
            }
            Rgb(std::array::from_fn(|c| {
                let red = f32::from(RED.0[c]);
                channel(red * alpha + f32::from(base.0[c]) * (1.0 - alpha))
            }))
        });
        for b in boxes {
            draw_outline(&mut out, b, RED, 2);
        }
        out
    }
}

/// Euclidean RGB distance between two pixels.
pub fn color_distance(a: &Rgba<u8>, b: &Rgba<u8>) -> f32 {
    (0..3)
        .map(|c| {
            let d = f32::from(a.0[c]) - f32::from(b.0[c]);
            d * d
        })
        .sum::<f32>()
        .sqrt()
}

fn dim(pixel: &Rgba<u8>) -> Rgb<u8> {
    let [r, g, b, _] = pixel.0;
    let gray = 0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b);
    Rgb([r, g, b].map(|c| channel(gray * DIM_FACTOR + f32::from(c) * (1.0 - DIM_FACTOR))))
}

fn channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Draw a rectangle outline `thickness` pixels wide, growing inward.
fn draw_outline(image: &mut RgbImage, b: &BoundingBox, color: Rgb<u8>, thickness: u32) {
    for i in 0..thickness {
        let inset = 2 * i;
        if b.width <= inset || b.height <= inset {
            break;
        }
        let rect = Rect::at((b.x + i) as i32, (b.y + i) as i32)
            .of_size(b.width - inset, b.height - inset);
        draw_hollow_rect_mut(image, rect, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

    fn renderer() -> DiffRenderer {
        DiffRenderer::new(DiffConfig::default(), RenderConfig::default())
    }

    fn mask_at(width: u32, height: u32, points: &[(u32, u32)]) -> GrayImage {
        let mut mask = GrayImage::new(width, height);
        for &(x, y) in points {
            mask.put_pixel(x, y, Luma([255]));
        }
        mask
    }

    fn bbox(x: u32, y: u32, width: u32, height: u32) -> BoundingBox {
        BoundingBox {
            x,
            y,
            width,
            height,
        }
    }

    #[test]
    fn test_unchanged_pixels_dimmed() {
        let img = RgbaImage::from_pixel(4, 4, Rgba([200, 100, 50, 255]));
        let mask = GrayImage::new(4, 4);
        let out = renderer().render_highlighted(&img, &img, &mask, &[]);
        // gray = 124.2 -> 0.15 * 124.2 + 0.85 * c
        assert_eq!(*out.get_pixel(1, 1), Rgb([189, 104, 61]));
    }

    #[test]
    fn test_white_stays_white_when_dimmed() {
        let img = RgbaImage::from_pixel(2, 2, WHITE);
        let out = renderer().render_highlighted(&img, &img, &GrayImage::new(2, 2), &[]);
        assert_eq!(*out.get_pixel(0, 0), Rgb([255, 255, 255]));
    }

    #[test]
    fn test_severity_tiers_by_relative_distance() {
        let staging = RgbaImage::from_pixel(3, 1, WHITE);
        let mut production = staging.clone();
        production.put_pixel(0, 0, Rgba([0, 0, 0, 255])); // 441.7, max
        production.put_pixel(1, 0, Rgba([255, 255, 0, 255])); // 255 -> 0.577
        production.put_pixel(2, 0, Rgba([175, 255, 255, 255])); // 80 -> 0.181
        let mask = mask_at(3, 1, &[(0, 0), (1, 0), (2, 0)]);

        let out = renderer().render_highlighted(&staging, &production, &mask, &[]);
        assert_eq!(*out.get_pixel(0, 0), RED);
        assert_eq!(*out.get_pixel(1, 0), ORANGE);
        assert_eq!(*out.get_pixel(2, 0), YELLOW);
    }

    #[test]
    fn test_dominant_change_demotes_secondary_changes() {
        let staging = RgbaImage::from_pixel(2, 1, WHITE);
        let mut production = staging.clone();
        production.put_pixel(1, 0, Rgba([175, 255, 255, 255]));

        // Alone, the moderate change is its own maximum
        let alone = renderer().render_highlighted(
            &staging,
            &production,
            &mask_at(2, 1, &[(1, 0)]),
            &[],
        );
        assert_eq!(*alone.get_pixel(1, 0), RED);

        // Next to a maximal change it falls into the minor tier
        production.put_pixel(0, 0, Rgba([0, 0, 0, 255]));
        let mixed = renderer().render_highlighted(
            &staging,
            &production,
            &mask_at(2, 1, &[(0, 0), (1, 0)]),
            &[],
        );
        assert_eq!(*mixed.get_pixel(0, 0), RED);
        assert_eq!(*mixed.get_pixel(1, 0), YELLOW);
    }

    #[test]
    fn test_zero_distance_changed_pixel_is_minor() {
        let img = RgbaImage::from_pixel(3, 3, WHITE);
        let mask = mask_at(3, 3, &[(1, 1)]);
        let out = renderer().render_highlighted(&img, &img, &mask, &[]);
        assert_eq!(*out.get_pixel(1, 1), YELLOW);
    }

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(Severity::from_normalized(0.71), Severity::Major);
        assert_eq!(Severity::from_normalized(0.7), Severity::Moderate);
        assert_eq!(Severity::from_normalized(0.41), Severity::Moderate);
        assert_eq!(Severity::from_normalized(0.4), Severity::Minor);
        assert_eq!(Severity::from_normalized(0.0), Severity::Minor);
    }

    #[test]
    fn test_outline_styles() {
        let r = renderer();
        assert_eq!(r.outline_style(12_000), (RED, 3));
        assert_eq!(r.outline_style(10_000), (ORANGE, 2));
        assert_eq!(r.outline_style(2_501), (ORANGE, 2));
        assert_eq!(r.outline_style(2_500), (YELLOW, 1));
    }

    #[test]
    fn test_outlines_only_for_large_boxes() {
        let img = RgbaImage::from_pixel(200, 200, WHITE);
        let mask = GrayImage::new(200, 200);
        let boxes = [
            bbox(5, 5, 8, 12),      // 96, not above 4 * 24
            bbox(20, 20, 10, 10),   // 100, thin yellow
            bbox(40, 40, 60, 60),   // 3600, orange width 2
            bbox(10, 100, 120, 90), // 10800, red width 3
        ];
        let out = renderer().render_highlighted(&img, &img, &mask, &boxes);
        let white = Rgb([255, 255, 255]);

        assert_eq!(*out.get_pixel(5, 5), white);

        assert_eq!(*out.get_pixel(20, 20), YELLOW);
        assert_eq!(*out.get_pixel(29, 29), YELLOW);
        assert_eq!(*out.get_pixel(21, 21), white);

        assert_eq!(*out.get_pixel(40, 40), ORANGE);
        assert_eq!(*out.get_pixel(41, 41), ORANGE);
        assert_eq!(*out.get_pixel(42, 42), white);

        assert_eq!(*out.get_pixel(10, 100), RED);
        assert_eq!(*out.get_pixel(12, 102), RED);
        assert_eq!(*out.get_pixel(13, 103), white);
    }

    #[test]
    fn test_outline_thresholds_configurable() {
        let r = DiffRenderer::new(
            DiffConfig::default(),
            RenderConfig {
                outline_area_factor: 1,
                ..RenderConfig::default()
            },
        );
        let img = RgbaImage::from_pixel(20, 20, WHITE);
        let mask = GrayImage::new(20, 20);
        let out = r.render_highlighted(&img, &img, &mask, &[bbox(2, 2, 5, 5)]);
        assert_eq!(*out.get_pixel(2, 2), YELLOW);
    }

    #[test]
    fn test_raw_mask_grayscale() {
        let mask = mask_at(3, 3, &[(1, 1)]);
        let out = renderer().render_raw(&mask);
        assert_eq!(*out.get_pixel(1, 1), Rgb([255, 255, 255]));
        assert_eq!(*out.get_pixel(0, 0), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_raw_heatmap() {
        let r = DiffRenderer::new(
            DiffConfig {
                enable_heatmap: true,
                ..DiffConfig::default()
            },
            RenderConfig::default(),
        );
        let mask = mask_at(3, 3, &[(1, 1)]);
        let out = r.render_raw(&mask);
        assert_eq!(*out.get_pixel(1, 1), RED);
        assert_eq!(*out.get_pixel(2, 2), BLACK);
    }

    #[test]
    fn test_overlay_blends_red() {
        let production = RgbaImage::from_pixel(4, 4, WHITE);
        let mask = mask_at(4, 4, &[(2, 2)]);
        let out = renderer().render_overlay(&production, &mask, &[]);
        // alpha 140/255: green/blue = 255 * (1 - 0.549) = 115
        assert_eq!(*out.get_pixel(2, 2), Rgb([255, 115, 115]));
        assert_eq!(*out.get_pixel(0, 0), Rgb([255, 255, 255]));
    }
}
