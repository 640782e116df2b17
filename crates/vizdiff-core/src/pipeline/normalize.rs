//! Bring two screenshots onto a common RGBA canvas for pixel-wise comparison.
//!
//! Both images are converted to RGBA8 and placed on opaque white canvases of
//! size `(max(w1, w2), max(h1, h2))`. When the captures differ by more than
//! [`ALIGNMENT_TOLERANCE`] pixels in either dimension they are centered;
//! otherwise both are pasted at the origin, since near-equal captures are
//! already pixel-aligned and a half-pixel centering shift would light up
//! every crisp edge.

use image::{imageops, DynamicImage, GrayImage, Luma, Rgba, RgbaImage};

use crate::config::DiffConfig;

/// Size drift (in pixels, per dimension) still treated as the same layout.
pub const ALIGNMENT_TOLERANCE: u32 = 10;

const CANVAS_FILL: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// How the originals were placed on their canvases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Pasted at (0, 0)
    TopLeft,
    /// Offset by `(target - original) / 2`
    Centered,
}

/// Two same-sized RGBA canvases ready for comparison.
#[derive(Debug, Clone)]
pub struct NormalizedPair {
    pub staging: RgbaImage,
    pub production: RgbaImage,
    pub placement: Placement,
}

impl NormalizedPair {
    pub fn dimensions(&self) -> (u32, u32) {
        self.staging.dimensions()
    }
}

/// Decide the placement policy for two image sizes.
pub fn placement_for(a: (u32, u32), b: (u32, u32)) -> Placement {
    if a.0.abs_diff(b.0) > ALIGNMENT_TOLERANCE || a.1.abs_diff(b.1) > ALIGNMENT_TOLERANCE {
        Placement::Centered
    } else {
        Placement::TopLeft
    }
}

/// Normalize a staging/production pair. Always succeeds.
pub fn normalize(
    staging: &DynamicImage,
    production: &DynamicImage,
    config: &DiffConfig,
) -> NormalizedPair {
    let staging = staging.to_rgba8();
    let production = production.to_rgba8();

    let (w1, h1) = staging.dimensions();
    let (w2, h2) = production.dimensions();
    let target = (w1.max(w2), h1.max(h2));
    let placement = placement_for((w1, h1), (w2, h2));

    tracing::debug!(
        "Normalizing {}x{} and {}x{} -> {}x{} ({:?})",
        w1,
        h1,
        w2,
        h2,
        target.0,
        target.1,
        placement
    );

    let mut staging = place(&staging, target, placement);
    let mut production = place(&production, target, placement);

    if config.enable_blur {
        staging = gaussian_blur_rgba(&staging, config.blur_radius);
        production = gaussian_blur_rgba(&production, config.blur_radius);
    }

    NormalizedPair {
        staging,
        production,
        placement,
    }
}

fn place(image: &RgbaImage, (width, height): (u32, u32), placement: Placement) -> RgbaImage {
    let mut canvas = RgbaImage::from_pixel(width, height, CANVAS_FILL);
    let (x, y) = match placement {
        Placement::TopLeft => (0, 0),
        Placement::Centered => ((width - image.width()) / 2, (height - image.height()) / 2),
    };
    imageops::replace(&mut canvas, image, i64::from(x), i64::from(y));
    canvas
}

/// Blur each RGBA channel independently.
///
/// Non-positive sigma returns the image unchanged (`imageproc` panics on it).
fn gaussian_blur_rgba(image: &RgbaImage, sigma: f32) -> RgbaImage {
    if sigma <= 0.0 || image.width() == 0 || image.height() == 0 {
        return image.clone();
    }

    let (w, h) = image.dimensions();
    let channels: [GrayImage; 4] = std::array::from_fn(|c| {
        GrayImage::from_fn(w, h, |x, y| Luma([image.get_pixel(x, y).0[c]]))
    });
    let blurred: [GrayImage; 4] =
        std::array::from_fn(|c| imageproc::filter::gaussian_blur_f32(&channels[c], sigma));

    RgbaImage::from_fn(w, h, |x, y| {
        Rgba([
            blurred[0].get_pixel(x, y).0[0],
            blurred[1].get_pixel(x, y).0[0],
            blurred[2].get_pixel(x, y).0[0],
            blurred[3].get_pixel(x, y).0[0],
        ])
    })
}
