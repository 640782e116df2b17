//! Connected change regions reduced to bounding boxes.

use image::{GrayImage, Luma};
use imageproc::region_labelling::{connected_components, Connectivity};

use crate::config::DiffConfig;
use crate::types::BoundingBox;

#[derive(Debug, Clone, Copy)]
struct Extent {
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
}

impl Extent {
    fn at(x: u32, y: u32) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    fn include(&mut self, x: u32, y: u32) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    fn to_box(self) -> BoundingBox {
        BoundingBox {
            x: self.min_x,
            y: self.min_y,
            width: self.max_x - self.min_x + 1,
            height: self.max_y - self.min_y + 1,
        }
    }
}

/// Label 8-connected changed pixels and return one box per component whose
/// area reaches `config.min_diff_area`.
///
/// Boxes come back in label order. Callers must not rely on that order.
pub fn extract_boxes(mask: &GrayImage, config: &DiffConfig) -> Vec<BoundingBox> {
    let labels = connected_components(mask, Connectivity::Eight, Luma([0u8]));

    // Index 0 is the background label
    let mut extents: Vec<Option<Extent>> = Vec::new();
    for (x, y, label) in labels.enumerate_pixels() {
        let label = label.0[0] as usize;
        if label == 0 {
            continue;
        }
        if label >= extents.len() {
            extents.resize(label + 1, None);
        }
        match &mut extents[label] {
            Some(extent) => extent.include(x, y),
            slot => *slot = Some(Extent::at(x, y)),
        }
    }

    let components = extents.iter().flatten().count();
    let min_area = u64::from(config.min_diff_area);
    let boxes: Vec<BoundingBox> = extents
        .into_iter()
        .flatten()
        .map(Extent::to_box)
        .filter(|b| b.area() >= min_area)
        .collect();

    tracing::debug!(
        "Found {} bounding boxes (filtered from {} components)",
        boxes.len(),
        components
    );
    boxes
}
