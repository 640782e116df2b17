//! Diff pipeline components.
//!
//! The stages of a pair diff, in order:
//! - **decode** / **validate**: Load captures and reject bad inputs
//! - **normalize**: Bring both captures onto one canvas
//! - **mask**: Per-pixel change mask with morphology cleanup
//! - **regions**: Connected change regions as bounding boxes
//! - **metrics**: Scalar change metrics
//! - **render**: Highlighted, raw and overlay visualizations
//! - **processor**: Wires the stages for one pair
//!
//! Around them, **discovery** finds the pages of a run and **batch** drives
//! them in chunks with stop/pause support.

pub mod batch;
pub mod decode;
pub mod discovery;
pub mod mask;
pub mod metrics;
pub mod normalize;
pub mod processor;
pub mod regions;
pub mod render;
pub mod validate;

// Re-exports for convenient access
pub use batch::BatchRunner;
pub use decode::{encode_png, ImageDecoder};
pub use discovery::PageDiscovery;
pub use mask::compute_mask;
pub use normalize::{normalize, NormalizedPair, Placement};
pub use processor::{DiffOutput, DiffProcessor, DiffResult};
pub use regions::extract_boxes;
pub use render::{DiffRenderer, Severity};
pub use validate::Validator;
