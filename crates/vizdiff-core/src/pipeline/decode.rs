//! Screenshot decoding and artifact encoding.

use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::path::Path;

use crate::config::LimitsConfig;
use crate::error::PipelineError;

use super::validate::Validator;

/// Image decoder with configurable limits.
pub struct ImageDecoder {
    validator: Validator,
}

impl ImageDecoder {
    /// Create a new decoder with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self {
            validator: Validator::new(limits),
        }
    }

    /// Validate, read and decode a screenshot.
    ///
    /// The format is detected from content first and only falls back to the
    /// file extension when sniffing fails.
    pub fn decode(&self, path: &Path) -> Result<DynamicImage, PipelineError> {
        self.validator.validate(path)?;

        let bytes = std::fs::read(path).map_err(|e| PipelineError::Decode {
            path: path.to_path_buf(),
            message: format!("Cannot read file: {}", e),
        })?;
        let image = Self::decode_bytes(bytes, path)?;
        self.validator.check_dimensions(&image, path)?;

        tracing::trace!(
            "Decoded {:?} ({}x{}, {:?})",
            path,
            image.width(),
            image.height(),
            image.color()
        );
        Ok(image)
    }

    fn decode_bytes(bytes: Vec<u8>, path: &Path) -> Result<DynamicImage, PipelineError> {
        let mut reader = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| PipelineError::Decode {
                path: path.to_path_buf(),
                message: format!("Cannot detect image format: {}", e),
            })?;
        if reader.format().is_none() {
            let format =
                ImageFormat::from_path(path).map_err(|_| PipelineError::UnsupportedFormat {
                    path: path.to_path_buf(),
                    format: path
                        .extension()
                        .and_then(|e| e.to_str())
                        .unwrap_or("unknown")
                        .to_string(),
                })?;
            reader.set_format(format);
        }
        reader.decode().map_err(|e| PipelineError::Decode {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// Write a rendered image as PNG, creating parent directories.
pub fn encode_png(image: &DynamicImage, path: &Path) -> Result<(), PipelineError> {
    let encode_err = |message: String| PipelineError::Encode {
        path: path.to_path_buf(),
        message,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| encode_err(format!("Cannot create directory: {}", e)))?;
    }
    image
        .save_with_format(path, ImageFormat::Png)
        .map_err(|e| encode_err(e.to_string()))
}
