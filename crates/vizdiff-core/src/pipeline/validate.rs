//! Input validation before and after decoding.

use std::io::Read;
use std::path::Path;

use image::DynamicImage;

use crate::config::LimitsConfig;
use crate::error::PipelineError;

/// Validates screenshot files before decoding.
pub struct Validator {
    limits: LimitsConfig,
}

impl Validator {
    /// Create a new validator with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Perform quick validation before full decode.
    ///
    /// Checks:
    /// - File exists and is readable
    /// - File size is within limits
    /// - File has valid image magic bytes
    pub fn validate(&self, path: &Path) -> Result<(), PipelineError> {
        if !path.exists() {
            return Err(PipelineError::FileNotFound(path.to_path_buf()));
        }

        let metadata = std::fs::metadata(path).map_err(|e| PipelineError::Decode {
            path: path.to_path_buf(),
            message: format!("Cannot read metadata: {}", e),
        })?;

        let max_bytes = self.limits.max_file_size_mb * 1024 * 1024;
        if metadata.len() > max_bytes {
            return Err(PipelineError::FileTooLarge {
                path: path.to_path_buf(),
                size_mb: metadata.len() / (1024 * 1024),
                max_mb: self.limits.max_file_size_mb,
            });
        }

        self.check_magic_bytes(path)
    }

    fn check_magic_bytes(&self, path: &Path) -> Result<(), PipelineError> {
        let mut file = std::fs::File::open(path).map_err(|e| PipelineError::Decode {
            path: path.to_path_buf(),
            message: format!("Cannot open file: {}", e),
        })?;

        let mut header = [0u8; 12];
        let bytes_read = file.read(&mut header).unwrap_or(0);

        if bytes_read < 4 {
            return Err(PipelineError::Decode {
                path: path.to_path_buf(),
                message: "File too small to be a valid image".to_string(),
            });
        }

        if !Self::is_valid_image_header(&header, bytes_read) {
            return Err(PipelineError::Decode {
                path: path.to_path_buf(),
                message: "Unrecognized image format (invalid magic bytes)".to_string(),
            });
        }

        Ok(())
    }

    /// Check if the header bytes match a format the decoder is built with.
    fn is_valid_image_header(header: &[u8; 12], bytes_read: usize) -> bool {
        if bytes_read < 4 {
            return false;
        }

        // PNG: 89 50 4E 47
        if header[..4] == [0x89, b'P', b'N', b'G'] {
            return true;
        }

        // JPEG: FF D8 FF
        if header[..3] == [0xFF, 0xD8, 0xFF] {
            return true;
        }

        // GIF: GIF8
        if &header[..4] == b"GIF8" {
            return true;
        }

        // WebP: RIFF....WEBP
        if &header[..4] == b"RIFF" {
            if bytes_read >= 12 {
                return &header[8..12] == b"WEBP";
            }
            return true;
        }

        // BMP: BM
        if &header[..2] == b"BM" {
            return true;
        }

        // TIFF: II*\0 (little-endian) or MM\0* (big-endian)
        header[..4] == [b'I', b'I', 0x2A, 0x00] || header[..4] == [b'M', b'M', 0x00, 0x2A]
    }

    /// Reject decoded images whose dimensions exceed the limit.
    pub fn check_dimensions(&self, image: &DynamicImage, path: &Path) -> Result<(), PipelineError> {
        let (width, height) = (image.width(), image.height());
        let max_dim = self.limits.max_image_dimension;
        if width > max_dim || height > max_dim {
            return Err(PipelineError::ImageTooLarge {
                path: path.to_path_buf(),
                width,
                height,
                max_dim,
            });
        }
        Ok(())
    }
}

/// Check a decoded pair before diffing.
///
/// Differing color types are not an error (both sides are normalized to
/// RGBA) but usually mean the captures came from different pipelines.
pub fn check_pair(staging: &DynamicImage, production: &DynamicImage) {
    if staging.color() != production.color() {
        tracing::warn!(
            "Images have different color types: {:?} vs {:?}",
            staging.color(),
            production.color()
        );
    }
}
