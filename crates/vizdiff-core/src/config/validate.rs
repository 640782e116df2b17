//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.diff.per_pixel_threshold;
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(ConfigError::ValidationError(
                "diff.per_pixel_threshold must be a finite value >= 0".into(),
            ));
        }
        if !self.diff.blur_radius.is_finite() || self.diff.blur_radius < 0.0 {
            return Err(ConfigError::ValidationError(
                "diff.blur_radius must be >= 0".into(),
            ));
        }
        if self.batch.batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "batch.batch_size must be > 0".into(),
            ));
        }
        if self.batch.pause_poll_ms == 0 {
            return Err(ConfigError::ValidationError(
                "batch.pause_poll_ms must be > 0".into(),
            ));
        }
        if self.render.outline_area_factor == 0 {
            return Err(ConfigError::ValidationError(
                "render.outline_area_factor must be > 0".into(),
            ));
        }
        if self.render.moderate_area > self.render.major_area {
            return Err(ConfigError::ValidationError(
                "render.moderate_area must not exceed render.major_area".into(),
            ));
        }
        if self.limits.max_file_size_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_file_size_mb must be > 0".into(),
            ));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be > 0".into(),
            ));
        }
        Ok(())
    }
}
