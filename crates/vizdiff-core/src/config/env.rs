//! `DIFF_*` environment overrides.

use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Apply overrides from `(key, value)` pairs, typically `std::env::vars()`.
    ///
    /// Unknown keys are ignored. Booleans are true only for a case-insensitive
    /// `"true"`; numbers that fail to parse are reported as errors.
    pub fn apply_env_overrides<I, K, V>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let (key, value) = (key.as_ref(), value.as_ref().trim());
            match key {
                "DIFF_PER_PIXEL_THRESHOLD" => self.diff.per_pixel_threshold = parse(key, value)?,
                "DIFF_MIN_DIFF_AREA" => self.diff.min_diff_area = parse(key, value)?,
                "DIFF_OVERLAY_ALPHA" => self.diff.overlay_alpha = parse(key, value)?,
                "DIFF_BATCH_SIZE" => self.batch.batch_size = parse(key, value)?,
                "DIFF_PAUSE_POLL_MS" => self.batch.pause_poll_ms = parse(key, value)?,
                "DIFF_OUTPUT_DIR" => self.output.diff_dir = PathBuf::from(value),
                "DIFF_SCREENSHOT_DIR" => self.output.screenshot_dir = PathBuf::from(value),
                "DIFF_ENABLE_BLUR" => self.diff.enable_blur = flag(value),
                "DIFF_BLUR_RADIUS" => self.diff.blur_radius = parse(key, value)?,
                "DIFF_HEATMAP" => self.diff.enable_heatmap = flag(value),
                "DIFF_DILATE_ITERATIONS" => self.diff.dilate_iterations = parse(key, value)?,
                "DIFF_ERODE_ITERATIONS" => self.diff.erode_iterations = parse(key, value)?,
                _ => {}
            }
        }
        Ok(())
    }
}

fn parse<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::InvalidEnv {
        key: key.to_string(),
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn flag(value: &str) -> bool {
    value.eq_ignore_ascii_case("true")
}
