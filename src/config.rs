//! Redaction settings shared by the library and the CLI.
//!
//! Settings can be stored as JSON; any key left out falls back to its default.

use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::codec::OutputFormat;
use crate::error::RedactionError;
use crate::redactor::DEFAULT_BLUR_STRENGTH;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedactionSettings {
    /// Gaussian sigma in pixels applied to every face region.
    pub blur_strength: f32,
    /// Encoding of the redacted output. A policy, not a per-image choice.
    pub output_format: OutputFormat,
    /// JPEG quality in percent; only used with [`OutputFormat::Jpeg`].
    pub jpeg_quality: u8,
    /// Upper bound on the face detection call, in milliseconds. `None` waits
    /// for as long as the detector takes.
    pub detection_timeout_ms: Option<u64>,
}

impl Default for RedactionSettings {
    fn default() -> Self {
        Self {
            blur_strength: DEFAULT_BLUR_STRENGTH,
            output_format: OutputFormat::Webp,
            jpeg_quality: 90,
            detection_timeout_ms: None,
        }
    }
}

impl RedactionSettings {
    /// Load settings from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        let settings: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse settings file {}", path.display()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn detection_timeout(&self) -> Option<Duration> {
        self.detection_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<(), RedactionError> {
        if !(self.blur_strength.is_finite() && self.blur_strength > 0.0) {
            return Err(RedactionError::InvalidConfig(format!(
                "blur_strength must be a positive number, got {}",
                self.blur_strength
            )));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(RedactionError::InvalidConfig(format!(
                "jpeg_quality must be between 1 and 100, got {}",
                self.jpeg_quality
            )));
        }
        Ok(())
    }
}
