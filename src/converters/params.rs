//! Parameter types for conversions.
//!
//! These describe *what* to produce, not *how*. They are the interface
//! between the pipeline (which decides source, destination and options) and
//! a [`Converter`](super::Converter) (which does the pixel work), so engines
//! can be swapped, or mocked in tests, without touching routing logic.
//!
//! - [`Quality`]: lossy encoding quality as a fraction in `0.0..=1.0`, default 0.9.
//! - [`ConversionOptions`]: target format, quality, metadata preservation.
//! - [`ConvertParams`]: a full request: source path, output path, options.

use crate::formats::ImageFormat;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Quality for lossy encoding, as a fraction (0.0 = smallest, 1.0 = best).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "f32", into = "f32")]
pub struct Quality(f32);

impl Quality {
    /// Clamped to `0.0..=1.0`; NaN becomes the default.
    pub fn new(value: f32) -> Self {
        if value.is_nan() {
            return Self::default();
        }
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(self) -> f32 {
        self.0
    }

    /// Encoder scale 1–100. Most encoders treat 0 as invalid.
    pub fn percent(self) -> u8 {
        ((self.0 * 100.0).round() as u8).clamp(1, 100)
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(0.9)
    }
}

impl From<f32> for Quality {
    fn from(value: f32) -> Self {
        Self::new(value)
    }
}

impl From<Quality> for f32 {
    fn from(quality: Quality) -> Self {
        quality.0
    }
}

/// What the caller asks of a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConversionOptions {
    pub target_format: ImageFormat,
    /// Only meaningful when the target is lossy.
    pub quality: Quality,
    pub preserve_metadata: bool,
}

impl ConversionOptions {
    pub fn new(target_format: ImageFormat) -> Self {
        Self {
            target_format,
            quality: Quality::default(),
            preserve_metadata: true,
        }
    }
}

/// A single conversion request handed to a converter.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub options: ConversionOptions,
}
