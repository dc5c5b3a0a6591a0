//! Converter trait and shared types.
//!
//! A [`Converter`] is the seam between this crate and whatever library does
//! the actual decoding and encoding. The router only ever names a
//! [`ConverterId`](crate::formats::ConverterId); the
//! [`ConverterRegistry`](super::ConverterRegistry) maps that name to one of
//! these.
//!
//! Contract: given a readable source file and [`ConvertParams`], write a new
//! file in the target format at `params.output`, or fail. Fractional progress
//! in `[0, 1]` may be reported through the callback; reporting is optional.

use super::params::ConvertParams;
use crate::formats::ImageFormat;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConverterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cannot decode {format} sources with this converter")]
    UnsupportedSource { format: String },
    #[error("Cannot encode {0} with this converter")]
    UnsupportedTarget(ImageFormat),
    #[error("Conversion failed: {0}")]
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// An external conversion engine.
///
/// `Sync` so one instance can serve a parallel batch.
pub trait Converter: Sync {
    fn convert(
        &self,
        params: &ConvertParams,
        progress: &dyn Fn(f32),
    ) -> Result<(), ConverterError>;

    /// Whether this engine can produce `format` at all.
    fn can_encode(&self, format: ImageFormat) -> bool;
}

/// Convenience for tests and callers without a progress sink.
pub fn no_progress(_: f32) {}

/// `true` when `path` exists and is non-empty. Converters use this to check
/// they actually produced something.
pub(crate) fn wrote_output(path: &Path) -> bool {
    std::fs::metadata(path).is_ok_and(|m| m.len() > 0)
}
