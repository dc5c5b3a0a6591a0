//! Format vocabulary shared by detection, routing and conversion.
//!
//! Three closed sets live here:
//!
//! - [`ImageFormat`]: the eight encodings the tool understands, each with a
//!   display label, canonical extensions, MIME type and lossy flag.
//! - [`Platform`]: the operating environments whose converter availability
//!   gates which conversions are offered.
//! - [`ConverterId`]: opaque names for the external engines that do the
//!   pixel work. The router hands one back; only the dispatcher looks inside.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatParseError {
    #[error("Unknown image format: {0}")]
    UnknownFormat(String),
    #[error("Unknown platform: {0} (expected ios or android)")]
    UnknownPlatform(String),
}

/// An image encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
    Webp,
    Heic,
    Bmp,
    Tiff,
    Avif,
    Gif,
}

impl ImageFormat {
    /// All formats in declaration order. Name-based detection scans in this order.
    pub const ALL: [ImageFormat; 8] = [
        ImageFormat::Jpeg,
        ImageFormat::Png,
        ImageFormat::Webp,
        ImageFormat::Heic,
        ImageFormat::Bmp,
        ImageFormat::Tiff,
        ImageFormat::Avif,
        ImageFormat::Gif,
    ];

    /// Stable lowercase identifier, matching the serialized form.
    pub fn id(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
            ImageFormat::Webp => "webp",
            ImageFormat::Heic => "heic",
            ImageFormat::Bmp => "bmp",
            ImageFormat::Tiff => "tiff",
            ImageFormat::Avif => "avif",
            ImageFormat::Gif => "gif",
        }
    }

    /// Human-facing label, e.g. `WebP`.
    pub fn label(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "JPEG",
            ImageFormat::Png => "PNG",
            ImageFormat::Webp => "WebP",
            ImageFormat::Heic => "HEIC",
            ImageFormat::Bmp => "BMP",
            ImageFormat::Tiff => "TIFF",
            ImageFormat::Avif => "AVIF",
            ImageFormat::Gif => "GIF",
        }
    }

    /// Canonical file extensions, dot included. The first one is used for
    /// naming converted files.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            ImageFormat::Jpeg => &[".jpg", ".jpeg"],
            ImageFormat::Png => &[".png"],
            ImageFormat::Webp => &[".webp"],
            ImageFormat::Heic => &[".heic", ".heif"],
            ImageFormat::Bmp => &[".bmp"],
            ImageFormat::Tiff => &[".tif", ".tiff"],
            ImageFormat::Avif => &[".avif"],
            ImageFormat::Gif => &[".gif"],
        }
    }

    pub fn primary_extension(self) -> &'static str {
        self.extensions()[0]
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Webp => "image/webp",
            ImageFormat::Heic => "image/heic",
            ImageFormat::Bmp => "image/bmp",
            ImageFormat::Tiff => "image/tiff",
            ImageFormat::Avif => "image/avif",
            ImageFormat::Gif => "image/gif",
        }
    }

    /// Whether the encoding discards information. Quality settings only
    /// apply to lossy targets.
    pub fn is_lossy(self) -> bool {
        match self {
            ImageFormat::Jpeg
            | ImageFormat::Webp
            | ImageFormat::Heic
            | ImageFormat::Avif
            | ImageFormat::Gif => true,
            ImageFormat::Png | ImageFormat::Bmp | ImageFormat::Tiff => false,
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Accepts the identifier (`jpeg`), the label (`WebP`) or any canonical
/// extension with or without the dot (`jpg`, `.tif`), case-insensitively.
impl FromStr for ImageFormat {
    type Err = FormatParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().trim_start_matches('.').to_ascii_lowercase();
        ImageFormat::ALL
            .into_iter()
            .find(|format| {
                format.id() == wanted
                    || format.label().eq_ignore_ascii_case(&wanted)
                    || format
                        .extensions()
                        .iter()
                        .any(|ext| ext.trim_start_matches('.') == wanted)
            })
            .ok_or_else(|| FormatParseError::UnknownFormat(s.to_string()))
    }
}

/// Target operating environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Android,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::Ios, Platform::Android];

    pub fn id(self) -> &'static str {
        match self {
            Platform::Ios => "ios",
            Platform::Android => "android",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Platform {
    type Err = FormatParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ios" => Ok(Platform::Ios),
            "android" => Ok(Platform::Android),
            _ => Err(FormatParseError::UnknownPlatform(s.to_string())),
        }
    }
}

/// Which external engine implements a conversion path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConverterId {
    GenericManipulator,
    HeicSpecialist,
    GenericCompressor,
}

impl ConverterId {
    pub fn id(self) -> &'static str {
        match self {
            ConverterId::GenericManipulator => "generic-manipulator",
            ConverterId::HeicSpecialist => "heic-specialist",
            ConverterId::GenericCompressor => "generic-compressor",
        }
    }
}

impl fmt::Display for ConverterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}
