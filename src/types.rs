//! Shared types for conversion results and error reporting.
//!
//! [`ConversionResult`] is what the pipeline returns and what the history
//! store persists, so everything here round-trips through JSON.

use crate::converters::{ConversionOptions, Dimensions};
use crate::formats::{ConverterId, ImageFormat};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A file on disk together with what we know about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAsset {
    pub path: PathBuf,
    pub file_name: String,
    pub format: ImageFormat,
    pub mime_type: String,
    pub file_size: u64,
    /// `None` when the headers can't be probed (e.g. HEIC).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,
}

/// One completed conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub id: String,
    pub source: ImageAsset,
    pub output: ImageAsset,
    pub options: ConversionOptions,
    pub converter: ConverterId,
    pub processing_time_ms: u64,
    /// Unix milliseconds at completion.
    pub timestamp: u64,
}

/// User-facing classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    UnsupportedFormat,
    FileTooLarge,
    PermissionDenied,
    ProcessingFailed,
    SaveFailed,
    /// Anything without a closer code, including a source file that no
    /// longer exists. Use [`ConvertError::recoverable`](crate::convert::ConvertError::recoverable)
    /// when the retry decision matters; it knows the underlying cause.
    Unknown,
}

impl ErrorCode {
    pub fn user_message(self) -> &'static str {
        match self {
            ErrorCode::UnsupportedFormat => {
                "This format conversion is not supported on your device."
            }
            ErrorCode::FileTooLarge => "This image is too large to process. Try a smaller image.",
            ErrorCode::PermissionDenied => "Permission is required to access your photos.",
            ErrorCode::ProcessingFailed => "Failed to convert the image. Please try again.",
            ErrorCode::SaveFailed => "Could not save the image. Check your storage.",
            ErrorCode::Unknown => "Something went wrong. Please try again.",
        }
    }

    /// Retrying can't help an unsupported format; everything else may be transient.
    pub fn recoverable(self) -> bool {
        self != ErrorCode::UnsupportedFormat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unsupported_format_is_unrecoverable() {
        for code in [
            ErrorCode::FileTooLarge,
            ErrorCode::PermissionDenied,
            ErrorCode::ProcessingFailed,
            ErrorCode::SaveFailed,
            ErrorCode::Unknown,
        ] {
            assert!(code.recoverable(), "{code:?}");
        }
        assert!(!ErrorCode::UnsupportedFormat.recoverable());
    }

    #[test]
    fn error_code_serializes_screaming_snake() {
        let json = serde_json::to_string(&ErrorCode::UnsupportedFormat).unwrap();
        assert_eq!(json, "\"UNSUPPORTED_FORMAT\"");
    }

    #[test]
    fn asset_without_dimensions_omits_field() {
        let asset = ImageAsset {
            path: "/tmp/a.heic".into(),
            file_name: "a.heic".into(),
            format: ImageFormat::Heic,
            mime_type: "image/heic".into(),
            file_size: 10,
            dimensions: None,
        };
        let json = serde_json::to_string(&asset).unwrap();
        assert!(!json.contains("dimensions"));
        let back: ImageAsset = serde_json::from_str(&json).unwrap();
        assert_eq!(back, asset);
    }
}
