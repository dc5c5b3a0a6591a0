//! Conversion routing.
//!
//! The conversion matrix is data, not code: every supported conversion is a
//! [`ConversionPath`] row naming its source, target, the platforms it works
//! on and the external converter that implements it. Adding a conversion is
//! a table edit.
//!
//! ## Uniqueness
//!
//! For any `(source, target, platform)` there is at most one path.
//! [`ConversionMatrix::new`] rejects tables that break this, and rejects
//! identity rows (`source == target`). Lookups go through a composite-key
//! index, so resolution never depends on scan order.
//!
//! ## Platform gating
//!
//! Some engines exist on one platform only (HEIC encoding, for instance),
//! so support is recorded per platform and never assumed symmetric.

use crate::formats::ConverterId::{GenericCompressor, GenericManipulator, HeicSpecialist};
use crate::formats::ImageFormat::{Avif, Bmp, Heic, Jpeg, Png, Tiff, Webp};
use crate::formats::{ConverterId, ImageFormat, Platform};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatrixError {
    #[error("Duplicate conversion path {from} -> {to} on {platform} (rows {first} and {second})")]
    Duplicate {
        from: ImageFormat,
        to: ImageFormat,
        platform: Platform,
        first: usize,
        second: usize,
    },
    #[error("Conversion path {0} -> {0} converts a format to itself (row {1})")]
    IdentityPath(ImageFormat, usize),
}

/// Per-platform availability of a conversion path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformSupport {
    pub ios: bool,
    pub android: bool,
}

impl PlatformSupport {
    pub const BOTH: Self = Self {
        ios: true,
        android: true,
    };
    pub const IOS_ONLY: Self = Self {
        ios: true,
        android: false,
    };

    pub fn supports(self, platform: Platform) -> bool {
        match platform {
            Platform::Ios => self.ios,
            Platform::Android => self.android,
        }
    }
}

/// One directed, platform-scoped edge of the conversion graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionPath {
    pub source: ImageFormat,
    pub target: ImageFormat,
    pub platform_support: PlatformSupport,
    pub converter: ConverterId,
    /// Rollout tier: 1 for the core conversions, 2 for the extended set.
    pub phase: u8,
}

impl ConversionPath {
    const fn new(
        source: ImageFormat,
        target: ImageFormat,
        platform_support: PlatformSupport,
        converter: ConverterId,
        phase: u8,
    ) -> Self {
        Self {
            source,
            target,
            platform_support,
            converter,
            phase,
        }
    }
}

/// The built-in table. Row order is the order targets are offered in.
const STANDARD_PATHS: &[ConversionPath] = &[
    // Phase 1
    ConversionPath::new(Jpeg, Png, PlatformSupport::BOTH, GenericManipulator, 1),
    ConversionPath::new(Png, Jpeg, PlatformSupport::BOTH, GenericManipulator, 1),
    ConversionPath::new(Webp, Png, PlatformSupport::BOTH, GenericManipulator, 1),
    ConversionPath::new(Webp, Jpeg, PlatformSupport::BOTH, GenericManipulator, 1),
    ConversionPath::new(Heic, Jpeg, PlatformSupport::BOTH, HeicSpecialist, 1),
    ConversionPath::new(Heic, Png, PlatformSupport::BOTH, HeicSpecialist, 1),
    ConversionPath::new(Bmp, Png, PlatformSupport::BOTH, GenericManipulator, 1),
    // Phase 2
    ConversionPath::new(Jpeg, Heic, PlatformSupport::IOS_ONLY, GenericCompressor, 2),
    ConversionPath::new(Png, Heic, PlatformSupport::IOS_ONLY, GenericCompressor, 2),
    ConversionPath::new(Tiff, Jpeg, PlatformSupport::IOS_ONLY, GenericManipulator, 2),
    ConversionPath::new(Avif, Jpeg, PlatformSupport::BOTH, GenericManipulator, 2),
    ConversionPath::new(Avif, Png, PlatformSupport::BOTH, GenericManipulator, 2),
];

static STANDARD: LazyLock<ConversionMatrix> = LazyLock::new(|| {
    ConversionMatrix::new(STANDARD_PATHS.to_vec()).expect("built-in conversion matrix must be valid")
});

/// An immutable, validated conversion table.
#[derive(Debug, Clone)]
pub struct ConversionMatrix {
    paths: Vec<ConversionPath>,
    index: HashMap<(ImageFormat, ImageFormat, Platform), usize>,
}

impl ConversionMatrix {
    /// Validate and index a table.
    pub fn new(paths: Vec<ConversionPath>) -> Result<Self, MatrixError> {
        let mut index = HashMap::new();
        for (row, path) in paths.iter().enumerate() {
            if path.source == path.target {
                return Err(MatrixError::IdentityPath(path.source, row));
            }
            for platform in Platform::ALL {
                if !path.platform_support.supports(platform) {
                    continue;
                }
                if let Some(&first) = index.get(&(path.source, path.target, platform)) {
                    return Err(MatrixError::Duplicate {
                        from: path.source,
                        to: path.target,
                        platform,
                        first,
                        second: row,
                    });
                }
                index.insert((path.source, path.target, platform), row);
            }
        }
        Ok(Self { paths, index })
    }

    /// The process-wide built-in matrix.
    pub fn standard() -> &'static ConversionMatrix {
        &STANDARD
    }

    /// All rows in declaration order.
    pub fn paths(&self) -> &[ConversionPath] {
        &self.paths
    }

    /// Every target reachable from `source` on `platform`, in row order.
    pub fn available_targets(&self, source: ImageFormat, platform: Platform) -> Vec<ImageFormat> {
        self.paths
            .iter()
            .filter(|p| p.source == source && p.platform_support.supports(platform))
            .map(|p| p.target)
            .collect()
    }

    pub fn resolve_path(
        &self,
        source: ImageFormat,
        target: ImageFormat,
        platform: Platform,
    ) -> Option<&ConversionPath> {
        self.index
            .get(&(source, target, platform))
            .map(|&row| &self.paths[row])
    }

    pub fn is_supported(&self, source: ImageFormat, target: ImageFormat, platform: Platform) -> bool {
        self.resolve_path(source, target, platform).is_some()
    }
}

/// [`ConversionMatrix::available_targets`] on the built-in matrix.
pub fn available_targets(source: ImageFormat, platform: Platform) -> Vec<ImageFormat> {
    ConversionMatrix::standard().available_targets(source, platform)
}

/// [`ConversionMatrix::resolve_path`] on the built-in matrix.
pub fn resolve_path(
    source: ImageFormat,
    target: ImageFormat,
    platform: Platform,
) -> Option<&'static ConversionPath> {
    ConversionMatrix::standard().resolve_path(source, target, platform)
}

/// [`ConversionMatrix::is_supported`] on the built-in matrix.
pub fn is_supported(source: ImageFormat, target: ImageFormat, platform: Platform) -> bool {
    ConversionMatrix::standard().is_supported(source, target, platform)
}
