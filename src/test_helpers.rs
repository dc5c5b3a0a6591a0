//! Shared test utilities.
//!
//! Fixture files are generated on the fly into a temp dir: real PNGs and
//! AVIFs via the `image` crate for the converter tests, and bare 32-byte signature
//! prefixes for detection and routing tests that never decode pixels.
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = tempfile::TempDir::new().unwrap();
//! let heic = write_file(tmp.path(), "IMG_0001", &signature_bytes(ImageFormat::Heic));
//! assert_eq!(detect_from_file(&heic), Some(ImageFormat::Heic));
//! ```

use std::borrow::Cow;
use std::io;
use std::path::{Path, PathBuf};

use crate::converters::ConversionOptions;
use crate::detect::{ImageSource, SIGNATURE_LEN};
use crate::formats::{ConverterId, ImageFormat};
use crate::types::{ConversionResult, ImageAsset};

// =========================================================================
// In-memory sources
// =========================================================================

/// An [`ImageSource`] backed by a byte vector, or one whose reads always fail.
pub struct MemorySource {
    name: String,
    bytes: Option<Vec<u8>>,
}

impl MemorySource {
    pub fn new(name: &str, bytes: Vec<u8>) -> Self {
        Self {
            name: name.to_string(),
            bytes: Some(bytes),
        }
    }

    pub fn failing(name: &str) -> Self {
        Self {
            name: name.to_string(),
            bytes: None,
        }
    }
}

impl ImageSource for MemorySource {
    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.name)
    }

    fn read_prefix(&self, buf: &mut [u8]) -> io::Result<usize> {
        let bytes = self.bytes.as_ref().ok_or_else(|| {
            io::Error::new(io::ErrorKind::PermissionDenied, "simulated read failure")
        })?;
        let n = bytes.len().min(buf.len());
        buf[..n].copy_from_slice(&bytes[..n]);
        Ok(n)
    }
}

// =========================================================================
// Signature prefixes
// =========================================================================

/// A zero-padded prefix carrying just the magic bytes for `format`.
pub fn signature_bytes(format: ImageFormat) -> [u8; SIGNATURE_LEN] {
    let mut bytes = [0u8; SIGNATURE_LEN];
    let mut put = |offset: usize, pattern: &[u8]| {
        bytes[offset..offset + pattern.len()].copy_from_slice(pattern);
    };
    match format {
        ImageFormat::Jpeg => put(0, &[0xFF, 0xD8, 0xFF, 0xE0]),
        ImageFormat::Png => put(0, &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]),
        ImageFormat::Gif => put(0, b"GIF89a"),
        ImageFormat::Bmp => put(0, b"BM"),
        ImageFormat::Tiff => put(0, &[0x49, 0x49, 0x2A, 0x00]),
        ImageFormat::Webp => {
            put(0, b"RIFF");
            put(4, &[0x24, 0x00, 0x00, 0x00]);
            put(8, b"WEBPVP8 ");
        }
        ImageFormat::Heic => {
            put(0, &[0x00, 0x00, 0x00, 0x18]);
            put(4, b"ftypheic");
        }
        ImageFormat::Avif => {
            put(0, &[0x00, 0x00, 0x00, 0x1C]);
            put(4, b"ftypavif");
        }
    }
    bytes
}

// =========================================================================
// Files on disk
// =========================================================================

/// Write `bytes` to `dir/name`, creating `dir` if needed.
pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

/// Write a real RGB gradient PNG.
pub fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    img.save_with_format(&path, image::ImageFormat::Png).unwrap();
    path
}

/// Write a real RGBA PNG with a transparent left half.
pub fn write_rgba_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    let img = image::RgbaImage::from_fn(width, height, |x, _| {
        let alpha = if x < width / 2 { 0 } else { 255 };
        image::Rgba([200, 50, 50, alpha])
    });
    img.save_with_format(&path, image::ImageFormat::Png).unwrap();
    path
}

/// Write a real AVIF through the `image` crate's rav1e encoder.
pub fn write_avif(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x * 8 % 256) as u8, (y * 8 % 256) as u8, 60])
    });
    let writer = std::io::BufWriter::new(std::fs::File::create(&path).unwrap());
    let encoder = image::codecs::avif::AvifEncoder::new_with_speed_quality(writer, 10, 80);
    image::DynamicImage::ImageRgb8(img)
        .write_with_encoder(encoder)
        .unwrap();
    path
}

// =========================================================================
// Results
// =========================================================================

fn asset(path: &str, format: ImageFormat, file_size: u64) -> ImageAsset {
    let path = PathBuf::from(path);
    ImageAsset {
        file_name: path.file_name().unwrap().to_string_lossy().into_owned(),
        path,
        format,
        mime_type: format.mime_type().to_string(),
        file_size,
        dimensions: None,
    }
}

/// A plausible HEIC → JPEG result with the given id.
pub fn sample_result(id: &str) -> ConversionResult {
    ConversionResult {
        id: id.to_string(),
        source: asset("/photos/IMG_0001.heic", ImageFormat::Heic, 2_400_000),
        output: asset(
            "/data/converted/converted_1700000000000_abc123.jpg",
            ImageFormat::Jpeg,
            1_100_000,
        ),
        options: ConversionOptions::new(ImageFormat::Jpeg),
        converter: ConverterId::HeicSpecialist,
        processing_time_ms: 840,
        timestamp: 1_700_000_000_000,
    }
}
