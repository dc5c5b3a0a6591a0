//! Image format detection.
//!
//! Detection runs in two stages:
//!
//! 1. **Name**: [`detect_from_name`] matches the file name against each
//!    format's canonical extensions. Cheap, no I/O.
//! 2. **Content**: [`detect_from_content`] inspects the first
//!    [`SIGNATURE_LEN`] bytes against known magic numbers. Used when the name
//!    says nothing (camera captures, content URIs, extension-less temp files).
//!
//! [`detect`] applies both in that order. Failing to recognise a file is a
//! normal outcome (`None`), not an error; callers turn it into an
//! "unsupported format" message. I/O failures while reading the prefix are
//! logged and folded into the same `None`.
//!
//! ## Signature order
//!
//! | # | Format | Bytes |
//! |---|--------|-------|
//! | 1 | JPEG | `FF D8 FF` @0 |
//! | 2 | PNG | `89 50 4E 47` @0 |
//! | 3 | GIF | `47 49 46` @0 |
//! | 4 | BMP | `42 4D` @0 |
//! | 5 | WebP | `RIFF` @0 + `WEBP` @8 |
//! | 6 | AVIF / HEIC | `ftyp` @4, brand @8 |
//! | 7 | TIFF | `49 49` or `4D 4D` @0 |
//!
//! TIFF's two-byte check is the weakest and must stay last.

use crate::formats::ImageFormat;
use std::borrow::Cow;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Number of leading bytes read for content detection.
pub const SIGNATURE_LEN: usize = 32;

/// Which stage recognised the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionMethod {
    Name,
    Content,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detection {
    pub format: ImageFormat,
    pub method: DetectionMethod,
}

/// A file reference detection can work with: a name, and a way to read its
/// first bytes. Detection never needs the whole file.
pub trait ImageSource {
    fn name(&self) -> Cow<'_, str>;

    /// Fill `buf` from the start of the file. Returns the number of bytes
    /// read, which is less than `buf.len()` only at end of file.
    fn read_prefix(&self, buf: &mut [u8]) -> io::Result<usize>;
}

impl ImageSource for Path {
    fn name(&self) -> Cow<'_, str> {
        self.file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| self.to_string_lossy())
    }

    fn read_prefix(&self, buf: &mut [u8]) -> io::Result<usize> {
        let mut file = File::open(self)?;
        let mut filled = 0;
        while filled < buf.len() {
            match file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }
}

impl ImageSource for PathBuf {
    fn name(&self) -> Cow<'_, str> {
        self.as_path().name()
    }

    fn read_prefix(&self, buf: &mut [u8]) -> io::Result<usize> {
        self.as_path().read_prefix(buf)
    }
}

/// Detect a format from a file name or URI.
///
/// Anything from the first `?` on is dropped, the rest is lowercased and
/// tested with "ends with" against each format's extensions in
/// [`ImageFormat::ALL`] order.
pub fn detect_from_name(name: &str) -> Option<ImageFormat> {
    let without_query = name.split('?').next().unwrap_or_default();
    if without_query.is_empty() {
        return None;
    }
    let normalized = without_query.to_lowercase();
    ImageFormat::ALL.into_iter().find(|format| {
        format
            .extensions()
            .iter()
            .any(|ext| normalized.ends_with(ext))
    })
}

/// `true` when `bytes` holds `pattern` starting at `offset`. Short buffers
/// never match.
fn has_at(bytes: &[u8], offset: usize, pattern: &[u8]) -> bool {
    bytes
        .get(offset..offset + pattern.len())
        .is_some_and(|window| window == pattern)
}

fn is_jpeg(b: &[u8]) -> Option<ImageFormat> {
    has_at(b, 0, &[0xFF, 0xD8, 0xFF]).then_some(ImageFormat::Jpeg)
}

fn is_png(b: &[u8]) -> Option<ImageFormat> {
    has_at(b, 0, &[0x89, 0x50, 0x4E, 0x47]).then_some(ImageFormat::Png)
}

fn is_gif(b: &[u8]) -> Option<ImageFormat> {
    has_at(b, 0, b"GIF").then_some(ImageFormat::Gif)
}

fn is_bmp(b: &[u8]) -> Option<ImageFormat> {
    has_at(b, 0, b"BM").then_some(ImageFormat::Bmp)
}

fn is_webp(b: &[u8]) -> Option<ImageFormat> {
    (has_at(b, 0, b"RIFF") && has_at(b, 8, b"WEBP")).then_some(ImageFormat::Webp)
}

/// ISO base media file: `ftyp` box at offset 4, major brand at 8.
fn is_isobmff_image(b: &[u8]) -> Option<ImageFormat> {
    if !has_at(b, 4, b"ftyp") {
        return None;
    }
    match b.get(8..12)? {
        b"avif" | b"avis" => Some(ImageFormat::Avif),
        b"heic" | b"heix" | b"mif1" => Some(ImageFormat::Heic),
        _ => None,
    }
}

fn is_tiff(b: &[u8]) -> Option<ImageFormat> {
    (has_at(b, 0, b"II") || has_at(b, 0, b"MM")).then_some(ImageFormat::Tiff)
}

type SignatureCheck = fn(&[u8]) -> Option<ImageFormat>;

/// Evaluated in order; first hit wins.
const SIGNATURES: &[SignatureCheck] = &[
    is_jpeg,
    is_png,
    is_gif,
    is_bmp,
    is_webp,
    is_isobmff_image,
    is_tiff,
];

/// Detect a format from the leading bytes of a file.
///
/// Only the first [`SIGNATURE_LEN`] bytes are considered. Buffers shorter
/// than a signature simply don't match it.
pub fn detect_from_content(bytes: &[u8]) -> Option<ImageFormat> {
    let prefix = &bytes[..bytes.len().min(SIGNATURE_LEN)];
    SIGNATURES.iter().find_map(|check| check(prefix))
}

/// Read the signature prefix of `source` and detect from its content.
///
/// A failed read (missing file, permissions, directory) is logged and
/// reported as `None`.
pub fn detect_from_source<S: ImageSource + ?Sized>(source: &S) -> Option<ImageFormat> {
    let mut buf = [0u8; SIGNATURE_LEN];
    match source.read_prefix(&mut buf) {
        Ok(n) => detect_from_content(&buf[..n]),
        Err(e) => {
            tracing::debug!(name = %source.name(), error = %e, "signature read failed");
            None
        }
    }
}

/// [`detect_from_source`] for a filesystem path.
pub fn detect_from_file(path: &Path) -> Option<ImageFormat> {
    detect_from_source(path)
}

/// Name first, content second.
pub fn detect<S: ImageSource + ?Sized>(source: &S) -> Option<Detection> {
    if let Some(format) = detect_from_name(&source.name()) {
        return Some(Detection {
            format,
            method: DetectionMethod::Name,
        });
    }
    let format = detect_from_source(source)?;
    tracing::debug!(name = %source.name(), %format, "recognised by content");
    Some(Detection {
        format,
        method: DetectionMethod::Content,
    })
}

pub fn detect_format<S: ImageSource + ?Sized>(source: &S) -> Option<ImageFormat> {
    detect(source).map(|d| d.format)
}
