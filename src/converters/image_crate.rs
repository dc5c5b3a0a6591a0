//! Converter backed by the `image` crate.
//!
//! Registered as the `generic-manipulator` engine.
//!
//! | Target | Encoder |
//! |---|---|
//! | JPEG | `JpegEncoder` at [`Quality::percent`](super::Quality::percent), alpha dropped |
//! | AVIF | `AvifEncoder` (rav1e, speed 6) at the same quality |
//! | PNG, TIFF | lossless, pixel layout kept |
//! | BMP, GIF, WebP | RGBA8 (WebP is lossless only) |
//! | HEIC | not available |
//!
//! Decoding covers JPEG, PNG, WebP, BMP, TIFF and GIF through the `image`
//! crate, and AVIF through [`avif`](super::avif) since the `"avif"` feature
//! only compiles the encoder. EXIF and other metadata are not carried across.

use super::avif::decode_avif;
use super::backend::{Converter, ConverterError, Dimensions, wrote_output};
use super::params::ConvertParams;
use crate::detect;
use crate::formats::ImageFormat;
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat as Codec, ImageReader};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

fn codec_for(format: ImageFormat) -> Option<Codec> {
    match format {
        ImageFormat::Jpeg => Some(Codec::Jpeg),
        ImageFormat::Png => Some(Codec::Png),
        ImageFormat::Webp => Some(Codec::WebP),
        ImageFormat::Bmp => Some(Codec::Bmp),
        ImageFormat::Tiff => Some(Codec::Tiff),
        ImageFormat::Avif => Some(Codec::Avif),
        ImageFormat::Gif => Some(Codec::Gif),
        ImageFormat::Heic => None,
    }
}

pub struct ImageCrateConverter;

impl ImageCrateConverter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageCrateConverter {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode from content, not extension: sources often arrive without one.
fn load_image(path: &Path) -> Result<DynamicImage, ConverterError> {
    if detect::detect_from_file(path) == Some(ImageFormat::Avif) {
        return decode_avif(path);
    }
    let reader = ImageReader::open(path)?.with_guessed_format()?;
    if reader.format().is_none() {
        return Err(ConverterError::UnsupportedSource {
            format: "unrecognised".into(),
        });
    }
    reader.decode().map_err(|e| {
        ConverterError::Failed(format!("Failed to decode {}: {e}", path.display()))
    })
}

fn create_writer(path: &Path) -> Result<BufWriter<File>, ConverterError> {
    Ok(BufWriter::new(File::create(path)?))
}

fn encode(img: DynamicImage, params: &ConvertParams) -> Result<(), ConverterError> {
    let target = params.options.target_format;
    let quality = params.options.quality.percent();
    let output = params.output.as_path();
    let encode_err = |e: image::ImageError| {
        ConverterError::Failed(format!("{} encode failed: {e}", target.label()))
    };

    match target {
        ImageFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            let encoder = JpegEncoder::new_with_quality(create_writer(output)?, quality);
            rgb.write_with_encoder(encoder).map_err(encode_err)
        }
        ImageFormat::Avif => {
            let encoder = AvifEncoder::new_with_speed_quality(create_writer(output)?, 6, quality);
            img.write_with_encoder(encoder).map_err(encode_err)
        }
        ImageFormat::Png | ImageFormat::Tiff => img
            .save_with_format(output, codec_for(target).unwrap_or(Codec::Png))
            .map_err(encode_err),
        ImageFormat::Bmp | ImageFormat::Gif | ImageFormat::Webp => {
            let codec = codec_for(target).ok_or(ConverterError::UnsupportedTarget(target))?;
            DynamicImage::ImageRgba8(img.to_rgba8())
                .save_with_format(output, codec)
                .map_err(encode_err)
        }
        ImageFormat::Heic => Err(ConverterError::UnsupportedTarget(target)),
    }
}

impl Converter for ImageCrateConverter {
    fn convert(
        &self,
        params: &ConvertParams,
        progress: &dyn Fn(f32),
    ) -> Result<(), ConverterError> {
        let target = params.options.target_format;
        if !self.can_encode(target) {
            return Err(ConverterError::UnsupportedTarget(target));
        }
        if params.options.preserve_metadata {
            tracing::warn!(
                source = %params.source.display(),
                "metadata preservation requested; the image-crate converter drops EXIF"
            );
        }

        let img = load_image(&params.source)?;
        progress(0.5);
        encode(img, params)?;

        if !wrote_output(&params.output) {
            return Err(ConverterError::Failed(format!(
                "Encoder produced no output at {}",
                params.output.display()
            )));
        }
        progress(1.0);
        Ok(())
    }

    fn can_encode(&self, format: ImageFormat) -> bool {
        codec_for(format).is_some_and(|codec| codec.writing_enabled())
    }
}

/// Read image dimensions from headers only.
///
/// AVIF goes through container metadata (`avif-parse`), which avoids a full
/// AV1 decode. Returns `None` for anything that can't be probed, HEIC
/// included.
pub fn read_dimensions(path: &Path, format: ImageFormat) -> Option<Dimensions> {
    if format == ImageFormat::Avif {
        return read_avif_dimensions(path);
    }
    let reader = ImageReader::open(path).ok()?.with_guessed_format().ok()?;
    let (width, height) = reader.into_dimensions().ok()?;
    Some(Dimensions { width, height })
}

fn read_avif_dimensions(path: &Path) -> Option<Dimensions> {
    let file_data = std::fs::read(path).ok()?;
    let avif = avif_parse::read_avif(&mut std::io::Cursor::new(&file_data))
        .map_err(|e| tracing::debug!(path = %path.display(), error = ?e, "AVIF parse failed"))
        .ok()?;
    let meta = avif.primary_item_metadata().ok()?;
    Some(Dimensions {
        width: meta.max_frame_width.get(),
        height: meta.max_frame_height.get(),
    })
}
