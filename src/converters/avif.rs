//! AVIF decoding for the `image`-crate converter.
//!
//! The `image` crate's `"avif"` feature only brings the rav1e encoder; its
//! decoder needs the C dav1d library. Instead the container is opened with
//! `avif-parse` and the primary item's AV1 payload goes through `rav1d`, the
//! Rust port of dav1d. The decoded YUV planes are converted to RGB8 here.
//!
//! Alpha items and image grids are ignored: only the primary item's colour
//! planes are decoded.

use super::backend::ConverterError;
use image::{DynamicImage, RgbImage};
use rav1d::include::dav1d::data::Dav1dData;
use rav1d::include::dav1d::dav1d::Dav1dSettings;
use rav1d::include::dav1d::headers::{
    DAV1D_PIXEL_LAYOUT_I400, DAV1D_PIXEL_LAYOUT_I420, DAV1D_PIXEL_LAYOUT_I422,
    DAV1D_PIXEL_LAYOUT_I444,
};
use rav1d::include::dav1d::picture::Dav1dPicture;
use rav1d::src::lib as dav1d;
use std::mem::MaybeUninit;
use std::path::Path;
use std::ptr::NonNull;

fn decode_failed(step: &str, code: i32) -> ConverterError {
    ConverterError::Failed(format!("AV1 decoder {step} failed ({code})"))
}

/// Decode the primary image of an AVIF file to RGB8.
pub(super) fn decode_avif(path: &Path) -> Result<DynamicImage, ConverterError> {
    let file_data = std::fs::read(path)?;
    let avif = avif_parse::read_avif(&mut std::io::Cursor::new(&file_data)).map_err(|e| {
        ConverterError::Failed(format!("Failed to parse AVIF {}: {e:?}", path.display()))
    })?;
    let payload: &[u8] = &avif.primary_item;

    let mut settings = MaybeUninit::<Dav1dSettings>::uninit();
    unsafe { dav1d::dav1d_default_settings(NonNull::from(&mut settings).cast()) };
    let mut settings = unsafe { settings.assume_init() };
    // Still images: one frame, no frame threading.
    settings.n_threads = 1;
    settings.max_frame_delay = 1;

    let mut ctx = None;
    let rc = unsafe { dav1d::dav1d_open(NonNull::new(&mut ctx), NonNull::new(&mut settings)) };
    if rc.0 != 0 {
        return Err(decode_failed("open", rc.0));
    }

    // Every exit below goes through the single close after the closure.
    let decoded = (|| {
        let mut data = Dav1dData::default();
        let buf = unsafe { dav1d::dav1d_data_create(NonNull::new(&mut data), payload.len()) };
        if buf.is_null() {
            return Err(decode_failed("data_create", -1));
        }
        unsafe { std::ptr::copy_nonoverlapping(payload.as_ptr(), buf, payload.len()) };

        let rc = unsafe { dav1d::dav1d_send_data(ctx, NonNull::new(&mut data)) };
        if rc.0 != 0 {
            unsafe { dav1d::dav1d_data_unref(NonNull::new(&mut data)) };
            return Err(decode_failed("send_data", rc.0));
        }

        let mut pic: Dav1dPicture = unsafe { std::mem::zeroed() };
        let rc = unsafe { dav1d::dav1d_get_picture(ctx, NonNull::new(&mut pic)) };
        if rc.0 != 0 {
            return Err(decode_failed("get_picture", rc.0));
        }

        let (width, height) = (pic.p.w as u32, pic.p.h as u32);
        let rgb = picture_to_rgb(&pic);
        unsafe { dav1d::dav1d_picture_unref(NonNull::new(&mut pic)) };

        RgbImage::from_raw(width, height, rgb?)
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(|| ConverterError::Failed("Decoded AVIF has inconsistent size".into()))
    })();

    unsafe { dav1d::dav1d_close(NonNull::new(&mut ctx)) };
    decoded
}

/// One plane of a decoded picture.
#[derive(Clone, Copy)]
struct Plane {
    ptr: *const u8,
    stride: isize,
}

impl Plane {
    /// # Safety
    ///
    /// `(x, y)` must lie inside the plane the pointer was taken from.
    unsafe fn sample(self, x: u32, y: u32, wide: bool) -> f32 {
        let row = y as isize * self.stride;
        if wide {
            let at = unsafe { self.ptr.offset(row + x as isize * 2) };
            f32::from(unsafe { at.cast::<u16>().read_unaligned() })
        } else {
            f32::from(unsafe { *self.ptr.offset(row + x as isize) })
        }
    }
}

enum Chroma {
    Mono,
    Planes {
        u: Plane,
        v: Plane,
        /// Horizontal and vertical subsampling, e.g. 4:2:0 is `(true, true)`.
        subsampled: (bool, bool),
    },
}

fn plane(pic: &Dav1dPicture, index: usize, stride: isize) -> Result<Plane, ConverterError> {
    let ptr = pic.data[index]
        .ok_or_else(|| ConverterError::Failed(format!("Decoded AVIF is missing plane {index}")))?;
    Ok(Plane {
        ptr: ptr.as_ptr() as *const u8,
        stride,
    })
}

fn picture_to_rgb(pic: &Dav1dPicture) -> Result<Vec<u8>, ConverterError> {
    let luma = plane(pic, 0, pic.stride[0])?;
    let subsampled = match pic.p.layout {
        DAV1D_PIXEL_LAYOUT_I400 => None,
        DAV1D_PIXEL_LAYOUT_I420 => Some((true, true)),
        DAV1D_PIXEL_LAYOUT_I422 => Some((true, false)),
        DAV1D_PIXEL_LAYOUT_I444 => Some((false, false)),
        other => {
            return Err(ConverterError::Failed(format!(
                "Unsupported AVIF pixel layout: {other}"
            )));
        }
    };
    let chroma = match subsampled {
        None => Chroma::Mono,
        Some(subsampled) => Chroma::Planes {
            u: plane(pic, 1, pic.stride[1])?,
            v: plane(pic, 2, pic.stride[1])?,
            subsampled,
        },
    };
    Ok(yuv_to_rgb(
        pic.p.w as u32,
        pic.p.h as u32,
        pic.p.bpc as u32,
        luma,
        &chroma,
    ))
}

/// BT.601 YCbCr → interleaved RGB8, scaled down from `bpc` bits.
fn yuv_to_rgb(width: u32, height: u32, bpc: u32, luma: Plane, chroma: &Chroma) -> Vec<u8> {
    let wide = bpc > 8;
    let scale = 255.0 / ((1u32 << bpc) - 1) as f32;
    let center = (1u32 << (bpc - 1)) as f32;
    let to_u8 = |v: f32| (v * scale).clamp(0.0, 255.0) as u8;

    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            // Coordinates stay within the picture reported by the decoder.
            let l = unsafe { luma.sample(x, y, wide) };
            let pixel = match chroma {
                Chroma::Mono => [to_u8(l); 3],
                Chroma::Planes { u, v, subsampled } => {
                    let cx = if subsampled.0 { x / 2 } else { x };
                    let cy = if subsampled.1 { y / 2 } else { y };
                    let cb = unsafe { u.sample(cx, cy, wide) } - center;
                    let cr = unsafe { v.sample(cx, cy, wide) } - center;
                    [
                        to_u8(l + 1.402 * cr),
                        to_u8(l - 0.344136 * cb - 0.714136 * cr),
                        to_u8(l + 1.772 * cb),
                    ]
                }
            };
            rgb.extend_from_slice(&pixel);
        }
    }
    rgb
}
