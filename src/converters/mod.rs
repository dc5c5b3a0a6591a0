//! Conversion engines.
//!
//! | Piece | Role |
//! |---|---|
//! | **Params** | [`Quality`], [`ConversionOptions`], [`ConvertParams`] |
//! | **Backend** | [`Converter`] trait and [`ConverterError`] |
//! | **Engines** | [`ImageCrateConverter`] (`image` crate, AVIF decode via `rav1d`) |
//! | **Registry** | [`ConverterRegistry`]: `ConverterId` → engine |

mod avif;
pub mod backend;
pub mod image_crate;
mod params;
pub mod registry;

pub use backend::{Converter, ConverterError, Dimensions, no_progress};
pub use image_crate::{ImageCrateConverter, read_dimensions};
pub use params::{ConversionOptions, ConvertParams, Quality};
pub use registry::ConverterRegistry;
