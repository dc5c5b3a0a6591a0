//! # imagesmith
//!
//! Image format detection and conversion routing.
//!
//! Given a file, imagesmith works out what kind of image it is, decides
//! whether it can be converted to the format you asked for on the platform
//! you're on, and hands the work to the engine responsible for that path.
//!
//! # Architecture: Detect, Route, Dispatch
//!
//! ```text
//! 1. Detect    file      →  ImageFormat       (name first, magic bytes second)
//! 2. Route     format    →  ConversionPath    (static matrix, platform-gated)
//! 3. Dispatch  path      →  Converter         (registry lookup, then convert)
//! ```
//!
//! Each step is usable on its own. Detection and routing are pure lookups
//! with no engine behind them, so they are cheap enough to call while
//! building a format picker; only dispatch touches pixels.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`formats`] | Format, platform and converter vocabularies |
//! | [`detect`] | Name-based and magic-byte format detection |
//! | [`matrix`] | The conversion matrix: available targets, path resolution |
//! | [`converters`] | `Converter` trait, the `image`-crate engine, the registry |
//! | [`convert`] | Single-file and batch conversion pipeline with progress events |
//! | [`history`] | Recent-conversion store persisted as JSON |
//! | [`config`] | `config.toml` loading, merging with stock defaults, validation |
//! | [`types`] | Result and error-code types shared by pipeline and history |
//! | [`naming`] | Output file names and conversion ids |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## The Matrix Is Data
//!
//! Supported conversions are one table of rows, not logic spread across
//! engines. Adding a path means adding a row; the router, the CLI `matrix`
//! command and the targets list all read from it. Rows are unique per
//! `(source, target, platform)`, which is checked when the table is built,
//! so lookups never have to choose between candidates.
//!
//! ## Names Before Bytes
//!
//! Extensions are checked before content. It's free, and for the formats
//! in play a lying extension is rarer than a file we can't open. Content
//! sniffing only reads the first 32 bytes.
//!
//! ## Engines Are Pluggable
//!
//! The matrix names converters by id. Which engines actually exist is up to
//! the [`converters::ConverterRegistry`]: the default one ships only the
//! pure-Rust `image` engine, so paths owned by native HEIC or compression
//! libraries resolve but report the converter as unavailable.

pub mod config;
pub mod convert;
pub mod converters;
pub mod detect;
pub mod formats;
pub mod history;
pub mod matrix;
pub mod naming;
pub mod output;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
