//! Settings module.
//!
//! Handles loading, validating and merging `config.toml` from the data
//! directory (`.imagesmith/` by default). Stock defaults are the base layer;
//! the user's file is merged on top, so it only needs the keys it changes.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! platform = "android"      # Platform whose converters are available
//!
//! [conversion]
//! quality = 0.9             # Default lossy quality (0.0-1.0)
//! preserve_metadata = true  # Keep EXIF by default
//! max_file_size_mb = 50     # Larger sources are rejected
//!
//! [history]
//! max_entries = 50          # Oldest conversions are dropped beyond this
//!
//! [processing]
//! max_processes = 4         # Max parallel conversions (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::converters::{ConversionOptions, Quality};
use crate::formats::{ImageFormat, Platform};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Settings loaded from `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Platform used for routing when `--platform` is not given.
    pub platform: Platform,
    /// Defaults applied to every conversion.
    pub conversion: ConversionConfig,
    /// History store settings.
    pub history: HistoryConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            platform: Platform::Android,
            conversion: ConversionConfig::default(),
            history: HistoryConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl Settings {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_quality("conversion.quality", self.conversion.quality)?;
        if self.conversion.max_file_size_mb == 0 {
            return Err(ConfigError::Validation(
                "conversion.max_file_size_mb must be non-zero".into(),
            ));
        }
        if self.history.max_entries == 0 {
            return Err(ConfigError::Validation(
                "history.max_entries must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// Options for a conversion to `target` using the configured defaults.
    pub fn default_options(&self, target: ImageFormat) -> ConversionOptions {
        ConversionOptions {
            target_format: target,
            quality: Quality::new(self.conversion.quality),
            preserve_metadata: self.conversion.preserve_metadata,
        }
    }
}

/// Conversion defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConversionConfig {
    /// Lossy encoding quality (0.0 = smallest, 1.0 = best).
    pub quality: f32,
    /// Whether to keep EXIF metadata unless told otherwise.
    pub preserve_metadata: bool,
    /// Sources above this size are rejected before conversion.
    pub max_file_size_mb: u64,
}

impl ConversionConfig {
    pub fn max_file_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            quality: 0.9,
            preserve_metadata: true,
            max_file_size_mb: 50,
        }
    }
}

/// History store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HistoryConfig {
    pub max_entries: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { max_entries: 50 }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel conversions.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

fn check_quality(key: &str, q: f32) -> Result<f32, ConfigError> {
    if !(0.0..=1.0).contains(&q) {
        return Err(ConfigError::Validation(format!("{key} must be 0.0-1.0")));
    }
    Ok(q)
}

/// Parse a `--quality` argument under the same rule as `conversion.quality`.
pub fn parse_quality(arg: &str) -> Result<f32, ConfigError> {
    let q: f32 = arg
        .trim()
        .parse()
        .map_err(|_| ConfigError::Validation(format!("quality must be a number, got {arg:?}")))?;
    check_quality("quality", q)
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(Settings::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the file doesn't exist.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<Settings, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let settings: Settings = merged.try_into()?;
    settings.validate()?;
    Ok(settings)
}

/// Load settings from `config.toml` in the given directory.
pub fn load_config(dir: &Path) -> Result<Settings, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(dir)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# imagesmith configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.
#
# This file lives in the data directory (default: .imagesmith/config.toml).

# Platform whose conversion engines are available: "ios" or "android".
# Some conversions (e.g. JPEG -> HEIC) only exist on one platform.
platform = "android"

# ---------------------------------------------------------------------------
# Conversion defaults
# ---------------------------------------------------------------------------
[conversion]
# Lossy encoding quality, 0.0 (smallest) to 1.0 (best).
# Ignored for lossless targets such as PNG.
quality = 0.9

# Keep EXIF metadata when the converter supports it.
preserve_metadata = true

# Sources larger than this (in MiB) are rejected.
max_file_size_mb = 50

# ---------------------------------------------------------------------------
# History
# ---------------------------------------------------------------------------
[history]
# Number of conversions remembered; the oldest are dropped first.
max_entries = 50

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel conversions.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
