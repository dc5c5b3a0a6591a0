//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Every entity leads with what it *is* (format, conversion, result id) and
//! shows file paths as indented `Source:` / `Output:` context lines, so the
//! output reads as an inventory while still tracing back to files.
//!
//! # Output Format
//!
//! ## Detect
//!
//! ```text
//! 001 HEIC (by name, image/heic)
//!     Source: photos/IMG_0001.heic
//! 002 unrecognized
//!     Source: notes.txt
//! ```
//!
//! ## Matrix
//!
//! ```text
//! 001 JPEG → PNG
//!     Platforms: ios, android
//!     Converter: generic-manipulator (phase 1)
//! ```
//!
//! ## Convert
//!
//! ```text
//! HEIC → JPEG via heic-specialist
//!     Source: IMG_0001.heic
//! Converted IMG_0001.heic (2.3 MB → 1.0 MB, 840 ms)
//!     Output: .imagesmith/converted/converted_1700000000000_abc123.jpg
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::convert::ConvertEvent;
use crate::converters::Dimensions;
use crate::detect::{Detection, DetectionMethod};
use crate::formats::{ImageFormat, Platform};
use crate::history::History;
use crate::matrix::ConversionMatrix;
use crate::types::{ConversionResult, ImageAsset};
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Human-readable byte count using binary units.
fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn dimensions(dims: Option<Dimensions>) -> String {
    match dims {
        Some(d) => format!("{}x{}", d.width, d.height),
        None => "unknown size".to_string(),
    }
}

fn arrow(from: ImageFormat, to: ImageFormat) -> String {
    format!("{} \u{2192} {}", from, to)
}

// ============================================================================
// detect
// ============================================================================

/// Format detection results, one entity per input in input order.
pub fn format_detections(results: &[(&Path, Option<Detection>)]) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, (path, detection)) in results.iter().enumerate() {
        let header = match detection {
            Some(Detection { format, method }) => {
                let how = match method {
                    DetectionMethod::Name => "by name",
                    DetectionMethod::Content => "by content",
                };
                format!(
                    "{} {} ({}, {})",
                    format_index(i + 1),
                    format,
                    how,
                    format.mime_type()
                )
            }
            None => format!("{} unrecognized", format_index(i + 1)),
        };
        lines.push(header);
        lines.push(format!("{}Source: {}", indent(1), path.display()));
    }
    lines
}

pub fn print_detections(results: &[(&Path, Option<Detection>)]) {
    for line in format_detections(results) {
        println!("{}", line);
    }
}

// ============================================================================
// targets
// ============================================================================

/// Format the targets offered for `source` on `platform`.
pub fn format_targets(source: ImageFormat, platform: Platform, targets: &[ImageFormat]) -> Vec<String> {
    let mut lines = vec![format!("{} on {}", source, platform)];
    if targets.is_empty() {
        lines.push(format!("{}(no conversions available)", indent(1)));
        return lines;
    }
    for (i, target) in targets.iter().enumerate() {
        lines.push(format!(
            "{}{} {} ({})",
            indent(1),
            format_index(i + 1),
            target,
            target.primary_extension()
        ));
    }
    lines
}

pub fn print_targets(source: ImageFormat, platform: Platform, targets: &[ImageFormat]) {
    for line in format_targets(source, platform, targets) {
        println!("{}", line);
    }
}

// ============================================================================
// matrix
// ============================================================================

/// Format every row of the matrix in declaration order.
///
/// With `platform` set, rows that don't apply there are left out.
pub fn format_matrix(matrix: &ConversionMatrix, platform: Option<Platform>) -> Vec<String> {
    let mut lines = Vec::new();
    let rows = matrix
        .paths()
        .iter()
        .filter(|p| platform.is_none_or(|pl| p.platform_support.supports(pl)));
    for (i, path) in rows.enumerate() {
        let platforms: Vec<&str> = Platform::ALL
            .into_iter()
            .filter(|pl| path.platform_support.supports(*pl))
            .map(Platform::id)
            .collect();
        lines.push(format!(
            "{} {}",
            format_index(i + 1),
            arrow(path.source, path.target)
        ));
        lines.push(format!("{}Platforms: {}", indent(1), platforms.join(", ")));
        lines.push(format!(
            "{}Converter: {} (phase {})",
            indent(1),
            path.converter,
            path.phase
        ));
    }
    lines
}

pub fn print_matrix(matrix: &ConversionMatrix, platform: Option<Platform>) {
    for line in format_matrix(matrix, platform) {
        println!("{}", line);
    }
}

// ============================================================================
// convert
// ============================================================================

fn asset_summary(asset: &ImageAsset) -> String {
    format!(
        "{}, {}, {}",
        asset.format,
        human_size(asset.file_size),
        dimensions(asset.dimensions)
    )
}

/// Format a finished conversion.
pub fn format_result(result: &ConversionResult) -> Vec<String> {
    vec![
        format!(
            "Converted {} ({} \u{2192} {}, {} ms)",
            result.source.file_name,
            human_size(result.source.file_size),
            human_size(result.output.file_size),
            result.processing_time_ms
        ),
        format!("{}Output: {}", indent(1), result.output.path.display()),
    ]
}

/// Format a single conversion event as display lines.
///
/// Progress events render nothing; the CLI only prints lifecycle changes.
pub fn format_convert_event(event: &ConvertEvent) -> Vec<String> {
    match event {
        ConvertEvent::Started {
            source,
            from,
            to,
            converter,
        } => vec![
            format!("{} via {}", arrow(*from, *to), converter),
            format!("{}Source: {}", indent(1), file_name(source)),
        ],
        ConvertEvent::Progress { .. } => Vec::new(),
        ConvertEvent::Finished { result } => format_result(result),
        ConvertEvent::Failed {
            source,
            message,
            code,
        } => vec![
            format!("Failed {}: {}", file_name(source), message),
            format!("{}{}", indent(1), code.user_message()),
        ],
    }
}

/// One-line batch summary.
pub fn format_batch_summary(converted: usize, failed: usize) -> String {
    format!("Converted {} files, {} failed", converted, failed)
}

// ============================================================================
// history
// ============================================================================

/// Format the history, newest first.
pub fn format_history(history: &History) -> Vec<String> {
    if history.is_empty() {
        return vec!["No conversions yet".to_string()];
    }
    let mut lines = Vec::new();
    for (i, entry) in history.iter().enumerate() {
        lines.push(format!(
            "{} {} {}",
            format_index(i + 1),
            entry.id,
            arrow(entry.source.format, entry.output.format)
        ));
        lines.push(format!(
            "{}Source: {} ({})",
            indent(1),
            entry.source.path.display(),
            asset_summary(&entry.source)
        ));
        lines.push(format!(
            "{}Output: {} ({})",
            indent(1),
            entry.output.path.display(),
            asset_summary(&entry.output)
        ));
    }
    lines
}

pub fn print_history(history: &History) {
    for line in format_history(history) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
