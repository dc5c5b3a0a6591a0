//! The conversion pipeline.
//!
//! Ties detection, routing and dispatch together for one file:
//!
//! ```text
//! source ──detect──▶ format ──matrix──▶ path ──registry──▶ converter ──▶ output
//! ```
//!
//! Each step has its own failure: an unrecognised file, an unsupported
//! `(source, target, platform)` triple, or a converter this deployment
//! doesn't ship. The router's answer is final; the pipeline never falls back
//! to a different path.
//!
//! Progress is reported as [`ConvertEvent`]s over an optional channel so the
//! CLI can print while a [rayon](https://docs.rs/rayon) batch runs:
//!
//! | Fraction | Point |
//! |---|---|
//! | 0.1 | routed, output directory ready |
//! | 0.1–0.8 | converter's own progress, rescaled |
//! | 0.8 | converter finished |
//! | 1.0 | output inspected, result built |

use crate::converters::{ConversionOptions, ConvertParams, ConverterError, ConverterRegistry};
use crate::converters::read_dimensions;
use crate::detect;
use crate::formats::{ConverterId, ImageFormat, Platform};
use crate::matrix::ConversionMatrix;
use crate::naming;
use crate::types::{ConversionResult, ErrorCode, ImageAsset};
use rayon::prelude::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::time::Instant;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Source image not found: {0}")]
    SourceNotFound(PathBuf),
    #[error("Unrecognized image format: {0}")]
    FormatUnrecognized(PathBuf),
    #[error("{path} is {size} bytes, over the {limit}-byte limit")]
    FileTooLarge { path: PathBuf, size: u64, limit: u64 },
    #[error("Conversion {from} -> {to} is not supported on {platform}")]
    ConversionUnsupported {
        from: ImageFormat,
        to: ImageFormat,
        platform: Platform,
    },
    #[error("No converter engine available for {0}")]
    ConverterUnavailable(ConverterId),
    #[error(transparent)]
    Converter(#[from] ConverterError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl ConvertError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ConvertError::FormatUnrecognized(_) | ConvertError::ConversionUnsupported { .. } => {
                ErrorCode::UnsupportedFormat
            }
            ConvertError::FileTooLarge { .. } => ErrorCode::FileTooLarge,
            ConvertError::ConverterUnavailable(_) | ConvertError::Converter(_) => {
                ErrorCode::ProcessingFailed
            }
            ConvertError::Io(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                ErrorCode::PermissionDenied
            }
            ConvertError::Io(_) => ErrorCode::SaveFailed,
            ConvertError::SourceNotFound(_) => ErrorCode::Unknown,
        }
    }

    /// Whether retrying the same request could succeed. Stricter than
    /// [`ErrorCode::recoverable`]: a missing source stays missing.
    pub fn recoverable(&self) -> bool {
        match self {
            ConvertError::SourceNotFound(_) => false,
            other => other.code().recoverable(),
        }
    }
}

/// Lifecycle events for a single conversion.
#[derive(Debug, Clone)]
pub enum ConvertEvent {
    Started {
        source: PathBuf,
        from: ImageFormat,
        to: ImageFormat,
        converter: ConverterId,
    },
    Progress {
        source: PathBuf,
        fraction: f32,
    },
    Finished {
        result: Box<ConversionResult>,
    },
    Failed {
        source: PathBuf,
        message: String,
        code: ErrorCode,
    },
}

/// Everything a conversion needs besides the file and options.
pub struct ConvertContext<'a> {
    pub matrix: &'a ConversionMatrix,
    pub registry: &'a ConverterRegistry,
    pub platform: Platform,
    pub output_dir: PathBuf,
    pub max_file_bytes: u64,
    pub events: Option<Sender<ConvertEvent>>,
}

impl ConvertContext<'_> {
    fn emit(&self, event: ConvertEvent) {
        if let Some(tx) = &self.events {
            // Receiver gone means nobody is listening; not an error.
            let _ = tx.send(event);
        }
    }

    fn progress(&self, source: &Path, fraction: f32) {
        self.emit(ConvertEvent::Progress {
            source: source.to_path_buf(),
            fraction,
        });
    }
}

fn build_asset(path: &Path, format: ImageFormat, file_size: u64) -> ImageAsset {
    ImageAsset {
        path: path.to_path_buf(),
        file_name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        format,
        mime_type: format.mime_type().to_string(),
        file_size,
        dimensions: read_dimensions(path, format),
    }
}

/// Convert one file.
pub fn convert_file(
    source: &Path,
    options: &ConversionOptions,
    ctx: &ConvertContext,
) -> Result<ConversionResult, ConvertError> {
    let result = run_conversion(source, options, ctx);
    match &result {
        Ok(done) => {
            tracing::info!(
                source = %source.display(),
                output = %done.output.path.display(),
                ms = done.processing_time_ms,
                "converted"
            );
            ctx.emit(ConvertEvent::Finished {
                result: Box::new(done.clone()),
            });
        }
        Err(e) => {
            tracing::info!(source = %source.display(), error = %e, "conversion failed");
            ctx.emit(ConvertEvent::Failed {
                source: source.to_path_buf(),
                message: e.to_string(),
                code: e.code(),
            });
        }
    }
    result
}

fn run_conversion(
    source: &Path,
    options: &ConversionOptions,
    ctx: &ConvertContext,
) -> Result<ConversionResult, ConvertError> {
    let started = Instant::now();
    let target = options.target_format;

    let size = match fs::metadata(source) {
        Ok(meta) if meta.is_file() => meta.len(),
        Ok(_) => return Err(ConvertError::FormatUnrecognized(source.to_path_buf())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ConvertError::SourceNotFound(source.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };

    let from = detect::detect_format(source)
        .ok_or_else(|| ConvertError::FormatUnrecognized(source.to_path_buf()))?;

    if size > ctx.max_file_bytes {
        return Err(ConvertError::FileTooLarge {
            path: source.to_path_buf(),
            size,
            limit: ctx.max_file_bytes,
        });
    }

    let path = ctx
        .matrix
        .resolve_path(from, target, ctx.platform)
        .ok_or(ConvertError::ConversionUnsupported {
            from,
            to: target,
            platform: ctx.platform,
        })?;
    let converter = ctx
        .registry
        .get(path.converter)
        .ok_or(ConvertError::ConverterUnavailable(path.converter))?;

    ctx.emit(ConvertEvent::Started {
        source: source.to_path_buf(),
        from,
        to: target,
        converter: path.converter,
    });

    fs::create_dir_all(&ctx.output_dir)?;
    let output = ctx
        .output_dir
        .join(naming::output_file_name(source, target, naming::now_millis()));
    ctx.progress(source, 0.1);

    let params = ConvertParams {
        source: source.to_path_buf(),
        output: output.clone(),
        options: *options,
    };
    let report = |p: f32| ctx.progress(source, 0.1 + 0.7 * p.clamp(0.0, 1.0));
    if let Err(e) = converter.convert(&params, &report) {
        // Partial output is useless.
        let _ = fs::remove_file(&output);
        return Err(e.into());
    }
    ctx.progress(source, 0.8);

    let output_size = fs::metadata(&output)?.len();
    let source_asset = build_asset(source, from, size);
    let output_asset = build_asset(&output, target, output_size);
    ctx.progress(source, 1.0);

    let timestamp = naming::now_millis();
    Ok(ConversionResult {
        id: naming::conversion_id(source, timestamp),
        source: source_asset,
        output: output_asset,
        options: *options,
        converter: path.converter,
        processing_time_ms: started.elapsed().as_millis() as u64,
        timestamp,
    })
}

/// Convert many files in parallel on the current rayon pool.
///
/// Results come back in input order.
pub fn convert_batch(
    sources: &[PathBuf],
    options: &ConversionOptions,
    ctx: &ConvertContext,
) -> Vec<(PathBuf, Result<ConversionResult, ConvertError>)> {
    sources
        .par_iter()
        .map(|source| (source.clone(), convert_file(source, options, ctx)))
        .collect()
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

/// Expand CLI inputs into a file list.
///
/// Files are kept as given, whatever their name. Directories are walked
/// recursively in name order; hidden entries are skipped and only files
/// whose name looks like an image are kept.
pub fn collect_inputs(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for input in inputs {
        if !input.is_dir() {
            files.push(input.clone());
            continue;
        }
        let walker = WalkDir::new(input)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e));
        for entry in walker {
            match entry {
                Ok(entry) if entry.file_type().is_file() => {
                    let name = entry.file_name().to_string_lossy();
                    if detect::detect_from_name(&name).is_some() {
                        files.push(entry.into_path());
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "skipping unreadable entry"),
            }
        }
    }
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converters::Quality;
    use crate::converters::backend::tests::MockConverter;
    use crate::formats::ConverterId::{GenericCompressor, GenericManipulator, HeicSpecialist};
    use crate::test_helpers::{signature_bytes, write_file, write_png};
    use std::sync::{Arc, mpsc};
    use tempfile::TempDir;

    const LIMIT: u64 = 1024 * 1024;

    fn mock_registry(
        id: ConverterId,
        mock: impl crate::converters::Converter + Send + 'static,
    ) -> ConverterRegistry {
        let mut registry = ConverterRegistry::new();
        registry.register(id, mock);
        registry
    }

    fn context<'a>(
        registry: &'a ConverterRegistry,
        platform: Platform,
        output_dir: &Path,
    ) -> ConvertContext<'a> {
        ConvertContext {
            matrix: ConversionMatrix::standard(),
            registry,
            platform,
            output_dir: output_dir.to_path_buf(),
            max_file_bytes: LIMIT,
            events: None,
        }
    }

    fn options(target: ImageFormat) -> ConversionOptions {
        ConversionOptions {
            target_format: target,
            quality: Quality::new(0.75),
            preserve_metadata: false,
        }
    }

    #[test]
    fn heic_to_jpeg_dispatches_to_heic_specialist() {
        let tmp = TempDir::new().unwrap();
        let source = write_file(tmp.path(), "IMG_001.heic", &signature_bytes(ImageFormat::Heic));
        let registry = mock_registry(HeicSpecialist, MockConverter::writing(b"jpeg".to_vec()));
        let out = tmp.path().join("out");
        let ctx = context(&registry, Platform::Ios, &out);

        let result = convert_file(&source, &options(ImageFormat::Jpeg), &ctx).unwrap();

        assert_eq!(result.converter, HeicSpecialist);
        assert_eq!(result.source.format, ImageFormat::Heic);
        assert_eq!(result.output.format, ImageFormat::Jpeg);
        assert_eq!(result.output.mime_type, "image/jpeg");
        assert_eq!(result.output.file_size, 4);
        assert!(result.output.path.starts_with(&out));
        assert!(result.output.file_name.ends_with(".jpg"));
        assert_eq!(result.options.quality.percent(), 75);
        assert!(result.output.path.exists());
    }

    #[test]
    fn options_reach_the_converter() {
        let tmp = TempDir::new().unwrap();
        let source = write_file(tmp.path(), "a.heic", &signature_bytes(ImageFormat::Heic));
        let mock = Arc::new(MockConverter::writing(b"x".to_vec()));
        let registry = mock_registry(HeicSpecialist, Arc::clone(&mock));
        let ctx = context(&registry, Platform::Android, tmp.path());

        let result = convert_file(&source, &options(ImageFormat::Png), &ctx).unwrap();

        let requests = mock.get_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].source, source.to_string_lossy());
        assert_eq!(requests[0].output, result.output.path.to_string_lossy());
        assert_eq!(requests[0].target, ImageFormat::Png);
        assert_eq!(requests[0].quality, 75);
        assert!(!requests[0].preserve_metadata);
    }

    #[test]
    fn unrecognised_source_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let source = write_file(tmp.path(), "notes", &[0u8; 32]);
        let registry = ConverterRegistry::with_defaults();
        let ctx = context(&registry, Platform::Ios, tmp.path());

        let err = convert_file(&source, &options(ImageFormat::Png), &ctx).unwrap_err();
        assert!(matches!(err, ConvertError::FormatUnrecognized(_)));
        assert_eq!(err.code(), ErrorCode::UnsupportedFormat);
        assert!(!err.code().recoverable());
        assert!(!err.recoverable());
    }

    #[test]
    fn missing_source_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let registry = ConverterRegistry::with_defaults();
        let ctx = context(&registry, Platform::Ios, tmp.path());

        let err = convert_file(&tmp.path().join("gone.png"), &options(ImageFormat::Jpeg), &ctx)
            .unwrap_err();
        assert!(matches!(err, ConvertError::SourceNotFound(_)));
        assert_eq!(err.code(), ErrorCode::Unknown);
        assert!(!err.recoverable());
    }

    #[test]
    fn platform_gated_pair_is_unsupported() {
        let tmp = TempDir::new().unwrap();
        let source = write_file(tmp.path(), "a.jpg", &signature_bytes(ImageFormat::Jpeg));
        let registry = mock_registry(GenericCompressor, MockConverter::writing(b"x".to_vec()));
        let ctx = context(&registry, Platform::Android, tmp.path());

        let err = convert_file(&source, &options(ImageFormat::Heic), &ctx).unwrap_err();
        assert!(matches!(
            err,
            ConvertError::ConversionUnsupported {
                from: ImageFormat::Jpeg,
                to: ImageFormat::Heic,
                platform: Platform::Android,
            }
        ));
    }

    #[test]
    fn identity_conversion_is_unsupported() {
        let tmp = TempDir::new().unwrap();
        let source = write_png(tmp.path(), "a.png", 2, 2);
        let registry = ConverterRegistry::with_defaults();
        let ctx = context(&registry, Platform::Ios, tmp.path());

        let err = convert_file(&source, &options(ImageFormat::Png), &ctx).unwrap_err();
        assert!(matches!(err, ConvertError::ConversionUnsupported { .. }));
    }

    #[test]
    fn missing_engine_is_unavailable() {
        let tmp = TempDir::new().unwrap();
        let source = write_file(tmp.path(), "a.heic", &signature_bytes(ImageFormat::Heic));
        let registry = ConverterRegistry::with_defaults();
        let ctx = context(&registry, Platform::Ios, tmp.path());

        let err = convert_file(&source, &options(ImageFormat::Jpeg), &ctx).unwrap_err();
        assert!(matches!(err, ConvertError::ConverterUnavailable(HeicSpecialist)));
        assert_eq!(err.code(), ErrorCode::ProcessingFailed);
    }

    #[test]
    fn oversized_source_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let mut bytes = signature_bytes(ImageFormat::Bmp).to_vec();
        bytes.resize(LIMIT as usize + 1, 0);
        let source = write_file(tmp.path(), "big.bmp", &bytes);
        let registry = ConverterRegistry::with_defaults();
        let ctx = context(&registry, Platform::Ios, tmp.path());

        let err = convert_file(&source, &options(ImageFormat::Png), &ctx).unwrap_err();
        assert!(matches!(err, ConvertError::FileTooLarge { size, .. } if size == LIMIT + 1));
        assert_eq!(err.code(), ErrorCode::FileTooLarge);
        assert!(err.recoverable());
    }

    #[test]
    fn converter_failure_removes_partial_output() {
        let tmp = TempDir::new().unwrap();
        let source = write_file(tmp.path(), "a.webp", &signature_bytes(ImageFormat::Webp));
        let out = tmp.path().join("out");
        let registry = mock_registry(GenericManipulator, MockConverter::failing("boom"));
        let ctx = context(&registry, Platform::Ios, &out);

        let err = convert_file(&source, &options(ImageFormat::Png), &ctx).unwrap_err();
        assert!(matches!(err, ConvertError::Converter(_)));
        assert_eq!(std::fs::read_dir(&out).unwrap().count(), 0);
    }

    #[test]
    fn events_trace_the_lifecycle() {
        let tmp = TempDir::new().unwrap();
        let source = write_file(tmp.path(), "a.bmp", &signature_bytes(ImageFormat::Bmp));
        let registry = mock_registry(GenericManipulator, MockConverter::writing(b"png".to_vec()));
        let (tx, rx) = mpsc::channel();
        let mut ctx = context(&registry, Platform::Android, tmp.path());
        ctx.events = Some(tx);

        convert_file(&source, &options(ImageFormat::Png), &ctx).unwrap();
        drop(ctx);
        let events: Vec<_> = rx.iter().collect();

        assert!(matches!(
            events.first(),
            Some(ConvertEvent::Started {
                from: ImageFormat::Bmp,
                to: ImageFormat::Png,
                converter: GenericManipulator,
                ..
            })
        ));
        let fractions: Vec<f32> = events
            .iter()
            .filter_map(|e| match e {
                ConvertEvent::Progress { fraction, .. } => Some(*fraction),
                _ => None,
            })
            .collect();
        // 0.1, mock's 0.5 and 1.0 rescaled, 0.8, 1.0
        assert_eq!(fractions.len(), 5);
        assert_eq!(fractions[0], 0.1);
        assert!((fractions[1] - 0.45).abs() < 1e-6);
        assert_eq!(*fractions.last().unwrap(), 1.0);
        assert!(fractions.windows(2).all(|w| w[0] <= w[1]));
        assert!(matches!(events.last(), Some(ConvertEvent::Finished { .. })));
    }

    #[test]
    fn failure_emits_failed_event_with_code() {
        let tmp = TempDir::new().unwrap();
        let source = write_file(tmp.path(), "a.gif", &signature_bytes(ImageFormat::Gif));
        let registry = ConverterRegistry::with_defaults();
        let (tx, rx) = mpsc::channel();
        let mut ctx = context(&registry, Platform::Ios, tmp.path());
        ctx.events = Some(tx);

        assert!(convert_file(&source, &options(ImageFormat::Png), &ctx).is_err());
        drop(ctx);
        let events: Vec<_> = rx.iter().collect();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            ConvertEvent::Failed {
                code: ErrorCode::UnsupportedFormat,
                ..
            }
        ));
    }

    #[test]
    fn batch_keeps_input_order() {
        let tmp = TempDir::new().unwrap();
        let good = write_png(tmp.path(), "a.png", 4, 4);
        let bad = write_file(tmp.path(), "b.txt", b"hello");
        let also_good = write_png(tmp.path(), "c.png", 4, 4);
        let registry = ConverterRegistry::with_defaults();
        let out = tmp.path().join("out");
        let ctx = context(&registry, Platform::Android, &out);

        let results = convert_batch(
            &[good.clone(), bad.clone(), also_good.clone()],
            &options(ImageFormat::Jpeg),
            &ctx,
        );

        let paths: Vec<_> = results.iter().map(|(p, _)| p.clone()).collect();
        assert_eq!(paths, vec![good, bad, also_good]);
        assert!(results[0].1.is_ok());
        assert!(results[1].1.is_err());
        assert!(results[2].1.is_ok());
        assert_eq!(std::fs::read_dir(&out).unwrap().count(), 2);
    }

    #[test]
    fn collect_inputs_walks_directories() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("photos");
        std::fs::create_dir_all(dir.join("nested")).unwrap();
        std::fs::create_dir_all(dir.join(".imagesmith")).unwrap();
        write_file(&dir, "b.jpg", b"x");
        write_file(&dir, "a.png", b"x");
        write_file(&dir, "notes.txt", b"x");
        write_file(&dir.join("nested"), "c.heic", b"x");
        write_file(&dir.join(".imagesmith"), "hidden.png", b"x");
        let loose = write_file(tmp.path(), "capture", b"x");

        let files = collect_inputs(&[dir.clone(), loose.clone()]);
        assert_eq!(
            files,
            vec![
                dir.join("a.png"),
                dir.join("b.jpg"),
                dir.join("nested").join("c.heic"),
                loose,
            ]
        );
    }
}
