//! Names for converted files and conversion ids.
//!
//! Converted files land in a flat output directory, so names must be unique
//! even when a parallel batch finishes several files in the same millisecond:
//!
//! ```text
//! converted_1718000000123_3fa9c1.jpg
//! ^prefix   ^unix ms      ^token ^primary extension of the target
//! ```
//!
//! The token is a short SHA-256 digest over the source path, the wall clock
//! in nanoseconds and a process-wide counter.

use crate::formats::ImageFormat;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

const OUTPUT_PREFIX: &str = "converted";

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Hex token of `len` characters, unique per call.
fn unique_token(seed: &Path, len: usize) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let mut hasher = Sha256::new();
    hasher.update(seed.to_string_lossy().as_bytes());
    hasher.update(nanos.to_le_bytes());
    hasher.update(COUNTER.fetch_add(1, Ordering::Relaxed).to_le_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..len].to_string()
}

/// File name for the converted copy of `source`.
pub fn output_file_name(source: &Path, target: ImageFormat, millis: u64) -> String {
    format!(
        "{OUTPUT_PREFIX}_{millis}_{}{}",
        unique_token(source, 6),
        target.primary_extension()
    )
}

/// Conversion id: `<unix ms>-<8 hex>`.
pub fn conversion_id(source: &Path, millis: u64) -> String {
    format!("{millis}-{}", unique_token(source, 8))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn output_name_uses_primary_extension() {
        let name = output_file_name(Path::new("/in/IMG_1.heic"), ImageFormat::Jpeg, 1700);
        assert!(name.starts_with("converted_1700_"), "{name}");
        assert!(name.ends_with(".jpg"), "{name}");
        assert_eq!(name.len(), "converted_1700_".len() + 6 + ".jpg".len());
    }

    #[test]
    fn output_names_unique_for_same_source_and_millis() {
        let source = Path::new("/in/a.png");
        let names: HashSet<_> = (0..100)
            .map(|_| output_file_name(source, ImageFormat::Png, 42))
            .collect();
        assert_eq!(names.len(), 100);
    }

    #[test]
    fn conversion_id_shape() {
        let id = conversion_id(Path::new("/in/a.png"), 99);
        let (millis, token) = id.split_once('-').unwrap();
        assert_eq!(millis, "99");
        assert_eq!(token.len(), 8);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn now_millis_is_after_2020() {
        assert!(now_millis() > 1_577_836_800_000);
    }
}
