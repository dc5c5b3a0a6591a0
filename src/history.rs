//! Conversion history.
//!
//! Completed conversions are kept newest-first in a JSON file inside the data
//! directory (`.imagesmith/history.json`). The list is capped: adding past
//! the cap drops the oldest entries.
//!
//! Like the settings file, history is a convenience. A missing, corrupt or
//! outdated file loads as an empty history instead of failing the command;
//! the next save replaces it.

use crate::types::ConversionResult;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the history file within the data directory.
const HISTORY_FILENAME: &str = "history.json";

/// Bump to discard histories written in an older layout.
const HISTORY_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct History {
    pub version: u32,
    conversions: Vec<ConversionResult>,
    #[serde(skip)]
    max_entries: usize,
}

impl History {
    pub fn empty(max_entries: usize) -> Self {
        Self {
            version: HISTORY_VERSION,
            conversions: Vec::new(),
            max_entries,
        }
    }

    pub fn path(data_dir: &Path) -> PathBuf {
        data_dir.join(HISTORY_FILENAME)
    }

    /// Load from the data directory, falling back to an empty history.
    pub fn load(data_dir: &Path, max_entries: usize) -> Self {
        let path = Self::path(data_dir);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(path = %path.display(), error = %e, "history unreadable");
                }
                return Self::empty(max_entries);
            }
        };
        let mut history: Self = match serde_json::from_str(&content) {
            Ok(h) => h,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "history corrupt, starting fresh");
                return Self::empty(max_entries);
            }
        };
        if history.version != HISTORY_VERSION {
            tracing::warn!(found = history.version, "history version mismatch, starting fresh");
            return Self::empty(max_entries);
        }
        history.max_entries = max_entries;
        history.conversions.truncate(max_entries);
        history
    }

    /// Save to the data directory, creating it if needed.
    pub fn save(&self, data_dir: &Path) -> Result<(), HistoryError> {
        std::fs::create_dir_all(data_dir)?;
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(Self::path(data_dir), json)?;
        Ok(())
    }

    /// Record a conversion as the newest entry.
    pub fn add(&mut self, result: ConversionResult) {
        self.conversions.insert(0, result);
        self.conversions.truncate(self.max_entries);
    }

    /// Remove the entry with `id`. Returns whether anything was removed.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.conversions.len();
        self.conversions.retain(|c| c.id != id);
        self.conversions.len() != before
    }

    pub fn clear(&mut self) {
        self.conversions.clear();
    }

    pub fn find(&self, id: &str) -> Option<&ConversionResult> {
        self.conversions.iter().find(|c| c.id == id)
    }

    /// Newest first.
    pub fn iter(&self) -> impl Iterator<Item = &ConversionResult> {
        self.conversions.iter()
    }

    pub fn len(&self) -> usize {
        self.conversions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversions.is_empty()
    }
}
