//! Page-index overrides for books whose PDF outline is unreliable.
//!
//! The override file is a JSON object keyed by the book's split-topic id:
//!
//! ```json
//! { "abc-123-main": [ {"title": "Preface", "page_start": 0, "page_end": 12}, ... ] }
//! ```
//!
//! Pages are zero-based and `page_end` is exclusive. The store is loaded once
//! at startup and never mutated.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// One chapter boundary supplied by the override file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    pub title: String,
    pub page_start: u32,
    pub page_end: u32,
}

/// Exact chapter boundaries for one book.
pub type PageIndexOverride = Vec<PageRange>;

/// Read-only map from book node id to its override.
#[derive(Debug, Clone, Default)]
pub struct PageIndexStore {
    entries: HashMap<String, PageIndexOverride>,
}

impl PageIndexStore {
    /// Load the override file. A missing or malformed file is fatal.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::PageIndexMissing {
                    path: path.display().to_string(),
                });
            }
            Err(e) => {
                return Err(ConfigError::Read {
                    path: path.display().to_string(),
                    source: e,
                });
            }
        };
        let entries: HashMap<String, PageIndexOverride> =
            serde_json::from_slice(&data).map_err(|e| ConfigError::PageIndexParse {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        tracing::info!(books = entries.len(), path = %path.display(), "loaded page-index overrides");
        Ok(Self { entries })
    }

    /// Build a store from in-memory entries.
    pub fn from_entries(entries: HashMap<String, PageIndexOverride>) -> Self {
        Self { entries }
    }

    /// Override for a book, if one was supplied.
    pub fn get(&self, book_identifier: &str) -> Option<&[PageRange]> {
        self.entries.get(book_identifier).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_and_lookup() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("pages.json");
        std::fs::write(
            &path,
            r#"{"abc-main": [
                {"title": "Preface", "page_start": 0, "page_end": 3},
                {"title": "Chapter 1", "page_start": 3, "page_end": 10}
            ]}"#,
        )
        .unwrap();

        let store = PageIndexStore::load(&path).unwrap();
        assert_eq!(store.len(), 1);
        let ranges = store.get("abc-main").unwrap();
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[1].page_start, 3);
        assert!(store.get("other-main").is_none());
    }

    #[test]
    fn missing_file_is_fatal() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = PageIndexStore::load(&dir.path().join("pages.json")).unwrap_err();
        assert!(matches!(err, ConfigError::PageIndexMissing { .. }));
    }

    #[test]
    fn malformed_file_is_fatal() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("pages.json");
        std::fs::write(&path, r#"{"abc-main": [{"title": "x"}]}"#).unwrap();
        let err = PageIndexStore::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::PageIndexParse { .. }));
    }

    #[test]
    fn empty_object_is_valid() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("pages.json");
        std::fs::write(&path, "{}").unwrap();
        assert!(PageIndexStore::load(&path).unwrap().is_empty());
    }
}
