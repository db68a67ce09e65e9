//! Local filesystem layout for downloads, thumbnails, and split chapters.
//!
//! Everything lives under one download directory that persists across runs:
//!
//! ```text
//! downloads/
//!   <book>.pdf              cached source PDFs, named by URL basename
//!   thumbnails/             cover thumbnails, named by URL basename
//!   chapters/<book-id>/     one PDF per split chapter
//! ```

use std::path::{Path, PathBuf};

use crate::error::{ConfigError, ConfigResult};

/// Resolved directories for one chef run.
#[derive(Debug, Clone)]
pub struct ChefPaths {
    /// `downloads/`
    pub download_dir: PathBuf,
    /// `downloads/thumbnails/`
    pub thumbnails_dir: PathBuf,
    /// `downloads/chapters/`
    pub chapters_root: PathBuf,
}

impl ChefPaths {
    /// Derive the layout from a download directory.
    pub fn new(download_dir: impl Into<PathBuf>) -> Self {
        let download_dir = download_dir.into();
        Self {
            thumbnails_dir: download_dir.join("thumbnails"),
            chapters_root: download_dir.join("chapters"),
            download_dir,
        }
    }

    /// Create the download and thumbnail directories. Idempotent.
    pub fn ensure_dirs(&self) -> ConfigResult<()> {
        for dir in [&self.download_dir, &self.thumbnails_dir, &self.chapters_root] {
            create_dir(dir)?;
        }
        Ok(())
    }

    /// Output directory for one book's chapters.
    pub fn chapters_dir(&self, book_identifier: &str) -> PathBuf {
        self.chapters_root.join(book_identifier)
    }

    /// Cache location for a source file downloaded for `owner`.
    ///
    /// Keyed by owner as well as basename: unrelated books often publish
    /// files under the same name.
    pub fn download_path(&self, owner: &str, url: &str) -> PathBuf {
        self.download_dir.join(format!("{owner}-{}", url_basename(url)))
    }

    /// Thumbnail location for a file stem and extension.
    pub fn thumbnail_path(&self, stem: &str, extension: &str) -> PathBuf {
        self.thumbnails_dir.join(format!("{stem}.{extension}"))
    }
}

pub(crate) fn create_dir(dir: &Path) -> ConfigResult<()> {
    std::fs::create_dir_all(dir).map_err(|e| ConfigError::CreateDir {
        path: dir.display().to_string(),
        source: e,
    })
}

/// Last path segment of a URL or path, with query and fragment removed.
pub fn url_basename(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    let trimmed = url[..end].trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// Split a basename into `(stem, lowercased extension)`.
///
/// A name without a dot has an empty extension.
pub fn split_extension(basename: &str) -> (&str, String) {
    match basename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, ext.to_ascii_lowercase()),
        _ => (basename, String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_derives_from_download_dir() {
        let paths = ChefPaths::new("/tmp/dl");
        assert_eq!(paths.thumbnails_dir, PathBuf::from("/tmp/dl/thumbnails"));
        assert_eq!(
            paths.chapters_dir("abc-main"),
            PathBuf::from("/tmp/dl/chapters/abc-main")
        );
        assert_eq!(
            paths.thumbnail_path("cover", "png"),
            PathBuf::from("/tmp/dl/thumbnails/cover.png")
        );
        assert_eq!(
            paths.download_path("abc-main", "https://cdn.test/x/book.pdf?v=2"),
            PathBuf::from("/tmp/dl/abc-main-book.pdf")
        );
    }

    #[test]
    fn basename_strips_query_and_fragment() {
        assert_eq!(
            url_basename("https://cdn.example.org/covers/physics.svg?v=3#top"),
            "physics.svg"
        );
        assert_eq!(url_basename("https://example.org/books/"), "books");
        assert_eq!(url_basename("local.pdf"), "local.pdf");
    }

    #[test]
    fn extension_is_lowercased() {
        assert_eq!(split_extension("Cover.SVG"), ("Cover", "svg".to_string()));
        assert_eq!(split_extension("README"), ("README", String::new()));
        assert_eq!(split_extension(".hidden"), (".hidden", String::new()));
    }

    #[test]
    fn ensure_dirs_is_idempotent() {
        let dir = tempfile::TempDir::new().unwrap();
        let paths = ChefPaths::new(dir.path().join("downloads"));
        paths.ensure_dirs().unwrap();
        paths.ensure_dirs().unwrap();
        assert!(paths.thumbnails_dir.is_dir());
        assert!(paths.chapters_root.is_dir());
    }
}
