//! Rich diagnostic error types for the channel chef.
//!
//! Each stage of the pipeline defines its own error type with miette `#[diagnostic]`
//! derives, providing error codes and help text so an operator knows which book,
//! URL, or configuration entry needs attention.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for a chef run.
///
/// Stage errors are wrapped transparently so their codes and help text reach
/// the terminal unchanged.
#[derive(Debug, Error, Diagnostic)]
pub enum ChefError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Thumbnail(#[from] ThumbnailError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Split(#[from] SplitError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Tree(#[from] TreeError),

    #[error("unmapped license \"{license}\" on book \"{book}\"")]
    #[diagnostic(
        code(chef::license::unmapped),
        help(
            "The license table is static configuration. Add \"{license}\" to the \
             [licenses] table of the chef config (or to the built-in mapping) and rerun."
        )
    )]
    UnmappedLicense { license: String, book: String },
}

impl ChefError {
    /// Whether this error only invalidates the book being processed.
    ///
    /// Book-scoped errors are logged and the run continues with the next
    /// catalog entry; everything else terminates the run.
    pub fn is_book_scoped(&self) -> bool {
        match self {
            Self::Fetch(_) | Self::Catalog(_) => true,
            Self::Thumbnail(e) => e.is_book_scoped(),
            Self::Split(e) => e.is_book_scoped(),
            Self::Config(_) | Self::Tree(_) | Self::UnmappedLicense { .. } => false,
        }
    }
}

/// Convenience alias for pipeline results.
pub type ChefResult<T> = std::result::Result<T, ChefError>;

// ---------------------------------------------------------------------------
// Fetch errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum FetchError {
    #[error("HTTP {status} fetching \"{url}\"")]
    #[diagnostic(
        code(chef::fetch::status),
        help("The server answered with an error status. Check that the URL is still published.")
    )]
    Status { url: String, status: u16 },

    #[error("transport error fetching \"{url}\" after {attempts} attempt(s): {message}")]
    #[diagnostic(
        code(chef::fetch::transport),
        help(
            "The URL could not be reached. Check network connectivity, or raise \
             `fetch.retries` / `fetch.timeout_secs` in the chef config."
        )
    )]
    Transport {
        url: String,
        attempts: u32,
        message: String,
    },

    #[error("failed to read local source \"{path}\"")]
    #[diagnostic(
        code(chef::fetch::local),
        help("Non-http references are read from disk. Check that the file exists.")
    )]
    Local {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type FetchResult<T> = std::result::Result<T, FetchError>;

// ---------------------------------------------------------------------------
// Catalog errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum CatalogError {
    #[error("malformed catalog response from \"{url}\": {message}")]
    #[diagnostic(
        code(chef::catalog::malformed),
        help(
            "The catalog endpoint returned JSON that does not match the expected \
             book schema. The API may have changed."
        )
    )]
    Malformed { url: String, message: String },
}

pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("page-index override file not found: {path}")]
    #[diagnostic(
        code(chef::config::page_index_missing),
        help(
            "The chapter splitter requires the page-index override file. \
             Pass --page-index or set `page_index_file` in the chef config."
        )
    )]
    PageIndexMissing { path: String },

    #[error("failed to parse page-index override file {path}: {message}")]
    #[diagnostic(
        code(chef::config::page_index_parse),
        help(
            "The file must be a JSON object mapping book node ids to lists of \
             {{\"title\", \"page_start\", \"page_end\"}} entries."
        )
    )]
    PageIndexParse { path: String, message: String },

    #[error("failed to read chef config: {path}")]
    #[diagnostic(
        code(chef::config::read),
        help("Ensure the config file exists and is valid TOML.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse chef config {path}: {message}")]
    #[diagnostic(
        code(chef::config::parse),
        help("Check the TOML syntax and the license kind names in the config file.")
    )]
    Parse { path: String, message: String },

    #[error("failed to write chef config: {path}")]
    #[diagnostic(
        code(chef::config::write),
        help("Ensure you have write permissions to the config directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create directory: {path}")]
    #[diagnostic(
        code(chef::config::create_dir),
        help("Check that the parent directory exists and you have write permissions.")
    )]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown license kind \"{kind}\"")]
    #[diagnostic(
        code(chef::config::license_kind),
        help(
            "Valid kinds are: CC BY, CC BY-SA, CC BY-ND, CC BY-NC, CC BY-NC-SA, \
             CC BY-NC-ND, All Rights Reserved, Public Domain, Special Permissions."
        )
    )]
    UnknownLicenseKind { kind: String },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// ---------------------------------------------------------------------------
// Thumbnail errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ThumbnailError {
    #[error("unsupported thumbnail format \"{extension}\" for {url}")]
    #[diagnostic(
        code(chef::thumbnail::unsupported_format),
        help(
            "Only png, jpg, jpeg, gif and svg covers are handled. Convert this cover \
             manually and add it to the cover exception table, or extend the normalizer."
        )
    )]
    UnsupportedFormat { url: String, extension: String },

    #[error("cover override asset missing: {path}")]
    #[diagnostic(
        code(chef::thumbnail::override_missing),
        help("The exception table points at a local asset that does not exist. Check `assets_dir`.")
    )]
    OverrideMissing { path: String },

    #[error("malformed SVG from {url}: {message}")]
    #[diagnostic(
        code(chef::thumbnail::svg),
        help("The vector cover could not be parsed as XML with an <svg> root element.")
    )]
    Svg { url: String, message: String },

    #[error("failed to rasterize {path}: {message}")]
    #[diagnostic(
        code(chef::thumbnail::raster),
        help(
            "The repaired SVG could not be rendered. Inspect the written .svg file; \
             covers that keep failing belong in the cover exception table."
        )
    )]
    Raster { path: String, message: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Fetch(#[from] FetchError),

    #[error("I/O error writing {path}")]
    #[diagnostic(
        code(chef::thumbnail::io),
        help("A filesystem operation failed. Check that the thumbnails directory is writable.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ThumbnailError {
    /// Fetch and markup problems belong to the book; format and setup problems stop the run.
    pub fn is_book_scoped(&self) -> bool {
        matches!(self, Self::Fetch(_) | Self::Svg { .. } | Self::Raster { .. })
    }
}

pub type ThumbnailResult<T> = std::result::Result<T, ThumbnailError>;

// ---------------------------------------------------------------------------
// Split errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum SplitError {
    #[error("failed to parse PDF {path}: {message}")]
    #[diagnostic(
        code(chef::split::parse),
        help("The downloaded PDF is not readable. Delete the cached copy and rerun to refetch it.")
    )]
    Parse { path: String, message: String },

    #[error("invalid page range {start}..{end} for \"{title}\" in {path} ({page_count} pages)")]
    #[diagnostic(
        code(chef::split::page_range),
        help(
            "The page-index override does not fit this PDF. Ranges are zero-based \
             with an exclusive end and must lie within the page count."
        )
    )]
    InvalidPageRange {
        path: String,
        title: String,
        start: u32,
        end: u32,
        page_count: u32,
    },

    #[error("failed to write chapter {path}: {message}")]
    #[diagnostic(
        code(chef::split::write),
        help("Check that the chapters directory is writable and the disk is not full.")
    )]
    Write { path: String, message: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Fetch(#[from] FetchError),

    #[error("I/O error on {path}")]
    #[diagnostic(
        code(chef::split::io),
        help("A filesystem operation failed. Check the download directory permissions.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl SplitError {
    /// Every split failure is confined to the book whose PDF failed,
    /// except a broken download directory.
    pub fn is_book_scoped(&self) -> bool {
        !matches!(self, Self::Io { .. })
    }
}

pub type SplitResult<T> = std::result::Result<T, SplitError>;

// ---------------------------------------------------------------------------
// Tree errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum TreeError {
    #[error("channel \"{channel}\" has no content")]
    #[diagnostic(
        code(chef::tree::empty_channel),
        help("No book produced any node. Check the logs for skipped books.")
    )]
    EmptyChannel { channel: String },

    #[error("duplicate source id \"{source_id}\" under \"{parent}\"")]
    #[diagnostic(
        code(chef::tree::duplicate_sibling),
        help("Sibling nodes must have distinct source ids.")
    )]
    DuplicateSibling { parent: String, source_id: String },

    #[error("invalid node \"{source_id}\": {reason}")]
    #[diagnostic(
        code(chef::tree::invalid_node),
        help("The node is missing required data for its kind.")
    )]
    InvalidNode { source_id: String, reason: String },

    #[error("failed to write channel tree to {path}: {message}")]
    #[diagnostic(
        code(chef::tree::write),
        help("Check that the output path is writable.")
    )]
    Write { path: String, message: String },
}

pub type TreeResult<T> = std::result::Result<T, TreeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_failures_are_book_scoped() {
        let err: ChefError = FetchError::Status {
            url: "https://example.org/x".into(),
            status: 503,
        }
        .into();
        assert!(err.is_book_scoped());
    }

    #[test]
    fn unsupported_format_stops_the_run() {
        let err: ChefError = ThumbnailError::UnsupportedFormat {
            url: "https://example.org/cover.tiff".into(),
            extension: "tiff".into(),
        }
        .into();
        assert!(!err.is_book_scoped());
    }

    #[test]
    fn unmapped_license_stops_the_run() {
        let err = ChefError::UnmappedLicense {
            license: "Proprietary".into(),
            book: "intro".into(),
        };
        assert!(!err.is_book_scoped());
        assert!(err.to_string().contains("Proprietary"));
    }

    #[test]
    fn invalid_page_range_is_book_scoped() {
        let err: ChefError = SplitError::InvalidPageRange {
            path: "book.pdf".into(),
            title: "Chapter 1".into(),
            start: 4,
            end: 2,
            page_count: 10,
        }
        .into();
        assert!(err.is_book_scoped());
    }
}
