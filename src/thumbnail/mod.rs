//! Cover thumbnails: fetch a book cover and leave a raster image on disk.
//!
//! Raster covers are stored as fetched. Vector covers go through the SVG
//! repair passes in [`svg`] and are rendered to PNG by [`raster`]. A small
//! exception table maps covers that do not survive conversion to
//! hand-made local assets.

pub mod css;
pub mod raster;
pub mod svg;

use std::path::{Path, PathBuf};

use crate::error::{ThumbnailError, ThumbnailResult};
use crate::fetch::Fetch;
use crate::paths::{ChefPaths, split_extension, url_basename};

/// Extensions stored without conversion.
pub const RASTER_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif"];

/// Extension converted through the SVG pipeline.
pub const VECTOR_EXTENSION: &str = "svg";

/// A cover replaced by a local asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoverOverride {
    /// Matched against the cover URL basename.
    pub fragment: &'static str,
    /// File name under the assets directory.
    pub asset: &'static str,
}

/// Covers known to render badly after conversion.
pub const COVER_OVERRIDES: &[CoverOverride] = &[CoverOverride {
    fragment: "US_history",
    asset: "US_history.png",
}];

/// How a cover URL is handled, decided from its basename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoverKind {
    Override(CoverOverride),
    Raster { stem: String, extension: String },
    Vector { stem: String },
}

impl CoverKind {
    /// Classify a cover URL. Unknown extensions are an error, never a guess.
    pub fn classify(cover_url: &str, overrides: &[CoverOverride]) -> ThumbnailResult<Self> {
        let basename = url_basename(cover_url);
        if let Some(entry) = overrides.iter().find(|o| basename.contains(o.fragment)) {
            return Ok(Self::Override(*entry));
        }

        let (stem, extension) = split_extension(basename);
        if RASTER_EXTENSIONS.contains(&extension.as_str()) {
            Ok(Self::Raster {
                stem: stem.to_string(),
                extension,
            })
        } else if extension == VECTOR_EXTENSION {
            Ok(Self::Vector {
                stem: stem.to_string(),
            })
        } else {
            Err(ThumbnailError::UnsupportedFormat {
                url: cover_url.to_string(),
                extension,
            })
        }
    }
}

/// Turns cover URLs into local raster thumbnails.
pub struct AssetNormalizer<'a> {
    fetcher: &'a dyn Fetch,
    paths: &'a ChefPaths,
    assets_dir: PathBuf,
    overrides: &'a [CoverOverride],
}

impl<'a> AssetNormalizer<'a> {
    pub fn new(fetcher: &'a dyn Fetch, paths: &'a ChefPaths, assets_dir: impl Into<PathBuf>) -> Self {
        Self {
            fetcher,
            paths,
            assets_dir: assets_dir.into(),
            overrides: COVER_OVERRIDES,
        }
    }

    /// Replace the cover exception table.
    pub fn with_overrides(mut self, overrides: &'a [CoverOverride]) -> Self {
        self.overrides = overrides;
        self
    }

    /// Produce the local thumbnail for `cover_url` and return its path.
    ///
    /// Existing thumbnails are overwritten, so reprocessing a cover yields
    /// the same file.
    pub fn normalize(&self, cover_url: &str) -> ThumbnailResult<PathBuf> {
        match CoverKind::classify(cover_url, self.overrides)? {
            CoverKind::Override(entry) => {
                let path = self.assets_dir.join(entry.asset);
                if !path.is_file() {
                    return Err(ThumbnailError::OverrideMissing {
                        path: path.display().to_string(),
                    });
                }
                tracing::debug!(url = cover_url, asset = %path.display(), "using cover override");
                Ok(path)
            }
            CoverKind::Raster { stem, extension } => {
                let bytes = self.fetcher.fetch(cover_url)?;
                let path = self.paths.thumbnail_path(&stem, &extension);
                write_file(&path, &bytes)?;
                Ok(path)
            }
            CoverKind::Vector { stem } => self.normalize_vector(cover_url, &stem),
        }
    }

    fn normalize_vector(&self, cover_url: &str, stem: &str) -> ThumbnailResult<PathBuf> {
        let markup = self.fetcher.fetch_text(cover_url)?;
        let repaired = svg::normalize(&markup, cover_url)?;
        tracing::debug!(
            url = cover_url,
            rules = repaired.rules,
            styled = repaired.styled_elements,
            "repaired SVG cover"
        );

        let svg_path = self.paths.thumbnail_path(stem, VECTOR_EXTENSION);
        write_file(&svg_path, repaired.markup.as_bytes())?;

        let png_path = self.paths.thumbnail_path(stem, "png");
        raster::rasterize(repaired.markup.as_bytes(), &png_path)?;
        Ok(png_path)
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> ThumbnailResult<()> {
    std::fs::write(path, bytes).map_err(|e| ThumbnailError::Io {
        path: path.display().to_string(),
        source: e,
    })
}
