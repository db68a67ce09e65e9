//! Chapter splitting: one PDF per book becomes one PDF per chapter.
//!
//! [`ChapterSplitter`] owns the book-level concerns (download cache, override
//! lookup, identifier alignment with the table of contents). Page-level work
//! is delegated to a [`SplitEngine`]; [`pdf::PdfSplitEngine`] is the lopdf
//! implementation.

pub mod pdf;

use std::path::{Path, PathBuf};

use crate::catalog::TableOfContents;
use crate::error::{SplitError, SplitResult};
use crate::fetch::Fetch;
use crate::page_index::{PageIndexStore, PageRange};
use crate::paths::ChefPaths;

/// A chapter file produced by a [`SplitEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedChapter {
    pub path: PathBuf,
    pub title: String,
}

/// Splits a local PDF into chapter files.
pub trait SplitEngine {
    /// Write one file per chapter into `out_dir`, in reading order.
    ///
    /// With `ranges`, chapters are exactly those ranges. Without, the engine
    /// derives boundaries from the document itself.
    fn split(
        &self,
        pdf: &Path,
        ranges: Option<&[PageRange]>,
        out_dir: &Path,
    ) -> SplitResult<Vec<ExtractedChapter>>;
}

/// A chapter with its content identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    pub path: PathBuf,
    pub title: String,
    pub source_id: String,
}

pub struct ChapterSplitter<'a> {
    fetcher: &'a dyn Fetch,
    paths: &'a ChefPaths,
    page_index: &'a PageIndexStore,
    engine: &'a dyn SplitEngine,
}

impl<'a> ChapterSplitter<'a> {
    pub fn new(
        fetcher: &'a dyn Fetch,
        paths: &'a ChefPaths,
        page_index: &'a PageIndexStore,
        engine: &'a dyn SplitEngine,
    ) -> Self {
        Self {
            fetcher,
            paths,
            page_index,
            engine,
        }
    }

    /// Split the book PDF at `pdf_url` into chapters identified against `toc`.
    pub fn split(
        &self,
        pdf_url: &str,
        book_identifier: &str,
        toc: &TableOfContents,
    ) -> SplitResult<Vec<Chapter>> {
        let pdf = self.download(pdf_url, book_identifier)?;
        let ranges = self.page_index.get(book_identifier);
        let out_dir = self.paths.chapters_dir(book_identifier);
        std::fs::create_dir_all(&out_dir).map_err(|e| SplitError::Io {
            path: out_dir.display().to_string(),
            source: e,
        })?;

        let extracted = self.engine.split(&pdf, ranges, &out_dir)?;
        if extracted.len() != toc.len() {
            tracing::debug!(
                book = book_identifier,
                chapters = extracted.len(),
                toc = toc.len(),
                overridden = ranges.is_some(),
                "chapter count differs from table of contents"
            );
        }
        Ok(align_chapters(extracted, book_identifier, toc))
    }

    /// Local copy of `pdf_url` for `book_identifier`, downloading it on
    /// first use.
    pub fn download(&self, pdf_url: &str, book_identifier: &str) -> SplitResult<PathBuf> {
        let path = self.paths.download_path(book_identifier, pdf_url);
        if path.metadata().map(|m| m.len() > 0).unwrap_or(false) {
            tracing::debug!(url = pdf_url, path = %path.display(), "using cached PDF");
            return Ok(path);
        }

        let bytes = self.fetcher.fetch(pdf_url)?;
        let partial = path.with_extension("part");
        std::fs::write(&partial, &bytes)
            .and_then(|()| std::fs::rename(&partial, &path))
            .map_err(|e| SplitError::Io {
                path: path.display().to_string(),
                source: e,
            })?;
        tracing::info!(url = pdf_url, bytes = bytes.len(), "downloaded PDF");
        Ok(path)
    }
}

/// Pair chapters with table-of-contents ids by position.
///
/// Chapters past the end of the table (or at entries without an id) get
/// `<book_identifier>-<index>`. Nothing is dropped.
pub fn align_chapters(
    extracted: Vec<ExtractedChapter>,
    book_identifier: &str,
    toc: &TableOfContents,
) -> Vec<Chapter> {
    extracted
        .into_iter()
        .enumerate()
        .map(|(index, chapter)| {
            let source_id = toc
                .entries()
                .get(index)
                .and_then(|entry| entry.id.as_deref())
                .filter(|id| !id.trim().is_empty())
                .map_or_else(|| format!("{book_identifier}-{index}"), str::to_string);
            Chapter {
                path: chapter.path,
                title: chapter.title,
                source_id,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::collections::HashMap;

    use super::*;
    use crate::catalog::TocEntry;
    use crate::error::FetchResult;

    struct StaticFetcher {
        calls: Cell<usize>,
    }

    impl Fetch for StaticFetcher {
        fn fetch(&self, _url: &str) -> FetchResult<Vec<u8>> {
            self.calls.set(self.calls.get() + 1);
            Ok(b"%PDF-1.5 fake".to_vec())
        }
    }

    /// Emits `count` chapters, or one per override range.
    struct CountingEngine {
        count: usize,
    }

    impl SplitEngine for CountingEngine {
        fn split(
            &self,
            _pdf: &Path,
            ranges: Option<&[PageRange]>,
            out_dir: &Path,
        ) -> SplitResult<Vec<ExtractedChapter>> {
            let titles: Vec<String> = match ranges {
                Some(ranges) => ranges.iter().map(|r| r.title.clone()).collect(),
                None => (0..self.count).map(|i| format!("Part {i}")).collect(),
            };
            Ok(titles
                .into_iter()
                .enumerate()
                .map(|(i, title)| ExtractedChapter {
                    path: out_dir.join(format!("{i}.pdf")),
                    title,
                })
                .collect())
        }
    }

    fn toc(ids: &[Option<&str>]) -> TableOfContents {
        TableOfContents(
            ids.iter()
                .enumerate()
                .map(|(i, id)| TocEntry {
                    id: id.map(str::to_string),
                    title: format!("Entry {i}"),
                })
                .collect(),
        )
    }

    #[test]
    fn extra_chapters_get_fallback_ids() {
        let dir = tempfile::TempDir::new().unwrap();
        let paths = ChefPaths::new(dir.path());
        paths.ensure_dirs().unwrap();
        let fetcher = StaticFetcher { calls: Cell::new(0) };
        let store = PageIndexStore::default();
        let engine = CountingEngine { count: 5 };
        let splitter = ChapterSplitter::new(&fetcher, &paths, &store, &engine);

        let chapters = splitter
            .split("https://cdn.test/book.pdf", "b-main", &toc(&[Some("t0"), Some("t1"), Some("t2")]))
            .unwrap();

        let ids: Vec<&str> = chapters.iter().map(|c| c.source_id.as_str()).collect();
        assert_eq!(ids, ["t0", "t1", "t2", "b-main-3", "b-main-4"]);
        assert!(paths.chapters_dir("b-main").is_dir());
    }

    #[test]
    fn override_ranges_reach_the_engine() {
        let dir = tempfile::TempDir::new().unwrap();
        let paths = ChefPaths::new(dir.path());
        paths.ensure_dirs().unwrap();
        let fetcher = StaticFetcher { calls: Cell::new(0) };
        let store = PageIndexStore::from_entries(HashMap::from([(
            "b-main".to_string(),
            vec![
                PageRange {
                    title: "Preface".into(),
                    page_start: 0,
                    page_end: 2,
                },
                PageRange {
                    title: "Chapter 1".into(),
                    page_start: 2,
                    page_end: 9,
                },
            ],
        )]));
        let engine = CountingEngine { count: 7 };
        let splitter = ChapterSplitter::new(&fetcher, &paths, &store, &engine);

        let chapters = splitter
            .split("https://cdn.test/book.pdf", "b-main", &toc(&[None]))
            .unwrap();
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].title, "Preface");
        assert_eq!(chapters[0].source_id, "b-main-0");
        assert_eq!(chapters[1].source_id, "b-main-1");
    }

    #[test]
    fn cached_pdf_is_reused() {
        let dir = tempfile::TempDir::new().unwrap();
        let paths = ChefPaths::new(dir.path());
        paths.ensure_dirs().unwrap();
        let fetcher = StaticFetcher { calls: Cell::new(0) };
        let store = PageIndexStore::default();
        let engine = CountingEngine { count: 1 };
        let splitter = ChapterSplitter::new(&fetcher, &paths, &store, &engine);

        let first = splitter.download("https://cdn.test/book.pdf?x=1", "b-main").unwrap();
        let second = splitter.download("https://cdn.test/book.pdf?x=1", "b-main").unwrap();
        assert_eq!(first, dir.path().join("b-main-book.pdf"));
        assert_eq!(first, second);
        assert_eq!(fetcher.calls.get(), 1);
    }

    #[test]
    fn same_basename_for_two_books_is_cached_separately() {
        let dir = tempfile::TempDir::new().unwrap();
        let paths = ChefPaths::new(dir.path());
        paths.ensure_dirs().unwrap();
        let fetcher = StaticFetcher { calls: Cell::new(0) };
        let store = PageIndexStore::default();
        let engine = CountingEngine { count: 1 };
        let splitter = ChapterSplitter::new(&fetcher, &paths, &store, &engine);

        let a = splitter.download("https://cdn.test/a/book.pdf", "a-main").unwrap();
        let b = splitter.download("https://cdn.test/b/book.pdf", "b-main").unwrap();
        assert_ne!(a, b);
        assert_eq!(fetcher.calls.get(), 2);
    }

    #[test]
    fn blank_toc_ids_fall_back() {
        let extracted = vec![ExtractedChapter {
            path: PathBuf::from("0.pdf"),
            title: "One".into(),
        }];
        let chapters = align_chapters(extracted, "b", &toc(&[Some("  ")]));
        assert_eq!(chapters[0].source_id, "b-0");
    }
}
