//! lopdf-backed [`SplitEngine`].
//!
//! Chapter boundaries come from the page-index override when one exists,
//! otherwise from the top level of the document outline. Each chapter is
//! written as a copy of the source with the other pages deleted and
//! unreachable objects pruned.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use lopdf::{Dictionary, Document, Object, ObjectId};

use super::{ExtractedChapter, SplitEngine};
use crate::error::{SplitError, SplitResult};
use crate::page_index::PageRange;

/// Upper bound on named-destination indirection.
const MAX_DEST_DEPTH: usize = 8;

#[derive(Debug, Clone, Copy, Default)]
pub struct PdfSplitEngine;

impl SplitEngine for PdfSplitEngine {
    fn split(
        &self,
        pdf: &Path,
        ranges: Option<&[PageRange]>,
        out_dir: &Path,
    ) -> SplitResult<Vec<ExtractedChapter>> {
        let doc = Document::load(pdf).map_err(|e| SplitError::Parse {
            path: pdf.display().to_string(),
            message: e.to_string(),
        })?;
        let page_count = u32::try_from(doc.get_pages().len()).unwrap_or(u32::MAX);
        if page_count == 0 {
            return Err(SplitError::Parse {
                path: pdf.display().to_string(),
                message: "document has no pages".into(),
            });
        }

        let ranges = match ranges {
            Some(ranges) => {
                validate_ranges(ranges, page_count, pdf)?;
                ranges.to_vec()
            }
            None => {
                let title = pdf
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                outline_ranges(&doc, page_count, &title)
            }
        };

        let mut chapters = Vec::with_capacity(ranges.len());
        for (index, range) in ranges.iter().enumerate() {
            let path = out_dir.join(format!("{index}.pdf"));
            write_chapter(&doc, range, &path)?;
            tracing::debug!(
                chapter = index,
                title = %range.title,
                start = range.page_start,
                end = range.page_end,
                "wrote chapter"
            );
            chapters.push(ExtractedChapter {
                path,
                title: range.title.clone(),
            });
        }
        Ok(chapters)
    }
}

/// Reject empty or out-of-bounds override ranges.
fn validate_ranges(ranges: &[PageRange], page_count: u32, pdf: &Path) -> SplitResult<()> {
    for range in ranges {
        if range.page_start >= range.page_end || range.page_end > page_count {
            return Err(SplitError::InvalidPageRange {
                path: pdf.display().to_string(),
                title: range.title.clone(),
                start: range.page_start,
                end: range.page_end,
                page_count,
            });
        }
    }
    Ok(())
}

/// Chapter ranges from top-level outline entries.
///
/// Each entry runs to the next entry's page; pages ahead of the first entry
/// belong to the first chapter. Without a usable outline the whole document
/// is one chapter titled `whole_title`.
pub fn outline_ranges(doc: &Document, page_count: u32, whole_title: &str) -> Vec<PageRange> {
    let page_numbers: HashMap<ObjectId, u32> = doc
        .get_pages()
        .into_iter()
        .map(|(number, id)| (id, number.saturating_sub(1)))
        .collect();

    let mut starts: Vec<(String, u32)> = Vec::new();
    for item in top_level_outline(doc) {
        let title = item
            .get(b"Title")
            .ok()
            .and_then(|t| resolve_object(doc, t))
            .map(object_text)
            .unwrap_or_default();
        match resolve_destination(doc, item).and_then(|id| page_numbers.get(&id).copied()) {
            Some(page) => starts.push((title, page)),
            None => tracing::warn!(title = %title, "outline entry has no resolvable page, skipped"),
        }
    }
    starts.sort_by_key(|(_, page)| *page);

    // Entries sharing a start page collapse onto the last of them.
    let mut chapters: Vec<(String, u32)> = Vec::with_capacity(starts.len());
    for (title, start) in starts {
        match chapters.last_mut() {
            Some(last) if last.1 == start => {
                tracing::debug!(skipped = %last.0, kept = %title, page = start, "outline entries share a page");
                *last = (title, start);
            }
            _ => chapters.push((title, start)),
        }
    }

    let mut ranges = Vec::with_capacity(chapters.len());
    for (i, (title, start)) in chapters.iter().enumerate() {
        let page_start = if i == 0 { 0 } else { *start };
        let page_end = chapters.get(i + 1).map_or(page_count, |(_, next)| *next);
        if page_start >= page_end {
            continue;
        }
        ranges.push(PageRange {
            title: title.clone(),
            page_start,
            page_end,
        });
    }

    if ranges.is_empty() {
        ranges.push(PageRange {
            title: whole_title.to_string(),
            page_start: 0,
            page_end: page_count,
        });
    }
    ranges
}

fn write_chapter(source: &Document, range: &PageRange, path: &Path) -> SplitResult<()> {
    let mut chapter = source.clone();
    let outside: Vec<u32> = chapter
        .get_pages()
        .keys()
        .copied()
        .filter(|number| {
            let index = number - 1;
            index < range.page_start || index >= range.page_end
        })
        .collect();
    chapter.delete_pages(&outside);
    drop_outline(&mut chapter);
    chapter.prune_objects();

    chapter.save(path).map_err(|e| SplitError::Write {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    Ok(())
}

/// The outline points into deleted pages once a chapter is cut out.
fn drop_outline(doc: &mut Document) {
    let Ok(root) = doc.trailer.get(b"Root").and_then(Object::as_reference) else {
        return;
    };
    if let Ok(catalog) = doc.get_object_mut(root).and_then(Object::as_dict_mut) {
        catalog.remove(b"Outlines");
    }
}

fn resolve_object<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    match resolve_object(doc, obj)? {
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

/// Outline items linked from `/Outlines /First` through `/Next`.
fn top_level_outline(doc: &Document) -> Vec<&Dictionary> {
    let mut items = Vec::new();
    let Some(outlines) = doc
        .catalog()
        .ok()
        .and_then(|catalog| catalog.get(b"Outlines").ok())
        .and_then(|o| resolve_dict(doc, o))
    else {
        return items;
    };

    let mut seen = HashSet::new();
    let mut next = outlines.get(b"First").and_then(Object::as_reference).ok();
    while let Some(id) = next {
        if !seen.insert(id) {
            break;
        }
        let Ok(item) = doc.get_dictionary(id) else {
            break;
        };
        items.push(item);
        next = item.get(b"Next").and_then(Object::as_reference).ok();
    }
    items
}

/// Page object targeted by an outline item, via `/Dest` or a GoTo action.
fn resolve_destination(doc: &Document, item: &Dictionary) -> Option<ObjectId> {
    let dest = match item.get(b"Dest") {
        Ok(dest) => dest,
        Err(_) => item
            .get(b"A")
            .ok()
            .and_then(|a| resolve_dict(doc, a))?
            .get(b"D")
            .ok()?,
    };
    destination_page(doc, dest, 0)
}

fn destination_page(doc: &Document, dest: &Object, depth: usize) -> Option<ObjectId> {
    if depth > MAX_DEST_DEPTH {
        return None;
    }
    match resolve_object(doc, dest)? {
        Object::Array(parts) => parts.first()?.as_reference().ok(),
        Object::Dictionary(dict) => destination_page(doc, dict.get(b"D").ok()?, depth + 1),
        Object::Name(name) | Object::String(name, _) => {
            destination_page(doc, named_destination(doc, name)?, depth + 1)
        }
        _ => None,
    }
}

/// Look a name up in `/Dests` (PDF 1.1) or the `/Names /Dests` tree.
fn named_destination<'a>(doc: &'a Document, name: &[u8]) -> Option<&'a Object> {
    let catalog = doc.catalog().ok()?;
    if let Some(found) = catalog
        .get(b"Dests")
        .ok()
        .and_then(|d| resolve_dict(doc, d))
        .and_then(|d| d.get(name).ok())
    {
        return Some(found);
    }
    let tree = catalog
        .get(b"Names")
        .ok()
        .and_then(|n| resolve_dict(doc, n))?
        .get(b"Dests")
        .ok()
        .and_then(|d| resolve_dict(doc, d))?;
    search_name_tree(doc, tree, name, 0)
}

fn search_name_tree<'a>(
    doc: &'a Document,
    node: &'a Dictionary,
    name: &[u8],
    depth: usize,
) -> Option<&'a Object> {
    if depth > MAX_DEST_DEPTH {
        return None;
    }
    if let Ok(names) = node.get(b"Names").and_then(Object::as_array) {
        for pair in names.chunks(2) {
            if let [key, value] = pair {
                if matches!(resolve_object(doc, key), Some(Object::String(k, _)) if k.as_slice() == name) {
                    return Some(value);
                }
            }
        }
    }
    if let Ok(kids) = node.get(b"Kids").and_then(Object::as_array) {
        for kid in kids {
            if let Some(found) = resolve_dict(doc, kid).and_then(|k| search_name_tree(doc, k, name, depth + 1)) {
                return Some(found);
            }
        }
    }
    None
}

fn object_text(obj: &Object) -> String {
    match obj {
        Object::String(bytes, _) => decode_pdf_string(bytes),
        Object::Name(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        _ => String::new(),
    }
}

/// Decode a PDF text string: UTF-16BE with BOM, UTF-8 with BOM, or
/// single-byte (read as Latin-1).
pub fn decode_pdf_string(bytes: &[u8]) -> String {
    let text = if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        String::from_utf8_lossy(rest).into_owned()
    } else {
        bytes.iter().map(|&b| char::from(b)).collect()
    };
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use lopdf::{Stream, dictionary};

    use super::*;

    /// A document with `pages` blank pages and a flat outline of
    /// `(title, zero-based page)` entries.
    fn sample_pdf(pages: usize, outline: &[(&str, usize)]) -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut page_ids = Vec::new();
        for i in 0..pages {
            let content_id = doc.add_object(Stream::new(
                Dictionary::new(),
                format!("% page {i}\n").into_bytes(),
            ));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            page_ids.push(page_id);
        }
        let kids: Vec<Object> = page_ids.iter().map(|id| Object::Reference(*id)).collect();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => Object::Integer(pages as i64),
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(595),
                    Object::Integer(842),
                ],
            }),
        );

        let mut catalog = dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        };
        if !outline.is_empty() {
            let outlines_id = doc.new_object_id();
            let item_ids: Vec<ObjectId> = outline.iter().map(|_| doc.new_object_id()).collect();
            for (i, (title, page)) in outline.iter().enumerate() {
                let mut item = dictionary! {
                    "Title" => Object::string_literal(*title),
                    "Parent" => outlines_id,
                    "Dest" => vec![Object::Reference(page_ids[*page]), "Fit".into()],
                };
                if let Some(next) = item_ids.get(i + 1) {
                    item.set("Next", *next);
                }
                doc.objects.insert(item_ids[i], Object::Dictionary(item));
            }
            doc.objects.insert(
                outlines_id,
                Object::Dictionary(dictionary! {
                    "Type" => "Outlines",
                    "First" => item_ids[0],
                    "Last" => item_ids[item_ids.len() - 1],
                    "Count" => Object::Integer(item_ids.len() as i64),
                }),
            );
            catalog.set("Outlines", outlines_id);
        }
        let catalog_id = doc.add_object(catalog);
        doc.trailer.set("Root", catalog_id);
        doc
    }

    fn save_sample(dir: &Path, pages: usize, outline: &[(&str, usize)]) -> std::path::PathBuf {
        let path = dir.join("book.pdf");
        sample_pdf(pages, outline).save(&path).unwrap();
        path
    }

    fn page_count(path: &Path) -> usize {
        Document::load(path).unwrap().get_pages().len()
    }

    #[test]
    fn override_ranges_define_chapters() {
        let dir = tempfile::TempDir::new().unwrap();
        let pdf = save_sample(dir.path(), 6, &[]);
        let out = dir.path().join("chapters");
        std::fs::create_dir_all(&out).unwrap();
        let ranges = vec![
            PageRange { title: "Preface".into(), page_start: 0, page_end: 1 },
            PageRange { title: "Chapter 1".into(), page_start: 1, page_end: 6 },
        ];

        let chapters = PdfSplitEngine.split(&pdf, Some(&ranges), &out).unwrap();

        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].path, out.join("0.pdf"));
        assert_eq!(chapters[1].title, "Chapter 1");
        assert_eq!(page_count(&chapters[0].path), 1);
        assert_eq!(page_count(&chapters[1].path), 5);
    }

    #[test]
    fn out_of_bounds_override_is_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let pdf = save_sample(dir.path(), 3, &[]);
        let ranges = vec![PageRange { title: "Too long".into(), page_start: 0, page_end: 4 }];

        let err = PdfSplitEngine.split(&pdf, Some(&ranges), dir.path()).unwrap_err();
        assert!(matches!(
            err,
            SplitError::InvalidPageRange { end: 4, page_count: 3, .. }
        ));
    }

    #[test]
    fn empty_override_range_is_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let pdf = save_sample(dir.path(), 3, &[]);
        let ranges = vec![PageRange { title: "Empty".into(), page_start: 2, page_end: 2 }];
        assert!(PdfSplitEngine.split(&pdf, Some(&ranges), dir.path()).is_err());
    }

    #[test]
    fn outline_defines_chapters_without_override() {
        let dir = tempfile::TempDir::new().unwrap();
        let pdf = save_sample(dir.path(), 5, &[("Chapter 1", 1), ("Chapter 2", 3)]);
        let out = dir.path().join("chapters");
        std::fs::create_dir_all(&out).unwrap();

        let chapters = PdfSplitEngine.split(&pdf, None, &out).unwrap();

        let titles: Vec<&str> = chapters.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, ["Chapter 1", "Chapter 2"]);
        // Leading pages fold into the first chapter.
        assert_eq!(page_count(&chapters[0].path), 3);
        assert_eq!(page_count(&chapters[1].path), 2);
    }

    #[test]
    fn no_outline_means_one_chapter() {
        let dir = tempfile::TempDir::new().unwrap();
        let pdf = save_sample(dir.path(), 4, &[]);
        let chapters = PdfSplitEngine.split(&pdf, None, dir.path()).unwrap();
        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].title, "book");
        assert_eq!(page_count(&chapters[0].path), 4);
    }

    #[test]
    fn outline_ranges_merge_entries_on_one_page() {
        let doc = sample_pdf(4, &[("Intro", 0), ("Welcome", 0), ("Body", 2)]);
        let ranges = outline_ranges(&doc, 4, "whole");
        assert_eq!(
            ranges,
            vec![
                PageRange { title: "Welcome".into(), page_start: 0, page_end: 2 },
                PageRange { title: "Body".into(), page_start: 2, page_end: 4 },
            ]
        );
    }

    #[test]
    fn shared_first_page_keeps_last_entry_and_front_matter() {
        let doc = sample_pdf(6, &[("Cover", 2), ("Preface", 2), ("Unit 1", 4)]);
        let ranges = outline_ranges(&doc, 6, "whole");
        assert_eq!(
            ranges,
            vec![
                PageRange { title: "Preface".into(), page_start: 0, page_end: 4 },
                PageRange { title: "Unit 1".into(), page_start: 4, page_end: 6 },
            ]
        );
    }

    #[test]
    fn split_output_is_deterministic() {
        let dir = tempfile::TempDir::new().unwrap();
        let pdf = save_sample(dir.path(), 4, &[("A", 0), ("B", 2)]);
        let first = dir.path().join("first");
        let second = dir.path().join("second");
        std::fs::create_dir_all(&first).unwrap();
        std::fs::create_dir_all(&second).unwrap();

        PdfSplitEngine.split(&pdf, None, &first).unwrap();
        PdfSplitEngine.split(&pdf, None, &second).unwrap();

        for name in ["0.pdf", "1.pdf"] {
            assert_eq!(
                std::fs::read(first.join(name)).unwrap(),
                std::fs::read(second.join(name)).unwrap()
            );
        }
    }

    #[test]
    fn unreadable_pdf_is_a_parse_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let pdf = dir.path().join("broken.pdf");
        std::fs::write(&pdf, b"not a pdf").unwrap();
        let err = PdfSplitEngine.split(&pdf, None, dir.path()).unwrap_err();
        assert!(matches!(err, SplitError::Parse { .. }));
        assert!(err.is_book_scoped());
    }

    #[test]
    fn pdf_text_strings() {
        assert_eq!(decode_pdf_string(b"\xFE\xFF\x00C\x00h\x00 \x00\xE9"), "Ch \u{e9}");
        assert_eq!(decode_pdf_string(b"Preface "), "Preface");
        assert_eq!(decode_pdf_string(b"\xEF\xBB\xBFcaf\xC3\xA9"), "caf\u{e9}");
    }
}
