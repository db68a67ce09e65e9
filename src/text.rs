//! Text helpers shared by the tree assembler: descriptions, authors, ids.

use scraper::Html;

/// Maximum number of authors named before the summary is truncated.
pub const MAX_NAMED_AUTHORS: usize = 5;

/// Suffix appended when authors were left out of the summary.
pub const ET_AL: &str = " et. al.";

/// Strip HTML tags from a catalog description, decoding entities.
///
/// Parsing goes through `scraper` (html5ever), so malformed markup is
/// handled the way a browser would handle it.
pub fn plain_description(html: Option<&str>) -> String {
    let Some(html) = html else {
        return String::new();
    };
    let fragment = Html::parse_fragment(html);
    let text: String = fragment.root_element().text().collect();
    text.trim().to_string()
}

/// Summarize authors in catalog order: the first five joined by `", "`,
/// followed by `" et. al."` when there are more.
pub fn author_summary<S: AsRef<str>>(authors: &[S]) -> String {
    let named = authors
        .iter()
        .take(MAX_NAMED_AUTHORS)
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(", ");
    if authors.len() > MAX_NAMED_AUTHORS {
        format!("{named}{ET_AL}")
    } else {
        named
    }
}

/// Identifier fragment for a title: lowercased, spaces replaced by hyphens.
pub fn title_id(title: &str) -> String {
    title.trim().replace(' ', "-").to_lowercase()
}

/// Identifier of a document placed under `base`.
pub fn document_id(base: &str, title: &str) -> String {
    format!("{base}-{}", title_id(title))
}
