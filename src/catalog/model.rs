//! Catalog records as returned by the book API.
//!
//! The API is loose about optional fields (nulls, missing keys, wrapped
//! lists), so every field defaults and the few shape variations are accepted
//! explicitly.

use serde::{Deserialize, Deserializer};

/// One entry of the `books` listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CatalogBook {
    #[serde(default, deserialize_with = "null_as_default")]
    pub subject: String,
    pub slug: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
}

/// The `books` listing: either `{"books": [...]}` or a bare array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum CatalogListing {
    Wrapped { books: Vec<CatalogBook> },
    Bare(Vec<CatalogBook>),
}

impl CatalogListing {
    pub(crate) fn into_books(self) -> Vec<CatalogBook> {
        match self {
            Self::Wrapped { books } | Self::Bare(books) => books,
        }
    }
}

/// Full record for one book.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BookDetail {
    #[serde(deserialize_with = "string_or_number")]
    pub cnx_id: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    pub description: Option<String>,
    pub cover_url: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub license_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub license_text: String,
    #[serde(deserialize_with = "null_as_default")]
    pub authors: Vec<Author>,
    pub high_resolution_pdf_url: Option<String>,
    pub low_resolution_pdf_url: Option<String>,
    pub student_handbook_url: Option<String>,
    pub table_of_contents: TableOfContents,
    #[serde(deserialize_with = "null_as_default")]
    pub book_faculty_resources: Vec<Resource>,
    #[serde(deserialize_with = "null_as_default")]
    pub book_student_resources: Vec<Resource>,
}

impl BookDetail {
    /// Preferred source for chapter splitting: low resolution first.
    pub fn primary_pdf_url(&self) -> Option<&str> {
        non_empty(&self.low_resolution_pdf_url).or_else(|| non_empty(&self.high_resolution_pdf_url))
    }

    /// Student handbook URL, if the book has one.
    pub fn handbook_url(&self) -> Option<&str> {
        non_empty(&self.student_handbook_url)
    }

    /// Author names in catalog order.
    pub fn author_names(&self) -> Vec<&str> {
        self.authors.iter().map(Author::name).collect()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// An author record: `{"value": {"name": ...}}` or `{"name": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Author {
    Wrapped { value: AuthorValue },
    Plain { name: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthorValue {
    pub name: String,
}

impl Author {
    pub fn name(&self) -> &str {
        match self {
            Self::Wrapped { value } => &value.name,
            Self::Plain { name } => name,
        }
    }
}

/// One table-of-contents entry. Extra keys are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct TocEntry {
    #[serde(deserialize_with = "string_or_number")]
    pub id: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
}

/// Ordered chapter descriptors.
///
/// Accepts `{"contents": [...]}` as served by the API as well as a bare list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableOfContents(pub Vec<TocEntry>);

impl TableOfContents {
    pub fn entries(&self) -> &[TocEntry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for TableOfContents {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Wrapped {
                #[serde(default)]
                contents: Vec<TocEntry>,
            },
            Bare(Vec<TocEntry>),
            Null(()),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Wrapped { contents } => Self(contents),
            Repr::Bare(entries) => Self(entries),
            Repr::Null(()) => Self::default(),
        })
    }
}

/// An instructor or student resource.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct Resource {
    pub link_document_url: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub resource_heading: String,
    pub resource_description: Option<String>,
}

impl Resource {
    /// The document link when it points at a PDF.
    pub fn pdf_link(&self) -> Option<&str> {
        self.link_document_url
            .as_deref()
            .filter(|url| crate::paths::url_basename(url).to_ascii_lowercase().ends_with(".pdf"))
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
