//! Channel assembly: walk the catalog and build the validated tree.
//!
//! Books are processed one at a time in catalog order. Each book is built
//! as a detached subtree and attached to its subject only once every step
//! succeeded, so a book-scoped failure (see [`ChefError::is_book_scoped`])
//! leaves nothing behind but a log line.

use std::collections::HashMap;
use std::path::Path;

use crate::catalog::{BookDetail, CatalogBook, CatalogClient, Resource};
use crate::error::{ChefError, ChefResult};
use crate::license::{LicenseInfo, LicenseTable};
use crate::split::ChapterSplitter;
use crate::text;
use crate::thumbnail::AssetNormalizer;
use crate::tree::{self, ContentNode, FileArtifact, NodeKind, Role, ValidationReport};

pub const INSTRUCTOR_RESOURCES: &str = "Instructor Resources";
pub const STUDENT_RESOURCES: &str = "Student Resources";
pub const STUDENT_HANDBOOK: &str = "Student Handbook";

/// Subject used for catalog entries that have none.
pub const UNCATEGORIZED_SUBJECT: &str = "Uncategorized";

/// Counters for one assembly run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssemblySummary {
    pub books_added: usize,
    /// Slugs of books skipped after a book-scoped failure.
    pub books_skipped: Vec<String>,
    /// Documents in attached books.
    pub documents: usize,
}

/// Metadata shared by every node produced for one book.
struct BookMetadata<'b> {
    book_id: String,
    title: String,
    description: String,
    thumbnail: Option<std::path::PathBuf>,
    author: String,
    license: LicenseInfo,
    detail: &'b BookDetail,
}

pub struct TreeAssembler<'a> {
    catalog: CatalogClient<'a>,
    thumbnails: AssetNormalizer<'a>,
    splitter: ChapterSplitter<'a>,
    licenses: &'a LicenseTable,
    copyright_holder: String,
    /// Subject title → position among the current channel's children.
    /// Cleared at the start of every run.
    subjects: HashMap<String, usize>,
    summary: AssemblySummary,
}

impl<'a> TreeAssembler<'a> {
    pub fn new(
        catalog: CatalogClient<'a>,
        thumbnails: AssetNormalizer<'a>,
        splitter: ChapterSplitter<'a>,
        licenses: &'a LicenseTable,
        copyright_holder: impl Into<String>,
    ) -> Self {
        Self {
            catalog,
            thumbnails,
            splitter,
            licenses,
            copyright_holder: copyright_holder.into(),
            subjects: HashMap::new(),
            summary: AssemblySummary::default(),
        }
    }

    /// Fetch the book listing from the catalog.
    pub fn list_books(&self) -> ChefResult<Vec<CatalogBook>> {
        self.catalog.list_books()
    }

    pub fn summary(&self) -> &AssemblySummary {
        &self.summary
    }

    /// Add every book under `channel`, then validate the result.
    pub fn assemble(
        &mut self,
        channel: &mut ContentNode,
        books: &[CatalogBook],
    ) -> ChefResult<ValidationReport> {
        tracing::info!(books = books.len(), "assembling channel");
        self.subjects.clear();
        for book in books {
            self.add_book(channel, book)?;
        }
        tracing::info!(
            subjects = self.subjects.len(),
            added = self.summary.books_added,
            skipped = self.summary.books_skipped.len(),
            "catalog processed"
        );
        Ok(tree::validate(channel)?)
    }

    /// Process one catalog entry. Only non-book-scoped errors are returned.
    pub fn add_book(&mut self, channel: &mut ContentNode, book: &CatalogBook) -> ChefResult<()> {
        let subject_index = self.subject_index(channel, &book.subject);

        let node = match self.build_book(book) {
            Ok(node) => node,
            Err(e) if e.is_book_scoped() => {
                tracing::warn!(book = %book.slug, error = %e, "skipping book");
                self.summary.books_skipped.push(book.slug.clone());
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let subject = &mut channel.children_mut()[subject_index];
        if subject.has_child(&node.source_id) {
            tracing::warn!(
                book = %book.slug,
                source_id = %node.source_id,
                subject = %subject.source_id,
                "book already present in subject, skipping"
            );
            self.summary.books_skipped.push(book.slug.clone());
            return Ok(());
        }
        let documents = node.count_by_kind().get(&NodeKind::Document).copied().unwrap_or(0);
        subject.add_child(node)?;
        self.summary.books_added += 1;
        self.summary.documents += documents;
        Ok(())
    }

    /// Position of the subject topic for `subject`, reusing one already on
    /// the channel and creating it otherwise.
    fn subject_index(&mut self, channel: &mut ContentNode, subject: &str) -> usize {
        let subject = match subject.trim() {
            "" => UNCATEGORIZED_SUBJECT,
            s => s,
        };
        let cached = self
            .subjects
            .get(subject)
            .copied()
            .filter(|&i| channel.children().get(i).is_some_and(|c| is_subject(c, subject)));
        if let Some(index) = cached {
            return index;
        }

        let existing = channel.children().iter().position(|c| is_subject(c, subject));
        let index = match existing {
            Some(index) => index,
            None => {
                channel.add_child_unique(ContentNode::topic(NodeKind::SubjectTopic, subject, subject));
                tracing::info!(subject, "new subject");
                channel.children().len() - 1
            }
        };
        self.subjects.insert(subject.to_string(), index);
        index
    }

    /// Build the detached subtree for one book.
    fn build_book(&self, book: &CatalogBook) -> ChefResult<ContentNode> {
        let detail = self.catalog.book_detail(&book.slug)?;
        let meta = self.book_metadata(book, &detail)?;
        tracing::info!(book = %book.slug, id = %meta.book_id, title = %meta.title, "writing book");

        let mut node = ContentNode::topic(NodeKind::BookTopic, &meta.book_id, &meta.title)
            .with_description(&meta.description)
            .with_thumbnail(meta.thumbnail.as_deref());

        match detail.primary_pdf_url() {
            Some(pdf_url) => {
                let main = self.split_main_topic(pdf_url, &meta)?;
                node.add_child(main)?;
            }
            None => tracing::warn!(book = %book.slug, "no PDF url, book has no chapters"),
        }

        if let Some(url) = detail.handbook_url() {
            node.add_child_unique(
                ContentNode::document(
                    text::document_id(&meta.book_id, STUDENT_HANDBOOK),
                    STUDENT_HANDBOOK,
                    FileArtifact::Remote(url.to_string()),
                )
                .with_description(&meta.description)
                .with_thumbnail(meta.thumbnail.as_deref())
                .with_author(&meta.author)
                .with_license(meta.license.clone()),
            );
        }

        let resource_groups = [
            (INSTRUCTOR_RESOURCES, &detail.book_faculty_resources, Role::Coach),
            (STUDENT_RESOURCES, &detail.book_student_resources, Role::Learner),
        ];
        for (name, resources, role) in resource_groups {
            let topic = self.resource_topic(&meta, name, resources, role);
            node.add_child(topic)?;
        }

        Ok(node)
    }

    fn book_metadata<'b>(
        &self,
        book: &CatalogBook,
        detail: &'b BookDetail,
    ) -> ChefResult<BookMetadata<'b>> {
        let kind = self
            .licenses
            .lookup(&detail.license_name)
            .ok_or_else(|| ChefError::UnmappedLicense {
                license: detail.license_name.clone(),
                book: book.slug.clone(),
            })?;

        let book_id = detail
            .cnx_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| {
                tracing::warn!(book = %book.slug, "no cnx_id, using slug");
                book.slug.clone()
            });
        let title = if detail.title.trim().is_empty() {
            book.title.clone()
        } else {
            detail.title.clone()
        };
        let thumbnail = match detail.cover_url.as_deref().filter(|u| !u.trim().is_empty()) {
            Some(url) => Some(self.thumbnails.normalize(url)?),
            None => None,
        };

        Ok(BookMetadata {
            book_id,
            title,
            description: text::plain_description(detail.description.as_deref()),
            thumbnail,
            author: text::author_summary(&detail.author_names()),
            license: LicenseInfo {
                kind,
                description: detail.license_text.clone(),
                copyright_holder: self.copyright_holder.clone(),
            },
            detail,
        })
    }

    /// Topic holding one document per split chapter.
    fn split_main_topic(&self, pdf_url: &str, meta: &BookMetadata<'_>) -> ChefResult<ContentNode> {
        let main_id = format!("{}-main", meta.book_id);
        let chapters = self
            .splitter
            .split(pdf_url, &main_id, &meta.detail.table_of_contents)?;

        let mut main = ContentNode::topic(NodeKind::SplitMainTopic, &main_id, &meta.title)
            .with_description(&meta.description)
            .with_thumbnail(meta.thumbnail.as_deref());
        for (index, chapter) in chapters.into_iter().enumerate() {
            let title = if chapter.title.trim().is_empty() {
                format!("Chapter {}", index + 1)
            } else {
                chapter.title
            };
            main.add_child_unique(
                ContentNode::document(
                    text::document_id(&chapter.source_id, &title),
                    title,
                    FileArtifact::Local(chapter.path),
                )
                .with_author(&meta.author)
                .with_license(meta.license.clone()),
            );
        }
        Ok(main)
    }

    /// Resource topic with one document per PDF-linked resource.
    fn resource_topic(
        &self,
        meta: &BookMetadata<'_>,
        name: &str,
        resources: &[Resource],
        role: Role,
    ) -> ContentNode {
        let topic_id = format!("{}-{}", meta.book_id, text::title_id(name));
        let mut topic = ContentNode::topic(NodeKind::ResourceTopic, &topic_id, name);
        for resource in resources {
            let Some(link) = resource.pdf_link() else {
                tracing::debug!(
                    topic = %topic_id,
                    heading = %resource.resource_heading,
                    "resource is not a PDF, excluded"
                );
                continue;
            };
            let heading = resource.resource_heading.trim();
            let title = if heading.is_empty() {
                crate::paths::url_basename(link)
            } else {
                heading
            };
            topic.add_child_unique(
                ContentNode::document(
                    text::document_id(&topic_id, title),
                    title,
                    FileArtifact::Remote(link.to_string()),
                )
                .with_description(text::plain_description(resource.resource_description.as_deref()))
                .with_license(meta.license.clone())
                .with_role(role),
            );
        }
        topic
    }
}

fn is_subject(node: &ContentNode, subject: &str) -> bool {
    node.kind == NodeKind::SubjectTopic && (node.source_id == subject || node.title == subject)
}

/// Write the channel tree as pretty JSON.
pub fn write_channel(channel: &ContentNode, path: &Path) -> ChefResult<()> {
    channel.write_json(path)?;
    tracing::info!(path = %path.display(), "channel tree written");
    Ok(())
}
