//! Channel tree nodes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::ChannelInfo;
use crate::error::{TreeError, TreeResult};
use crate::license::LicenseInfo;

/// What a node represents in the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Channel,
    SubjectTopic,
    BookTopic,
    /// Holds the chapter documents of a split book.
    SplitMainTopic,
    /// "Instructor Resources" or "Student Resources".
    ResourceTopic,
    Document,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Channel => "channel",
            Self::SubjectTopic => "subject",
            Self::BookTopic => "book",
            Self::SplitMainTopic => "split-main",
            Self::ResourceTopic => "resources",
            Self::Document => "document",
        }
    }

    pub fn is_topic(&self) -> bool {
        !matches!(self, Self::Channel | Self::Document)
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Intended audience of a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Learner,
    Coach,
}

/// The file behind a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "location", rename_all = "lowercase")]
pub enum FileArtifact {
    /// Produced locally (split chapters).
    Local(PathBuf),
    /// Referenced by URL and retrieved by the publishing side.
    Remote(String),
}

/// A node of the channel tree. Children are owned by their parent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentNode {
    pub kind: NodeKind,
    pub source_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Local thumbnail path, or a URL for the channel root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<LicenseInfo>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileArtifact>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<ContentNode>,
}

impl ContentNode {
    fn new(kind: NodeKind, source_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            kind,
            source_id: source_id.into(),
            title: title.into(),
            description: String::new(),
            thumbnail: None,
            license: None,
            author: String::new(),
            role: None,
            source_domain: None,
            language: None,
            files: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Channel root from configuration.
    pub fn channel(info: &ChannelInfo) -> Self {
        let mut node = Self::new(NodeKind::Channel, &info.source_id, &info.title);
        node.description = info.description.clone().unwrap_or_default();
        node.thumbnail = info.thumbnail.clone();
        node.source_domain = Some(info.source_domain.clone());
        node.language = Some(info.language.clone());
        node
    }

    /// A topic (any non-root, non-document kind).
    pub fn topic(kind: NodeKind, source_id: impl Into<String>, title: impl Into<String>) -> Self {
        debug_assert!(kind.is_topic(), "{kind} is not a topic kind");
        Self::new(kind, source_id, title)
    }

    /// A document carrying one file, as a learner resource.
    pub fn document(source_id: impl Into<String>, title: impl Into<String>, file: FileArtifact) -> Self {
        let mut node = Self::new(NodeKind::Document, source_id, title);
        node.files.push(file);
        node.role = Some(Role::Learner);
        node
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_thumbnail(mut self, thumbnail: Option<&Path>) -> Self {
        self.thumbnail = thumbnail.map(|p| p.display().to_string());
        self
    }

    pub fn with_license(mut self, license: LicenseInfo) -> Self {
        self.license = Some(license);
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn children(&self) -> &[ContentNode] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut [ContentNode] {
        &mut self.children
    }

    pub fn has_child(&self, source_id: &str) -> bool {
        self.children.iter().any(|c| c.source_id == source_id)
    }

    /// Attach a child. Sibling source ids must be unique.
    pub fn add_child(&mut self, child: ContentNode) -> TreeResult<&mut ContentNode> {
        if self.has_child(&child.source_id) {
            return Err(TreeError::DuplicateSibling {
                parent: self.source_id.clone(),
                source_id: child.source_id,
            });
        }
        self.children.push(child);
        let last = self.children.len() - 1;
        Ok(&mut self.children[last])
    }

    /// Attach a child, suffixing `-2`, `-3`, ... onto a colliding source id.
    pub fn add_child_unique(&mut self, mut child: ContentNode) -> &mut ContentNode {
        if self.has_child(&child.source_id) {
            let base = child.source_id.clone();
            let mut n = 2;
            while self.has_child(&format!("{base}-{n}")) {
                n += 1;
            }
            child.source_id = format!("{base}-{n}");
            tracing::warn!(
                parent = %self.source_id,
                source_id = %base,
                renamed = %child.source_id,
                "duplicate sibling id, suffixed"
            );
        }
        self.children.push(child);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    /// Depth-first visit of this node and all descendants, with depth.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a ContentNode, usize)) {
        self.walk_at(0, visit);
    }

    fn walk_at<'a>(&'a self, depth: usize, visit: &mut impl FnMut(&'a ContentNode, usize)) {
        visit(self, depth);
        for child in &self.children {
            child.walk_at(depth + 1, visit);
        }
    }

    /// Number of nodes of each kind in this subtree.
    pub fn count_by_kind(&self) -> BTreeMap<NodeKind, usize> {
        let mut counts = BTreeMap::new();
        self.walk(&mut |node, _| *counts.entry(node.kind).or_insert(0) += 1);
        counts
    }

    /// Pretty JSON of the whole subtree.
    pub fn to_json(&self) -> TreeResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| TreeError::Write {
            path: "<memory>".into(),
            message: e.to_string(),
        })
    }

    pub fn write_json(&self, path: &Path) -> TreeResult<()> {
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|e| TreeError::Write {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}
