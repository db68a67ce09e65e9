//! Structural checks run once the whole channel is assembled.

use std::collections::{HashMap, HashSet};

use super::node::{ContentNode, NodeKind};
use crate::error::{TreeError, TreeResult};

/// Outcome of a successful validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub nodes: usize,
    pub documents: usize,
    pub empty_topics: usize,
    /// Source ids used by more than one node anywhere in the tree.
    pub repeated_ids: usize,
}

/// Validate the channel tree rooted at `channel`.
///
/// Hard failures: empty channel, blank id or title, duplicate sibling ids,
/// documents without exactly one file or without a license, files on
/// non-documents, children under documents, misplaced channel nodes.
/// Empty topics and ids repeated across parents are reported as warnings.
pub fn validate(channel: &ContentNode) -> TreeResult<ValidationReport> {
    if channel.kind != NodeKind::Channel {
        return Err(invalid(channel, "tree root must be a channel"));
    }
    if channel.children().is_empty() {
        return Err(TreeError::EmptyChannel {
            channel: channel.source_id.clone(),
        });
    }

    let mut report = ValidationReport::default();
    let mut id_uses: HashMap<&str, usize> = HashMap::new();
    check_node(channel, true, &mut report, &mut id_uses)?;

    for (id, uses) in id_uses.iter().filter(|(_, uses)| **uses > 1) {
        tracing::warn!(source_id = id, uses, "source id repeated across the tree");
        report.repeated_ids += 1;
    }
    tracing::info!(
        nodes = report.nodes,
        documents = report.documents,
        empty_topics = report.empty_topics,
        repeated_ids = report.repeated_ids,
        "channel tree validated"
    );
    Ok(report)
}

fn check_node<'a>(
    node: &'a ContentNode,
    is_root: bool,
    report: &mut ValidationReport,
    id_uses: &mut HashMap<&'a str, usize>,
) -> TreeResult<()> {
    report.nodes += 1;
    if node.source_id.trim().is_empty() {
        return Err(invalid(node, "empty source id"));
    }
    if node.title.trim().is_empty() {
        return Err(invalid(node, "empty title"));
    }
    if !is_root {
        *id_uses.entry(node.source_id.as_str()).or_insert(0) += 1;
        if node.kind == NodeKind::Channel {
            return Err(invalid(node, "channel node below the root"));
        }
    }

    match node.kind {
        NodeKind::Document => {
            report.documents += 1;
            if node.files.len() != 1 {
                return Err(invalid(
                    node,
                    &format!("document must carry exactly one file, found {}", node.files.len()),
                ));
            }
            if node.license.is_none() {
                return Err(invalid(node, "document has no license"));
            }
            if !node.children().is_empty() {
                return Err(invalid(node, "document has children"));
            }
        }
        _ => {
            if !node.files.is_empty() {
                return Err(invalid(node, &format!("{} carries files", node.kind)));
            }
            if node.kind.is_topic() && node.children().is_empty() {
                tracing::warn!(source_id = %node.source_id, kind = %node.kind, "topic has no children");
                report.empty_topics += 1;
            }
        }
    }

    let mut siblings = HashSet::new();
    for child in node.children() {
        if !siblings.insert(child.source_id.as_str()) {
            return Err(TreeError::DuplicateSibling {
                parent: node.source_id.clone(),
                source_id: child.source_id.clone(),
            });
        }
        check_node(child, false, report, id_uses)?;
    }
    Ok(())
}

fn invalid(node: &ContentNode, reason: &str) -> TreeError {
    TreeError::InvalidNode {
        source_id: node.source_id.clone(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChannelInfo;
    use crate::license::{LicenseInfo, LicenseKind};
    use crate::tree::FileArtifact;

    fn license() -> LicenseInfo {
        LicenseInfo {
            kind: LicenseKind::CcBy,
            description: String::new(),
            copyright_holder: "Rice University".into(),
        }
    }

    fn doc(id: &str) -> ContentNode {
        ContentNode::document(id, "Doc", FileArtifact::Remote(format!("https://x/{id}.pdf")))
            .with_license(license())
    }

    fn channel_with(subject: ContentNode) -> ContentNode {
        let mut channel = ContentNode::channel(&ChannelInfo::default());
        channel.add_child(subject).unwrap();
        channel
    }

    #[test]
    fn empty_channel_fails() {
        let channel = ContentNode::channel(&ChannelInfo::default());
        assert!(matches!(validate(&channel), Err(TreeError::EmptyChannel { .. })));
    }

    #[test]
    fn valid_tree_reports_counts() {
        let mut subject = ContentNode::topic(NodeKind::SubjectTopic, "Math", "Math");
        let book = subject
            .add_child(ContentNode::topic(NodeKind::BookTopic, "b", "Book"))
            .unwrap();
        book.add_child(doc("b-handbook")).unwrap();
        book.add_child(ContentNode::topic(NodeKind::ResourceTopic, "b-student-resources", "Student Resources"))
            .unwrap();

        let report = validate(&channel_with(subject)).unwrap();
        assert_eq!(report.nodes, 5);
        assert_eq!(report.documents, 1);
        assert_eq!(report.empty_topics, 1);
        assert_eq!(report.repeated_ids, 0);
    }

    #[test]
    fn document_without_license_fails() {
        let mut subject = ContentNode::topic(NodeKind::SubjectTopic, "Math", "Math");
        subject
            .add_child(ContentNode::document("d", "Doc", FileArtifact::Remote("https://x/d.pdf".into())))
            .unwrap();
        let err = validate(&channel_with(subject)).unwrap_err();
        assert!(matches!(err, TreeError::InvalidNode { ref source_id, .. } if source_id == "d"));
    }

    #[test]
    fn files_on_topic_fail() {
        let mut subject = ContentNode::topic(NodeKind::SubjectTopic, "Math", "Math");
        subject.files.push(FileArtifact::Remote("https://x/a.pdf".into()));
        subject.add_child(doc("d")).unwrap();
        assert!(validate(&channel_with(subject)).is_err());
    }

    #[test]
    fn blank_title_fails() {
        let subject = ContentNode::topic(NodeKind::SubjectTopic, "Math", " ");
        assert!(matches!(
            validate(&channel_with(subject)),
            Err(TreeError::InvalidNode { .. })
        ));
    }

    #[test]
    fn duplicate_siblings_fail() {
        let mut subject = ContentNode::topic(NodeKind::SubjectTopic, "Math", "Math");
        subject.add_child(doc("d")).unwrap();
        subject.children_mut()[0].source_id = "x".into();
        subject.add_child(doc("x-other")).unwrap();
        subject.children_mut()[1].source_id = "x".into();
        assert!(matches!(
            validate(&channel_with(subject)),
            Err(TreeError::DuplicateSibling { .. })
        ));
    }

    #[test]
    fn ids_repeated_across_parents_only_warn() {
        let mut subject = ContentNode::topic(NodeKind::SubjectTopic, "Math", "Math");
        let a = subject
            .add_child(ContentNode::topic(NodeKind::BookTopic, "a", "A"))
            .unwrap();
        a.add_child(doc("shared")).unwrap();
        let b = subject
            .add_child(ContentNode::topic(NodeKind::BookTopic, "b", "B"))
            .unwrap();
        b.add_child(doc("shared")).unwrap();

        let report = validate(&channel_with(subject)).unwrap();
        assert_eq!(report.repeated_ids, 1);
    }
}
