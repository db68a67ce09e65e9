//! The channel tree: channel → subject → book → topics → documents.

pub mod node;
pub mod validate;

pub use node::{ContentNode, FileArtifact, NodeKind, Role};
pub use validate::{ValidationReport, validate};
