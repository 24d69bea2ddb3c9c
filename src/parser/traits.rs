//! Document trait definition

use crate::parser::json::JsonDocument;
use crate::parser::types::{FileFormat, Leaf, PendingEdits};
use crate::parser::yaml::YamlDocument;

/// Format-preserving view over a parsed file
///
/// Paths are sequences of mapping keys from the document root. Every method
/// considers duplicate keys: a path may resolve to several nodes.
pub trait Document {
    /// Returns the format this document was parsed as
    fn format(&self) -> FileFormat;

    /// Original text the document was parsed from
    fn content(&self) -> &str;

    /// Every scalar leaf reachable at `path`
    ///
    /// A mapping with a `version` (or `.`) string key resolves to that nested leaf.
    fn locate(&self, path: &[&str]) -> Vec<Leaf>;

    /// Scalar entries of every mapping found at `path`, in source order
    fn entries(&self, path: &[&str]) -> Vec<(String, Leaf)>;

    /// Keys of every mapping found at `path`, in source order
    fn keys(&self, path: &[&str]) -> Vec<String>;

    fn pending(&self) -> &PendingEdits;

    fn pending_mut(&mut self) -> &mut PendingEdits;

    /// Queue `value` as the new content of `leaf`
    ///
    /// Returns false when the encoded value equals the current text.
    fn replace_leaf(&mut self, leaf: &Leaf, value: &str) -> bool {
        let encoded = leaf.encode(value);
        if self.content()[leaf.start_offset..leaf.end_offset] == encoded {
            return false;
        }
        self.pending_mut()
            .push(leaf.start_offset, leaf.end_offset, encoded)
    }

    /// Original text with every queued replacement applied
    fn serialize(&self) -> String {
        self.pending().apply(self.content())
    }
}

/// Error type for parsing operations
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Failed to parse the file structure
    #[error("Failed to parse file: {0}")]
    ParseFailed(String),

    /// Invalid syntax in the file
    #[error("Invalid syntax: {0}")]
    InvalidSyntax(String),

    /// Tree-sitter related error
    #[error("Tree-sitter error: {0}")]
    TreeSitter(String),
}

/// Parse `content` with the document model for `format`
pub fn open_document(format: FileFormat, content: &str) -> Result<Box<dyn Document>, ParseError> {
    match format {
        FileFormat::BlockStructured => Ok(Box::new(YamlDocument::parse(content)?)),
        FileFormat::Delimited => Ok(Box::new(JsonDocument::parse(content)?)),
    }
}

/// Describe the first error or missing node of a syntax tree
pub(crate) fn first_syntax_error(node: tree_sitter::Node) -> Option<String> {
    if node.is_error() || node.is_missing() {
        let point = node.start_position();
        return Some(format!(
            "unexpected {} at line {}, column {}",
            if node.is_missing() { "end of input" } else { "token" },
            point.row + 1,
            point.column + 1
        ));
    }

    if !node.has_error() {
        return None;
    }

    let mut cursor = node.walk();
    node.children(&mut cursor).find_map(first_syntax_error)
}
