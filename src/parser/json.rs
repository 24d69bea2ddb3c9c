//! package.json document model

use crate::parser::traits::{Document, ParseError, first_syntax_error};
use crate::parser::types::{FileFormat, Leaf, PendingEdits, Quoting};
use tracing::warn;

/// Keys that hold the version of an object-valued dependency
const NESTED_VERSION_KEYS: [&str; 2] = ["version", "."];

/// Format-preserving JSON document backed by tree-sitter
pub struct JsonDocument {
    content: String,
    tree: tree_sitter::Tree,
    pending: PendingEdits,
}

impl JsonDocument {
    pub fn parse(content: &str) -> Result<Self, ParseError> {
        let mut parser = tree_sitter::Parser::new();
        let language = tree_sitter_json::LANGUAGE;
        parser.set_language(&language.into()).map_err(|e| {
            warn!("Failed to set JSON language for tree-sitter: {}", e);
            ParseError::TreeSitter(e.to_string())
        })?;

        let tree = parser.parse(content, None).ok_or_else(|| {
            warn!("Failed to parse JSON content");
            ParseError::ParseFailed("Failed to parse JSON".to_string())
        })?;

        if let Some(message) = first_syntax_error(tree.root_node()) {
            return Err(ParseError::InvalidSyntax(message));
        }

        let document = Self {
            content: content.to_string(),
            tree,
            pending: PendingEdits::new(),
        };

        if document.root_object().is_none() {
            return Err(ParseError::ParseFailed(
                "expected a top-level JSON object".to_string(),
            ));
        }

        Ok(document)
    }

    /// Find the root object
    fn root_object(&self) -> Option<tree_sitter::Node<'_>> {
        let root = self.tree.root_node();
        let mut cursor = root.walk();
        let document = root
            .named_children(&mut cursor)
            .find(|child| child.kind() != "comment");
        document.filter(|child| child.kind() == "object")
    }

    /// Collect every node reachable from `node` by following `path`
    fn resolve<'t>(
        &self,
        node: tree_sitter::Node<'t>,
        path: &[&str],
        results: &mut Vec<tree_sitter::Node<'t>>,
    ) {
        let Some((head, rest)) = path.split_first() else {
            results.push(node);
            return;
        };

        if node.kind() != "object" {
            return;
        }

        for pair in pairs(node) {
            let Some(key_node) = pair.child_by_field_name("key") else {
                continue;
            };
            if self.get_string_value(key_node) != *head {
                continue;
            }
            if let Some(value_node) = pair.child_by_field_name("value") {
                self.resolve(value_node, rest, results);
            }
        }
    }

    fn nodes_at(&self, path: &[&str]) -> Vec<tree_sitter::Node<'_>> {
        let mut results = Vec::new();
        if let Some(root) = self.root_object() {
            self.resolve(root, path, &mut results);
        }
        results
    }

    /// Turn a value node into a replaceable leaf
    fn leaf_of(&self, node: tree_sitter::Node) -> Option<Leaf> {
        match node.kind() {
            "string" => Some(self.string_leaf(node)),
            "object" => NESTED_VERSION_KEYS.iter().find_map(|key| {
                let mut nested = Vec::new();
                self.resolve(node, &[*key], &mut nested);
                nested
                    .into_iter()
                    .find(|n| n.kind() == "string")
                    .map(|n| self.string_leaf(n))
            }),
            _ => None,
        }
    }

    fn string_leaf(&self, node: tree_sitter::Node) -> Leaf {
        // Adjust for quotes - the value starts after the opening quote
        Leaf {
            value: self.get_string_value(node),
            start_offset: node.start_byte() + 1,
            end_offset: node.end_byte() - 1,
            quoting: Quoting::Json,
        }
    }

    /// Get the string value from a string node (removes quotes, resolves escapes)
    fn get_string_value(&self, node: tree_sitter::Node) -> String {
        let text = &self.content[node.byte_range()];
        serde_json::from_str::<String>(text).unwrap_or_else(|_| {
            text.trim()
                .trim_start_matches('"')
                .trim_end_matches('"')
                .to_string()
        })
    }
}

fn pairs(object_node: tree_sitter::Node) -> Vec<tree_sitter::Node> {
    let mut cursor = object_node.walk();
    object_node
        .children(&mut cursor)
        .filter(|child| child.kind() == "pair")
        .collect()
}

impl Document for JsonDocument {
    fn format(&self) -> FileFormat {
        FileFormat::Delimited
    }

    fn content(&self) -> &str {
        &self.content
    }

    fn locate(&self, path: &[&str]) -> Vec<Leaf> {
        self.nodes_at(path)
            .into_iter()
            .filter_map(|node| self.leaf_of(node))
            .collect()
    }

    fn entries(&self, path: &[&str]) -> Vec<(String, Leaf)> {
        let mut results = Vec::new();
        for object in self.nodes_at(path) {
            if object.kind() != "object" {
                continue;
            }
            for pair in pairs(object) {
                let Some(key_node) = pair.child_by_field_name("key") else {
                    continue;
                };
                let Some(value_node) = pair.child_by_field_name("value") else {
                    continue;
                };
                if let Some(leaf) = self.leaf_of(value_node) {
                    results.push((self.get_string_value(key_node), leaf));
                }
            }
        }
        results
    }

    fn keys(&self, path: &[&str]) -> Vec<String> {
        self.nodes_at(path)
            .into_iter()
            .filter(|node| node.kind() == "object")
            .flat_map(pairs)
            .filter_map(|pair| pair.child_by_field_name("key"))
            .map(|key_node| self.get_string_value(key_node))
            .collect()
    }

    fn pending(&self) -> &PendingEdits {
        &self.pending
    }

    fn pending_mut(&mut self) -> &mut PendingEdits {
        &mut self.pending
    }
}
