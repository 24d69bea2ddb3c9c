//! pnpm-workspace.yaml document model
//!
//! Supports block mappings (`catalog:` followed by indented entries) and flow
//! mappings (`catalog: { react: ^18.2.0 }`). Comments, anchors and any node that
//! is not addressed by a path are never touched.

use crate::parser::traits::{Document, ParseError, first_syntax_error};
use crate::parser::types::{FileFormat, Leaf, PendingEdits, Quoting};
use tracing::warn;

/// Keys that hold the version of a mapping-valued dependency
const NESTED_VERSION_KEYS: [&str; 2] = ["version", "."];

/// Format-preserving YAML document backed by tree-sitter
pub struct YamlDocument {
    content: String,
    tree: tree_sitter::Tree,
    pending: PendingEdits,
}

impl YamlDocument {
    pub fn parse(content: &str) -> Result<Self, ParseError> {
        let mut parser = tree_sitter::Parser::new();
        let language = tree_sitter_yaml::LANGUAGE;
        parser.set_language(&language.into()).map_err(|e| {
            warn!("Failed to set YAML language for tree-sitter: {}", e);
            ParseError::TreeSitter(e.to_string())
        })?;

        let tree = parser.parse(content, None).ok_or_else(|| {
            warn!("Failed to parse YAML content");
            ParseError::ParseFailed("Failed to parse YAML".to_string())
        })?;

        if let Some(message) = first_syntax_error(tree.root_node()) {
            return Err(ParseError::InvalidSyntax(message));
        }

        Ok(Self {
            content: content.to_string(),
            tree,
            pending: PendingEdits::new(),
        })
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

        let Some(mapping) = find_mapping(node) else {
            return;
        };

        for pair in pairs(mapping) {
            let Some(key_node) = pair.child_by_field_name("key") else {
                continue;
            };
            if self.get_node_text(key_node) != *head {
                continue;
            }
            if let Some(value_node) = pair.child_by_field_name("value") {
                self.resolve(value_node, rest, results);
            }
        }
    }

    fn nodes_at(&self, path: &[&str]) -> Vec<tree_sitter::Node<'_>> {
        let mut results = Vec::new();
        self.resolve(self.tree.root_node(), path, &mut results);
        results
    }

    /// Turn a value node into a replaceable leaf
    fn leaf_of(&self, node: tree_sitter::Node) -> Option<Leaf> {
        if let Some(scalar) = find_scalar(node) {
            return Some(self.scalar_leaf(scalar));
        }

        find_mapping(node)?;
        NESTED_VERSION_KEYS.iter().find_map(|key| {
            let mut nested = Vec::new();
            self.resolve(node, &[*key], &mut nested);
            nested
                .into_iter()
                .find_map(find_scalar)
                .map(|scalar| self.scalar_leaf(scalar))
        })
    }

    fn scalar_leaf(&self, scalar: tree_sitter::Node) -> Leaf {
        let start_offset = scalar.start_byte();
        let end_offset = scalar.end_byte();
        let raw = &self.content[start_offset..end_offset];

        // Quoted scalars keep their quotes; only the inner text is replaceable
        match scalar.kind() {
            "double_quote_scalar" => Leaf {
                value: raw[1..raw.len() - 1]
                    .replace("\\\"", "\"")
                    .replace("\\\\", "\\"),
                start_offset: start_offset + 1,
                end_offset: end_offset - 1,
                quoting: Quoting::Double,
            },
            "single_quote_scalar" => Leaf {
                value: raw[1..raw.len() - 1].replace("''", "'"),
                start_offset: start_offset + 1,
                end_offset: end_offset - 1,
                quoting: Quoting::Single,
            },
            _ => Leaf {
                value: raw.trim().to_string(),
                start_offset,
                end_offset,
                quoting: Quoting::Plain,
            },
        }
    }

    /// Get text content of a node, removing quotes if present
    fn get_node_text(&self, node: tree_sitter::Node) -> String {
        let text = &self.content[node.byte_range()];
        text.trim()
            .trim_start_matches('"')
            .trim_end_matches('"')
            .trim_start_matches('\'')
            .trim_end_matches('\'')
            .to_string()
    }
}

/// Descend through wrapper nodes to the first block or flow mapping
fn find_mapping(node: tree_sitter::Node) -> Option<tree_sitter::Node> {
    match node.kind() {
        "block_mapping" | "flow_mapping" => Some(node),
        "stream" | "document" | "block_node" | "flow_node" => {
            let mut cursor = node.walk();
            let children: Vec<_> = node.named_children(&mut cursor).collect();
            children.into_iter().find_map(find_mapping)
        }
        _ => None,
    }
}

/// Descend through a flow node to its scalar token
fn find_scalar(node: tree_sitter::Node) -> Option<tree_sitter::Node> {
    match node.kind() {
        "plain_scalar" | "double_quote_scalar" | "single_quote_scalar" => Some(node),
        "flow_node" => {
            let mut cursor = node.walk();
            let children: Vec<_> = node.named_children(&mut cursor).collect();
            children.into_iter().find_map(find_scalar)
        }
        _ => None,
    }
}

fn pairs(mapping: tree_sitter::Node) -> Vec<tree_sitter::Node> {
    let mut cursor = mapping.walk();
    mapping
        .children(&mut cursor)
        .filter(|child| matches!(child.kind(), "block_mapping_pair" | "flow_pair"))
        .collect()
}

impl Document for YamlDocument {
    fn format(&self) -> FileFormat {
        FileFormat::BlockStructured
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
        for mapping in self.nodes_at(path).into_iter().filter_map(find_mapping) {
            for pair in pairs(mapping) {
                let Some(key_node) = pair.child_by_field_name("key") else {
                    continue;
                };
                let Some(value_node) = pair.child_by_field_name("value") else {
                    continue;
                };
                if let Some(leaf) = self.leaf_of(value_node) {
                    results.push((self.get_node_text(key_node), leaf));
                }
            }
        }
        results
    }

    fn keys(&self, path: &[&str]) -> Vec<String> {
        self.nodes_at(path)
            .into_iter()
            .filter_map(find_mapping)
            .flat_map(pairs)
            .filter_map(|pair| pair.child_by_field_name("key"))
            .map(|key_node| self.get_node_text(key_node))
            .collect()
    }

    fn pending(&self) -> &PendingEdits {
        &self.pending
    }

    fn pending_mut(&mut self) -> &mut PendingEdits {
        &mut self.pending
    }
}
