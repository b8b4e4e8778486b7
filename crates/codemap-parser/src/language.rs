use crate::error::ExtractError;
use std::path::Path;
use tree_sitter::{Node, Parser, Tree};

/// File extension of indexable sources.
pub const JAVA_EXTENSION: &str = "java";

pub fn is_java_source(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(JAVA_EXTENSION))
}

/// Owns a tree-sitter parser configured for Java.
pub struct JavaSupport {
    parser: Parser,
}

impl JavaSupport {
    pub fn new() -> Result<Self, ExtractError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_java::LANGUAGE.into())
            .map_err(|e| ExtractError::Grammar(format!("Failed to set java language: {}", e)))?;
        Ok(Self { parser })
    }

    /// Parse source text. A tree containing error nodes is rejected so that a
    /// malformed file yields no elements rather than partial ones.
    pub fn parse(&mut self, path: &Path, source: &str) -> Result<Tree, ExtractError> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| ExtractError::Grammar("Failed to parse source".to_string()))?;

        let root = tree.root_node();
        if root.has_error() {
            return Err(ExtractError::Syntax {
                path: path.to_path_buf(),
                line: first_error_line(&root).unwrap_or(1),
            });
        }

        Ok(tree)
    }
}

fn first_error_line(node: &Node) -> Option<usize> {
    if node.is_error() || node.is_missing() {
        return Some(node.start_position().row + 1);
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.has_error() {
            if let Some(line) = first_error_line(&child) {
                return Some(line);
            }
        }
    }
    None
}

/// Text covered by a node.
pub(crate) fn node_text<'a>(node: &Node, source: &'a str) -> &'a str {
    &source[node.start_byte()..node.end_byte()]
}

/// 1-based line of a node's first byte.
pub(crate) fn start_line(node: &Node) -> usize {
    node.start_position().row + 1
}

pub(crate) fn end_line(node: &Node) -> usize {
    node.end_position().row + 1
}
