use crate::elements::{AstNode, ElementKind};
use crate::language::{node_text, start_line};
use serde::{Deserialize, Serialize};
use tree_sitter::{Node, Tree};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    Import,
    Extends,
    Implements,
    Calls,
    Creates,
    Uses,
}

impl DependencyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyKind::Import => "import",
            DependencyKind::Extends => "extends",
            DependencyKind::Implements => "implements",
            DependencyKind::Calls => "calls",
            DependencyKind::Creates => "creates",
            DependencyKind::Uses => "uses",
        }
    }
}

/// A directed, typed edge between two element keys.
///
/// `target_node` starts as the name written in the source and is rewritten to
/// a resolved key by cross-file resolution. `target_file_path` stays empty
/// until then.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeDependency {
    pub kind: DependencyKind,
    pub source_node: String,
    pub target_node: String,
    pub source_file_path: String,
    pub target_file_path: String,
    pub source_line: usize,
    pub description: String,
}

impl CodeDependency {
    pub fn new(kind: DependencyKind, source: &AstNode, target: &str, line: usize) -> Self {
        let description = match kind {
            DependencyKind::Import => format!("Imports {}", target),
            DependencyKind::Extends => format!("Extends {}", target),
            DependencyKind::Implements => format!("Implements {}", target),
            DependencyKind::Calls => format!("Calls method {}", target),
            DependencyKind::Creates => format!("Creates instance of {}", target),
            DependencyKind::Uses => format!("Uses field {}", target),
        };

        Self {
            kind,
            source_node: source.key(),
            target_node: target.to_string(),
            source_file_path: source.file_path.clone(),
            target_file_path: String::new(),
            source_line: line,
            description,
        }
    }

    pub fn is_resolved(&self) -> bool {
        !self.target_file_path.is_empty()
    }

    /// Last dotted segment of the target.
    pub fn target_simple_name(&self) -> &str {
        self.target_node
            .rsplit('.')
            .next()
            .unwrap_or(&self.target_node)
    }
}

/// Same-file relationship extraction.
///
/// Every edge is sourced at the file's primary type, the first class or
/// interface extracted from it. Files without one produce no edges.
pub struct DependencyExtractor;

impl DependencyExtractor {
    pub fn extract(tree: &Tree, source: &str, elements: &[AstNode]) -> Vec<CodeDependency> {
        let Some(primary) = elements.iter().find(|e| e.kind.is_type()) else {
            return Vec::new();
        };

        let root = tree.root_node();
        let mut visitor = EdgeVisitor {
            source,
            primary,
            elements,
            inheritance: Vec::new(),
            calls: Vec::new(),
            creates: Vec::new(),
            uses: Vec::new(),
        };
        visitor.visit(&root);

        let mut edges = Self::imports(&root, source, primary);
        edges.append(&mut visitor.inheritance);
        edges.append(&mut visitor.calls);
        edges.append(&mut visitor.creates);
        edges.append(&mut visitor.uses);
        edges
    }

    fn imports(root: &Node, source: &str, primary: &AstNode) -> Vec<CodeDependency> {
        let mut edges = Vec::new();
        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            if child.kind() != "import_declaration" {
                continue;
            }
            let mut inner = child.walk();
            let name = child
                .named_children(&mut inner)
                .find(|n| matches!(n.kind(), "scoped_identifier" | "identifier"));
            if let Some(name) = name {
                edges.push(CodeDependency::new(
                    DependencyKind::Import,
                    primary,
                    node_text(&name, source),
                    start_line(&child),
                ));
            }
        }
        edges
    }
}

struct EdgeVisitor<'a> {
    source: &'a str,
    primary: &'a AstNode,
    elements: &'a [AstNode],
    inheritance: Vec<CodeDependency>,
    calls: Vec<CodeDependency>,
    creates: Vec<CodeDependency>,
    uses: Vec<CodeDependency>,
}

impl EdgeVisitor<'_> {
    fn visit(&mut self, node: &Node) {
        match node.kind() {
            "class_declaration" => {
                if let Some(superclass) = node.child_by_field_name("superclass") {
                    self.supertypes(&superclass, DependencyKind::Extends);
                }
                if let Some(interfaces) = node.child_by_field_name("interfaces") {
                    self.supertypes(&interfaces, DependencyKind::Implements);
                }
            }
            "interface_declaration" => {
                let mut cursor = node.walk();
                let extends = node
                    .children(&mut cursor)
                    .find(|c| c.kind() == "extends_interfaces");
                if let Some(extends) = extends {
                    self.supertypes(&extends, DependencyKind::Extends);
                }
            }
            "method_invocation" => self.invocation(node),
            "object_creation_expression" => {
                if let Some(name) = node
                    .child_by_field_name("type")
                    .and_then(|t| simple_type_name(&t, self.source))
                {
                    self.creates.push(CodeDependency::new(
                        DependencyKind::Creates,
                        self.primary,
                        &name,
                        start_line(node),
                    ));
                }
            }
            "identifier" => self.identifier(node),
            _ => {}
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit(&child);
        }
    }

    /// `superclass`, `super_interfaces` and `extends_interfaces` all wrap the
    /// listed types, directly or inside a `type_list`.
    fn supertypes(&mut self, clause: &Node, kind: DependencyKind) {
        let mut cursor = clause.walk();
        for child in clause.named_children(&mut cursor) {
            if child.kind() == "type_list" {
                self.supertypes(&child, kind);
            } else if let Some(name) = simple_type_name(&child, self.source) {
                self.inheritance.push(CodeDependency::new(
                    kind,
                    self.primary,
                    &name,
                    start_line(&child),
                ));
            }
        }
    }

    fn invocation(&mut self, node: &Node) {
        let Some(name) = node.child_by_field_name("name") else {
            return;
        };
        let method = node_text(&name, self.source);
        let known = self
            .elements
            .iter()
            .any(|e| e.kind == ElementKind::Method && e.name == method);
        if known {
            self.calls.push(CodeDependency::new(
                DependencyKind::Calls,
                self.primary,
                method,
                start_line(node),
            ));
        }
    }

    fn identifier(&mut self, node: &Node) {
        if !is_name_reference(node) {
            return;
        }
        let name = node_text(node, self.source);
        let known = self
            .elements
            .iter()
            .any(|e| e.kind == ElementKind::Field && e.name == name);
        if known {
            self.uses.push(CodeDependency::new(
                DependencyKind::Uses,
                self.primary,
                name,
                start_line(node),
            ));
        }
    }
}

/// Simple name of a type reference: generics and qualifiers are dropped, so
/// `java.util.List<String>` becomes `List`.
fn simple_type_name(node: &Node, source: &str) -> Option<String> {
    match node.kind() {
        "type_identifier" | "identifier" => Some(node_text(node, source).to_string()),
        "generic_type" => {
            let mut cursor = node.walk();
            let base = node.named_children(&mut cursor).next()?;
            simple_type_name(&base, source)
        }
        "scoped_type_identifier" => {
            let mut cursor = node.walk();
            let last = node
                .named_children(&mut cursor)
                .filter(|c| c.kind() == "type_identifier")
                .last()?;
            Some(node_text(&last, source).to_string())
        }
        _ => {
            let text = node_text(node, source);
            let base = text.split('<').next().unwrap_or(text);
            base.rsplit('.').next().map(|s| s.trim().to_string())
        }
    }
}

const NON_REFERENCE_PARENTS: &[&str] = &[
    "scoped_identifier",
    "package_declaration",
    "import_declaration",
    "formal_parameter",
    "catch_formal_parameter",
    "spread_parameter",
    "inferred_parameters",
    "lambda_expression",
    "labeled_statement",
    "break_statement",
    "continue_statement",
    "enum_constant",
    "marker_annotation",
    "annotation",
    "element_value_pair",
];

/// An identifier used as a bare name expression, not as a declaration name,
/// a member selector or part of a qualified name.
fn is_name_reference(node: &Node) -> bool {
    let Some(parent) = node.parent() else {
        return false;
    };
    if NON_REFERENCE_PARENTS.contains(&parent.kind()) {
        return false;
    }
    if parent.child_by_field_name("name") == Some(*node) {
        return false;
    }
    if parent.kind() == "field_access" && parent.child_by_field_name("field") == Some(*node) {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::ElementExtractor;
    use crate::language::JavaSupport;
    use std::path::Path;

    const CHECKOUT: &str = r#"package com.shop.checkout;

import com.shop.util.Clock;
import com.shop.model.Cart;

public class Checkout extends BaseFlow<Cart> implements Step, com.shop.api.Auditable {
    private Clock clock;
    private int attempts;

    public Checkout() {
        this.clock = new Clock();
        attempts = 0;
    }

    public void run(Cart cart) {
        validate(cart);
        attempts++;
        Cart copy = new com.shop.model.Cart();
        System.out.println(clock.now());
    }

    private void validate(Cart cart) {
    }
}
"#;

    fn extract(source: &str) -> Vec<CodeDependency> {
        let mut support = JavaSupport::new().unwrap();
        let tree = support.parse(Path::new("Checkout.java"), source).unwrap();
        let elements = ElementExtractor::extract(&tree, source, "Checkout.java");
        DependencyExtractor::extract(&tree, source, &elements)
    }

    fn of_kind(edges: &[CodeDependency], kind: DependencyKind) -> Vec<String> {
        edges
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| e.target_node.clone())
            .collect()
    }

    #[test]
    fn test_imports_keep_literal_names() {
        let edges = extract(CHECKOUT);
        assert_eq!(
            of_kind(&edges, DependencyKind::Import),
            vec!["com.shop.util.Clock", "com.shop.model.Cart"]
        );
        let first = &edges[0];
        assert_eq!(first.source_node, "com.shop.checkout.Checkout");
        assert_eq!(first.source_file_path, "Checkout.java");
        assert_eq!(first.source_line, 3);
        assert!(first.target_file_path.is_empty());
        assert_eq!(first.description, "Imports com.shop.util.Clock");
    }

    #[test]
    fn test_inheritance_uses_simple_names() {
        let edges = extract(CHECKOUT);
        assert_eq!(of_kind(&edges, DependencyKind::Extends), vec!["BaseFlow"]);
        assert_eq!(
            of_kind(&edges, DependencyKind::Implements),
            vec!["Step", "Auditable"]
        );
    }

    #[test]
    fn test_creates_strip_qualifiers() {
        let edges = extract(CHECKOUT);
        assert_eq!(of_kind(&edges, DependencyKind::Creates), vec!["Clock", "Cart"]);
    }

    #[test]
    fn test_calls_only_same_file_methods() {
        let edges = extract(CHECKOUT);
        // println and now are not declared in this file
        assert_eq!(of_kind(&edges, DependencyKind::Calls), vec!["validate"]);
        let call = edges
            .iter()
            .find(|e| e.kind == DependencyKind::Calls)
            .unwrap();
        assert_eq!(call.source_line, 16);
        assert_eq!(call.description, "Calls method validate");
    }

    #[test]
    fn test_uses_bare_field_references() {
        let edges = extract(CHECKOUT);
        // this.clock is a field access, not a bare reference
        assert_eq!(
            of_kind(&edges, DependencyKind::Uses),
            vec!["attempts", "attempts", "clock"]
        );
    }

    #[test]
    fn test_edge_order_by_kind() {
        let edges = extract(CHECKOUT);
        let kinds: Vec<_> = edges.iter().map(|e| e.kind).collect();
        let first_call = kinds.iter().position(|k| *k == DependencyKind::Calls).unwrap();
        let first_create = kinds
            .iter()
            .position(|k| *k == DependencyKind::Creates)
            .unwrap();
        let last_import = kinds
            .iter()
            .rposition(|k| *k == DependencyKind::Import)
            .unwrap();
        assert!(last_import < first_call);
        assert!(first_call < first_create);
    }

    #[test]
    fn test_interface_extends() {
        let source = "package a;\n\npublic interface Repo extends Reader, Writer<String> {\n}\n";
        let edges = extract(source);
        assert_eq!(of_kind(&edges, DependencyKind::Extends), vec!["Reader", "Writer"]);
    }

    #[test]
    fn test_no_primary_type_yields_no_edges() {
        let source = "package a;\n\nimport b.C;\n\nenum Color { RED, GREEN }\n";
        assert!(extract(source).is_empty());
    }

    #[test]
    fn test_target_simple_name() {
        let primary = AstNode::new(ElementKind::Class, "A", "p", "A.java");
        let edge = CodeDependency::new(DependencyKind::Import, &primary, "x.y.Z", 1);
        assert_eq!(edge.target_simple_name(), "Z");
        assert!(!edge.is_resolved());
    }
}
