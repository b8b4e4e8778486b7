use crate::error::ExtractError;
use crate::language::{JavaSupport, end_line, node_text, start_line};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;
use tree_sitter::{Node, Tree};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Class,
    Interface,
    Field,
    Method,
    Constructor,
}

impl ElementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Class => "class",
            ElementKind::Interface => "interface",
            ElementKind::Field => "field",
            ElementKind::Method => "method",
            ElementKind::Constructor => "constructor",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "class" => Some(ElementKind::Class),
            "interface" => Some(ElementKind::Interface),
            "field" => Some(ElementKind::Field),
            "method" => Some(ElementKind::Method),
            "constructor" => Some(ElementKind::Constructor),
            _ => None,
        }
    }

    /// Classes and interfaces, the kinds that own members.
    pub fn is_type(&self) -> bool {
        matches!(self, ElementKind::Class | ElementKind::Interface)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Visibility {
    #[serde(rename = "public")]
    Public,
    #[serde(rename = "private")]
    Private,
    #[serde(rename = "protected")]
    Protected,
    #[default]
    #[serde(rename = "package-private")]
    PackagePrivate,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
            Visibility::Protected => "protected",
            Visibility::PackagePrivate => "package-private",
        }
    }
}

/// A declared class, interface, field, method or constructor.
///
/// Classes and interfaces own copies of their members in `children`; the
/// members also appear as standalone entries in the flat extraction output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AstNode {
    pub kind: ElementKind,
    pub name: String,
    pub package_name: String,
    pub file_path: String,
    pub line_number: usize,
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_interface: bool,
    pub is_abstract: bool,
    pub return_type: Option<String>,
    #[serde(default)]
    pub children: Vec<AstNode>,
    pub start_line: usize,
    pub end_line: usize,
    pub source_code: Option<String>,
}

impl AstNode {
    pub fn new(kind: ElementKind, name: &str, package_name: &str, file_path: &str) -> Self {
        Self {
            kind,
            name: name.to_string(),
            package_name: package_name.to_string(),
            file_path: file_path.to_string(),
            line_number: 0,
            visibility: Visibility::PackagePrivate,
            is_static: false,
            is_interface: kind == ElementKind::Interface,
            is_abstract: false,
            return_type: None,
            children: Vec::new(),
            start_line: 0,
            end_line: 0,
            source_code: None,
        }
    }

    pub fn with_lines(mut self, start_line: usize, end_line: usize) -> Self {
        self.line_number = start_line;
        self.start_line = start_line;
        self.end_line = end_line;
        self
    }

    /// Identity key: `package.Name`, or just `Name` in the default package.
    pub fn key(&self) -> String {
        qualified_key(&self.package_name, &self.name)
    }

    pub fn has_source(&self) -> bool {
        self.source_code.as_deref().is_some_and(|s| !s.is_empty())
    }

    pub fn contains_line(&self, line: usize) -> bool {
        self.start_line <= line && line <= self.end_line
    }
}

pub fn qualified_key(package_name: &str, name: &str) -> String {
    if package_name.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", package_name, name)
    }
}

/// Result of parsing one file: its text, syntax tree and elements.
pub struct ParsedFile {
    pub path: String,
    pub source: String,
    pub tree: Tree,
    pub elements: Vec<AstNode>,
}

pub struct ElementExtractor {
    support: JavaSupport,
    max_file_size_kb: u64,
}

impl ElementExtractor {
    pub fn new(max_file_size_kb: u64) -> Result<Self, ExtractError> {
        Ok(Self {
            support: JavaSupport::new()?,
            max_file_size_kb,
        })
    }

    /// Read, size-check and parse one file.
    pub fn parse_file(&mut self, path: &Path) -> Result<ParsedFile, ExtractError> {
        let metadata = fs::metadata(path).map_err(|source| ExtractError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let size_kb = metadata.len() / 1024;
        if size_kb > self.max_file_size_kb {
            return Err(ExtractError::TooLarge {
                path: path.to_path_buf(),
                size_kb,
                limit_kb: self.max_file_size_kb,
            });
        }

        let source = fs::read_to_string(path).map_err(|source| ExtractError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let tree = self.support.parse(path, &source)?;

        let file_path = path.to_string_lossy().to_string();
        let elements = Self::extract(&tree, &source, &file_path);
        debug!(file = %file_path, elements = elements.len(), "Parsed file");

        Ok(ParsedFile {
            path: file_path,
            source,
            tree,
            elements,
        })
    }

    /// Flat pre-order list of every element declared in the tree.
    pub fn extract(tree: &Tree, source: &str, file_path: &str) -> Vec<AstNode> {
        let root = tree.root_node();
        let ctx = FileContext {
            source,
            file_path,
            package_name: package_name(&root, source),
        };

        let mut elements = Vec::new();
        Self::extract_recursive(&root, &ctx, &mut elements);
        elements
    }

    fn extract_recursive(node: &Node, ctx: &FileContext, out: &mut Vec<AstNode>) {
        match node.kind() {
            "class_declaration" | "interface_declaration" => {
                if let Some(mut element) = type_element(node, ctx) {
                    element.children = members(node, ctx);
                    out.push(element);
                }
            }
            "field_declaration" | "constant_declaration" => out.extend(field_elements(node, ctx)),
            "method_declaration" => out.extend(method_element(node, ctx)),
            "constructor_declaration" => out.extend(constructor_element(node, ctx)),
            _ => {}
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            Self::extract_recursive(&child, ctx, out);
        }
    }
}

struct FileContext<'a> {
    source: &'a str,
    file_path: &'a str,
    package_name: String,
}

impl FileContext<'_> {
    fn element(&self, kind: ElementKind, name: &str, node: &Node) -> AstNode {
        AstNode::new(kind, name, &self.package_name, self.file_path)
            .with_lines(start_line(node), end_line(node))
    }
}

#[derive(Default)]
struct Modifiers {
    visibility: Visibility,
    is_static: bool,
    is_abstract: bool,
}

fn modifiers(node: &Node) -> Modifiers {
    let mut result = Modifiers::default();
    let mut cursor = node.walk();
    let Some(list) = node.children(&mut cursor).find(|c| c.kind() == "modifiers") else {
        return result;
    };

    let mut cursor = list.walk();
    for modifier in list.children(&mut cursor) {
        match modifier.kind() {
            "public" => result.visibility = Visibility::Public,
            "private" => result.visibility = Visibility::Private,
            "protected" => result.visibility = Visibility::Protected,
            "static" => result.is_static = true,
            "abstract" => result.is_abstract = true,
            _ => {}
        }
    }
    result
}

fn package_name(root: &Node, source: &str) -> String {
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        if child.kind() != "package_declaration" {
            continue;
        }
        let mut inner = child.walk();
        for name in child.named_children(&mut inner) {
            if matches!(name.kind(), "scoped_identifier" | "identifier") {
                return node_text(&name, source).to_string();
            }
        }
    }
    String::new()
}

fn declared_name(node: &Node, source: &str) -> Option<String> {
    node.child_by_field_name("name")
        .map(|name| node_text(&name, source).to_string())
}

fn type_element(node: &Node, ctx: &FileContext) -> Option<AstNode> {
    let name = declared_name(node, ctx.source)?;
    let kind = if node.kind() == "interface_declaration" {
        ElementKind::Interface
    } else {
        ElementKind::Class
    };
    let mods = modifiers(node);

    let mut element = ctx.element(kind, &name, node);
    element.visibility = mods.visibility;
    element.is_static = mods.is_static;
    element.is_abstract = mods.is_abstract;
    Some(element)
}

/// Member copies of a type body, ordered fields, constructors, methods.
fn members(node: &Node, ctx: &FileContext) -> Vec<AstNode> {
    let Some(body) = node.child_by_field_name("body") else {
        return Vec::new();
    };

    let mut fields = Vec::new();
    let mut constructors = Vec::new();
    let mut methods = Vec::new();

    let mut cursor = body.walk();
    for member in body.named_children(&mut cursor) {
        match member.kind() {
            "field_declaration" | "constant_declaration" => {
                fields.extend(field_elements(&member, ctx))
            }
            "constructor_declaration" => constructors.extend(constructor_element(&member, ctx)),
            "method_declaration" => methods.extend(method_element(&member, ctx)),
            _ => {}
        }
    }

    fields.extend(constructors);
    fields.extend(methods);
    fields
}

/// One element per declarator: `int a, b;` yields `a` and `b`.
fn field_elements(node: &Node, ctx: &FileContext) -> Vec<AstNode> {
    let mods = modifiers(node);
    let field_type = node
        .child_by_field_name("type")
        .map(|t| node_text(&t, ctx.source).to_string());

    let mut cursor = node.walk();
    let fields = node
        .children_by_field_name("declarator", &mut cursor)
        .filter_map(|declarator| declared_name(&declarator, ctx.source))
        .map(|name| {
            let mut element = ctx.element(ElementKind::Field, &name, node);
            element.visibility = mods.visibility;
            element.is_static = mods.is_static;
            element.return_type = field_type.clone();
            element
        })
        .collect();
    fields
}

fn method_element(node: &Node, ctx: &FileContext) -> Option<AstNode> {
    let name = declared_name(node, ctx.source)?;
    let mods = modifiers(node);

    let mut element = ctx.element(ElementKind::Method, &name, node);
    element.visibility = mods.visibility;
    element.is_static = mods.is_static;
    element.is_abstract = mods.is_abstract;
    element.return_type = node
        .child_by_field_name("type")
        .map(|t| node_text(&t, ctx.source).to_string());
    Some(element)
}

fn constructor_element(node: &Node, ctx: &FileContext) -> Option<AstNode> {
    let name = declared_name(node, ctx.source)?;
    let mut element = ctx.element(ElementKind::Constructor, &name, node);
    element.visibility = modifiers(node).visibility;
    Some(element)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const ORDER_SERVICE: &str = r#"package com.shop.orders;

import com.shop.util.Clock;

public class OrderService extends BaseService implements Auditable {
    private static final int LIMIT = 10;
    protected String name, label;

    public OrderService() {
        this.name = "orders";
    }

    public int count() {
        return LIMIT;
    }

    abstract void audit();

    static class Line {
        int qty;
    }
}
"#;

    fn extract(source: &str) -> Vec<AstNode> {
        let mut support = JavaSupport::new().unwrap();
        let tree = support.parse(Path::new("OrderService.java"), source).unwrap();
        ElementExtractor::extract(&tree, source, "OrderService.java")
    }

    #[test]
    fn test_extract_flat_list_in_declaration_order() {
        let elements = extract(ORDER_SERVICE);
        let names: Vec<_> = elements
            .iter()
            .map(|e| (e.kind.as_str(), e.name.as_str()))
            .collect();

        assert_eq!(
            names,
            vec![
                ("class", "OrderService"),
                ("field", "LIMIT"),
                ("field", "name"),
                ("field", "label"),
                ("constructor", "OrderService"),
                ("method", "count"),
                ("method", "audit"),
                ("class", "Line"),
                ("field", "qty"),
            ]
        );
    }

    #[test]
    fn test_class_metadata_and_children() {
        let elements = extract(ORDER_SERVICE);
        let class = &elements[0];

        assert_eq!(class.package_name, "com.shop.orders");
        assert_eq!(class.key(), "com.shop.orders.OrderService");
        assert_eq!(class.visibility, Visibility::Public);
        assert_eq!(class.line_number, 5);
        assert_eq!(class.start_line, 5);
        assert_eq!(class.end_line, 22);
        assert!(!class.is_interface);

        let children: Vec<_> = class.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            children,
            vec!["LIMIT", "name", "label", "OrderService", "count", "audit"]
        );
        assert!(class.children.iter().all(|c| c.children.is_empty()));
    }

    #[test]
    fn test_member_modifiers_and_types() {
        let elements = extract(ORDER_SERVICE);
        let limit = elements.iter().find(|e| e.name == "LIMIT").unwrap();
        assert_eq!(limit.visibility, Visibility::Private);
        assert!(limit.is_static);
        assert_eq!(limit.return_type.as_deref(), Some("int"));

        let label = elements.iter().find(|e| e.name == "label").unwrap();
        assert_eq!(label.visibility, Visibility::Protected);
        assert_eq!(label.return_type.as_deref(), Some("String"));

        let audit = elements.iter().find(|e| e.name == "audit").unwrap();
        assert_eq!(audit.visibility, Visibility::PackagePrivate);
        assert!(audit.is_abstract);
        assert_eq!(audit.return_type.as_deref(), Some("void"));

        let ctor = elements
            .iter()
            .find(|e| e.kind == ElementKind::Constructor)
            .unwrap();
        assert_eq!(ctor.return_type, None);
        assert_eq!(ctor.start_line, 9);
        assert_eq!(ctor.end_line, 11);
    }

    #[test]
    fn test_interface_and_default_package() {
        let source = "interface Greeter {\n    String PREFIX = \"hi\";\n    String greet(String who);\n}\n";
        let elements = extract(source);

        assert_eq!(elements[0].kind, ElementKind::Interface);
        assert!(elements[0].is_interface);
        assert_eq!(elements[0].package_name, "");
        assert_eq!(elements[0].key(), "Greeter");
        assert!(
            elements
                .iter()
                .any(|e| e.kind == ElementKind::Field && e.name == "PREFIX")
        );
        assert!(
            elements
                .iter()
                .any(|e| e.kind == ElementKind::Method && e.name == "greet")
        );
    }

    #[test]
    fn test_parse_file_rejects_oversized_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Big.java");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "class Big {{").unwrap();
        for i in 0..200 {
            writeln!(file, "    int field{} = {};", i, i).unwrap();
        }
        writeln!(file, "}}").unwrap();

        let mut extractor = ElementExtractor::new(1).unwrap();
        let err = extractor.parse_file(&path).err().unwrap();
        assert!(matches!(err, ExtractError::TooLarge { .. }));
    }

    #[test]
    fn test_parse_file_reports_missing_file() {
        let dir = TempDir::new().unwrap();
        let mut extractor = ElementExtractor::new(1000).unwrap();
        let err = extractor
            .parse_file(&dir.path().join("Missing.java"))
            .err()
            .unwrap();
        assert!(matches!(err, ExtractError::Io { .. }));
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!(ElementKind::parse("Method"), Some(ElementKind::Method));
        assert_eq!(ElementKind::parse("enum"), None);
        assert!(ElementKind::Interface.is_type());
        assert!(!ElementKind::Field.is_type());
    }
}
