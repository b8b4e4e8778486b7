//! Text renderings of the graph and of search hits.
//!
//! Graph summaries are pretty-printed JSON; source excerpts are plain text
//! with fenced Java blocks. Both are consumed as opaque text by whatever
//! assembles prompts downstream.

use crate::results::ScoredRecord;
use codemap_index::DependencyGraph;
use codemap_parser::{AstNode, CodeDependency, DependencyKind};
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, HashSet};

/// Edges listed under `keyDependencies` in a whole-graph summary.
const KEY_DEPENDENCY_LIMIT: usize = 50;
/// Dependencies listed per node in a summary.
const NODE_DEPENDENCY_LIMIT: usize = 10;
/// Characters of source shown per node in a summary.
const SNIPPET_PREVIEW_CHARS: usize = 300;
/// Types shown when source highlights are requested without a context.
const HIGHLIGHT_LIMIT: usize = 5;

/// True when `node` belongs to `context`: its package starts with it, or it
/// names the node by key or simple name.
pub fn context_matches(node: &AstNode, context: &str) -> bool {
    node.package_name.starts_with(context) || node.key() == context || node.name == context
}

/// Whole-graph summary. `nodeCount` counts classes and interfaces, the same
/// set listed under `mainComponents`.
pub fn format_graph(graph: &DependencyGraph) -> String {
    let components: Vec<Value> = graph
        .nodes()
        .iter()
        .filter(|n| n.kind.is_type())
        .map(|n| format_node(graph, n))
        .collect();

    let key_dependencies: Vec<Value> = graph
        .edges()
        .iter()
        .filter(|e| {
            matches!(
                e.kind,
                DependencyKind::Extends | DependencyKind::Implements | DependencyKind::Import
            )
        })
        .take(KEY_DEPENDENCY_LIMIT)
        .map(format_dependency)
        .collect();

    pretty(&json!({
        "nodeCount": graph.type_count(),
        "edgeCount": graph.edge_count(),
        "packages": graph.packages(),
        "mainComponents": components,
        "keyDependencies": key_dependencies,
    }))
}

/// Summary restricted to the nodes matching `context` and every edge that
/// starts or ends at one of them.
pub fn format_filtered_graph(graph: &DependencyGraph, context: &str) -> String {
    let nodes: Vec<&AstNode> = graph
        .nodes()
        .iter()
        .filter(|n| context_matches(n, context))
        .collect();
    let keys: HashSet<String> = nodes.iter().map(|n| n.key()).collect();

    let dependencies: Vec<Value> = graph
        .edges()
        .iter()
        .filter(|e| keys.contains(&e.source_node) || keys.contains(&e.target_node))
        .map(format_dependency)
        .collect();

    pretty(&json!({
        "context": context,
        "nodeCount": nodes.len(),
        "edgeCount": dependencies.len(),
        "nodes": nodes.iter().map(|n| format_node(graph, n)).collect::<Vec<_>>(),
        "dependencies": dependencies,
    }))
}

/// Every field of one node, its members' source and all of its edges.
pub fn format_detailed_node(graph: &DependencyGraph, node: &AstNode) -> String {
    let mut map = base_fields(node);
    map.insert("startLine".into(), json!(node.start_line));
    map.insert("endLine".into(), json!(node.end_line));
    map.insert("sourceCode".into(), json!(node.source_code));

    let children: Vec<Value> = node
        .children
        .iter()
        .map(|child| {
            let mut child_map = base_fields(child);
            child_map.insert("sourceCode".into(), json!(child.source_code));
            Value::Object(child_map)
        })
        .collect();
    map.insert("children".into(), Value::Array(children));

    let dependencies: Vec<Value> = graph
        .dependencies_of(&node.key())
        .into_iter()
        .map(format_dependency)
        .collect();
    map.insert("dependencies".into(), Value::Array(dependencies));

    pretty(&Value::Object(map))
}

/// Counts by kind and package plus a one-line entry per node.
pub fn format_nodes_summary(nodes: &[&AstNode]) -> String {
    let mut by_kind: BTreeMap<&str, usize> = BTreeMap::new();
    let mut by_package: BTreeMap<&str, usize> = BTreeMap::new();
    for node in nodes {
        *by_kind.entry(node.kind.as_str()).or_default() += 1;
        *by_package.entry(node.package_name.as_str()).or_default() += 1;
    }

    let entries: Vec<Value> = nodes
        .iter()
        .map(|n| {
            json!({
                "type": n.kind.as_str(),
                "name": n.name,
                "packageName": n.package_name,
            })
        })
        .collect();

    pretty(&json!({
        "count": nodes.len(),
        "typeCount": by_kind,
        "packageCount": by_package,
        "nodes": entries,
    }))
}

/// Numbered list of semantic hits, best first.
pub fn format_semantic_results(hits: &[ScoredRecord]) -> String {
    let mut out = String::from("Semantic search results for the query:\n\n");
    for (i, hit) in hits.iter().enumerate() {
        let record = &hit.record;
        out.push_str(&format!(
            "{}. Type: {}\n   Name: {}\n   Package: {}\n   File: {}\n   Similarity: {:.3}\n   Description: {}\n\n",
            i + 1,
            record.kind,
            record.name,
            record.package_name,
            record.file_path,
            hit.similarity,
            record.description,
        ));
    }
    out
}

/// Source of each semantic hit. The stored snippet is preferred; otherwise
/// the graph node's source is used.
pub fn format_semantic_sources(hits: &[ScoredRecord], graph: &DependencyGraph) -> String {
    let mut out = String::from("Source code snippets from relevant components:\n\n");
    for (i, hit) in hits.iter().enumerate() {
        let record = &hit.record;
        out.push_str(&format!("{}. {}: {}\n", i + 1, record.kind, record.name));

        let source = record
            .source_snippet
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| {
                graph
                    .node_by_key(&record.node_key)
                    .and_then(|n| n.source_code.as_deref())
                    .filter(|s| !s.is_empty())
            });

        match source {
            Some(source) => push_java_block(&mut out, source),
            None => out.push_str("(Source code not available)\n\n"),
        }
    }
    out
}

/// Source of every node matching `context`.
pub fn format_context_source(graph: &DependencyGraph, context: &str) -> String {
    let mut out = format!("Source code for context {}:\n\n", context);
    for node in graph
        .nodes()
        .iter()
        .filter(|n| context_matches(n, context) && n.has_source())
    {
        push_node_source(&mut out, node);
    }
    out
}

/// Source of the first few classes and interfaces.
pub fn format_source_highlights(graph: &DependencyGraph) -> String {
    let mut out = String::from("Selected source code highlights:\n\n");
    for node in graph
        .nodes()
        .iter()
        .filter(|n| n.kind.is_type() && n.has_source())
        .take(HIGHLIGHT_LIMIT)
    {
        push_node_source(&mut out, node);
    }
    out
}

fn base_fields(node: &AstNode) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("type".into(), json!(node.kind.as_str()));
    map.insert("name".into(), json!(node.name));
    map.insert("packageName".into(), json!(node.package_name));
    map.insert("fullyQualifiedName".into(), json!(node.key()));
    map.insert("filePath".into(), json!(node.file_path));
    map.insert("lineNumber".into(), json!(node.line_number));
    map.insert("visibility".into(), json!(node.visibility.as_str()));
    if let Some(return_type) = &node.return_type {
        map.insert("returnType".into(), json!(return_type));
    }
    map.insert("isStatic".into(), json!(node.is_static));
    map.insert("isInterface".into(), json!(node.is_interface));
    map.insert("isAbstract".into(), json!(node.is_abstract));
    map
}

fn format_node(graph: &DependencyGraph, node: &AstNode) -> Value {
    let mut map = base_fields(node);

    let children: Vec<Value> = node
        .children
        .iter()
        .map(|child| {
            let mut entry = Map::new();
            entry.insert("type".into(), json!(child.kind.as_str()));
            entry.insert("name".into(), json!(child.name));
            entry.insert("visibility".into(), json!(child.visibility.as_str()));
            if let Some(return_type) = &child.return_type {
                entry.insert("returnType".into(), json!(return_type));
            }
            Value::Object(entry)
        })
        .collect();
    map.insert("children".into(), Value::Array(children));

    let dependencies: Vec<Value> = graph
        .dependencies_of(&node.key())
        .into_iter()
        .take(NODE_DEPENDENCY_LIMIT)
        .map(|d| json!({ "type": d.kind.as_str(), "target": d.target_node }))
        .collect();
    map.insert("dependencies".into(), Value::Array(dependencies));

    if let Some(source) = node.source_code.as_deref().filter(|s| !s.is_empty()) {
        map.insert(
            "codeSnippet".into(),
            json!(preview(source, SNIPPET_PREVIEW_CHARS)),
        );
    }

    Value::Object(map)
}

fn format_dependency(dependency: &CodeDependency) -> Value {
    let mut map = Map::new();
    map.insert("type".into(), json!(dependency.kind.as_str()));
    map.insert("source".into(), json!(dependency.source_node));
    map.insert("target".into(), json!(dependency.target_node));
    map.insert("sourceLine".into(), json!(dependency.source_line));
    map.insert("description".into(), json!(dependency.description));
    if dependency.is_resolved() {
        map.insert("targetFile".into(), json!(dependency.target_file_path));
    }
    Value::Object(map)
}

fn push_node_source(out: &mut String, node: &AstNode) {
    out.push_str(&format!("// {}: {}\n", node.kind.as_str(), node.key()));
    if let Some(source) = &node.source_code {
        push_java_block(out, source);
    }
}

fn push_java_block(out: &mut String, source: &str) {
    out.push_str("```java\n");
    out.push_str(source);
    out.push_str("\n```\n\n");
}

/// First `max` characters, with `...` appended when anything was cut.
fn preview(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
