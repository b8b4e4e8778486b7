use codemap_index::EmbeddingRecord;
use codemap_parser::AstNode;
use serde::{Deserialize, Serialize};

/// A stored embedding together with its similarity to the query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredRecord {
    pub record: EmbeddingRecord,
    pub similarity: f32,
}

impl ScoredRecord {
    pub fn node_key(&self) -> &str {
        &self.record.node_key
    }
}

/// Uniform answer to a code query, consumed as opaque text downstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub formatted_graph: String,
    pub source_code_context: Option<String>,
}

impl QueryResult {
    pub fn new(formatted_graph: String) -> Self {
        Self {
            formatted_graph,
            source_code_context: None,
        }
    }

    pub fn with_source(mut self, source: String) -> Self {
        self.source_code_context = Some(source);
        self
    }
}

/// Source text of one element in a package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceContext {
    pub file_path: String,
    pub name: String,
    pub package_name: String,
    pub source_code: String,
    pub kind: String,
    pub start_line: usize,
    pub end_line: usize,
}

impl SourceContext {
    /// None when the node carries no source text.
    pub fn from_node(node: &AstNode) -> Option<Self> {
        if !node.has_source() {
            return None;
        }
        Some(Self {
            file_path: node.file_path.clone(),
            name: node.name.clone(),
            package_name: node.package_name.clone(),
            source_code: node.source_code.clone().unwrap_or_default(),
            kind: node.kind.as_str().to_string(),
            start_line: node.start_line,
            end_line: node.end_line,
        })
    }

    pub fn location(&self) -> String {
        if self.start_line == self.end_line {
            format!("{}:{}", self.file_path, self.start_line)
        } else {
            format!("{}:{}-{}", self.file_path, self.start_line, self.end_line)
        }
    }
}

/// One method in a call tree. `truncated` marks a node whose callees were
/// not expanded because the depth bound or a cycle stopped the walk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallTreeNode {
    pub key: String,
    pub kind: String,
    pub source: Option<String>,
    pub callees: Vec<CallTreeNode>,
    pub truncated: bool,
}

impl CallTreeNode {
    pub fn depth(&self) -> usize {
        1 + self.callees.iter().map(CallTreeNode::depth).max().unwrap_or(0)
    }

    /// Number of nodes in the tree, this one included.
    pub fn size(&self) -> usize {
        1 + self.callees.iter().map(CallTreeNode::size).sum::<usize>()
    }

    /// Indented outline, one key per line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, 0);
        out
    }

    fn render_into(&self, out: &mut String, level: usize) {
        out.push_str(&"  ".repeat(level));
        out.push_str(&self.key);
        if self.truncated {
            out.push_str(" [not expanded]");
        }
        out.push('\n');
        for callee in &self.callees {
            callee.render_into(out, level + 1);
        }
    }
}
