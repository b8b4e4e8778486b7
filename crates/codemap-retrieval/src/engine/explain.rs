//! Call trees for RetrievalEngine.
//!
//! A method's callees are the resolved `calls` edges recorded inside its
//! line range. Each branch carries its own copy of the keys already on the
//! path, so a cycle stops that branch without hiding the same method from
//! sibling branches. A shared node budget caps the whole tree, since
//! methods reachable from many callers are expanded under each of them.

use super::RetrievalEngine;
use crate::error::RetrievalError;
use crate::results::CallTreeNode;
use codemap_index::DependencyGraph;
use codemap_parser::{AstNode, DependencyKind, ElementKind};
use std::collections::HashSet;
use tracing::debug;

pub const DEFAULT_EXPLAIN_DEPTH: usize = 5;
const MAX_EXPLAIN_DEPTH: usize = 12;
/// Nodes per tree; callees that would exceed it are left unexpanded.
pub(crate) const MAX_EXPLAIN_NODES: usize = 500;

impl RetrievalEngine {
    /// Call tree rooted at the method stored under `key`.
    /// Nodes deeper than `max_depth` are listed but not expanded.
    ///
    /// Constructors share their class's key, so they are not reachable here.
    pub fn explain(&self, key: &str, max_depth: usize) -> Result<CallTreeNode, RetrievalError> {
        if max_depth > MAX_EXPLAIN_DEPTH {
            return Err(RetrievalError::InvalidRequest(format!(
                "depth {} exceeds the maximum of {}",
                max_depth, MAX_EXPLAIN_DEPTH
            )));
        }

        let snapshot = self.current_snapshot()?;
        let graph = &snapshot.graph;
        let node = graph
            .node_by_key(key)
            .ok_or_else(|| RetrievalError::NotFound(key.to_string()))?;
        if node.kind != ElementKind::Method {
            return Err(RetrievalError::InvalidRequest(format!(
                "{} is a {}, not a method",
                key,
                node.kind.as_str()
            )));
        }

        let mut walk = Walk {
            graph,
            max_depth,
            budget: MAX_EXPLAIN_NODES - 1,
        };
        let tree = walk.expand(node, &HashSet::new(), 0);
        debug!(key, nodes = tree.size(), depth = tree.depth(), "Built call tree");
        Ok(tree)
    }
}

struct Walk<'a> {
    graph: &'a DependencyGraph,
    max_depth: usize,
    /// Nodes that may still be created beyond those already reserved.
    budget: usize,
}

impl Walk<'_> {
    fn expand(&mut self, node: &AstNode, path: &HashSet<String>, depth: usize) -> CallTreeNode {
        let key = node.key();
        let mut tree = CallTreeNode {
            key: key.clone(),
            kind: node.kind.as_str().to_string(),
            source: node.source_code.clone(),
            callees: Vec::new(),
            truncated: false,
        };

        if path.contains(&key) {
            tree.truncated = true;
            return tree;
        }

        let callees = callees_of(self.graph, node);
        if depth >= self.max_depth || self.budget < callees.len() {
            tree.truncated = !callees.is_empty();
            return tree;
        }

        self.budget -= callees.len();
        let mut path = path.clone();
        path.insert(key);
        tree.callees = callees
            .into_iter()
            .map(|callee| self.expand(callee, &path, depth + 1))
            .collect();
        tree
    }
}

/// Distinct resolved call targets recorded inside `method`, in edge order.
fn callees_of<'a>(graph: &'a DependencyGraph, method: &AstNode) -> Vec<&'a AstNode> {
    let mut seen = HashSet::new();
    graph
        .edges_of_kind(DependencyKind::Calls)
        .filter(|e| {
            e.is_resolved()
                && e.source_file_path == method.file_path
                && method.contains_line(e.source_line)
        })
        .filter(|e| seen.insert(e.target_node.clone()))
        .filter_map(|e| graph.node_by_key(&e.target_node))
        .collect()
}
