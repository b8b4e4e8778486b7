//! In-memory dependency graph: nodes, edges and the key index over them.

use codemap_parser::{AstNode, CodeDependency, DependencyKind, ElementKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Nodes in discovery order, edges in extraction order.
///
/// The key index maps each key to the first node inserted under it. Later
/// nodes with a colliding key (a constructor shares its class's key, for
/// instance) stay in the node list but are not reachable by key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "GraphData", into = "GraphData")]
pub struct DependencyGraph {
    nodes: Vec<AstNode>,
    edges: Vec<CodeDependency>,
    index: HashMap<String, usize>,
    edges_by_source: HashMap<String, Vec<usize>>,
    collisions: usize,
}

#[derive(Serialize, Deserialize)]
struct GraphData {
    nodes: Vec<AstNode>,
    edges: Vec<CodeDependency>,
}

impl From<GraphData> for DependencyGraph {
    fn from(data: GraphData) -> Self {
        let mut graph = DependencyGraph::new();
        for node in data.nodes {
            graph.add_node(node);
        }
        for edge in data.edges {
            graph.add_dependency(edge);
        }
        graph
    }
}

impl From<DependencyGraph> for GraphData {
    fn from(graph: DependencyGraph) -> Self {
        GraphData {
            nodes: graph.nodes,
            edges: graph.edges,
        }
    }
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node. Returns false when its key was already taken.
    pub fn add_node(&mut self, node: AstNode) -> bool {
        let key = node.key();
        let position = self.nodes.len();
        self.nodes.push(node);

        if self.index.contains_key(&key) {
            self.collisions += 1;
            debug!(key = %key, "Node key already taken, keeping first");
            return false;
        }
        self.index.insert(key, position);
        true
    }

    pub fn add_dependency(&mut self, dependency: CodeDependency) {
        self.edges_by_source
            .entry(dependency.source_node.clone())
            .or_default()
            .push(self.edges.len());
        self.edges.push(dependency);
    }

    pub fn nodes(&self) -> &[AstNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[CodeDependency] {
        &self.edges
    }

    /// Edges are rewritten in place during resolution. Sources never change,
    /// so the per-source index stays valid.
    pub(crate) fn edges_mut(&mut self) -> &mut [CodeDependency] {
        &mut self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes that lost their key to an earlier node.
    pub fn collisions(&self) -> usize {
        self.collisions
    }

    pub fn node_by_key(&self, key: &str) -> Option<&AstNode> {
        self.index.get(key).map(|&i| &self.nodes[i])
    }

    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.index.get(key).copied()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Outgoing edges recorded under `key`, in extraction order.
    pub fn dependencies_of(&self, key: &str) -> Vec<&CodeDependency> {
        self.edges_by_source
            .get(key)
            .map(|indices| indices.iter().map(|&i| &self.edges[i]).collect())
            .unwrap_or_default()
    }

    /// Outgoing edges of the node at `position`. Only the node that owns its
    /// key has dependencies; a shadowed duplicate reports none.
    pub fn dependencies_for_node(&self, position: usize) -> Vec<&CodeDependency> {
        let Some(node) = self.nodes.get(position) else {
            return Vec::new();
        };
        let key = node.key();
        if self.index.get(&key) != Some(&position) {
            return Vec::new();
        }
        self.dependencies_of(&key)
    }

    pub fn edges_of_kind(&self, kind: DependencyKind) -> impl Iterator<Item = &CodeDependency> {
        self.edges.iter().filter(move |e| e.kind == kind)
    }

    /// Mutable access to every node declared in `file_path`.
    pub fn nodes_in_file_mut<'a>(
        &'a mut self,
        file_path: &'a str,
    ) -> impl Iterator<Item = &'a mut AstNode> + 'a {
        self.nodes.iter_mut().filter(move |n| n.file_path == file_path)
    }

    /// Classes and interfaces.
    pub fn type_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.kind.is_type()).count()
    }

    pub fn count_of_kind(&self, kind: ElementKind) -> usize {
        self.nodes.iter().filter(|n| n.kind == kind).count()
    }

    /// Distinct package names, sorted.
    pub fn packages(&self) -> Vec<String> {
        self.nodes
            .iter()
            .map(|n| n.package_name.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Nodes whose package starts with `prefix`, in node order. An empty
    /// prefix matches everything.
    pub fn nodes_in_package<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a AstNode> {
        self.nodes
            .iter()
            .filter(move |n| n.package_name.starts_with(prefix))
    }

    /// First method named `name` declared in `file_path`.
    pub fn method_in_file(&self, file_path: &str, name: &str) -> Option<&AstNode> {
        self.nodes.iter().find(|n| {
            n.kind == ElementKind::Method && n.file_path == file_path && n.name == name
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(name: &str, pkg: &str) -> AstNode {
        AstNode::new(ElementKind::Class, name, pkg, &format!("{}.java", name)).with_lines(1, 10)
    }

    #[test]
    fn test_first_node_owns_its_key() {
        let mut graph = DependencyGraph::new();
        assert!(graph.add_node(class("Cart", "shop")));
        let ctor = AstNode::new(ElementKind::Constructor, "Cart", "shop", "Cart.java");
        assert!(!graph.add_node(ctor));

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.collisions(), 1);
        assert_eq!(graph.node_by_key("shop.Cart").unwrap().kind, ElementKind::Class);
        assert_eq!(graph.index_of("shop.Cart"), Some(0));
    }

    #[test]
    fn test_dependencies_belong_to_key_owner() {
        let mut graph = DependencyGraph::new();
        let cart = class("Cart", "shop");
        graph.add_node(cart.clone());
        graph.add_node(AstNode::new(ElementKind::Constructor, "Cart", "shop", "Cart.java"));
        graph.add_dependency(CodeDependency::new(DependencyKind::Import, &cart, "shop.util.Clock", 2));

        assert_eq!(graph.dependencies_for_node(0).len(), 1);
        assert!(graph.dependencies_for_node(1).is_empty());
        assert!(graph.dependencies_for_node(9).is_empty());
        assert_eq!(graph.dependencies_of("shop.Cart")[0].target_node, "shop.util.Clock");
    }

    #[test]
    fn test_packages_and_prefix_filter() {
        let mut graph = DependencyGraph::new();
        graph.add_node(class("A", "com.acme.web"));
        graph.add_node(class("B", "com.acme"));
        graph.add_node(class("C", "org.other"));
        graph.add_node(class("D", ""));

        assert_eq!(graph.packages(), vec!["", "com.acme", "com.acme.web", "org.other"]);
        let names: Vec<&str> = graph
            .nodes_in_package("com.acme")
            .map(|n| n.name.as_str())
            .collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(graph.nodes_in_package("").count(), 4);
        assert!(graph.node_by_key("D").is_some());
    }

    #[test]
    fn test_serde_rebuilds_indices() {
        let mut graph = DependencyGraph::new();
        let a = class("A", "p");
        graph.add_node(a.clone());
        graph.add_node(class("B", "p"));
        graph.add_dependency(CodeDependency::new(DependencyKind::Extends, &a, "B", 1));

        let json = serde_json::to_string(&graph).unwrap();
        let restored: DependencyGraph = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.node_count(), 2);
        assert_eq!(restored.edge_count(), 1);
        assert_eq!(restored.node_by_key("p.B").unwrap().name, "B");
        assert_eq!(restored.dependencies_of("p.A").len(), 1);
    }
}
