//! Cross-file resolution of edge targets.
//!
//! Extraction records targets as they are written in the source: a dotted
//! import, a simple type name, a method or field name. Once every file is in
//! the graph, targets that can be pinned to a known node are rewritten to
//! that node's key and its file. Anything ambiguous or unknown is left alone.

use crate::graph::DependencyGraph;
use codemap_parser::{AstNode, DependencyKind, ElementKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionStats {
    pub imports: usize,
    pub inheritance: usize,
    pub creates: usize,
    pub calls: usize,
    pub uses: usize,
    pub unresolved: usize,
}

impl ResolutionStats {
    pub fn resolved(&self) -> usize {
        self.imports + self.inheritance + self.creates + self.calls + self.uses
    }

    fn record(&mut self, kind: DependencyKind) {
        match kind {
            DependencyKind::Import => self.imports += 1,
            DependencyKind::Extends | DependencyKind::Implements => self.inheritance += 1,
            DependencyKind::Creates => self.creates += 1,
            DependencyKind::Calls => self.calls += 1,
            DependencyKind::Uses => self.uses += 1,
        }
    }
}

struct Rewrite {
    edge: usize,
    target: String,
    /// Declaring file, when the target is a node in the graph.
    file: Option<String>,
}

pub struct CrossFileResolver;

impl CrossFileResolver {
    pub fn resolve(graph: &mut DependencyGraph) -> ResolutionStats {
        let lookup = Lookup::new(graph);
        let mut stats = ResolutionStats::default();
        let mut rewrites = Vec::new();

        for (position, edge) in graph.edges().iter().enumerate() {
            let resolved = match edge.kind {
                // Imports keep the written name; only the file is attached.
                DependencyKind::Import => lookup
                    .import_target(&edge.target_node)
                    .map(|node| (edge.target_node.clone(), Some(node))),
                DependencyKind::Extends | DependencyKind::Implements | DependencyKind::Creates => {
                    lookup
                        .imported_type(&edge.source_node, &edge.target_node)
                        .map(|(qualified, node)| (qualified.to_string(), node))
                }
                DependencyKind::Calls => lookup
                    .method(&edge.source_node, &edge.source_file_path, &edge.target_node)
                    .map(|node| (node.key(), Some(node))),
                DependencyKind::Uses => lookup
                    .field(&edge.source_file_path, &edge.target_node)
                    .map(|node| (node.key(), Some(node))),
            };

            match resolved {
                Some((target, node)) => {
                    stats.record(edge.kind);
                    rewrites.push(Rewrite {
                        edge: position,
                        target,
                        file: node.map(|n| n.file_path.clone()),
                    });
                }
                None => stats.unresolved += 1,
            }
        }

        let edges = graph.edges_mut();
        for rewrite in rewrites {
            let edge = &mut edges[rewrite.edge];
            edge.target_node = rewrite.target;
            if let Some(file) = rewrite.file {
                edge.target_file_path = file;
            }
        }

        debug!(
            resolved = stats.resolved(),
            unresolved = stats.unresolved,
            "Cross-file resolution finished"
        );
        stats
    }
}

/// Read-only indexes over the graph built once per resolution pass.
struct Lookup<'g> {
    graph: &'g DependencyGraph,
    /// Nodes by simple name, in node order.
    by_name: HashMap<&'g str, Vec<&'g AstNode>>,
    /// Import targets written by each source key, in edge order.
    imports: HashMap<&'g str, Vec<&'g str>>,
}

impl<'g> Lookup<'g> {
    fn new(graph: &'g DependencyGraph) -> Self {
        let mut by_name: HashMap<&str, Vec<&AstNode>> = HashMap::new();
        for node in graph.nodes() {
            by_name.entry(node.name.as_str()).or_default().push(node);
        }

        let mut imports: HashMap<&str, Vec<&str>> = HashMap::new();
        for edge in graph.edges_of_kind(DependencyKind::Import) {
            imports
                .entry(edge.source_node.as_str())
                .or_default()
                .push(edge.target_node.as_str());
        }

        Self {
            graph,
            by_name,
            imports,
        }
    }

    /// Exact key match first, then the first node whose name is the import's
    /// last segment.
    fn import_target(&self, target: &str) -> Option<&'g AstNode> {
        if let Some(node) = self.graph.node_by_key(target) {
            return Some(node);
        }
        let simple = target.rsplit('.').next()?;
        if simple == target {
            return None;
        }
        self.by_name.get(simple)?.first().copied()
    }

    /// Qualifies a simple type name through the source's imports. Exactly one
    /// import must end in `.Name`; the type itself need not be indexed.
    fn imported_type(&self, source: &str, simple: &str) -> Option<(&'g str, Option<&'g AstNode>)> {
        let suffix = format!(".{}", simple);
        let mut matching = self
            .imports
            .get(source)?
            .iter()
            .filter(|import| import.ends_with(&suffix));

        let qualified = *matching.next()?;
        if matching.next().is_some() {
            return None;
        }
        Some((qualified, self.graph.node_by_key(qualified)))
    }

    /// A lone method of that name wins outright. Among several, one declared
    /// in the calling file comes first, then one whose package some import
    /// of the caller starts with.
    fn method(&self, source: &str, file: &str, name: &str) -> Option<&'g AstNode> {
        let candidates: Vec<&AstNode> = self
            .by_name
            .get(name)?
            .iter()
            .copied()
            .filter(|n| n.kind == ElementKind::Method)
            .collect();

        match candidates.as_slice() {
            [] => None,
            [only] => Some(*only),
            _ => {
                if let Some(local) = candidates.iter().find(|n| n.file_path == file) {
                    return Some(*local);
                }
                let imports = self.imports.get(source)?;
                candidates.into_iter().find(|candidate| {
                    !candidate.package_name.is_empty()
                        && imports
                            .iter()
                            .any(|import| import.starts_with(&candidate.package_name))
                })
            }
        }
    }

    fn field(&self, file: &str, name: &str) -> Option<&'g AstNode> {
        self.by_name
            .get(name)?
            .iter()
            .copied()
            .find(|n| n.kind == ElementKind::Field && n.file_path == file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codemap_parser::CodeDependency;

    fn node(kind: ElementKind, name: &str, pkg: &str, file: &str) -> AstNode {
        AstNode::new(kind, name, pkg, file).with_lines(1, 1)
    }

    fn graph_with(nodes: Vec<AstNode>) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for n in nodes {
            graph.add_node(n);
        }
        graph
    }

    #[test]
    fn test_import_resolves_to_declaring_file() {
        let order = node(ElementKind::Class, "OrderService", "shop.app", "app/OrderService.java");
        let repo = node(ElementKind::Interface, "OrderRepo", "shop.data", "data/OrderRepo.java");
        let mut graph = graph_with(vec![order.clone(), repo]);
        graph.add_dependency(CodeDependency::new(DependencyKind::Import, &order, "shop.data.OrderRepo", 3));
        graph.add_dependency(CodeDependency::new(DependencyKind::Import, &order, "java.util.List", 4));

        let stats = CrossFileResolver::resolve(&mut graph);
        assert_eq!(stats.imports, 1);
        assert_eq!(stats.unresolved, 1);

        let edges = graph.edges();
        assert_eq!(edges[0].target_node, "shop.data.OrderRepo");
        assert_eq!(edges[0].target_file_path, "data/OrderRepo.java");
        assert!(!edges[1].is_resolved());
    }

    #[test]
    fn test_import_suffix_match() {
        let main = node(ElementKind::Class, "Main", "", "Main.java");
        let helper = node(ElementKind::Class, "Helper", "", "Helper.java");
        let mut graph = graph_with(vec![main.clone(), helper]);
        graph.add_dependency(CodeDependency::new(DependencyKind::Import, &main, "legacy.Helper", 1));

        CrossFileResolver::resolve(&mut graph);
        assert_eq!(graph.edges()[0].target_node, "legacy.Helper");
        assert_eq!(graph.edges()[0].target_file_path, "Helper.java");
    }

    #[test]
    fn test_inheritance_uses_unique_import() {
        let flow = node(ElementKind::Class, "Checkout", "shop.flow", "flow/Checkout.java");
        let base = node(ElementKind::Class, "BaseFlow", "shop.core", "core/BaseFlow.java");
        let step = node(ElementKind::Interface, "Step", "shop.core", "core/Step.java");
        let mut graph = graph_with(vec![flow.clone(), base, step]);
        graph.add_dependency(CodeDependency::new(DependencyKind::Import, &flow, "shop.core.BaseFlow", 3));
        graph.add_dependency(CodeDependency::new(DependencyKind::Extends, &flow, "BaseFlow", 5));
        graph.add_dependency(CodeDependency::new(DependencyKind::Implements, &flow, "Step", 5));

        let stats = CrossFileResolver::resolve(&mut graph);
        assert_eq!(stats.inheritance, 1);
        assert_eq!(graph.edges()[1].target_node, "shop.core.BaseFlow");
        assert_eq!(graph.edges()[1].target_file_path, "core/BaseFlow.java");
        // No import names Step, so it stays as written.
        assert_eq!(graph.edges()[2].target_node, "Step");
        assert!(!graph.edges()[2].is_resolved());
    }

    #[test]
    fn test_external_import_qualifies_target_without_file() {
        let repo = node(ElementKind::Class, "Repo", "app", "app/Repo.java");
        let mut graph = graph_with(vec![repo.clone()]);
        graph.add_dependency(CodeDependency::new(DependencyKind::Import, &repo, "java.util.AbstractList", 1));
        graph.add_dependency(CodeDependency::new(DependencyKind::Extends, &repo, "AbstractList", 3));
        graph.add_dependency(CodeDependency::new(DependencyKind::Creates, &repo, "AbstractList", 7));

        let stats = CrossFileResolver::resolve(&mut graph);
        assert_eq!(stats.inheritance, 1);
        assert_eq!(stats.creates, 1);
        // Only the import itself, which names nothing indexed.
        assert_eq!(stats.unresolved, 1);

        for edge in &graph.edges()[1..] {
            assert_eq!(edge.target_node, "java.util.AbstractList");
            assert!(edge.target_file_path.is_empty());
            assert!(!edge.is_resolved());
        }
    }

    #[test]
    fn test_ambiguous_import_leaves_edge_unresolved() {
        let user = node(ElementKind::Class, "User", "app", "User.java");
        let a = node(ElementKind::Class, "Clock", "lib.a", "a/Clock.java");
        let b = node(ElementKind::Class, "Clock", "lib.b", "b/Clock.java");
        let mut graph = graph_with(vec![user.clone(), a, b]);
        graph.add_dependency(CodeDependency::new(DependencyKind::Import, &user, "lib.a.Clock", 1));
        graph.add_dependency(CodeDependency::new(DependencyKind::Import, &user, "lib.b.Clock", 2));
        graph.add_dependency(CodeDependency::new(DependencyKind::Creates, &user, "Clock", 5));

        CrossFileResolver::resolve(&mut graph);
        assert_eq!(graph.edges()[2].target_node, "Clock");
        assert!(!graph.edges()[2].is_resolved());
    }

    #[test]
    fn test_calls_prefer_same_file_then_imported_package() {
        let caller = node(ElementKind::Class, "Billing", "shop.billing", "Billing.java");
        let local = node(ElementKind::Method, "total", "shop.billing", "Billing.java");
        let remote = node(ElementKind::Method, "total", "shop.cart", "Cart.java");
        let mut graph = graph_with(vec![caller.clone(), remote, local]);
        graph.add_dependency(CodeDependency::new(DependencyKind::Calls, &caller, "total", 9));

        let stats = CrossFileResolver::resolve(&mut graph);
        assert_eq!(stats.calls, 1);
        assert_eq!(graph.edges()[0].target_node, "shop.billing.total");
        assert_eq!(graph.edges()[0].target_file_path, "Billing.java");
    }

    #[test]
    fn test_calls_fall_back_to_import_prefix() {
        let caller = node(ElementKind::Class, "Report", "app", "Report.java");
        let a = node(ElementKind::Method, "render", "lib.html", "Html.java");
        let b = node(ElementKind::Method, "render", "lib.pdf", "Pdf.java");
        let mut graph = graph_with(vec![caller.clone(), a, b]);
        graph.add_dependency(CodeDependency::new(DependencyKind::Import, &caller, "lib.pdf.Pdf", 1));
        graph.add_dependency(CodeDependency::new(DependencyKind::Calls, &caller, "render", 4));

        CrossFileResolver::resolve(&mut graph);
        assert_eq!(graph.edges()[1].target_node, "lib.pdf.render");
    }

    #[test]
    fn test_uses_resolve_to_same_file_field() {
        let owner = node(ElementKind::Class, "Counter", "util", "Counter.java");
        let field = node(ElementKind::Field, "count", "util", "Counter.java");
        let other = node(ElementKind::Field, "count", "misc", "Other.java");
        let mut graph = graph_with(vec![owner.clone(), other, field]);
        graph.add_dependency(CodeDependency::new(DependencyKind::Uses, &owner, "count", 6));

        CrossFileResolver::resolve(&mut graph);
        assert_eq!(graph.edges()[0].target_node, "util.count");
        assert_eq!(graph.edges()[0].target_file_path, "Counter.java");
    }
}
