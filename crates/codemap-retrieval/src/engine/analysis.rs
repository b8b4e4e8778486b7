//! Graph lookups and query dispatch for RetrievalEngine.

use super::RetrievalEngine;
use crate::error::RetrievalError;
use crate::format;
use crate::query::{CodeQueryRequest, QueryMode};
use crate::results::{QueryResult, SourceContext};
use codemap_parser::AstNode;
use tracing::debug;

impl RetrievalEngine {
    pub fn get_node(&self, key: &str) -> Result<AstNode, RetrievalError> {
        let snapshot = self.current_snapshot()?;
        snapshot
            .graph
            .node_by_key(key)
            .cloned()
            .ok_or_else(|| RetrievalError::NotFound(key.to_string()))
    }

    /// Pretty JSON with every field, member and edge of one node.
    pub fn describe_node(&self, key: &str) -> Result<String, RetrievalError> {
        let snapshot = self.current_snapshot()?;
        let node = snapshot
            .graph
            .node_by_key(key)
            .ok_or_else(|| RetrievalError::NotFound(key.to_string()))?;
        Ok(format::format_detailed_node(&snapshot.graph, node))
    }

    /// Nodes whose package starts with `prefix`, in discovery order.
    pub fn elements_for_package(&self, prefix: &str) -> Result<Vec<AstNode>, RetrievalError> {
        let snapshot = self.current_snapshot()?;
        Ok(snapshot.graph.nodes_in_package(prefix).cloned().collect())
    }

    /// Source text of every node in the package that has any.
    pub fn source_for_package(&self, prefix: &str) -> Result<Vec<SourceContext>, RetrievalError> {
        let snapshot = self.current_snapshot()?;
        Ok(snapshot
            .graph
            .nodes_in_package(prefix)
            .filter_map(SourceContext::from_node)
            .collect())
    }

    /// Counts and one-line entries for the nodes in a package.
    pub fn package_summary(&self, prefix: &str) -> Result<String, RetrievalError> {
        let snapshot = self.current_snapshot()?;
        let nodes: Vec<&AstNode> = snapshot.graph.nodes_in_package(prefix).collect();
        Ok(format::format_nodes_summary(&nodes))
    }

    /// Graph summary focused on `context`.
    pub fn query_by_context(&self, context: &str) -> Result<String, RetrievalError> {
        let snapshot = self.current_snapshot()?;
        Ok(format::format_filtered_graph(&snapshot.graph, context))
    }

    /// Answer a client request in whichever mode it selects.
    pub fn query(&self, request: CodeQueryRequest) -> Result<QueryResult, RetrievalError> {
        let mode = QueryMode::try_from(request)?;
        self.run_query(&mode)
    }

    pub fn run_query(&self, mode: &QueryMode) -> Result<QueryResult, RetrievalError> {
        let snapshot = self.current_snapshot()?;
        debug!(mode = mode.name(), generation = snapshot.generation, "Dispatching query");

        match mode {
            QueryMode::Semantic {
                query,
                package_filter,
                limit,
                include_source,
            } => {
                let hits =
                    self.search_snapshot(&snapshot, query, *limit, package_filter.as_deref())?;
                let result = QueryResult::new(format::format_semantic_results(&hits));
                Ok(if *include_source {
                    result.with_source(format::format_semantic_sources(&hits, &snapshot.graph))
                } else {
                    result
                })
            }
            QueryMode::Structural {
                context: Some(context),
                include_source,
            } => {
                let result =
                    QueryResult::new(format::format_filtered_graph(&snapshot.graph, context));
                Ok(if *include_source {
                    result.with_source(format::format_context_source(&snapshot.graph, context))
                } else {
                    result
                })
            }
            QueryMode::Structural {
                context: None,
                include_source,
            } => {
                let result = QueryResult::new(format::format_graph(&snapshot.graph));
                Ok(if *include_source {
                    result.with_source(format::format_source_highlights(&snapshot.graph))
                } else {
                    result
                })
            }
        }
    }
}
