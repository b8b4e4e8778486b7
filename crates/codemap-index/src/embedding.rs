//! Turns graph nodes into embedding records.
//!
//! Each node is rendered to a descriptive text (kind, name, package,
//! modifiers, outgoing edges, members and source), embedded, and stored with
//! a short human-readable description. A rebuild always embeds from scratch;
//! the previous records are replaced wholesale when the build is published.

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::graph::DependencyGraph;
use crate::pipeline::CancelToken;
use crate::progress::PercentProgress;
use crate::schema::EmbeddingRecord;
use codemap_embeddings::EmbeddingModel;
use codemap_parser::{AstNode, CodeDependency};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Longest stored snippet, in characters, before truncation.
pub const MAX_SNIPPET_CHARS: usize = 10_000;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingStats {
    /// Nodes the embedder attempted
    pub processed: usize,
    pub created: usize,
    pub failed: usize,
    /// Nodes never attempted because the cap was reached
    pub skipped: usize,
    pub capped: bool,
}

#[derive(Debug, Default)]
pub struct EmbeddingOutcome {
    pub records: Vec<EmbeddingRecord>,
    pub stats: EmbeddingStats,
}

pub struct EmbeddingPipeline<'a> {
    model: &'a dyn EmbeddingModel,
    batch_size: usize,
    max_embeddings: usize,
    progress_interval: usize,
}

impl<'a> EmbeddingPipeline<'a> {
    pub fn new(model: &'a dyn EmbeddingModel, config: &PipelineConfig) -> Self {
        Self {
            model,
            batch_size: config.embedding_batch_size.max(1),
            max_embeddings: config.max_embeddings,
            progress_interval: config.progress_interval,
        }
    }

    /// Embed every node in graph order until the cap is reached. A node that
    /// fails to embed is logged and skipped; it does not count toward the cap.
    pub fn run(
        &self,
        graph: &DependencyGraph,
        cancel: &CancelToken,
    ) -> Result<EmbeddingOutcome, PipelineError> {
        let nodes = graph.nodes();
        let mut outcome = EmbeddingOutcome::default();
        let mut progress = PercentProgress::new(nodes.len(), self.progress_interval);

        info!(
            nodes = nodes.len(),
            max = self.max_embeddings,
            model = %self.model.name(),
            "Creating embeddings"
        );

        'batches: for (batch_no, batch) in nodes.chunks(self.batch_size).enumerate() {
            cancel.check("embed")?;

            for (offset, node) in batch.iter().enumerate() {
                if outcome.stats.created >= self.max_embeddings {
                    outcome.stats.capped = true;
                    break 'batches;
                }

                let position = batch_no * self.batch_size + offset;
                let dependencies = graph.dependencies_for_node(position);
                outcome.stats.processed += 1;

                match self.embed_node(node, &dependencies) {
                    Ok(record) => {
                        outcome.records.push(record);
                        outcome.stats.created += 1;
                    }
                    Err(e) => {
                        outcome.stats.failed += 1;
                        warn!(node = %node.key(), error = %e, "Failed to embed node");
                    }
                }

                if let Some(percent) = progress.advance(1) {
                    info!(
                        percent,
                        processed = progress.done(),
                        total = progress.total(),
                        created = outcome.stats.created,
                        "Embedding progress"
                    );
                }
            }

            if outcome.stats.created >= self.max_embeddings {
                outcome.stats.capped = true;
                break;
            }
        }

        outcome.stats.skipped = nodes.len() - outcome.stats.processed;
        if outcome.stats.capped && outcome.stats.skipped > 0 {
            warn!(
                max = self.max_embeddings,
                skipped = outcome.stats.skipped,
                "Embedding cap reached"
            );
        }
        info!(
            created = outcome.stats.created,
            failed = outcome.stats.failed,
            skipped = outcome.stats.skipped,
            "Embeddings created"
        );

        Ok(outcome)
    }

    fn embed_node(
        &self,
        node: &AstNode,
        dependencies: &[&CodeDependency],
    ) -> anyhow::Result<EmbeddingRecord> {
        let text = build_embedding_text(node, dependencies);
        let embedding = self.model.embed(&text)?;
        debug!(node = %node.key(), dim = embedding.len(), "Embedded node");

        Ok(EmbeddingRecord {
            id: 0,
            node_key: node.key(),
            file_path: node.file_path.clone(),
            kind: node.kind.as_str().to_string(),
            name: node.name.clone(),
            package_name: node.package_name.clone(),
            source_snippet: node.source_code.as_deref().map(truncate_snippet),
            description: build_description(node, dependencies),
            embedding,
        })
    }
}

/// The text handed to the embedding model for one node.
pub fn build_embedding_text(node: &AstNode, dependencies: &[&CodeDependency]) -> String {
    let mut text = String::new();

    text.push_str(&format!("Type: {}\n", node.kind.as_str()));
    text.push_str(&format!("Name: {}\n", node.name));
    text.push_str(&format!("Package: {}\n", node.package_name));
    text.push_str(&format!("Visibility: {}\n", node.visibility.as_str()));
    if node.is_interface {
        text.push_str("Is Interface: true\n");
    }
    if node.is_abstract {
        text.push_str("Is Abstract: true\n");
    }
    if let Some(return_type) = &node.return_type {
        text.push_str(&format!("Return Type: {}\n", return_type));
    }

    if !dependencies.is_empty() {
        text.push_str("Dependencies:\n");
        for dep in dependencies {
            text.push_str(&format!("- {}: {}\n", dep.kind.as_str(), dep.target_node));
        }
    }

    if !node.children.is_empty() {
        text.push_str("Contains:\n");
        for child in &node.children {
            text.push_str(&format!("- {}: {}\n", child.kind.as_str(), child.name));
        }
    }

    if let Some(source) = node.source_code.as_deref().filter(|s| !s.is_empty()) {
        text.push_str("Source code:\n");
        text.push_str(source);
        text.push('\n');
    }

    text
}

/// One-line summary shown next to search hits.
pub fn build_description(node: &AstNode, dependencies: &[&CodeDependency]) -> String {
    let mut description = format!(
        "{} in {}, {}",
        node.kind.as_str(),
        node.package_name,
        node.visibility.as_str()
    );

    if node.is_interface {
        description.push_str(", interface");
    } else if node.is_abstract {
        description.push_str(", abstract");
    }
    if !dependencies.is_empty() {
        description.push_str(&format!(", has {} dependencies", dependencies.len()));
    }
    if !node.children.is_empty() {
        description.push_str(&format!(", contains {} members", node.children.len()));
    }

    description
}

fn truncate_snippet(source: &str) -> String {
    match source.char_indices().nth(MAX_SNIPPET_CHARS) {
        Some((cut, _)) => format!("{}...", &source[..cut]),
        None => source.to_string(),
    }
}
