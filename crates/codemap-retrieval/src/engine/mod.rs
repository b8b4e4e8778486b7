//! Retrieval over the published index.
//!
//! `RetrievalEngine` reads whatever snapshot the graph store currently
//! publishes. Each call takes its own `Arc` to that snapshot, so an answer is
//! always computed against one complete build even while a rebuild runs.

mod analysis;
mod explain;
mod search;

use crate::error::RetrievalError;
use codemap_embeddings::EmbeddingModel;
use codemap_index::{GraphStore, IndexSnapshot};
use std::sync::Arc;

pub use explain::DEFAULT_EXPLAIN_DEPTH;

/// The main search and retrieval engine.
pub struct RetrievalEngine {
    pub(crate) graph_store: Arc<GraphStore>,
    /// Must be the model the index was built with.
    pub(crate) model: Arc<dyn EmbeddingModel>,
}

impl RetrievalEngine {
    pub fn new(graph_store: Arc<GraphStore>, model: Arc<dyn EmbeddingModel>) -> Self {
        Self { graph_store, model }
    }

    pub fn graph_store(&self) -> &Arc<GraphStore> {
        &self.graph_store
    }

    pub fn model(&self) -> &Arc<dyn EmbeddingModel> {
        &self.model
    }

    /// The published snapshot, read-only.
    ///
    /// Fails with `NotIndexed` while the store still holds its initial empty
    /// placeholder, that is before any build was published or loaded.
    pub fn current_snapshot(&self) -> Result<Arc<IndexSnapshot>, RetrievalError> {
        let snapshot = self.graph_store.snapshot()?;
        if snapshot.report.is_none() && snapshot.is_empty() {
            return Err(RetrievalError::NotIndexed);
        }
        Ok(snapshot)
    }
}
