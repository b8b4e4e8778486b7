use crate::error::PipelineError;
use crate::graph_store::{GraphStore, IndexSnapshot, RebuildOutcome};
use crate::pipeline::{CancelToken, Pipeline};
use crate::store::IndexStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Binds a project root and a pipeline to a graph store, and optionally to
/// an on-disk store that receives every published build.
pub struct Indexer {
    root: PathBuf,
    pipeline: Pipeline,
    graph_store: Arc<GraphStore>,
    persist: Option<Arc<IndexStore>>,
}

impl Indexer {
    pub fn new(root: PathBuf, pipeline: Pipeline, graph_store: Arc<GraphStore>) -> Self {
        Self {
            root,
            pipeline,
            graph_store,
            persist: None,
        }
    }

    pub fn with_persistence(mut self, store: Arc<IndexStore>) -> Self {
        self.persist = Some(store);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn graph_store(&self) -> &Arc<GraphStore> {
        &self.graph_store
    }

    /// Build from scratch and publish. When persistence is configured the
    /// build is written to disk first; a write failure publishes nothing.
    pub fn rebuild(&self, cancel: &CancelToken) -> Result<RebuildOutcome, PipelineError> {
        let outcome = self.graph_store.rebuild_with(|generation| {
            let output = self.pipeline.run(&self.root, cancel)?;
            if let Some(store) = &self.persist {
                store.save_build(&output)?;
            }
            Ok(IndexSnapshot::from_build(output, generation))
        })?;

        if !outcome.joined {
            info!(
                root = %self.root.display(),
                generation = outcome.snapshot.generation,
                "Index rebuilt"
            );
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use codemap_embeddings::HashingEmbeddingModel;
    use std::fs;
    use tempfile::TempDir;

    fn indexer(root: &Path, store: Option<Arc<IndexStore>>) -> Indexer {
        let pipeline = Pipeline::new(
            PipelineConfig::default(),
            Arc::new(HashingEmbeddingModel::new(16)),
        );
        let indexer = Indexer::new(root.to_path_buf(), pipeline, Arc::new(GraphStore::new()));
        match store {
            Some(store) => indexer.with_persistence(store),
            None => indexer,
        }
    }

    #[test]
    fn test_rebuild_publishes_and_persists() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Hello.java"), "class Hello { void hi() {} }").unwrap();
        let store = Arc::new(IndexStore::open_in_memory().unwrap());

        let indexer = indexer(dir.path(), Some(Arc::clone(&store)));
        let outcome = indexer.rebuild(&CancelToken::new()).unwrap();

        assert_eq!(outcome.snapshot.generation, 1);
        assert!(indexer.graph_store().node("Hello").unwrap().is_some());
        assert_eq!(store.embedding_count().unwrap(), 2);
        assert!(store.load_graph().unwrap().is_some());
    }

    #[test]
    fn test_failed_rebuild_keeps_last_good_graph() {
        let dir = TempDir::new().unwrap();
        let project = dir.path().join("project");
        fs::create_dir(&project).unwrap();
        fs::write(project.join("Hello.java"), "class Hello {}").unwrap();

        let indexer = indexer(&project, None);
        indexer.rebuild(&CancelToken::new()).unwrap();

        fs::remove_dir_all(&project).unwrap();
        let err = indexer.rebuild(&CancelToken::new()).unwrap_err();
        assert!(matches!(err, PipelineError::RootNotFound(_)));

        assert_eq!(indexer.graph_store().generation(), 1);
        assert!(indexer.graph_store().node("Hello").unwrap().is_some());
    }
}
