pub mod auto_indexer;
pub mod config;
pub mod embedding;
pub mod error;
pub mod exclusions;
pub mod graph;
pub mod graph_store;
pub mod indexer;
pub mod locator;
pub mod pipeline;
pub mod progress;
pub mod resolver;
pub mod schema;
pub mod store;
pub mod watcher;

pub use auto_indexer::{AutoIndexer, ProcessResult};
pub use config::PipelineConfig;
pub use embedding::{
    EmbeddingOutcome, EmbeddingPipeline, EmbeddingStats, build_description, build_embedding_text,
};
pub use error::PipelineError;
pub use exclusions::{EXCLUDED_DIRS, should_exclude_entry, should_exclude_path};
pub use graph::DependencyGraph;
pub use graph_store::{GraphStore, IndexSnapshot, RebuildOutcome};
pub use indexer::Indexer;
pub use locator::SourceLocator;
pub use pipeline::{
    BuildOutput, BuildReport, BuildState, CancelToken, FileFailure, Pipeline, Stage, StageContext,
};
pub use progress::PercentProgress;
pub use resolver::{CrossFileResolver, ResolutionStats};
pub use schema::EmbeddingRecord;
pub use store::{IndexStats, IndexStore};
pub use watcher::{FileEvent, FileWatcher};
