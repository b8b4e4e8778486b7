//! Common utilities and constants for CLI commands

use anyhow::{Context, Result, anyhow, bail};
use clap::Args;
use codemap_embeddings::{EmbeddingConfig, EmbeddingModel, EmbeddingProvider, create_embedding_model};
use codemap_index::{GraphStore, IndexStore, PipelineConfig};
use codemap_retrieval::RetrievalEngine;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Default database filename
pub const DEFAULT_DB_NAME: &str = ".codemap.db";

/// Embedding provider flags, layered over `CODEMAP_*` environment variables.
#[derive(Args, Debug, Clone, Default)]
pub struct EmbeddingArgs {
    /// Embedding provider: ollama or hashing
    #[arg(long, global = true)]
    pub provider: Option<String>,

    /// Ollama server URL
    #[arg(long, global = true)]
    pub ollama_url: Option<String>,

    /// Embedding model name
    #[arg(long, global = true)]
    pub embedding_model: Option<String>,
}

impl EmbeddingArgs {
    pub fn to_config(&self) -> Result<EmbeddingConfig> {
        let mut config = EmbeddingConfig::from_env();
        if let Some(provider) = &self.provider {
            config.provider = EmbeddingProvider::parse(provider)
                .ok_or_else(|| anyhow!("Unknown embedding provider: {}", provider))?;
        }
        if let Some(url) = &self.ollama_url {
            config.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(model) = &self.embedding_model {
            config.model = model.clone();
        }
        Ok(config)
    }

    /// Must run off the async runtime: the HTTP provider is blocking.
    pub fn create_model(&self) -> Result<Arc<dyn EmbeddingModel>> {
        let model = create_embedding_model(Some(self.to_config()?))?;
        info!(model = %model.name(), dim = model.dimension(), "Embedding model ready");
        Ok(Arc::from(model))
    }
}

/// Pipeline limits, layered over `CODEMAP_*` environment variables.
#[derive(Args, Debug, Clone, Default)]
pub struct PipelineArgs {
    /// Files parsed per progress batch
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Stop extracting once this many nodes exist
    #[arg(long)]
    pub max_nodes: Option<usize>,

    /// Upper bound on stored embeddings
    #[arg(long)]
    pub max_embeddings: Option<usize>,

    /// Skip source files larger than this many KB
    #[arg(long)]
    pub max_file_kb: Option<u64>,
}

impl PipelineArgs {
    pub fn to_config(&self) -> Result<PipelineConfig> {
        let mut config = PipelineConfig::from_env();
        if let Some(n) = self.batch_size {
            config.batch_size = positive(n, "--batch-size")?;
        }
        if let Some(n) = self.max_nodes {
            config.max_nodes = positive(n, "--max-nodes")?;
        }
        if let Some(n) = self.max_embeddings {
            config.max_embeddings = positive(n, "--max-embeddings")?;
        }
        if let Some(kb) = self.max_file_kb {
            if kb == 0 {
                bail!("--max-file-kb must be at least 1");
            }
            config.max_file_size_kb = kb;
        }
        Ok(config)
    }
}

fn positive(value: usize, flag: &str) -> Result<usize> {
    if value == 0 {
        bail!("{} must be at least 1", flag);
    }
    Ok(value)
}

/// Resolves a path to an absolute project root path.
/// If the path is relative, it's joined with the current directory.
pub fn resolve_project_root(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// Returns the database path, using the provided path or defaulting to
/// `DEFAULT_DB_NAME` in the project root.
pub fn resolve_db_path(database: Option<PathBuf>, project_root: &Path) -> PathBuf {
    database.unwrap_or_else(|| project_root.join(DEFAULT_DB_NAME))
}

/// Database path for commands that read an existing index.
pub fn existing_db_path(project: Option<PathBuf>, database: Option<PathBuf>) -> Result<PathBuf> {
    let project_root = match project {
        Some(path) => resolve_project_root(&path)?,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    let db_path = resolve_db_path(database, &project_root);

    if !db_path.exists() {
        bail!(
            "Database not found: {:?}. Run 'codemap index' first.",
            db_path
        );
    }
    Ok(db_path)
}

/// Retrieval engine over the last build saved in `db_path`.
pub fn open_engine(db_path: &Path, embedding: &EmbeddingArgs) -> Result<RetrievalEngine> {
    let store = IndexStore::open(db_path)?;
    let snapshot = store.load_snapshot()?.ok_or_else(|| {
        anyhow!(
            "No usable index in {:?}; it is missing or was built by another version. Run 'codemap index'.",
            db_path
        )
    })?;
    debug!(
        nodes = snapshot.graph.node_count(),
        embeddings = snapshot.embeddings.len(),
        "Loaded index snapshot"
    );

    let model = embedding.create_model()?;
    Ok(RetrievalEngine::new(
        Arc::new(GraphStore::with_snapshot(snapshot)),
        model,
    ))
}

/// Run blocking work on the blocking pool and flatten its result.
pub async fn run_blocking<F, T>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .context("Blocking task panicked")?
}
