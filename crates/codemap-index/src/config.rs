use serde::{Deserialize, Serialize};
use tracing::warn;

/// Tuning knobs for one build. All limits apply per build, not per file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Files parsed between cancellation checks and progress reports
    pub batch_size: usize,
    /// Node count at which extraction stops taking new files
    pub max_nodes: usize,
    /// Percentage step between progress log lines
    pub progress_interval: usize,
    /// Files larger than this are skipped and reported
    pub max_file_size_kb: u64,
    pub embedding_batch_size: usize,
    /// Upper bound on successfully embedded elements
    pub max_embeddings: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            max_nodes: 10_000,
            progress_interval: 5,
            max_file_size_kb: 1000,
            embedding_batch_size: 50,
            max_embeddings: 5000,
        }
    }
}

impl PipelineConfig {
    /// Defaults overlaid with `CODEMAP_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        let read = |key: &str, current: usize| -> usize {
            match lookup(key) {
                None => current,
                Some(value) => match value.trim().parse::<usize>() {
                    Ok(parsed) if parsed > 0 => parsed,
                    _ => {
                        warn!(key, value = %value, "Invalid pipeline setting, keeping default");
                        current
                    }
                },
            }
        };

        config.batch_size = read("CODEMAP_BATCH_SIZE", config.batch_size);
        config.max_nodes = read("CODEMAP_MAX_NODES", config.max_nodes);
        config.progress_interval = read("CODEMAP_PROGRESS_INTERVAL", config.progress_interval);
        config.max_file_size_kb =
            read("CODEMAP_MAX_FILE_KB", config.max_file_size_kb as usize) as u64;
        config.embedding_batch_size =
            read("CODEMAP_EMBED_BATCH_SIZE", config.embedding_batch_size);
        config.max_embeddings = read("CODEMAP_MAX_EMBEDDINGS", config.max_embeddings);

        config
    }
}
