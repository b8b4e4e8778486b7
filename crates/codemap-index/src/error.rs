use std::path::PathBuf;
use thiserror::Error;

/// Failures that abort a build. Per-file and per-element problems are
/// recorded in the build report instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("project root {0} does not exist")]
    RootNotFound(PathBuf),

    #[error("project root {0} is not a directory")]
    NotADirectory(PathBuf),

    #[error("project root {path} is not readable")]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("build cancelled during {stage}")]
    Cancelled { stage: &'static str },

    #[error("Java grammar unavailable")]
    Grammar(#[source] codemap_parser::ExtractError),

    #[error("snapshot lock poisoned")]
    LockPoisoned,

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl PipelineError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineError::Cancelled { .. })
    }
}
