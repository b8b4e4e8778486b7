use std::path::PathBuf;
use thiserror::Error;

/// Why a single file produced no elements.
///
/// All variants are recoverable: the pipeline records them and keeps going
/// with the rest of the file set.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("{path:?} is too large ({size_kb}KB > {limit_kb}KB limit)")]
    TooLarge {
        path: PathBuf,
        size_kb: u64,
        limit_kb: u64,
    },

    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("syntax error in {path:?} near line {line}")]
    Syntax { path: PathBuf, line: usize },

    #[error("grammar error: {0}")]
    Grammar(String),
}

impl ExtractError {
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            ExtractError::TooLarge { path, .. }
            | ExtractError::Io { path, .. }
            | ExtractError::Syntax { path, .. } => Some(path),
            ExtractError::Grammar(_) => None,
        }
    }
}
