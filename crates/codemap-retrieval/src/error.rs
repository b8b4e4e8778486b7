use codemap_embeddings::VectorError;
use codemap_index::PipelineError;
use thiserror::Error;

/// Failures surfaced to callers of the retrieval engine.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("No element found for key: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("No index has been built yet")]
    NotIndexed,

    #[error(transparent)]
    Vector(#[from] VectorError),

    #[error("Embedding request failed: {0:#}")]
    Embedding(anyhow::Error),

    #[error(transparent)]
    Index(#[from] PipelineError),
}

impl RetrievalError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RetrievalError::NotFound(_))
    }
}
