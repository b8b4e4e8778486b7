pub mod model;
#[cfg(feature = "ollama")]
pub mod ollama;
pub mod vector;

pub use model::{
    EmbeddingConfig, EmbeddingModel, EmbeddingProvider, HashingEmbeddingModel,
    create_embedding_model,
};
#[cfg(feature = "ollama")]
pub use ollama::OllamaEmbeddingModel;
pub use vector::{
    VectorError, average, bytes_to_vector, cosine_similarity, euclidean_distance, normalize,
    vector_to_bytes, vectors_equal,
};

/// Dimension of the local hashing model's vectors
pub const EMBEDDING_DIM: usize = 384;
