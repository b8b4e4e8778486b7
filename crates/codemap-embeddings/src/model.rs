use crate::EMBEDDING_DIM;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Remote Ollama server
    Ollama,
    /// Local feature-hashing model, no network
    Hashing,
}

impl EmbeddingProvider {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "ollama" => Some(EmbeddingProvider::Ollama),
            "hashing" | "local" => Some(EmbeddingProvider::Hashing),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    pub base_url: String,
    pub model: String,
    pub dimension: usize,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Ollama,
            base_url: "http://localhost:11434".to_string(),
            model: "nomic-embed-text".to_string(),
            dimension: EMBEDDING_DIM,
            timeout_secs: 30,
        }
    }
}

impl EmbeddingConfig {
    /// Defaults overlaid with `CODEMAP_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("CODEMAP_EMBEDDING_PROVIDER") {
            match EmbeddingProvider::parse(&value) {
                Some(provider) => config.provider = provider,
                None => warn!(value = %value, "Unknown embedding provider, keeping default"),
            }
        }
        if let Some(url) = lookup("CODEMAP_OLLAMA_URL") {
            config.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(model) = lookup("CODEMAP_EMBEDDING_MODEL") {
            config.model = model;
        }
        if let Some(value) = lookup("CODEMAP_EMBEDDING_DIM") {
            match value.parse::<usize>() {
                Ok(dim) if dim > 0 => config.dimension = dim,
                _ => warn!(value = %value, "Invalid CODEMAP_EMBEDDING_DIM, keeping default"),
            }
        }

        config
    }
}

/// Trait for embedding models
pub trait EmbeddingModel: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|text| self.embed(text)).collect()
    }

    fn dimension(&self) -> usize;

    /// Provider and model, for logs.
    fn name(&self) -> String;
}

/// Deterministic bag-of-words model using signed feature hashing.
///
/// Identifiers are split on case changes as well as punctuation, so
/// `OrderService` and `order service` land on the same buckets. Vectors are
/// L2-normalized; text with no tokens embeds to the zero vector.
pub struct HashingEmbeddingModel {
    dimension: usize,
}

impl HashingEmbeddingModel {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }
}

impl Default for HashingEmbeddingModel {
    fn default() -> Self {
        Self::new(EMBEDDING_DIM)
    }
}

/// Stored vectors are compared with later query vectors, so the token hash
/// must not change between builds of the binary.
fn token_hash(token: &str) -> u64 {
    let digest = blake3::hash(token.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_le_bytes(bytes)
}

impl EmbeddingModel for HashingEmbeddingModel {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimension];

        for token in tokenize(text) {
            let hash = token_hash(&token);

            let bucket = (hash % self.dimension as u64) as usize;
            let sign = if (hash >> 63) & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }

        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> String {
        format!("hashing:{}", self.dimension)
    }
}

fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for ch in text.chars() {
        if ch.is_alphanumeric() {
            if ch.is_uppercase() && prev_lower && !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
            current.extend(ch.to_lowercase());
        } else {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            prev_lower = false;
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

/// Create an embedding model for the configured provider
pub fn create_embedding_model(config: Option<EmbeddingConfig>) -> Result<Box<dyn EmbeddingModel>> {
    let config = config.unwrap_or_default();

    match config.provider {
        #[cfg(feature = "ollama")]
        EmbeddingProvider::Ollama => {
            let model = crate::ollama::OllamaEmbeddingModel::new(&config)?;
            info!(model = %model.name(), "Using Ollama embedding model");
            Ok(Box::new(model))
        }
        #[cfg(not(feature = "ollama"))]
        EmbeddingProvider::Ollama => {
            warn!("Built without the ollama feature, falling back to the hashing model");
            Ok(Box::new(HashingEmbeddingModel::new(config.dimension)))
        }
        EmbeddingProvider::Hashing => {
            info!(dimension = config.dimension, "Using local hashing embedding model");
            Ok(Box::new(HashingEmbeddingModel::new(config.dimension)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::cosine_similarity;
    use std::collections::HashMap;

    #[test]
    fn test_hashing_model_dimension_and_norm() {
        let model = HashingEmbeddingModel::default();
        let embedding = model.embed("public class OrderService").unwrap();
        assert_eq!(embedding.len(), EMBEDDING_DIM);

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_hashing_model_is_deterministic() {
        let model = HashingEmbeddingModel::new(64);
        let a = model.embed("Type: method\nName: placeOrder").unwrap();
        let b = model.embed("Type: method\nName: placeOrder").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_hashing_model_relates_camel_case_to_words() {
        let model = HashingEmbeddingModel::default();
        let code = model.embed("OrderService").unwrap();
        let words = model.embed("order service").unwrap();
        let other = model.embed("payment gateway").unwrap();

        let related = cosine_similarity(&code, &words).unwrap();
        let unrelated = cosine_similarity(&code, &other).unwrap();
        assert!((related - 1.0).abs() < 1e-5);
        assert!(related > unrelated);
    }

    #[test]
    fn test_token_hash_is_blake3_prefix() {
        // BLAKE3("") = af1349b9f5f9a1a6...
        assert_eq!(token_hash(""), 0xa6a1_f9f5_b949_13af);

        let model = HashingEmbeddingModel::new(16);
        let hash = token_hash("cart");
        let mut expected = vec![0.0f32; 16];
        expected[(hash % 16) as usize] = if hash >> 63 == 0 { 1.0 } else { -1.0 };
        assert_eq!(model.embed("Cart").unwrap(), expected);
    }

    #[test]
    fn test_empty_text_embeds_to_zero_vector() {
        let model = HashingEmbeddingModel::new(8);
        assert_eq!(model.embed("  ... ").unwrap(), vec![0.0; 8]);
    }

    #[test]
    fn test_tokenize_splits_identifiers() {
        assert_eq!(
            tokenize("getHTTPClient v2Value snake_case"),
            vec!["get", "httpclient", "v2", "value", "snake", "case"]
        );
    }

    #[test]
    fn test_config_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("CODEMAP_EMBEDDING_PROVIDER", "hashing"),
            ("CODEMAP_OLLAMA_URL", "http://gpu-box:11434/"),
            ("CODEMAP_EMBEDDING_DIM", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let config = EmbeddingConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.provider, EmbeddingProvider::Hashing);
        assert_eq!(config.base_url, "http://gpu-box:11434");
        assert_eq!(config.model, "nomic-embed-text");
        assert_eq!(config.dimension, EMBEDDING_DIM);
    }

    #[test]
    fn test_create_hashing_model() {
        let config = EmbeddingConfig {
            provider: EmbeddingProvider::Hashing,
            dimension: 32,
            ..Default::default()
        };
        let model = create_embedding_model(Some(config)).unwrap();
        assert_eq!(model.dimension(), 32);
        assert_eq!(model.name(), "hashing:32");
    }
}
