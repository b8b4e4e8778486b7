//! Embedding provider backed by an Ollama server's `/api/embeddings` endpoint.

use crate::model::{EmbeddingConfig, EmbeddingModel};
use anyhow::{Context, Result, anyhow, bail};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

pub struct OllamaEmbeddingModel {
    client: Client,
    endpoint: String,
    model: String,
    /// Last observed vector length; the configured value until the first reply.
    dimension: AtomicUsize,
}

impl OllamaEmbeddingModel {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: format!("{}/api/embeddings", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            dimension: AtomicUsize::new(config.dimension),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl EmbeddingModel for OllamaEmbeddingModel {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&EmbeddingRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .with_context(|| format!("Embedding request to {} failed", self.endpoint))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            bail!("Embedding provider returned {}: {}", status, body.trim());
        }

        let parsed: EmbeddingResponse = response
            .json()
            .context("Malformed embedding response")?;
        if parsed.embedding.is_empty() {
            return Err(anyhow!("Embedding provider returned an empty vector"));
        }

        let previous = self.dimension.swap(parsed.embedding.len(), Ordering::Relaxed);
        if previous != parsed.embedding.len() {
            debug!(
                previous,
                current = parsed.embedding.len(),
                "Embedding dimension updated"
            );
        }

        Ok(parsed.embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension.load(Ordering::Relaxed)
    }

    fn name(&self) -> String {
        format!("ollama:{}", self.model)
    }
}
