//! Similarity search for RetrievalEngine.

use super::RetrievalEngine;
use crate::error::RetrievalError;
use crate::results::ScoredRecord;
use codemap_embeddings::cosine_similarity;
use codemap_index::{EmbeddingRecord, IndexSnapshot};
use codemap_parser::ElementKind;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Maximum limit for search results to prevent excessive memory usage.
const MAX_SEARCH_LIMIT: usize = 1000;

impl RetrievalEngine {
    /// Rank every stored embedding against `query` and return the best
    /// `limit`. With a package filter only records whose package starts with
    /// it are considered.
    pub fn semantic_search(
        &self,
        query: &str,
        limit: usize,
        package_filter: Option<&str>,
    ) -> Result<Vec<ScoredRecord>, RetrievalError> {
        let snapshot = self.current_snapshot()?;
        self.search_snapshot(&snapshot, query, limit, package_filter)
    }

    pub(crate) fn search_snapshot(
        &self,
        snapshot: &IndexSnapshot,
        query: &str,
        limit: usize,
        package_filter: Option<&str>,
    ) -> Result<Vec<ScoredRecord>, RetrievalError> {
        if query.trim().is_empty() {
            return Err(RetrievalError::InvalidRequest(
                "query must not be empty".to_string(),
            ));
        }

        let start = Instant::now();
        let limit = cap_limit(limit);
        let query_vector = self.model.embed(query).map_err(RetrievalError::Embedding)?;

        let candidates = snapshot.embeddings.iter().filter(|r| {
            package_filter.is_none_or(|prefix| r.package_name.starts_with(prefix))
        });
        let hits = rank(&query_vector, candidates, limit)?;

        info!(
            query = %query,
            package = package_filter.unwrap_or(""),
            results = hits.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Semantic search"
        );
        Ok(hits)
    }

    /// Nearest neighbors of the record stored for `node_key`, excluding that
    /// record itself.
    pub fn find_similar(
        &self,
        node_key: &str,
        limit: usize,
    ) -> Result<Vec<ScoredRecord>, RetrievalError> {
        let snapshot = self.current_snapshot()?;
        let target = snapshot
            .embedding_for(node_key)
            .ok_or_else(|| RetrievalError::NotFound(node_key.to_string()))?;

        let candidates = snapshot
            .embeddings
            .iter()
            .filter(|r| !std::ptr::eq(*r, target));
        let hits = rank(&target.embedding, candidates, cap_limit(limit))?;

        debug!(node_key, results = hits.len(), "Similar elements");
        Ok(hits)
    }

    /// Stored records of one element kind, in index order.
    pub fn find_by_kind(
        &self,
        kind: &str,
        package_filter: Option<&str>,
    ) -> Result<Vec<EmbeddingRecord>, RetrievalError> {
        let kind = ElementKind::parse(kind)
            .ok_or_else(|| RetrievalError::InvalidRequest(format!("unknown element kind: {}", kind)))?;

        let snapshot = self.current_snapshot()?;
        Ok(snapshot
            .embeddings
            .iter()
            .filter(|r| r.kind == kind.as_str())
            .filter(|r| package_filter.is_none_or(|prefix| r.package_name.starts_with(prefix)))
            .cloned()
            .collect())
    }

    pub fn get_embedding(&self, node_key: &str) -> Result<EmbeddingRecord, RetrievalError> {
        let snapshot = self.current_snapshot()?;
        snapshot
            .embedding_for(node_key)
            .cloned()
            .ok_or_else(|| RetrievalError::NotFound(node_key.to_string()))
    }
}

fn cap_limit(limit: usize) -> usize {
    if limit > MAX_SEARCH_LIMIT {
        warn!(
            requested = limit,
            max = MAX_SEARCH_LIMIT,
            "Requested limit exceeds maximum, capping to {}",
            MAX_SEARCH_LIMIT
        );
        return MAX_SEARCH_LIMIT;
    }
    limit
}

/// Score `candidates` against `query`, best first, keeping at most `limit`.
///
/// Equal similarities are ordered by node key so the ranking is the same on
/// every run. A stored vector whose length differs from the query's fails
/// the whole ranking.
pub(crate) fn rank<'a, I>(
    query: &[f32],
    candidates: I,
    limit: usize,
) -> Result<Vec<ScoredRecord>, RetrievalError>
where
    I: IntoIterator<Item = &'a EmbeddingRecord>,
{
    let mut scored: Vec<(f32, &EmbeddingRecord)> = Vec::new();
    for record in candidates {
        let similarity = cosine_similarity(query, &record.embedding)?;
        scored.push((similarity, record));
    }

    scored.sort_by(|a, b| {
        b.0.total_cmp(&a.0)
            .then_with(|| a.1.node_key.cmp(&b.1.node_key))
    });
    scored.truncate(limit);

    Ok(scored
        .into_iter()
        .map(|(similarity, record)| ScoredRecord {
            record: record.clone(),
            similarity,
        })
        .collect())
}
