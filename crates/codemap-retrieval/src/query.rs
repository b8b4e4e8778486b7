//! Incoming query requests and the retrieval mode each one selects.

use crate::error::RetrievalError;
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

fn default_max_results() -> usize {
    5
}

/// A code query as sent by a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeQueryRequest {
    #[serde(default)]
    pub query: String,
    /// Package prefix or fully-qualified name to focus on.
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default = "default_true")]
    pub include_source: bool,
    #[serde(default = "default_true")]
    pub use_semantic_search: bool,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Default for CodeQueryRequest {
    fn default() -> Self {
        Self {
            query: String::new(),
            context: None,
            include_source: true,
            use_semantic_search: true,
            max_results: default_max_results(),
        }
    }
}

impl CodeQueryRequest {
    pub fn semantic(query: &str) -> Self {
        Self {
            query: query.to_string(),
            ..Default::default()
        }
    }

    pub fn structural(context: Option<&str>) -> Self {
        Self {
            context: context.map(str::to_string),
            use_semantic_search: false,
            ..Default::default()
        }
    }

    pub fn with_context(mut self, context: &str) -> Self {
        self.context = Some(context.to_string());
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_source(mut self, include_source: bool) -> Self {
        self.include_source = include_source;
        self
    }
}

/// How a request is answered. Every request maps to exactly one mode.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryMode {
    /// Rank stored embeddings against the query text.
    Semantic {
        query: String,
        package_filter: Option<String>,
        limit: usize,
        include_source: bool,
    },
    /// Summarize the graph, or the part of it matching `context`.
    Structural {
        context: Option<String>,
        include_source: bool,
    },
}

impl QueryMode {
    pub fn name(&self) -> &'static str {
        match self {
            QueryMode::Semantic { .. } => "semantic",
            QueryMode::Structural { .. } => "structural",
        }
    }
}

impl TryFrom<CodeQueryRequest> for QueryMode {
    type Error = RetrievalError;

    fn try_from(request: CodeQueryRequest) -> Result<Self, Self::Error> {
        let context = request
            .context
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        if !request.use_semantic_search {
            return Ok(QueryMode::Structural {
                context,
                include_source: request.include_source,
            });
        }

        let query = request.query.trim();
        if query.is_empty() {
            return Err(RetrievalError::InvalidRequest(
                "semantic search needs a non-empty query".to_string(),
            ));
        }
        if request.max_results == 0 {
            return Err(RetrievalError::InvalidRequest(
                "maxResults must be at least 1".to_string(),
            ));
        }

        Ok(QueryMode::Semantic {
            query: query.to_string(),
            package_filter: context,
            limit: request.max_results,
            include_source: request.include_source,
        })
    }
}
