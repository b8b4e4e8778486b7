//! Answer a code query

use anyhow::Result;
use codemap_retrieval::CodeQueryRequest;
use std::path::PathBuf;

use super::common::{EmbeddingArgs, existing_db_path, open_engine, run_blocking};

pub fn query_request(
    query: Option<String>,
    context: Option<String>,
    structural: bool,
    no_source: bool,
    max_results: usize,
) -> CodeQueryRequest {
    CodeQueryRequest {
        query: query.unwrap_or_default(),
        context,
        include_source: !no_source,
        use_semantic_search: !structural,
        max_results,
    }
}

pub async fn query(
    request: CodeQueryRequest,
    project: Option<PathBuf>,
    database: Option<PathBuf>,
    embedding: EmbeddingArgs,
) -> Result<()> {
    let db_path = existing_db_path(project, database)?;

    let result = run_blocking(move || {
        let engine = open_engine(&db_path, &embedding)?;
        Ok(engine.query(request)?)
    })
    .await?;

    println!("{}", result.formatted_graph);
    if let Some(source) = result.source_code_context {
        println!();
        print!("{}", source);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_request_from_flags() {
        let request = query_request(None, Some("com.shop".to_string()), true, true, 5);
        assert!(!request.use_semantic_search);
        assert!(!request.include_source);
        assert_eq!(request.query, "");

        let request = query_request(Some("totals".to_string()), None, false, false, 3);
        assert!(request.use_semantic_search);
        assert!(request.include_source);
        assert_eq!(request.max_results, 3);
    }
}
