//! Semantic search and nearest neighbors

use anyhow::Result;
use codemap_retrieval::ScoredRecord;
use std::path::PathBuf;

use super::common::{EmbeddingArgs, existing_db_path, open_engine, run_blocking};

pub async fn search(
    query: String,
    project: Option<PathBuf>,
    database: Option<PathBuf>,
    embedding: EmbeddingArgs,
    limit: usize,
    package: Option<String>,
) -> Result<()> {
    let db_path = existing_db_path(project, database)?;

    let hits = {
        let query = query.clone();
        run_blocking(move || {
            let engine = open_engine(&db_path, &embedding)?;
            Ok(engine.semantic_search(&query, limit, package.as_deref())?)
        })
        .await?
    };

    println!("Search results for '{}'", query);
    print_hits(&hits);
    Ok(())
}

pub async fn similar(
    key: String,
    project: Option<PathBuf>,
    database: Option<PathBuf>,
    embedding: EmbeddingArgs,
    limit: usize,
) -> Result<()> {
    let db_path = existing_db_path(project, database)?;

    let hits = {
        let key = key.clone();
        run_blocking(move || {
            let engine = open_engine(&db_path, &embedding)?;
            Ok(engine.find_similar(&key, limit)?)
        })
        .await?
    };

    println!("Elements similar to {}", key);
    print_hits(&hits);
    Ok(())
}

fn print_hits(hits: &[ScoredRecord]) {
    println!("Found {} results\n", hits.len());

    for (i, hit) in hits.iter().enumerate() {
        let record = &hit.record;
        println!(
            "{}. {} {} (similarity: {:.3})",
            i + 1,
            record.kind,
            record.node_key,
            hit.similarity
        );
        println!("   File: {}", record.file_path);
        println!("   {}", record.description);
        println!();
    }
}
