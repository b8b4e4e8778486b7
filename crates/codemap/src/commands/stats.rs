//! Show index statistics

use anyhow::Result;
use codemap_index::IndexStore;
use std::path::PathBuf;

use super::common::existing_db_path;

pub async fn stats(project: Option<PathBuf>, database: Option<PathBuf>) -> Result<()> {
    let db_path = existing_db_path(project, database)?;

    let store = IndexStore::open(&db_path)?;
    let stats = store.get_stats()?;

    println!("codemap Index Statistics");
    println!("========================");
    println!("Database: {:?}", db_path);
    println!();
    println!("Index:");
    println!("  Nodes: {}", stats.node_count);
    println!("  Edges: {}", stats.edge_count);
    println!("  Embeddings: {}", stats.embedding_count);
    match stats.built_at {
        Some(built_at) => println!("  Built at: {} (unix seconds)", built_at),
        None => println!("  Built at: never"),
    }
    if store.needs_full_rebuild()? {
        println!("  Parser changed since this build; run 'codemap index' again.");
    }

    if let Some(report) = store.last_report()? {
        println!();
        println!("Last build:");
        println!("  Root: {}", report.root);
        println!(
            "  Files: {} parsed, {} failed",
            report.files_parsed, report.files_failed
        );
        println!("  Resolved edges: {}", report.resolution.resolved());
        println!("  Unresolved edges: {}", report.resolution.unresolved);
        for stage in &report.stages {
            println!("  {}: {} ms", stage.name, stage.millis);
        }
    }

    Ok(())
}
