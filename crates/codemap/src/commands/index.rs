//! Index a project directory

use anyhow::{Context, Result};
use codemap_index::{BuildReport, CancelToken, GraphStore, IndexStore, Indexer, Pipeline};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use super::common::{EmbeddingArgs, PipelineArgs, resolve_db_path, resolve_project_root, run_blocking};

pub async fn index(
    path: &Path,
    database: Option<PathBuf>,
    embedding: EmbeddingArgs,
    pipeline: PipelineArgs,
    json: bool,
) -> Result<()> {
    let project_root = resolve_project_root(path)?;
    let db_path = resolve_db_path(database, &project_root);

    info!("Indexing project: {:?}", project_root);
    info!("Database: {:?}", db_path);

    let cancel = CancelToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling build");
            on_signal.cancel();
        }
    });

    let report = run_blocking(move || {
        build(project_root, &db_path, &embedding, &pipeline, &cancel)
    })
    .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn build(
    project_root: PathBuf,
    db_path: &Path,
    embedding: &EmbeddingArgs,
    pipeline: &PipelineArgs,
    cancel: &CancelToken,
) -> Result<BuildReport> {
    let store = Arc::new(IndexStore::open(db_path)?);
    if store.needs_full_rebuild()? {
        info!("Stored index is missing or from another parser version");
    }

    let pipeline = Pipeline::new(pipeline.to_config()?, embedding.create_model()?);
    let indexer = Indexer::new(project_root, pipeline, Arc::new(GraphStore::new()))
        .with_persistence(store);

    let outcome = indexer.rebuild(cancel)?;
    outcome
        .snapshot
        .report
        .clone()
        .context("Published build carries no report")
}

fn print_report(report: &BuildReport) {
    println!("Indexed {}", report.root);
    println!(
        "  Files: {} parsed, {} failed, {} discovered",
        report.files_parsed, report.files_failed, report.files_discovered
    );
    println!(
        "  Graph: {} nodes, {} edges ({} key collisions)",
        report.nodes, report.edges, report.key_collisions
    );

    let resolution = &report.resolution;
    println!(
        "  Resolved: {} imports, {} inheritance, {} creates, {} calls, {} uses ({} unresolved)",
        resolution.imports,
        resolution.inheritance,
        resolution.creates,
        resolution.calls,
        resolution.uses,
        resolution.unresolved
    );

    let embeddings = &report.embeddings;
    println!(
        "  Embeddings: {} created, {} failed, {} skipped{}",
        embeddings.created,
        embeddings.failed,
        embeddings.skipped,
        if embeddings.capped { " (cap reached)" } else { "" }
    );
    if report.stopped_early {
        println!("  Stopped early: node limit reached");
    }
    println!("  Time: {} ms", report.duration_ms);

    if !report.failures.is_empty() {
        println!();
        println!("Files that could not be parsed:");
        for failure in &report.failures {
            println!("  {}: {}", failure.path, failure.reason);
        }
    }
}
