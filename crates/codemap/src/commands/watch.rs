//! Keep the index current while sources change

use anyhow::{Context, Result};
use codemap_index::{AutoIndexer, GraphStore, IndexStore, Indexer, Pipeline};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use super::common::{EmbeddingArgs, PipelineArgs, resolve_db_path, resolve_project_root, run_blocking};

/// How often pending file events are collected into one rebuild.
const POLL_INTERVAL: Duration = Duration::from_secs(2);

pub async fn watch(
    path: &Path,
    database: Option<PathBuf>,
    embedding: EmbeddingArgs,
    pipeline: PipelineArgs,
) -> Result<()> {
    let project_root = resolve_project_root(path)?;
    let db_path = resolve_db_path(database, &project_root);

    info!("Watching project: {:?}", project_root);
    info!("Database: {:?}", db_path);

    let auto = run_blocking(move || {
        let store = Arc::new(IndexStore::open(&db_path)?);
        // Serve the previous build until the first rebuild publishes.
        let graph_store = match store.load_snapshot()? {
            Some(snapshot) => GraphStore::with_snapshot(snapshot),
            None => GraphStore::new(),
        };

        let pipeline = Pipeline::new(pipeline.to_config()?, embedding.create_model()?);
        let indexer = Indexer::new(project_root, pipeline, Arc::new(graph_store))
            .with_persistence(store);
        Ok(Arc::new(AutoIndexer::new(Arc::new(indexer))?))
    })
    .await?;

    let initial = Arc::clone(&auto);
    match run_blocking(move || Ok(initial.initial_index()?)).await {
        Ok(outcome) => info!(
            nodes = outcome.snapshot.graph.node_count(),
            embeddings = outcome.snapshot.embeddings.len(),
            "Initial index complete"
        ),
        Err(e) => error!("Initial indexing failed: {:#}", e),
    }

    let mut interval = tokio::time::interval(POLL_INTERVAL);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                let auto = Arc::clone(&auto);
                match run_blocking(move || auto.process_events()).await {
                    Ok(result) if result.failed => {
                        warn!(changed = result.changed(), "Rebuild failed, keeping previous index");
                    }
                    Ok(result) if result.changed() > 0 => {
                        info!(
                            created = result.created,
                            modified = result.modified,
                            deleted = result.deleted,
                            generation = result.generation,
                            "Index updated"
                        );
                    }
                    Ok(_) => {}
                    Err(e) => error!("Auto-indexer error: {:#}", e),
                }
            }
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl-C")?;
                info!("Stopping watcher");
                auto.cancel_token().cancel();
                break;
            }
        }
    }

    // The embedding provider's HTTP client must be dropped off the runtime.
    run_blocking(move || {
        drop(auto);
        Ok(())
    })
    .await
}
