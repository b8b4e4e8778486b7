//! Show the call tree of a method

use anyhow::Result;
use std::path::PathBuf;

use super::common::{EmbeddingArgs, existing_db_path, open_engine, run_blocking};

pub async fn explain(
    key: String,
    depth: usize,
    json: bool,
    project: Option<PathBuf>,
    database: Option<PathBuf>,
    embedding: EmbeddingArgs,
) -> Result<()> {
    let db_path = existing_db_path(project, database)?;

    let tree = run_blocking(move || {
        let engine = open_engine(&db_path, &embedding)?;
        Ok(engine.explain(&key, depth)?)
    })
    .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&tree)?);
    } else {
        print!("{}", tree.render());
        println!();
        println!("{} methods, {} levels", tree.size(), tree.depth());
    }
    Ok(())
}
