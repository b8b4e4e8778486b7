//! Graph snapshot persistence for IndexStore.

use super::IndexStore;
use crate::graph::DependencyGraph;
use crate::graph_store::IndexSnapshot;
use crate::pipeline::{BuildOutput, BuildReport};
use anyhow::{Context, Result};
use codemap_parser::PARSER_VERSION;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info, warn};

impl IndexStore {
    /// Persist a finished build: records, graph and report together, or
    /// nothing at all.
    pub fn save_build(&self, output: &BuildOutput) -> Result<()> {
        let graph_json =
            serde_json::to_string(&output.graph).context("Failed to serialize graph")?;
        let report_json =
            serde_json::to_string(&output.report).context("Failed to serialize build report")?;

        self.in_transaction(|conn| {
            conn.execute("DELETE FROM embeddings", [])?;
            for record in &output.embeddings {
                Self::insert_embedding_impl(conn, record)?;
            }
            Self::save_graph_impl(conn, &output.graph, &graph_json, output.report.built_at)?;
            conn.execute(
                "INSERT OR REPLACE INTO metadata (key, value) VALUES ('last_build', ?1)",
                [&report_json],
            )?;
            Self::set_parser_version_impl(conn)?;
            Ok(())
        })?;

        info!(
            db = %self.db_path().display(),
            nodes = output.graph.node_count(),
            embeddings = output.embeddings.len(),
            "Saved build"
        );
        Ok(())
    }

    pub fn save_graph(&self, graph: &DependencyGraph, built_at: i64) -> Result<()> {
        let json = serde_json::to_string(graph).context("Failed to serialize graph")?;
        self.in_transaction(|conn| {
            Self::save_graph_impl(conn, graph, &json, built_at)?;
            Self::set_parser_version_impl(conn)
        })
    }

    fn save_graph_impl(
        conn: &Connection,
        graph: &DependencyGraph,
        json: &str,
        built_at: i64,
    ) -> Result<()> {
        conn.execute(
            "INSERT OR REPLACE INTO graph_snapshot
                 (id, parser_version, node_count, edge_count, data, built_at)
             VALUES (1, ?1, ?2, ?3, ?4, ?5)",
            params![
                PARSER_VERSION,
                graph.node_count() as i64,
                graph.edge_count() as i64,
                json,
                built_at,
            ],
        )?;
        debug!(nodes = graph.node_count(), edges = graph.edge_count(), "Stored graph snapshot");
        Ok(())
    }

    /// The stored graph, or None when there is none or it was written by a
    /// different parser version.
    pub fn load_graph(&self) -> Result<Option<DependencyGraph>> {
        let row: Option<(u32, String)> = self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT parser_version, data FROM graph_snapshot WHERE id = 1",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?)
        })?;

        let Some((version, json)) = row else {
            return Ok(None);
        };
        if version != PARSER_VERSION {
            warn!(
                stored = version,
                current = PARSER_VERSION,
                "Stored graph is from another parser version, ignoring it"
            );
            return Ok(None);
        }

        let graph = serde_json::from_str(&json).context("Stored graph is corrupted")?;
        Ok(Some(graph))
    }

    pub fn last_report(&self) -> Result<Option<BuildReport>> {
        let json: Option<String> = self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT value FROM metadata WHERE key = 'last_build'",
                    [],
                    |row| row.get(0),
                )
                .optional()?)
        })?;

        match json {
            Some(json) => match serde_json::from_str(&json) {
                Ok(report) => Ok(Some(report)),
                Err(e) => {
                    warn!(error = %e, "Unreadable build report in metadata");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    /// Everything needed to answer queries without rebuilding.
    pub fn load_snapshot(&self) -> Result<Option<IndexSnapshot>> {
        let Some(graph) = self.load_graph()? else {
            return Ok(None);
        };
        Ok(Some(IndexSnapshot {
            graph,
            embeddings: self.list_all()?,
            report: self.last_report()?,
            generation: 0,
        }))
    }

    /// Check if the stored data predates the current parser.
    pub fn needs_full_rebuild(&self) -> Result<bool> {
        self.with_conn(|conn| {
            let stored: Option<String> = conn
                .query_row(
                    "SELECT value FROM metadata WHERE key = 'parser_version'",
                    [],
                    |row| row.get(0),
                )
                .optional()?;

            match stored {
                Some(v) => {
                    let stored: u32 = v.parse().unwrap_or_else(|_| {
                        warn!(value = %v, "Corrupted parser_version in metadata, forcing rebuild");
                        0
                    });
                    Ok(stored != PARSER_VERSION)
                }
                None => Ok(true),
            }
        })
    }

    fn set_parser_version_impl(conn: &Connection) -> Result<()> {
        conn.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES ('parser_version', ?1)",
            [PARSER_VERSION.to_string()],
        )?;
        Ok(())
    }
}
