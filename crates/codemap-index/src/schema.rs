use rusqlite::{Connection, Result as SqliteResult};
use serde::{Deserialize, Serialize};

pub const SCHEMA_VERSION: i32 = 1;

pub fn init_schema(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        r#"
        -- Metadata table for schema versioning and build bookkeeping
        CREATE TABLE IF NOT EXISTS metadata (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        -- One row per embedded element; node_key is not unique because
        -- colliding elements are each embedded
        CREATE TABLE IF NOT EXISTS embeddings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            node_key TEXT NOT NULL,
            file_path TEXT NOT NULL,
            kind TEXT NOT NULL,
            name TEXT NOT NULL,
            package_name TEXT NOT NULL,
            source_snippet TEXT,
            description TEXT NOT NULL,
            embedding BLOB NOT NULL
        );

        -- Last published graph, serialized as JSON
        CREATE TABLE IF NOT EXISTS graph_snapshot (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            parser_version INTEGER NOT NULL,
            node_count INTEGER NOT NULL,
            edge_count INTEGER NOT NULL,
            data TEXT NOT NULL,
            built_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_embeddings_node_key ON embeddings(node_key);
        CREATE INDEX IF NOT EXISTS idx_embeddings_package ON embeddings(package_name);
        CREATE INDEX IF NOT EXISTS idx_embeddings_kind ON embeddings(kind);
        CREATE INDEX IF NOT EXISTS idx_embeddings_name ON embeddings(name);
        CREATE INDEX IF NOT EXISTS idx_embeddings_file ON embeddings(file_path);
        "#,
    )?;

    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

/// One embedded element. `id` is 0 until the record has been stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub id: i64,
    pub node_key: String,
    pub file_path: String,
    pub kind: String,
    pub name: String,
    pub package_name: String,
    pub source_snippet: Option<String>,
    pub description: String,
    pub embedding: Vec<f32>,
}
