//! Embedding record operations for IndexStore.

use super::IndexStore;
use crate::schema::EmbeddingRecord;
use anyhow::Result;
use codemap_embeddings::{bytes_to_vector, vector_to_bytes};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::debug;

const SELECT_RECORD: &str = "SELECT id, node_key, file_path, kind, name, package_name,
        source_snippet, description, embedding
 FROM embeddings";

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<EmbeddingRecord> {
    let bytes: Vec<u8> = row.get(8)?;
    let embedding = bytes_to_vector(&bytes)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(8, Type::Blob, Box::new(e)))?;

    Ok(EmbeddingRecord {
        id: row.get(0)?,
        node_key: row.get(1)?,
        file_path: row.get(2)?,
        kind: row.get(3)?,
        name: row.get(4)?,
        package_name: row.get(5)?,
        source_snippet: row.get(6)?,
        description: row.get(7)?,
        embedding,
    })
}

impl IndexStore {
    /// Delete every stored record. Returns how many were removed.
    pub fn delete_all_embeddings(&self) -> Result<usize> {
        self.with_conn(|conn| Ok(conn.execute("DELETE FROM embeddings", [])?))
    }

    /// Insert one record and return its row id.
    pub fn insert_embedding(&self, record: &EmbeddingRecord) -> Result<i64> {
        self.with_conn(|conn| Self::insert_embedding_impl(conn, record))
    }

    pub(crate) fn insert_embedding_impl(conn: &Connection, record: &EmbeddingRecord) -> Result<i64> {
        conn.execute(
            "INSERT INTO embeddings (node_key, file_path, kind, name, package_name,
                                     source_snippet, description, embedding)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.node_key,
                record.file_path,
                record.kind,
                record.name,
                record.package_name,
                record.source_snippet,
                record.description,
                vector_to_bytes(&record.embedding),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Replace the whole record set in one transaction.
    pub fn replace_embeddings(&self, records: &[EmbeddingRecord]) -> Result<()> {
        self.in_transaction(|conn| {
            conn.execute("DELETE FROM embeddings", [])?;
            for record in records {
                Self::insert_embedding_impl(conn, record)?;
            }
            Ok(())
        })?;
        debug!(records = records.len(), "Replaced embeddings");
        Ok(())
    }

    /// First record stored under `node_key`.
    pub fn find_by_node_key(&self, node_key: &str) -> Result<Option<EmbeddingRecord>> {
        self.with_conn(|conn| {
            let sql = format!("{SELECT_RECORD} WHERE node_key = ?1 ORDER BY id LIMIT 1");
            Ok(conn
                .query_row(&sql, [node_key], record_from_row)
                .optional()?)
        })
    }

    pub fn list_all(&self) -> Result<Vec<EmbeddingRecord>> {
        self.query_records(&format!("{SELECT_RECORD} ORDER BY id"), &[])
    }

    /// Records whose package starts with `prefix`. Matching is literal, so
    /// `_` and `%` in package names carry no special meaning.
    pub fn find_by_package_prefix(&self, prefix: &str) -> Result<Vec<EmbeddingRecord>> {
        self.query_records(
            &format!(
                "{SELECT_RECORD} WHERE substr(package_name, 1, length(?1)) = ?1 ORDER BY id"
            ),
            &[prefix],
        )
    }

    pub fn find_by_kind(&self, kind: &str) -> Result<Vec<EmbeddingRecord>> {
        self.query_records(
            &format!("{SELECT_RECORD} WHERE kind = ?1 ORDER BY id"),
            &[kind],
        )
    }

    pub fn find_by_kind_and_package_prefix(
        &self,
        kind: &str,
        prefix: &str,
    ) -> Result<Vec<EmbeddingRecord>> {
        self.query_records(
            &format!(
                "{SELECT_RECORD} WHERE kind = ?1 AND substr(package_name, 1, length(?2)) = ?2
                 ORDER BY id"
            ),
            &[kind, prefix],
        )
    }

    pub fn find_by_name(&self, name: &str) -> Result<Vec<EmbeddingRecord>> {
        self.query_records(
            &format!("{SELECT_RECORD} WHERE name = ?1 ORDER BY id"),
            &[name],
        )
    }

    pub fn find_by_file_path(&self, file_path: &str) -> Result<Vec<EmbeddingRecord>> {
        self.query_records(
            &format!("{SELECT_RECORD} WHERE file_path = ?1 ORDER BY id"),
            &[file_path],
        )
    }

    /// Records carrying a non-empty snippet, optionally limited to a package
    /// prefix.
    pub fn find_with_source(&self, prefix: Option<&str>) -> Result<Vec<EmbeddingRecord>> {
        match prefix {
            Some(prefix) => self.query_records(
                &format!(
                    "{SELECT_RECORD} WHERE source_snippet IS NOT NULL AND source_snippet != ''
                     AND substr(package_name, 1, length(?1)) = ?1 ORDER BY id"
                ),
                &[prefix],
            ),
            None => self.query_records(
                &format!(
                    "{SELECT_RECORD} WHERE source_snippet IS NOT NULL AND source_snippet != ''
                     ORDER BY id"
                ),
                &[],
            ),
        }
    }

    pub fn embedding_count(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM embeddings", [], |row| row.get(0))?;
            Ok(count as usize)
        })
    }

    fn query_records(&self, sql: &str, args: &[&str]) -> Result<Vec<EmbeddingRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(sql)?;
            let records = stmt
                .query_map(rusqlite::params_from_iter(args.iter()), record_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(records)
        })
    }
}
