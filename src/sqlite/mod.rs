//! SQLite backend for mnemograph entity storage.
//!
//! This module provides:
//! - `Database`: core SQLite connection and schema management
//! - `Memory`, `MemoryLink`, `MemoryTag`: persisted entity records
//! - `embedding`: BLOB conversion and cosine similarity
//! - `links`: link rows and backlink queries
//! - `tags`: named labels, many-to-many with memories
//! - `search`: exact-match and substring queries
//!
//! The database is the single source of truth for all three entity
//! collections. Relationship collections are never materialized on the
//! entity structs; they are re-queried on every read.

pub mod embedding;
pub mod links;
pub mod search;
pub mod tags;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use uuid::Uuid;

pub use self::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};

/// A single memory record with an optional transient relevance score.
#[derive(Clone)]
pub struct Memory {
    /// Store-assigned numeric id, stable for the lifetime of the database.
    pub id: i64,
    /// Immutable v4 UUID assigned at creation; used for cross-reference
    /// stability independent of the storage backend.
    pub uuid: String,
    pub title: String,
    pub content: String,
    pub content_type: String,
    pub source: String,
    /// Dense embedding, absent when generation failed or was skipped.
    pub embedding: Option<Vec<f32>>,
    /// The text the embedding was derived from.
    pub embedding_text: Option<String>,

    /// Relevance score, populated by search operations only:
    /// cosine similarity for semantic passes, fused RRF score after fusion.
    pub similarity: Option<f64>,
    pub created_at: String,
    pub updated_at: String,
}

/// A directed, typed, weighted edge between two memories.
#[derive(Clone)]
pub struct MemoryLink {
    pub id: i64,
    pub source_id: i64,
    pub target_id: i64,
    pub link_type: String,
    pub weight: f64,
    pub description: String,
    pub created_at: String,
}

/// A named label, unique by name, many-to-many with memories.
#[derive(Clone)]
pub struct MemoryTag {
    pub id: i64,
    pub name: String,
}

/// Error types for SQLite operations.
#[derive(Debug)]
pub enum Error {
    Sqlite(String),
    InvalidBlobSize { expected: usize, actual: usize },
    MismatchedDimensions { expected: usize, actual: usize },
    EmptyVector,
    InvalidEmbedding(String),
    NotFound(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Sqlite(msg) => write!(f, "Database error: {}", msg),
            Error::InvalidBlobSize { expected, actual } => {
                write!(
                    f,
                    "Invalid BLOB size: expected {} bytes, got {} bytes",
                    expected, actual
                )
            }
            Error::MismatchedDimensions { expected, actual } => {
                write!(
                    f,
                    "Mismatched dimensions: expected {} dimensions, got {} dimensions",
                    expected, actual
                )
            }
            Error::EmptyVector => write!(f, "Cannot compute similarity with empty vector"),
            Error::InvalidEmbedding(msg) => write!(f, "Invalid embedding: {}", msg),
            Error::NotFound(msg) => write!(f, "Not found: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Sqlite(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// SQLite database backend for mnemograph.
pub struct Database {
    conn: Connection,
    dims: usize,
}

/// Initialize database schema and create necessary tables and indexes.
fn create_schema(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS memories (
            id INTEGER PRIMARY KEY,
            uuid TEXT NOT NULL UNIQUE,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            content_type TEXT NOT NULL DEFAULT 'text/plain',
            source TEXT NOT NULL DEFAULT '',
            embedding BLOB,
            embedding_text TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_memories_title ON memories(title);

        CREATE TABLE IF NOT EXISTS links (
            id INTEGER PRIMARY KEY,
            source_id INTEGER NOT NULL REFERENCES memories(id),
            target_id INTEGER NOT NULL REFERENCES memories(id),
            link_type TEXT NOT NULL,
            weight REAL NOT NULL DEFAULT 1.0,
            description TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_links_source ON links(source_id);
        CREATE INDEX IF NOT EXISTS idx_links_target ON links(target_id);

        CREATE TABLE IF NOT EXISTS tags (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS memory_tags (
            memory_id INTEGER NOT NULL REFERENCES memories(id),
            tag_id INTEGER NOT NULL REFERENCES tags(id),
            position INTEGER NOT NULL,
            PRIMARY KEY (memory_id, tag_id)
        );
        "#,
    )?;
    Ok(())
}

/// Map a memory row in canonical column order:
/// id, uuid, title, content, content_type, source, embedding,
/// embedding_text, created_at, updated_at.
fn row_to_memory(row: &rusqlite::Row<'_>, dims: usize) -> rusqlite::Result<Memory> {
    let blob: Option<Vec<u8>> = row.get(6)?;
    let embedding = match blob {
        Some(bytes) => Some(blob_to_vec(&bytes, dims).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                6,
                rusqlite::types::Type::Blob,
                Box::new(e),
            )
        })?),
        None => None,
    };
    Ok(Memory {
        id: row.get(0)?,
        uuid: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        content_type: row.get(4)?,
        source: row.get(5)?,
        embedding,
        embedding_text: row.get(7)?,
        similarity: None,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

const MEMORY_COLUMNS: &str =
    "id, uuid, title, content, content_type, source, embedding, embedding_text, created_at, updated_at";

impl Database {
    /// Open or create a SQLite database at the given path.
    ///
    /// Initializes the schema if the database is new. `dims` is the
    /// deployment embedding dimensionality; every stored embedding must
    /// have exactly this length.
    ///
    /// # Errors
    ///
    /// Returns error if the database cannot be opened or schema
    /// initialization fails.
    pub fn open(path: &Path, dims: usize) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        create_schema(&mut conn)?;
        Ok(Self { conn, dims })
    }

    /// Deployment embedding dimensionality.
    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Insert a new memory.
    ///
    /// Assigns a fresh UUID and timestamps. An embedding is rejected for
    /// empty content: a memory with no content never carries one.
    ///
    /// # Errors
    ///
    /// Returns error if the embedding has invalid dimensions or the write
    /// fails.
    pub fn insert_memory(
        &self,
        title: &str,
        content: &str,
        content_type: &str,
        source: &str,
        embedding: Option<&[f32]>,
    ) -> Result<Memory> {
        let embedding = if content.trim().is_empty() {
            None
        } else {
            embedding
        };
        let blob = match embedding {
            Some(vec) => Some(vec_to_blob(vec, self.dims)?),
            None => None,
        };
        let embedding_text = embedding.map(|_| content.to_string());
        let uuid = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        self.conn.execute(
            r#"
            INSERT INTO memories (uuid, title, content, content_type, source, embedding, embedding_text, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![&uuid, title, content, content_type, source, &blob, &embedding_text, &now, &now],
        )?;
        let id = self.conn.last_insert_rowid();

        Ok(Memory {
            id,
            uuid,
            title: title.to_string(),
            content: content.to_string(),
            content_type: content_type.to_string(),
            source: source.to_string(),
            embedding: embedding.map(|v| v.to_vec()),
            embedding_text,
            similarity: None,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Retrieve a single memory by numeric id.
    ///
    /// Returns None if the memory does not exist.
    pub fn get(&self, id: i64) -> Result<Option<Memory>> {
        let dims = self.dims;
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {MEMORY_COLUMNS} FROM memories WHERE id = ?1"
        ))?;
        let result = stmt
            .query_row([id], |row| row_to_memory(row, dims))
            .optional()?;
        Ok(result)
    }

    /// List all memories in store order (ascending numeric id).
    pub fn all_memories(&self) -> Result<Vec<Memory>> {
        let dims = self.dims;
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {MEMORY_COLUMNS} FROM memories ORDER BY id"
        ))?;
        let memories: rusqlite::Result<Vec<Memory>> = stmt
            .query_map([], |row| row_to_memory(row, dims))?
            .collect();
        Ok(memories?)
    }

    /// Update a memory's title, content, content type, and embedding.
    ///
    /// The numeric id, UUID, source, and creation timestamp are unchanged;
    /// `updated_at` is bumped.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if no memory has the given id.
    pub fn update_memory(
        &self,
        id: i64,
        title: &str,
        content: &str,
        content_type: &str,
        embedding: Option<&[f32]>,
    ) -> Result<()> {
        let embedding = if content.trim().is_empty() {
            None
        } else {
            embedding
        };
        let blob = match embedding {
            Some(vec) => Some(vec_to_blob(vec, self.dims)?),
            None => None,
        };
        let embedding_text = embedding.map(|_| content.to_string());
        let now = Utc::now().to_rfc3339();

        let rows = self.conn.execute(
            r#"
            UPDATE memories
            SET title = ?1, content = ?2, content_type = ?3, embedding = ?4, embedding_text = ?5, updated_at = ?6
            WHERE id = ?7
            "#,
            params![title, content, content_type, &blob, &embedding_text, &now, id],
        )?;
        if rows == 0 {
            return Err(Error::NotFound(format!("no memory with id {}", id)));
        }
        Ok(())
    }

    /// Bump a memory's updated_at without changing its content.
    ///
    /// Called after edge-only mutations so that any reader holding a cached
    /// relationship view of this memory sees it invalidated.
    pub fn touch(&self, id: i64) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let rows = self.conn.execute(
            "UPDATE memories SET updated_at = ?1 WHERE id = ?2",
            params![&now, id],
        )?;
        if rows == 0 {
            return Err(Error::NotFound(format!("no memory with id {}", id)));
        }
        Ok(())
    }

    /// Delete a memory row by id.
    ///
    /// Returns true if a memory was deleted, false if it didn't exist.
    /// Link cascade is the engine's responsibility and must happen first.
    pub fn delete_memory(&self, id: i64) -> Result<bool> {
        self.conn
            .execute("DELETE FROM memory_tags WHERE memory_id = ?1", [id])?;
        let rows = self
            .conn
            .execute("DELETE FROM memories WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }

    /// Get internal connection (for internal use, e.g., tests).
    #[allow(dead_code)]
    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }
}

#[cfg(test)]
pub(crate) mod test_utils {
    use super::Database;
    use tempfile::TempDir;

    pub const DIMS: usize = 384;

    pub fn create_test_db() -> Database {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.db");
        let db = Database::open(&path, DIMS).unwrap();
        std::mem::forget(dir);
        db
    }

    pub fn test_embedding(value: f32) -> Vec<f32> {
        vec![value; DIMS]
    }
}
