//! Exact-match and substring queries over memories.

use rusqlite::OptionalExtension;

use super::{Database, MEMORY_COLUMNS, Memory, Result, row_to_memory};

/// Escape LIKE metacharacters so a query substring matches literally.
fn escape_like(pattern: &str) -> String {
    pattern
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

impl Database {
    /// Retrieve a memory by its immutable UUID.
    pub fn find_by_uuid(&self, uuid: &str) -> Result<Option<Memory>> {
        let dims = self.dims();
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {MEMORY_COLUMNS} FROM memories WHERE uuid = ?1"
        ))?;
        let result = stmt
            .query_row([uuid], |row| row_to_memory(row, dims))
            .optional()?;
        Ok(result)
    }

    /// Retrieve a memory by exact title match. If several memories share
    /// the title, the oldest (lowest id) wins.
    pub fn find_by_title(&self, title: &str) -> Result<Option<Memory>> {
        let dims = self.dims();
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {MEMORY_COLUMNS} FROM memories WHERE title = ?1 ORDER BY id LIMIT 1"
        ))?;
        let result = stmt
            .query_row([title], |row| row_to_memory(row, dims))
            .optional()?;
        Ok(result)
    }

    /// Memories whose title or content contains the given substring,
    /// case-insensitively, in store order.
    pub fn query_contains(&self, substring: &str) -> Result<Vec<Memory>> {
        let dims = self.dims();
        let pattern = format!("%{}%", escape_like(&substring.to_lowercase()));
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {MEMORY_COLUMNS} FROM memories
            WHERE LOWER(title) LIKE ?1 ESCAPE '\' OR LOWER(content) LIKE ?1 ESCAPE '\'
            ORDER BY id
            "#
        ))?;
        let memories: rusqlite::Result<Vec<Memory>> = stmt
            .query_map([&pattern], |row| row_to_memory(row, dims))?
            .collect();
        Ok(memories?)
    }

    /// Memories carrying an embedding, in store order. This is the scan
    /// the vector index rebuilds from.
    pub fn embedded_memories(&self) -> Result<Vec<Memory>> {
        let dims = self.dims();
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {MEMORY_COLUMNS} FROM memories WHERE embedding IS NOT NULL ORDER BY id"
        ))?;
        let memories: rusqlite::Result<Vec<Memory>> = stmt
            .query_map([], |row| row_to_memory(row, dims))?
            .collect();
        Ok(memories?)
    }
}
