//! Link rows: directed, typed, weighted edges between memories.
//!
//! Outgoing and incoming collections are queries, not materialized fields.
//! Every read goes back to the link table, so a collection can never be
//! served stale after an out-of-band mutation.

use chrono::Utc;
use rusqlite::{OptionalExtension, params};

use super::{Database, Error, MemoryLink, Result};

fn row_to_link(row: &rusqlite::Row<'_>) -> rusqlite::Result<MemoryLink> {
    Ok(MemoryLink {
        id: row.get(0)?,
        source_id: row.get(1)?,
        target_id: row.get(2)?,
        link_type: row.get(3)?,
        weight: row.get(4)?,
        description: row.get(5)?,
        created_at: row.get(6)?,
    })
}

const LINK_COLUMNS: &str = "id, source_id, target_id, link_type, weight, description, created_at";

impl Database {
    /// Insert a directed link between two existing memories.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if either endpoint does not exist; a link
    /// is never persisted with a dangling reference.
    pub fn insert_link(
        &self,
        source_id: i64,
        target_id: i64,
        link_type: &str,
        weight: f64,
        description: &str,
    ) -> Result<MemoryLink> {
        for id in [source_id, target_id] {
            if self.get(id)?.is_none() {
                return Err(Error::NotFound(format!("no memory with id {}", id)));
            }
        }
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            r#"
            INSERT INTO links (source_id, target_id, link_type, weight, description, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![source_id, target_id, link_type, weight, description, &now],
        )?;
        let id = self.conn.last_insert_rowid();
        Ok(MemoryLink {
            id,
            source_id,
            target_id,
            link_type: link_type.to_string(),
            weight,
            description: description.to_string(),
            created_at: now,
        })
    }

    /// Retrieve a single link by id.
    pub fn get_link(&self, id: i64) -> Result<Option<MemoryLink>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {LINK_COLUMNS} FROM links WHERE id = ?1"))?;
        let result = stmt.query_row([id], row_to_link).optional()?;
        Ok(result)
    }

    /// Outgoing links of a memory, in insertion order.
    pub fn links_from(&self, memory_id: i64) -> Result<Vec<MemoryLink>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE source_id = ?1 ORDER BY id"
        ))?;
        let links: rusqlite::Result<Vec<MemoryLink>> =
            stmt.query_map([memory_id], row_to_link)?.collect();
        Ok(links?)
    }

    /// Incoming links (backlinks) of a memory, derived by querying links
    /// whose target is this memory.
    pub fn links_to(&self, memory_id: i64) -> Result<Vec<MemoryLink>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE target_id = ?1 ORDER BY id"
        ))?;
        let links: rusqlite::Result<Vec<MemoryLink>> =
            stmt.query_map([memory_id], row_to_link)?.collect();
        Ok(links?)
    }

    /// Update a link's type, weight, and description.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if no link has the given id.
    pub fn update_link(
        &self,
        id: i64,
        link_type: &str,
        weight: f64,
        description: &str,
    ) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE links SET link_type = ?1, weight = ?2, description = ?3 WHERE id = ?4",
            params![link_type, weight, description, id],
        )?;
        if rows == 0 {
            return Err(Error::NotFound(format!("no link with id {}", id)));
        }
        Ok(())
    }

    /// Delete a link by id.
    ///
    /// Returns true if a link was deleted, false if it didn't exist.
    pub fn delete_link(&self, id: i64) -> Result<bool> {
        let rows = self.conn.execute("DELETE FROM links WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }

    /// Delete every link referencing a memory as source or target.
    ///
    /// Returns the number of links removed. Used by the delete cascade
    /// before the memory row itself is removed.
    pub fn delete_links_for(&self, memory_id: i64) -> Result<usize> {
        let rows = self.conn.execute(
            "DELETE FROM links WHERE source_id = ?1 OR target_id = ?1",
            [memory_id],
        )?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::create_test_db;
    use super::*;

    #[test]
    fn test_insert_and_get_link() {
        let db = create_test_db();
        let a = db.insert_memory("a", "x", "text/plain", "", None).unwrap();
        let b = db.insert_memory("b", "y", "text/plain", "", None).unwrap();

        let link = db
            .insert_link(a.id, b.id, "causes", 0.7, "a precedes b")
            .unwrap();
        let fetched = db.get_link(link.id).unwrap().unwrap();
        assert_eq!(fetched.source_id, a.id);
        assert_eq!(fetched.target_id, b.id);
        assert_eq!(fetched.link_type, "causes");
        assert!((fetched.weight - 0.7).abs() < 1e-9);
        assert_eq!(fetched.description, "a precedes b");
    }

    #[test]
    fn test_insert_link_dangling_endpoint() {
        let db = create_test_db();
        let a = db.insert_memory("a", "x", "text/plain", "", None).unwrap();
        let result = db.insert_link(a.id, 999, "refers", 1.0, "");
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_links_from_and_to() {
        let db = create_test_db();
        let a = db.insert_memory("a", "x", "text/plain", "", None).unwrap();
        let b = db.insert_memory("b", "y", "text/plain", "", None).unwrap();
        let c = db.insert_memory("c", "z", "text/plain", "", None).unwrap();

        db.insert_link(a.id, b.id, "explains", 1.0, "").unwrap();
        db.insert_link(c.id, b.id, "contradicts", 1.0, "").unwrap();

        let outgoing = db.links_from(a.id).unwrap();
        assert_eq!(outgoing.len(), 1);
        assert_eq!(outgoing[0].target_id, b.id);

        let backlinks = db.links_to(b.id).unwrap();
        assert_eq!(backlinks.len(), 2);
        assert_eq!(backlinks[0].source_id, a.id);
        assert_eq!(backlinks[1].source_id, c.id);
    }

    #[test]
    fn test_update_link() {
        let db = create_test_db();
        let a = db.insert_memory("a", "x", "text/plain", "", None).unwrap();
        let b = db.insert_memory("b", "y", "text/plain", "", None).unwrap();
        let link = db.insert_link(a.id, b.id, "refers", 1.0, "").unwrap();

        db.update_link(link.id, "causes", 0.5, "revised").unwrap();
        let fetched = db.get_link(link.id).unwrap().unwrap();
        assert_eq!(fetched.link_type, "causes");
        assert!((fetched.weight - 0.5).abs() < 1e-9);
        assert_eq!(fetched.description, "revised");
    }

    #[test]
    fn test_update_link_nonexistent() {
        let db = create_test_db();
        assert!(matches!(
            db.update_link(7, "t", 1.0, ""),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_link() {
        let db = create_test_db();
        let a = db.insert_memory("a", "x", "text/plain", "", None).unwrap();
        let b = db.insert_memory("b", "y", "text/plain", "", None).unwrap();
        let link = db.insert_link(a.id, b.id, "refers", 1.0, "").unwrap();

        assert!(db.delete_link(link.id).unwrap());
        assert!(db.get_link(link.id).unwrap().is_none());
        assert!(!db.delete_link(link.id).unwrap());
    }

    #[test]
    fn test_delete_links_for_both_directions() {
        let db = create_test_db();
        let a = db.insert_memory("a", "x", "text/plain", "", None).unwrap();
        let b = db.insert_memory("b", "y", "text/plain", "", None).unwrap();
        let c = db.insert_memory("c", "z", "text/plain", "", None).unwrap();

        db.insert_link(a.id, b.id, "refers", 1.0, "").unwrap();
        db.insert_link(c.id, a.id, "refers", 1.0, "").unwrap();
        db.insert_link(b.id, c.id, "refers", 1.0, "").unwrap();

        let removed = db.delete_links_for(a.id).unwrap();
        assert_eq!(removed, 2);
        assert!(db.links_from(a.id).unwrap().is_empty());
        assert!(db.links_to(a.id).unwrap().is_empty());
        assert_eq!(db.links_from(b.id).unwrap().len(), 1);
    }
}
