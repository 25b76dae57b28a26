//! Tag rows: named labels, unique by name, many-to-many with memories.
//!
//! Tags are created lazily on first use. The join table records an
//! attachment position so that a memory's "first tag" is stable.

use rusqlite::{OptionalExtension, params};

use super::{Database, MemoryTag, Result};

impl Database {
    /// Find a tag by exact, case-sensitive name, creating it if absent.
    pub fn find_or_create_tag(&self, name: &str) -> Result<MemoryTag> {
        let existing: Option<MemoryTag> = self
            .conn
            .prepare("SELECT id, name FROM tags WHERE name = ?1")?
            .query_row([name], |row| {
                Ok(MemoryTag {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })
            .optional()?;
        if let Some(tag) = existing {
            return Ok(tag);
        }

        self.conn
            .execute("INSERT INTO tags (name) VALUES (?1)", [name])?;
        Ok(MemoryTag {
            id: self.conn.last_insert_rowid(),
            name: name.to_string(),
        })
    }

    /// Attach a tag to a memory. Idempotent: attaching an already-attached
    /// tag is a no-op.
    pub fn attach_tag(&self, memory_id: i64, tag_id: i64) -> Result<()> {
        let next_position: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(position), -1) + 1 FROM memory_tags WHERE memory_id = ?1",
            [memory_id],
            |row| row.get(0),
        )?;
        self.conn.execute(
            "INSERT OR IGNORE INTO memory_tags (memory_id, tag_id, position) VALUES (?1, ?2, ?3)",
            params![memory_id, tag_id, next_position],
        )?;
        Ok(())
    }

    /// Tags attached to a memory, in attachment order.
    pub fn tags_for(&self, memory_id: i64) -> Result<Vec<MemoryTag>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT t.id, t.name
            FROM tags t
            JOIN memory_tags mt ON mt.tag_id = t.id
            WHERE mt.memory_id = ?1
            ORDER BY mt.position
            "#,
        )?;
        let tags: rusqlite::Result<Vec<MemoryTag>> = stmt
            .query_map([memory_id], |row| {
                Ok(MemoryTag {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect();
        Ok(tags?)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::create_test_db;

    #[test]
    fn test_find_or_create_tag() {
        let db = create_test_db();
        let tag = db.find_or_create_tag("physics").unwrap();
        let again = db.find_or_create_tag("physics").unwrap();
        assert_eq!(tag.id, again.id);
        assert_eq!(again.name, "physics");
    }

    #[test]
    fn test_tag_names_case_sensitive() {
        let db = create_test_db();
        let lower = db.find_or_create_tag("history").unwrap();
        let upper = db.find_or_create_tag("History").unwrap();
        assert_ne!(lower.id, upper.id);
    }

    #[test]
    fn test_attach_tag_idempotent() {
        let db = create_test_db();
        let memory = db.insert_memory("m", "c", "text/plain", "", None).unwrap();
        let tag = db.find_or_create_tag("geo").unwrap();

        db.attach_tag(memory.id, tag.id).unwrap();
        db.attach_tag(memory.id, tag.id).unwrap();

        let tags = db.tags_for(memory.id).unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "geo");
    }

    #[test]
    fn test_tags_for_attachment_order() {
        let db = create_test_db();
        let memory = db.insert_memory("m", "c", "text/plain", "", None).unwrap();
        let second = db.find_or_create_tag("second").unwrap();
        let first = db.find_or_create_tag("first").unwrap();

        db.attach_tag(memory.id, first.id).unwrap();
        db.attach_tag(memory.id, second.id).unwrap();

        let tags = db.tags_for(memory.id).unwrap();
        assert_eq!(tags[0].name, "first");
        assert_eq!(tags[1].name, "second");
    }
}
