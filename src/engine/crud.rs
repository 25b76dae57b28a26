//! Mutation operations: memory CRUD, linking, and tagging.

use tracing::debug;

use crate::errors::Error;
use crate::sqlite::{Memory, MemoryLink, MemoryTag};

use super::context::MemoryEngine;

impl MemoryEngine {
    #[must_use = "handle the error or results may be lost"]
    /// Create a memory with a freshly generated embedding.
    ///
    /// # Errors
    ///
    /// Returns `Error::Embedding` if the provider cannot embed the
    /// content; nothing is persisted in that case, and a memory is never
    /// silently created embedding-less through this path.
    pub fn create_memory(
        &mut self,
        title: &str,
        content: &str,
        content_type: &str,
        source: &str,
    ) -> Result<Memory, Error> {
        Self::validate_input_length(content)?;

        let embedding = self
            .embedder
            .generate_embedding(content)
            .ok_or_else(|| Error::Embedding("could not embed memory content".to_string()))?;

        let memory = self
            .db
            .insert_memory(title, content, content_type, source, Some(&embedding))?;
        self.index.add(&memory.uuid, &embedding)?;
        self.index.persist()?;
        Ok(memory)
    }

    #[must_use = "handle the error or results may be lost"]
    /// Update a memory's title, content, and content type, regenerating
    /// its embedding from the new content.
    ///
    /// The UUID is unchanged; the index entry is upserted under it.
    ///
    /// # Errors
    ///
    /// Fails with `Error::Embedding` when the new content cannot be
    /// embedded; the stored record is left untouched.
    pub fn update_memory(
        &mut self,
        id: i64,
        title: &str,
        content: &str,
        content_type: &str,
    ) -> Result<Memory, Error> {
        Self::validate_input_length(content)?;

        let existing = self
            .db
            .get(id)?
            .ok_or_else(|| Error::InvalidInput(format!("no memory with id {}", id)))?;

        let embedding = self
            .embedder
            .generate_embedding(content)
            .ok_or_else(|| Error::Embedding("could not embed memory content".to_string()))?;

        self.db
            .update_memory(id, title, content, content_type, Some(&embedding))?;
        self.index.add(&existing.uuid, &embedding)?;
        self.index.persist()?;

        let updated = self
            .db
            .get(id)?
            .ok_or_else(|| Error::InvalidInput(format!("no memory with id {}", id)))?;
        Ok(updated)
    }

    #[must_use = "handle the error or results may be lost"]
    /// Delete a memory and cascade its links.
    ///
    /// Links referencing the memory (both directions) are removed before
    /// the memory row; removing the row first would strand invalid link
    /// references. The index entry is dropped last; searches tolerate a
    /// stale index, not a stale store.
    ///
    /// Returns false if the memory didn't exist.
    pub fn delete_memory(&mut self, id: i64) -> Result<bool, Error> {
        let Some(memory) = self.db.get(id)? else {
            return Ok(false);
        };

        let removed_links = self.db.delete_links_for(id)?;
        if removed_links > 0 {
            debug!(id, removed_links, "cascaded link removal");
        }
        let deleted = self.db.delete_memory(id)?;
        self.index.remove(&memory.uuid);
        self.index.persist()?;
        Ok(deleted)
    }

    #[must_use = "handle the error or results may be lost"]
    /// Create a directed, typed, weighted link between two memories.
    ///
    /// The source memory is re-persisted (touched) so that any cached
    /// relationship view of it is invalidated.
    pub fn link_memories(
        &mut self,
        source_id: i64,
        target_id: i64,
        link_type: &str,
        weight: f64,
        description: &str,
    ) -> Result<MemoryLink, Error> {
        let link = self
            .db
            .insert_link(source_id, target_id, link_type, weight, description)?;
        self.db.touch(source_id)?;
        Ok(link)
    }

    #[must_use = "handle the error or results may be lost"]
    /// Update a link's type, weight, and description, touching the
    /// owning source memory afterward.
    pub fn update_link(
        &mut self,
        link_id: i64,
        link_type: &str,
        weight: f64,
        description: &str,
    ) -> Result<MemoryLink, Error> {
        let link = self
            .db
            .get_link(link_id)?
            .ok_or_else(|| Error::InvalidInput(format!("no link with id {}", link_id)))?;
        self.db
            .update_link(link_id, link_type, weight, description)?;
        self.db.touch(link.source_id)?;
        let updated = self
            .db
            .get_link(link_id)?
            .ok_or_else(|| Error::InvalidInput(format!("no link with id {}", link_id)))?;
        Ok(updated)
    }

    #[must_use = "handle the error or results may be lost"]
    /// Delete a link, touching the owning source memory afterward.
    ///
    /// Returns false if the link didn't exist.
    pub fn delete_link(&mut self, link_id: i64) -> Result<bool, Error> {
        let Some(link) = self.db.get_link(link_id)? else {
            return Ok(false);
        };
        let deleted = self.db.delete_link(link_id)?;
        self.db.touch(link.source_id)?;
        Ok(deleted)
    }

    #[must_use = "handle the error or results may be lost"]
    /// Attach a tag to a memory, creating the tag on first use.
    /// Idempotent: re-attaching an attached tag is a no-op.
    pub fn add_tag_to_memory(&mut self, memory_id: i64, tag_name: &str) -> Result<MemoryTag, Error> {
        if self.db.get(memory_id)?.is_none() {
            return Err(Error::InvalidInput(format!(
                "no memory with id {}",
                memory_id
            )));
        }
        let tag = self.db.find_or_create_tag(tag_name)?;
        self.db.attach_tag(memory_id, tag.id)?;
        Ok(tag)
    }

    #[must_use = "handle the error or results may be lost"]
    /// Get a specific memory by numeric id.
    pub fn get(&self, id: i64) -> Result<Option<Memory>, Error> {
        Ok(self.db.get(id)?)
    }

    #[must_use = "handle the error or results may be lost"]
    /// Get a specific memory by UUID.
    pub fn get_by_uuid(&self, uuid: &str) -> Result<Option<Memory>, Error> {
        Ok(self.db.find_by_uuid(uuid)?)
    }

    #[must_use = "handle the error or results may be lost"]
    /// Get a memory by exact title.
    pub fn get_by_title(&self, title: &str) -> Result<Option<Memory>, Error> {
        Ok(self.db.find_by_title(title)?)
    }

    #[must_use = "handle the error or results may be lost"]
    /// List the full corpus in store order.
    pub fn list(&self) -> Result<Vec<Memory>, Error> {
        Ok(self.db.all_memories()?)
    }

    #[must_use = "handle the error or results may be lost"]
    /// A memory's outgoing links, freshly read.
    pub fn outgoing_links(&self, memory_id: i64) -> Result<Vec<MemoryLink>, Error> {
        Ok(self.db.links_from(memory_id)?)
    }

    #[must_use = "handle the error or results may be lost"]
    /// A memory's incoming links (backlinks), freshly read.
    pub fn backlinks(&self, memory_id: i64) -> Result<Vec<MemoryLink>, Error> {
        Ok(self.db.links_to(memory_id)?)
    }

    #[must_use = "handle the error or results may be lost"]
    /// A memory's tags in attachment order.
    pub fn tags(&self, memory_id: i64) -> Result<Vec<MemoryTag>, Error> {
        Ok(self.db.tags_for(memory_id)?)
    }
}
