//! Engine context: construction and shared validation.

use std::path::Path;

use tracing::{info, warn};

use crate::config::Config;
use crate::embedding::EmbeddingProvider;
use crate::errors::Error;
use crate::index::VectorIndex;
use crate::sqlite::Database;

/// Maximum allowed input length (100,000 characters).
pub const MAX_INPUT_LENGTH: usize = 100_000;

/// Capacity hint for the ANN index.
const INDEX_CAPACITY: usize = 100_000;

/// Hybrid memory-retrieval and relationship-graph engine.
///
/// Owns the SQLite store (source of truth), the ANN index (derived,
/// rebuildable cache), and the embedding provider. All operations are
/// synchronous; the engine instance is the single owner serializing
/// index access, so callers wanting cross-thread sharing wrap it in
/// their own lock.
///
/// # Mutability Requirements
///
/// Operations that generate embeddings (`create_memory`, `update_memory`,
/// `search`, `search_precise`) require `&mut self` because embedding
/// inference mutates provider state.
pub struct MemoryEngine {
    pub(crate) db: Database,
    pub(crate) index: VectorIndex,
    pub(crate) embedder: Box<dyn EmbeddingProvider>,
    pub(crate) config: Config,
}

impl MemoryEngine {
    /// Initialize an engine for one session.
    ///
    /// Opens (or creates) the database at `db_path` and the ANN index at
    /// `index_path`. A corrupt index backing file is discarded and the
    /// index rebuilt from the store, never fatal. The index is brought
    /// in sync with the store before this returns, so the first query
    /// never sees a partially built index.
    ///
    /// # Errors
    ///
    /// Returns error if the database cannot be opened or the initial
    /// store scan fails.
    pub fn new(
        db_path: &Path,
        index_path: Option<&Path>,
        embedder: Box<dyn EmbeddingProvider>,
        config: Config,
    ) -> Result<Self, Error> {
        let dims = embedder.dimensions();
        let db = Database::open(db_path, dims)?;

        let index = match VectorIndex::open(dims, INDEX_CAPACITY, index_path) {
            Ok(index) => index,
            Err(e) => {
                warn!(error = %e, "discarding unreadable index backing file");
                if let Some(path) = index_path {
                    let _ = std::fs::remove_file(path);
                }
                VectorIndex::open(dims, INDEX_CAPACITY, index_path)?
            }
        };

        let mut engine = MemoryEngine {
            db,
            index,
            embedder,
            config,
        };
        engine.sync_index()?;
        Ok(engine)
    }

    /// Insert every embedded memory missing from the index. Covers both
    /// the rebuild-from-scratch path and a backing file that lags behind
    /// the store.
    fn sync_index(&mut self) -> Result<(), Error> {
        let mut inserted = 0;
        for memory in self.db.embedded_memories()? {
            if self.index.contains(&memory.uuid) {
                continue;
            }
            if let Some(embedding) = &memory.embedding {
                self.index.add(&memory.uuid, embedding)?;
                inserted += 1;
            }
        }
        if inserted > 0 {
            info!(inserted, total = self.index.len(), "synced vector index from store");
        }
        Ok(())
    }

    /// Configured precise-search similarity threshold.
    pub fn precise_threshold(&self) -> f64 {
        self.config.precise_threshold
    }

    /// Validate input length (rejects empty and whitespace-only inputs).
    pub(crate) fn validate_input_length(text: &str) -> Result<(), Error> {
        if text.trim().is_empty() {
            return Err(Error::InvalidInput("input cannot be empty".to_string()));
        }
        if text.len() > MAX_INPUT_LENGTH {
            return Err(Error::InvalidInput(format!(
                "input exceeds maximum length of {} characters",
                MAX_INPUT_LENGTH
            )));
        }
        Ok(())
    }
}
