//! Approximate nearest-neighbor index over memory embeddings.
//!
//! Wraps an HNSW graph (cosine distance) keyed by memory UUID. The index
//! is a derived, rebuildable cache of the store and is never authoritative:
//! the HNSW graph cannot delete vectors, so `remove` only drops the UUID
//! mapping and searches filter out stale entries. Callers that need exact
//! answers re-verify candidates against the store.
//!
//! Persistence stores the UUID mappings and raw vectors; the graph itself
//! is re-inserted on load.

use hnsw_rs::hnsw::Hnsw;
use hnsw_rs::prelude::*;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::errors::Error;

/// Neighbor count per node in the HNSW graph.
const MAX_CONNECTIONS: usize = 16;
/// Maximum layer count; enough for millions of vectors.
const MAX_LAYER: usize = 16;
/// Candidate list size during construction.
const EF_CONSTRUCTION: usize = 200;
/// Minimum candidate list size during search.
const EF_SEARCH: usize = 64;

/// In-memory ANN index with an optional persistent backing file.
///
/// Not safe for concurrent mutation; all access is serialized through the
/// single owning engine instance.
pub struct VectorIndex {
    hnsw: Hnsw<'static, f32, DistCosine>,
    uuid_to_data_id: HashMap<String, usize>,
    data_id_to_uuid: HashMap<usize, String>,
    /// Raw vectors kept for persistence and graph rebuild on load.
    vectors: HashMap<String, Vec<f32>>,
    next_data_id: usize,
    dims: usize,
    capacity: usize,
    backing: Option<PathBuf>,
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndex")
            .field("dims", &self.dims)
            .field("len", &self.uuid_to_data_id.len())
            .field("backing", &self.backing)
            .finish()
    }
}

impl VectorIndex {
    /// Allocate an index, loading the backing file when one exists.
    ///
    /// # Errors
    ///
    /// Returns `Error::IndexInit` if the backing file is unreadable,
    /// corrupt, or was written for a different dimensionality. Callers
    /// treat this as non-fatal: discard the file and rebuild from the
    /// store.
    pub fn open(dims: usize, capacity: usize, backing: Option<&Path>) -> Result<Self, Error> {
        if let Some(path) = backing {
            if path.exists() {
                return Self::load(path, dims, capacity);
            }
        }
        Ok(Self::empty(dims, capacity, backing.map(Path::to_path_buf)))
    }

    fn empty(dims: usize, capacity: usize, backing: Option<PathBuf>) -> Self {
        let hnsw = Hnsw::<f32, DistCosine>::new(
            MAX_CONNECTIONS,
            capacity,
            MAX_LAYER,
            EF_CONSTRUCTION,
            DistCosine {},
        );
        Self {
            hnsw,
            uuid_to_data_id: HashMap::new(),
            data_id_to_uuid: HashMap::new(),
            vectors: HashMap::new(),
            next_data_id: 0,
            dims,
            capacity,
            backing,
        }
    }

    /// Insert or upsert one vector under a memory UUID.
    ///
    /// Idempotent per UUID within a session: a re-insert reuses the same
    /// internal id, replacing the previous vector in searches.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` on a dimension mismatch.
    pub fn add(&mut self, uuid: &str, vector: &[f32]) -> Result<(), Error> {
        if vector.len() != self.dims {
            return Err(Error::InvalidInput(format!(
                "index expects {} dimensions, got {}",
                self.dims,
                vector.len()
            )));
        }

        let data_id = match self.uuid_to_data_id.get(uuid) {
            Some(&existing) => existing,
            None => {
                let id = self.next_data_id;
                self.next_data_id += 1;
                self.uuid_to_data_id.insert(uuid.to_string(), id);
                self.data_id_to_uuid.insert(id, uuid.to_string());
                id
            }
        };

        self.hnsw.insert_slice((vector, data_id));
        self.vectors.insert(uuid.to_string(), vector.to_vec());
        debug!(uuid, data_id, "indexed vector");
        Ok(())
    }

    /// Up to `k` entries ordered by decreasing cosine similarity.
    ///
    /// Returns fewer than `k` when fewer vectors are indexed, and an empty
    /// list for an empty index. Entries whose UUID mapping was removed
    /// (best-effort deletes) are filtered out.
    pub fn find_nearest(&self, query: &[f32], k: usize) -> Vec<(String, f32)> {
        if self.uuid_to_data_id.is_empty() || k == 0 {
            return Vec::new();
        }

        let ef = EF_SEARCH.max(k);
        let neighbours: Vec<Neighbour> = self.hnsw.search(query, k, ef);

        let mut results: Vec<(String, f32)> = neighbours
            .into_iter()
            .filter_map(|n| {
                // Cosine distance is 1 - cos(a, b).
                self.data_id_to_uuid
                    .get(&n.d_id)
                    .map(|uuid| (uuid.clone(), 1.0 - n.distance))
            })
            .collect();
        results.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        results
    }

    /// Best-effort removal: drops the UUID mapping so searches no longer
    /// surface the entry. The vector itself stays in the HNSW graph.
    pub fn remove(&mut self, uuid: &str) -> bool {
        if let Some(data_id) = self.uuid_to_data_id.remove(uuid) {
            self.data_id_to_uuid.remove(&data_id);
            self.vectors.remove(uuid);
            true
        } else {
            false
        }
    }

    /// Whether a UUID is currently indexed.
    pub fn contains(&self, uuid: &str) -> bool {
        self.uuid_to_data_id.contains_key(uuid)
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.uuid_to_data_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uuid_to_data_id.is_empty()
    }

    /// Write mappings and vectors to the backing file, if one is
    /// configured. The graph is rebuilt from these on load.
    pub fn persist(&self) -> Result<(), Error> {
        let Some(path) = &self.backing else {
            return Ok(());
        };
        let data: Vec<(String, usize, Vec<f32>)> = self
            .uuid_to_data_id
            .iter()
            .filter_map(|(uuid, &data_id)| {
                self.vectors
                    .get(uuid)
                    .map(|v| (uuid.clone(), data_id, v.clone()))
            })
            .collect();

        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        bincode::serialize_into(writer, &(self.dims, self.next_data_id, data))
            .map_err(|e| Error::IndexInit(format!("serializing index: {e}")))?;
        debug!(len = self.len(), path = %path.display(), "persisted vector index");
        Ok(())
    }

    fn load(path: &Path, dims: usize, capacity: usize) -> Result<Self, Error> {
        let file = File::open(path)
            .map_err(|e| Error::IndexInit(format!("opening {}: {e}", path.display())))?;
        let reader = BufReader::new(file);

        let (stored_dims, next_data_id, data): (usize, usize, Vec<(String, usize, Vec<f32>)>) =
            bincode::deserialize_from(reader)
                .map_err(|e| Error::IndexInit(format!("deserializing {}: {e}", path.display())))?;

        if stored_dims != dims {
            return Err(Error::IndexInit(format!(
                "backing file has {} dimensions, deployment expects {}",
                stored_dims, dims
            )));
        }

        let mut index = Self::empty(dims, capacity, Some(path.to_path_buf()));
        for (uuid, data_id, vector) in data {
            if vector.len() != dims {
                warn!(uuid = %uuid, "skipping persisted vector with wrong dimensions");
                continue;
            }
            index.hnsw.insert_slice((vector.as_slice(), data_id));
            index.uuid_to_data_id.insert(uuid.clone(), data_id);
            index.data_id_to_uuid.insert(data_id, uuid.clone());
            index.vectors.insert(uuid, vector);
        }
        index.next_data_id = next_data_id;

        info!(
            len = index.len(),
            path = %path.display(),
            "loaded vector index"
        );
        Ok(index)
    }

    /// Discard all entries and re-insert from `(uuid, vector)` pairs.
    /// This is the disaster-recovery path after a corrupt backing file.
    pub fn rebuild<'a, I>(&mut self, entries: I) -> Result<usize, Error>
    where
        I: IntoIterator<Item = (&'a str, &'a [f32])>,
    {
        *self = Self::empty(self.dims, self.capacity, self.backing.clone());
        let mut count = 0;
        for (uuid, vector) in entries {
            self.add(uuid, vector)?;
            count += 1;
        }
        info!(count, "rebuilt vector index from store");
        Ok(count)
    }
}
