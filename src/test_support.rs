//! Shared fixtures for unit tests: a deterministic embedding provider and
//! engine constructors on throwaway databases.

use std::collections::{HashMap, HashSet};

use tempfile::TempDir;

use crate::config::Config;
use crate::embedding::EmbeddingProvider;
use crate::engine::MemoryEngine;

pub const DIMS: usize = 384;

/// Deterministic provider: returns pinned vectors for registered texts and
/// a byte-derived pseudo-embedding otherwise. `failing()` simulates an
/// unavailable model; `with_failure_on` a per-text failure.
pub struct StubProvider {
    vectors: HashMap<String, Vec<f32>>,
    failures: HashSet<String>,
    fail: bool,
}

impl StubProvider {
    pub fn new() -> Self {
        Self {
            vectors: HashMap::new(),
            failures: HashSet::new(),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn with_vector(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }

    pub fn with_failure_on(mut self, text: &str) -> Self {
        self.failures.insert(text.to_string());
        self
    }
}

impl EmbeddingProvider for StubProvider {
    fn generate_embedding(&mut self, text: &str) -> Option<Vec<f32>> {
        if self.fail || text.trim().is_empty() || self.failures.contains(text) {
            return None;
        }
        Some(
            self.vectors
                .get(text)
                .cloned()
                .unwrap_or_else(|| pseudo_embedding(text)),
        )
    }

    fn dimensions(&self) -> usize {
        DIMS
    }
}

/// L2-normalized vector derived from text bytes; equal texts embed
/// identically, different texts almost never collide.
pub fn pseudo_embedding(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; DIMS];
    let mut position = 7usize;
    for byte in text.bytes() {
        position = position.wrapping_mul(31).wrapping_add(byte as usize);
        vector[position % DIMS] += 1.0;
    }
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm = norm.max(1e-9);
    vector.iter().map(|x| x / norm).collect()
}

/// A basis vector scaled to unit length, for hand-built similarity setups.
pub fn unit_vector(axis: usize) -> Vec<f32> {
    let mut vector = vec![0.0f32; DIMS];
    vector[axis % DIMS] = 1.0;
    vector
}

/// Engine on a fresh throwaway database, no index backing file.
pub fn test_engine() -> MemoryEngine {
    test_engine_with(StubProvider::new())
}

/// Engine on a fresh throwaway database with a caller-supplied provider.
pub fn test_engine_with(provider: StubProvider) -> MemoryEngine {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.db");
    std::mem::forget(dir);
    MemoryEngine::new(&path, None, Box::new(provider), Config::default()).unwrap()
}
