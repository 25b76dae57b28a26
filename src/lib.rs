//! mnemograph - A hybrid memory-retrieval and relationship-graph engine.
//!
//! This crate stores short textual memories with dense embeddings, links
//! them with typed, weighted, directed relations, retrieves them by fusing
//! lexical and semantic signals (Reciprocal Rank Fusion), deduplicates
//! near-identical results, and projects memory sets into renderer-agnostic
//! node/edge graphs. All operations are synchronous (no async/await
//! required).
//!
//! # Example
//!
//! ```no_run
//! use mnemograph::{Config, MemoryEngine, OnnxEmbedder};
//!
//! let config = Config::default();
//! let embedder = OnnxEmbedder::new(&config.embedding_model).expect("load model");
//! let db_path = config.database_path.clone();
//! let index_path = config.index_path.clone();
//! let mut engine = MemoryEngine::new(&db_path, Some(index_path.as_path()), Box::new(embedder), config)
//!     .expect("initialize engine");
//!
//! let alice = engine
//!     .create_memory("Alice", "Alice works at Microsoft", "text/plain", "chat")
//!     .expect("create memory");
//! let seattle = engine
//!     .create_memory("Seattle", "Microsoft is headquartered near Seattle", "text/plain", "chat")
//!     .expect("create memory");
//! engine
//!     .link_memories(alice.id, seattle.id, "works near", 1.0, "")
//!     .expect("link memories");
//!
//! let results = engine.search("where does alice work").expect("search");
//! let graph = engine
//!     .build_graph_for_search_results(&results)
//!     .expect("project graph");
//! println!("{} nodes, {} edges", graph.nodes.len(), graph.edges.len());
//! ```
//!
//! # Mutability Requirements
//!
//! Operations that generate embeddings (`create_memory`, `update_memory`,
//! `search`, `search_precise`) require `&mut engine` because embedding
//! inference mutates provider state for tensor allocations.

pub mod config;
pub mod embedding;
pub mod engine;
pub mod errors;
pub mod graph;
pub mod index;
pub mod sqlite;
mod rrf;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export public API
pub use config::Config;
pub use embedding::{EMBEDDING_DIMS, EmbeddingProvider, OnnxEmbedder};
pub use engine::{MAX_INPUT_LENGTH, MemoryEngine, dedupe_semantic};
pub use errors::Error;
pub use graph::{Graph, GraphEdge, GraphNode};
pub use index::VectorIndex;
pub use sqlite::{Memory, MemoryLink, MemoryTag};
