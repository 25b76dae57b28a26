//! Graph projection: memories and their links as a renderer-agnostic
//! node/edge graph.
//!
//! The projector knows nothing about layout or interaction; node color is
//! a categorical presentation hint derived from the memory's first tag.
//! Links are re-read from the store at projection time so the emitted
//! graph never reflects a stale relationship snapshot.

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::warn;

use crate::engine::MemoryEngine;
use crate::errors::Error;
use crate::sqlite::Memory;

/// Categorical palette for tag-derived node colors.
const PALETTE: [&str; 8] = [
    "#4e79a7", "#f28e2b", "#e15759", "#76b7b2", "#59a14f", "#edc948", "#b07aa1", "#ff9da7",
];

/// Color for memories without any tag.
const DEFAULT_COLOR: &str = "#9aa0a6";

/// A renderable memory node.
#[derive(Debug, Clone, Serialize)]
pub struct GraphNode {
    /// Memory UUID, stable across storage backends.
    pub id: String,
    pub label: String,
    pub color: String,
}

/// A renderable link edge. Present only when both endpoints are in the
/// node set; the projector never emits dangling edges.
#[derive(Debug, Clone, Serialize)]
pub struct GraphEdge {
    pub id: i64,
    pub source: String,
    pub target: String,
    pub label: String,
    pub weight: f64,
}

/// The value handed to a renderer.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Graph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// Stable categorical color for a tag name.
fn color_for_tag(name: &str) -> &'static str {
    let hash = name
        .bytes()
        .fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
    PALETTE[hash % PALETTE.len()]
}

impl MemoryEngine {
    #[must_use = "handle the error or results may be lost"]
    /// Project a set of memories and the links among them.
    ///
    /// Edges whose other endpoint lies outside the supplied set are
    /// silently dropped; edges whose endpoint no longer resolves in the
    /// store at all are logged as dangling and dropped. Duplicate edge
    /// ids are emitted once.
    pub fn build_graph(&self, memories: &[Memory]) -> Result<Graph, Error> {
        let id_to_uuid: HashMap<i64, String> = memories
            .iter()
            .map(|m| (m.id, m.uuid.clone()))
            .collect();

        let mut seen_nodes: HashSet<&str> = HashSet::new();
        let mut nodes = Vec::with_capacity(memories.len());
        for memory in memories {
            if !seen_nodes.insert(&memory.uuid) {
                continue;
            }
            let tags = self.db.tags_for(memory.id)?;
            let color = tags
                .first()
                .map(|tag| color_for_tag(&tag.name))
                .unwrap_or(DEFAULT_COLOR);
            nodes.push(GraphNode {
                id: memory.uuid.clone(),
                label: memory.title.clone(),
                color: color.to_string(),
            });
        }

        let mut seen_edges: HashSet<i64> = HashSet::new();
        let mut edges = Vec::new();
        for memory in memories {
            // Fresh read: outgoing links are queried, never taken from a
            // cached collection.
            for link in self.db.links_from(memory.id)? {
                if !seen_edges.insert(link.id) {
                    continue;
                }
                let source = match id_to_uuid.get(&link.source_id) {
                    Some(uuid) => uuid.clone(),
                    None => {
                        self.check_dangling(link.id, link.source_id)?;
                        continue;
                    }
                };
                let target = match id_to_uuid.get(&link.target_id) {
                    Some(uuid) => uuid.clone(),
                    None => {
                        self.check_dangling(link.id, link.target_id)?;
                        continue;
                    }
                };
                edges.push(GraphEdge {
                    id: link.id,
                    source,
                    target,
                    label: link.link_type.clone(),
                    weight: link.weight,
                });
            }
        }

        Ok(Graph { nodes, edges })
    }

    #[must_use = "handle the error or results may be lost"]
    /// Project the entire corpus.
    pub fn build_graph_all(&self) -> Result<Graph, Error> {
        let memories = self.db.all_memories()?;
        self.build_graph(&memories)
    }

    #[must_use = "handle the error or results may be lost"]
    /// Project a search-result set expanded to its direct neighbors.
    ///
    /// Every memory reachable by one outgoing link or one backlink from
    /// an input memory is pulled in before projecting, so the subgraph
    /// shows immediate context even for memories that didn't match the
    /// query themselves.
    pub fn build_graph_for_search_results(&self, memories: &[Memory]) -> Result<Graph, Error> {
        let mut included: HashSet<i64> = memories.iter().map(|m| m.id).collect();
        let mut expanded: Vec<Memory> = memories.to_vec();

        for memory in memories {
            let mut neighbor_ids = Vec::new();
            for link in self.db.links_from(memory.id)? {
                neighbor_ids.push(link.target_id);
            }
            for link in self.db.links_to(memory.id)? {
                neighbor_ids.push(link.source_id);
            }

            for neighbor_id in neighbor_ids {
                if !included.insert(neighbor_id) {
                    continue;
                }
                match self.db.get(neighbor_id)? {
                    Some(neighbor) => expanded.push(neighbor),
                    None => {
                        warn!(neighbor_id, "dangling link endpoint skipped during expansion");
                    }
                }
            }
        }

        self.build_graph(&expanded)
    }

    /// Log a dangling reference when an out-of-set endpoint is also gone
    /// from the store. Out-of-set but live endpoints are dropped silently.
    fn check_dangling(&self, link_id: i64, endpoint_id: i64) -> Result<(), Error> {
        if self.db.get(endpoint_id)?.is_none() {
            warn!(link_id, endpoint_id, "link references a deleted memory");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_engine;

    #[test]
    fn test_color_for_tag_is_stable() {
        assert_eq!(color_for_tag("physics"), color_for_tag("physics"));
        assert!(PALETTE.contains(&color_for_tag("anything")));
    }

    #[test]
    fn test_build_graph_nodes_and_edges() {
        let mut engine = test_engine();
        let a = engine.create_memory("A", "alpha content", "text/plain", "").unwrap();
        let b = engine.create_memory("B", "beta content", "text/plain", "").unwrap();
        let link = engine.link_memories(a.id, b.id, "explains", 1.0, "").unwrap();

        let graph = engine.build_graph(&[a.clone(), b.clone()]).unwrap();
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].id, link.id);
        assert_eq!(graph.edges[0].source, a.uuid);
        assert_eq!(graph.edges[0].target, b.uuid);
        assert_eq!(graph.edges[0].label, "explains");
    }

    #[test]
    fn test_edges_to_memories_outside_set_are_dropped() {
        let mut engine = test_engine();
        let a = engine.create_memory("A", "alpha content", "text/plain", "").unwrap();
        let b = engine.create_memory("B", "beta content", "text/plain", "").unwrap();
        let c = engine.create_memory("C", "gamma content", "text/plain", "").unwrap();
        engine.link_memories(a.id, c.id, "refers", 1.0, "").unwrap();

        let partial = engine.build_graph(&[a.clone(), b.clone()]).unwrap();
        assert_eq!(partial.nodes.len(), 2);
        assert!(partial.edges.is_empty());

        let full = engine.build_graph(&[a, b, c]).unwrap();
        assert_eq!(full.edges.len(), 1);
    }

    #[test]
    fn test_node_color_from_first_tag() {
        let mut engine = test_engine();
        let tagged = engine.create_memory("T", "tagged content", "text/plain", "").unwrap();
        let untagged = engine.create_memory("U", "untagged content", "text/plain", "").unwrap();
        engine.add_tag_to_memory(tagged.id, "history").unwrap();
        engine.add_tag_to_memory(tagged.id, "geo").unwrap();

        let graph = engine.build_graph(&[tagged.clone(), untagged.clone()]).unwrap();
        let tagged_node = graph.nodes.iter().find(|n| n.id == tagged.uuid).unwrap();
        let untagged_node = graph.nodes.iter().find(|n| n.id == untagged.uuid).unwrap();

        assert_eq!(tagged_node.color, color_for_tag("history"));
        assert_eq!(untagged_node.color, DEFAULT_COLOR);
    }

    #[test]
    fn test_search_result_graph_expands_neighbors() {
        let mut engine = test_engine();
        let hit = engine.create_memory("Hit", "match content", "text/plain", "").unwrap();
        let forward = engine.create_memory("Forward", "linked content", "text/plain", "").unwrap();
        let backward = engine.create_memory("Backward", "linking content", "text/plain", "").unwrap();
        let unrelated = engine.create_memory("Unrelated", "island content", "text/plain", "").unwrap();

        engine.link_memories(hit.id, forward.id, "refers", 1.0, "").unwrap();
        engine.link_memories(backward.id, hit.id, "refers", 1.0, "").unwrap();

        let graph = engine.build_graph_for_search_results(&[hit.clone()]).unwrap();
        let node_ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();

        assert!(node_ids.contains(&hit.uuid.as_str()));
        assert!(node_ids.contains(&forward.uuid.as_str()));
        assert!(node_ids.contains(&backward.uuid.as_str()));
        assert!(!node_ids.contains(&unrelated.uuid.as_str()));
        assert_eq!(graph.edges.len(), 2);
    }

    #[test]
    fn test_edge_ids_deduplicated() {
        let mut engine = test_engine();
        let a = engine.create_memory("A", "alpha content", "text/plain", "").unwrap();
        let b = engine.create_memory("B", "beta content", "text/plain", "").unwrap();
        engine.link_memories(a.id, b.id, "refers", 1.0, "").unwrap();

        // The same memory supplied twice must not duplicate its node or edges.
        let graph = engine
            .build_graph(&[a.clone(), a.clone(), b.clone()])
            .unwrap();
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.edges.len(), 1);
    }

    #[test]
    fn test_graph_all_after_cascade_delete_has_no_deleted_edges() {
        let mut engine = test_engine();
        let a = engine.create_memory("A", "alpha content", "text/plain", "").unwrap();
        let b = engine.create_memory("B", "beta content", "text/plain", "").unwrap();
        engine.link_memories(a.id, b.id, "refers", 1.0, "").unwrap();

        engine.delete_memory(b.id).unwrap();

        let graph = engine.build_graph_all().unwrap();
        assert_eq!(graph.nodes.len(), 1);
        assert!(graph.edges.is_empty());
        assert!(graph.nodes.iter().all(|n| n.id != b.uuid));
    }

    #[test]
    fn test_graph_serializes_to_json() {
        let mut engine = test_engine();
        let a = engine.create_memory("A", "alpha content", "text/plain", "").unwrap();
        let graph = engine.build_graph(&[a]).unwrap();

        let json = serde_json::to_value(&graph).unwrap();
        assert!(json.get("nodes").is_some());
        assert!(json.get("edges").is_some());
    }
}
