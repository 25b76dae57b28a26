//! Retrieval operations: hybrid search and precise semantic search.

use tracing::{debug, warn};

use crate::errors::Error;
use crate::rrf;
use crate::sqlite::{Memory, cosine_similarity};

use super::context::MemoryEngine;

/// Candidate pool pulled from the ANN index on the precise path.
const PRECISE_CANDIDATES: usize = 100;

impl MemoryEngine {
    #[must_use = "handle the error or results may be lost"]
    /// Retrieve memories for a free-text query, most relevant first.
    ///
    /// A blank query returns the full corpus, unranked, in store order.
    /// Otherwise three retrieval passes run and are fused with Reciprocal
    /// Rank Fusion:
    ///
    /// 1. lexical: title or content contains the query, case-insensitive;
    /// 2. reverse containment: the title is a substring of the query,
    ///    which surfaces short entity names embedded in a longer question;
    /// 3. semantic: cosine similarity between the query embedding and
    ///    every embedded memory, skipped when the provider returns None.
    ///
    /// Memories matched by no pass are excluded, so a query matching
    /// nothing returns an empty list, distinct from the blank-query
    /// case. Near-duplicate results (cosine above the configured
    /// threshold) collapse to the highest-ranked representative.
    ///
    /// Read-only; the only raised error is a store failure.
    pub fn search(&mut self, query: &str) -> Result<Vec<Memory>, Error> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(self.db.all_memories()?);
        }
        Self::validate_input_length(query)?;

        let lexical = self.db.query_contains(query)?;

        // The corpus scan serves both remaining passes. Reverse
        // containment is inherently linear in corpus size; no cutoff is
        // imposed here.
        let corpus = self.db.all_memories()?;

        let query_lower = query.to_lowercase();
        let reverse: Vec<Memory> = corpus
            .iter()
            .filter(|m| {
                let title = m.title.trim();
                !title.is_empty() && query_lower.contains(&title.to_lowercase())
            })
            .cloned()
            .collect();

        let semantic = match self.embedder.generate_embedding(query) {
            Some(query_embedding) => {
                let mut scored = Vec::new();
                for memory in &corpus {
                    if let Some(embedding) = &memory.embedding {
                        let mut memory = memory.clone();
                        memory.similarity =
                            Some(cosine_similarity(&query_embedding, embedding)?);
                        scored.push(memory);
                    }
                }
                scored.sort_by(|a, b| {
                    b.similarity
                        .unwrap_or(0.0)
                        .partial_cmp(&a.similarity.unwrap_or(0.0))
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
                scored
            }
            None => {
                debug!("no query embedding; semantic pass skipped");
                Vec::new()
            }
        };

        let fused = rrf::rrf_fusion(vec![lexical, reverse, semantic], None);
        if fused.is_empty() {
            return Ok(Vec::new());
        }

        Ok(dedupe_semantic(fused, self.config.dedup_threshold))
    }

    #[must_use = "handle the error or results may be lost"]
    /// Precision-first retrieval: ANN candidates re-verified against the
    /// store.
    ///
    /// Embeds the query, pulls the nearest candidates from the index, and
    /// keeps only those whose freshly recomputed similarity against the
    /// store's current embedding reaches `threshold`. Candidates whose
    /// memory no longer exists are dropped; the index may lag behind
    /// deletes and must never be trusted over the store.
    ///
    /// A blank query or an unavailable provider yields an empty result.
    pub fn search_precise(&mut self, query: &str, threshold: f64) -> Result<Vec<Memory>, Error> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        Self::validate_input_length(query)?;

        let Some(query_embedding) = self.embedder.generate_embedding(query) else {
            warn!("no query embedding; precise search returns nothing");
            return Ok(Vec::new());
        };

        let candidates = self.index.find_nearest(&query_embedding, PRECISE_CANDIDATES);

        let mut results = Vec::new();
        for (uuid, _indexed_similarity) in candidates {
            let Some(memory) = self.db.find_by_uuid(&uuid)? else {
                debug!(uuid = %uuid, "stale index entry; memory no longer in store");
                continue;
            };
            let Some(embedding) = memory.embedding.clone() else {
                continue;
            };
            let fresh = cosine_similarity(&query_embedding, &embedding)?;
            if fresh >= threshold {
                let mut memory = memory;
                memory.similarity = Some(fresh);
                results.push(memory);
            }
        }

        results.sort_by(|a, b| {
            b.similarity
                .unwrap_or(0.0)
                .partial_cmp(&a.similarity.unwrap_or(0.0))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(results)
    }
}

/// Collapse near-duplicates to one representative per cluster.
///
/// Walks the ranked list and drops any memory whose cosine similarity to
/// an already-kept memory exceeds `threshold`, preferring the earlier
/// (higher-ranked) item. A memory without an embedding never
/// deduplicates: similarity is treated as 0. Idempotent on its own
/// output.
pub fn dedupe_semantic(memories: Vec<Memory>, threshold: f64) -> Vec<Memory> {
    let mut kept: Vec<Memory> = Vec::new();
    'candidates: for candidate in memories {
        if let Some(candidate_embedding) = &candidate.embedding {
            for existing in &kept {
                if let Some(kept_embedding) = &existing.embedding {
                    let similarity =
                        cosine_similarity(kept_embedding, candidate_embedding).unwrap_or(0.0);
                    if similarity > threshold {
                        continue 'candidates;
                    }
                }
            }
        }
        kept.push(candidate);
    }
    kept
}
