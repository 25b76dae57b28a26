//! Reciprocal Rank Fusion (RRF) for hybrid search.
//!
//! Merges multiple ranked result lists without score normalization.
//! Formula: score = Σ 1 / (k + rank) for each ranking list.
//!
//! Memories appearing in several passes (lexical, reverse-containment,
//! semantic) accumulate score and rise above single-pass matches.

use crate::sqlite::Memory;
use std::collections::HashMap;

/// RRF fusion configuration.
#[derive(Debug, Clone, Copy)]
pub struct RrfConfig {
    /// The k parameter for the RRF formula. Dampens the contribution of
    /// top ranks and prevents division by very small numbers.
    pub k: f64,
}

impl Default for RrfConfig {
    fn default() -> Self {
        Self { k: 60.0 }
    }
}

/// Fuse ranked result lists into one ranking.
///
/// Each input list must be pre-sorted best-first; a memory at 1-based rank
/// `r` contributes `1 / (k + r)` per list it appears in, keyed by its
/// numeric id. A memory absent from a list contributes nothing for that
/// list, so only memories present in at least one pass appear in the
/// output. Ties break on ascending id so the ordering is deterministic.
///
/// The fused score is left in each memory's `similarity` field.
pub fn rrf_fusion(result_lists: Vec<Vec<Memory>>, config: Option<RrfConfig>) -> Vec<Memory> {
    let config = config.unwrap_or_default();

    if result_lists.is_empty() {
        return vec![];
    }

    let mut fused: HashMap<i64, (Memory, f64)> = HashMap::new();

    for result_list in result_lists {
        for (rank, result) in result_list.into_iter().enumerate() {
            let rank = rank + 1;
            let rrf_score = 1.0f64 / (config.k + rank as f64);

            match fused.get_mut(&result.id) {
                Some((_, accumulated)) => {
                    *accumulated += rrf_score;
                }
                None => {
                    fused.insert(result.id, (result, rrf_score));
                }
            }
        }
    }

    let mut fused_vec: Vec<(Memory, f64)> = fused.into_values().collect();
    fused_vec.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.id.cmp(&b.0.id))
    });

    fused_vec
        .into_iter()
        .map(|(mut result, score)| {
            result.similarity = Some(score);
            result
        })
        .collect()
}
