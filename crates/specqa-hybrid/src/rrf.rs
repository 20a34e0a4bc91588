//! Reciprocal rank fusion of a vector list and a lexical list.

use std::cmp::Ordering;
use std::collections::HashMap;

use specqa_core::types::SourceKind;
use specqa_core::Candidate;

pub const DEFAULT_RRF_K: f64 = 60.0;

fn contribution(weight: f64, rank: usize, rrf_k: f64) -> f64 { weight / (rank as f64 + rrf_k) }

/// Merge two ranked lists into the top `k` by weighted RRF score.
///
/// Chunks are matched by id. `alpha` weights the vector side, `1 - alpha`
/// the lexical side; a chunk missing from one list gets nothing from it.
/// Equal scores keep first-seen order: vector list first, then chunks only
/// the lexical side found.
pub fn fuse(vector: Vec<Candidate>, lexical: Vec<Candidate>, alpha: f64, rrf_k: f64, k: usize) -> Vec<Candidate> {
    let mut merged: Vec<(Candidate, f64)> = Vec::with_capacity(vector.len() + lexical.len());
    let mut by_id: HashMap<String, usize> = HashMap::new();

    for (pos, cand) in vector.into_iter().enumerate() {
        let rank = cand.vector_rank.unwrap_or(pos + 1);
        if by_id.contains_key(cand.id()) { continue; }
        by_id.insert(cand.id().to_string(), merged.len());
        merged.push((cand, contribution(alpha, rank, rrf_k)));
    }

    for (pos, cand) in lexical.into_iter().enumerate() {
        let rank = cand.lexical_rank.unwrap_or(pos + 1);
        let score = contribution(1.0 - alpha, rank, rrf_k);
        match by_id.get(cand.id()) {
            Some(&i) => {
                let (existing, total) = &mut merged[i];
                if existing.lexical_rank.is_none() {
                    existing.lexical_score = cand.lexical_score;
                    existing.lexical_rank = Some(rank);
                    existing.source = SourceKind::Hybrid;
                    *total += score;
                }
            }
            None => {
                by_id.insert(cand.id().to_string(), merged.len());
                merged.push((cand, score));
            }
        }
    }

    merged.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    merged.truncate(k);
    merged
        .into_iter()
        .enumerate()
        .map(|(pos, (mut cand, score))| {
            cand.fused_score = Some(score);
            cand.fused_rank = pos + 1;
            cand
        })
        .collect()
}
