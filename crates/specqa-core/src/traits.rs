use std::sync::Arc;

use crate::error::Result;
use crate::types::{Candidate, Chunk, ChunkId};

/// Turns text into fixed-length vectors.
///
/// Implementations must be deterministic for a given text and model version
/// and must return `dim()`-length vectors.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector"))
    }
}

/// Keyword index kept in lockstep with the passage store.
pub trait TextIndexer: Send + Sync {
    /// Replace the whole index with `chunks`.
    fn rebuild(&self, chunks: &[Arc<Chunk>]) -> Result<()>;
    /// Top `k` chunks with a positive keyword score; `IndexUnavailable`
    /// before the first non-empty rebuild.
    fn search(&self, query: &str, k: usize) -> Result<Vec<Candidate>>;
    /// `false` until a non-empty corpus has been indexed.
    fn is_ready(&self) -> bool;
}

/// Embedding-backed passage store.
pub trait VectorIndexer: Send + Sync {
    /// Embed and append `chunks`, returning the ids they were assigned.
    fn add(&self, chunks: Vec<Chunk>) -> Result<Vec<ChunkId>>;
    /// Up to `k` chunks ordered by descending similarity.
    fn search(&self, query: &str, k: usize) -> Result<Vec<Candidate>>;
    fn count(&self) -> usize;
    /// Bulk dump of the current contents, in insertion order.
    fn chunks(&self) -> Arc<Vec<Arc<Chunk>>>;
    fn clear(&self);
}

/// Anything that can turn a query into a ranked candidate list.
pub trait SearchEngine: Send + Sync {
    fn index(&self, chunks: Vec<Chunk>) -> Result<Vec<ChunkId>>;
    fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Candidate>>;
    fn count(&self) -> usize;
}
