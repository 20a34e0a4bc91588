use std::cmp::Ordering;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use specqa_core::traits::{Embedder, VectorIndexer};
use specqa_core::{Candidate, Chunk, ChunkId, Error, Result};

use crate::similarity::{distance, score_from_distance};

type Snapshot = Arc<Vec<Arc<Chunk>>>;

/// Chunks plus embeddings, searched by exact cosine similarity.
///
/// Readers clone the current snapshot `Arc` and never block on a writer
/// for longer than that clone. Writers are serialized and publish a new
/// snapshot only after the whole batch has been embedded.
pub struct PassageStore {
    embedder: Box<dyn Embedder>,
    snapshot: RwLock<Snapshot>,
    writer: Mutex<()>,
}

impl PassageStore {
    pub fn new(embedder: Box<dyn Embedder>) -> Self {
        Self { embedder, snapshot: RwLock::new(Arc::new(Vec::new())), writer: Mutex::new(()) }
    }

    pub fn dim(&self) -> usize { self.embedder.dim() }

    pub fn embedder(&self) -> &dyn Embedder { self.embedder.as_ref() }

    fn current(&self) -> Snapshot { Arc::clone(&self.snapshot.read()) }

    fn embed_chunks(&self, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>> {
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self
            .embedder
            .embed_batch(&texts)
            .map_err(|e| Error::Embedding(e.to_string()))?;
        if embeddings.len() != chunks.len() {
            return Err(Error::Embedding(format!(
                "expected {} vectors, embedder returned {}",
                chunks.len(),
                embeddings.len()
            )));
        }
        let dim = self.embedder.dim();
        if let Some(bad) = embeddings.iter().find(|e| e.len() != dim) {
            return Err(Error::Embedding(format!("expected dimension {dim}, got {}", bad.len())));
        }
        Ok(embeddings)
    }
}

impl VectorIndexer for PassageStore {
    fn add(&self, chunks: Vec<Chunk>) -> Result<Vec<ChunkId>> {
        if chunks.is_empty() { return Ok(vec![]); }
        if let Some(pos) = chunks.iter().position(|c| c.text.trim().is_empty()) {
            return Err(Error::InvalidInput(format!("chunk {pos} in batch has empty text")));
        }

        let _guard = self.writer.lock();
        let embeddings = self.embed_chunks(&chunks)?;

        let current = self.current();
        let base = current.len();
        let mut next: Vec<Arc<Chunk>> = Vec::with_capacity(base + chunks.len());
        next.extend(current.iter().cloned());

        let mut ids = Vec::with_capacity(chunks.len());
        for (offset, (mut chunk, embedding)) in chunks.into_iter().zip(embeddings).enumerate() {
            chunk.id = format!("doc_{}", base + offset);
            chunk.embedding = Some(embedding);
            ids.push(chunk.id.clone());
            next.push(Arc::new(chunk));
        }

        let total = next.len();
        *self.snapshot.write() = Arc::new(next);
        info!(added = ids.len(), total, "added chunks to passage store");
        Ok(ids)
    }

    fn search(&self, query: &str, k: usize) -> Result<Vec<Candidate>> {
        let chunks = self.current();
        if chunks.is_empty() || k == 0 { return Ok(vec![]); }

        let query_vec = self.embedder.embed(query).map_err(|e| Error::Embedding(e.to_string()))?;
        let mut scored: Vec<(usize, f32)> = chunks
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.embedding.as_deref().map(|e| (i, distance(&query_vec, e))))
            .collect();
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal).then(a.0.cmp(&b.0)));
        scored.truncate(k.min(chunks.len()));

        debug!(k, returned = scored.len(), "vector search");
        Ok(scored
            .into_iter()
            .enumerate()
            .map(|(pos, (i, dist))| Candidate::from_vector(Arc::clone(&chunks[i]), score_from_distance(dist), pos + 1))
            .collect())
    }

    fn count(&self) -> usize { self.snapshot.read().len() }

    fn chunks(&self) -> Arc<Vec<Arc<Chunk>>> { self.current() }

    fn clear(&self) {
        let _guard = self.writer.lock();
        *self.snapshot.write() = Arc::new(Vec::new());
        info!("cleared passage store");
    }
}
