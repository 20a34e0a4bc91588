//! specqa-hybrid
//!
//! Runs the passage store and the lexical index for each query and merges
//! their rankings with reciprocal rank fusion.

use parking_lot::Mutex;
use tracing::{debug, error, warn};

use specqa_core::config::Settings;
use specqa_core::traits::{Embedder, SearchEngine, TextIndexer, VectorIndexer};
use specqa_core::{Candidate, Chunk, ChunkId, Error, Result};
use specqa_text::LexicalIndex;
use specqa_vector::PassageStore;

pub mod rrf;

pub use rrf::{fuse, DEFAULT_RRF_K};

#[derive(Debug, Clone, PartialEq)]
pub struct FusionConfig {
    /// When false, every query goes straight to the passage store.
    pub enabled: bool,
    /// Weight of the vector ranking; the lexical ranking gets `1 - alpha`.
    pub alpha: f64,
    /// Each sub-search fetches `k * candidate_multiplier` candidates.
    pub candidate_multiplier: usize,
    pub rrf_k: f64,
}

impl Default for FusionConfig {
    fn default() -> Self { Self { enabled: true, alpha: 0.5, candidate_multiplier: 3, rrf_k: DEFAULT_RRF_K } }
}

impl FusionConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            enabled: settings.hybrid_search_enabled,
            alpha: f64::from(settings.hybrid_search_alpha),
            candidate_multiplier: settings.candidate_multiplier.max(1),
            rrf_k: settings.rrf_k,
        }
    }
}

pub struct HybridRetriever<TI, VI>
where
    TI: TextIndexer,
    VI: VectorIndexer,
{
    lexical: TI,
    vector: VI,
    config: FusionConfig,
    /// Held across store add and lexical rebuild so rebuilds publish in
    /// the same order as store snapshots.
    writer: Mutex<()>,
}

/// The in-process pairing used by the pipeline.
pub type InMemoryRetriever = HybridRetriever<LexicalIndex, PassageStore>;

impl InMemoryRetriever {
    pub fn in_memory(embedder: Box<dyn Embedder>, config: FusionConfig) -> Self {
        Self::new(LexicalIndex::new(), PassageStore::new(embedder), config)
    }
}

impl<TI, VI> HybridRetriever<TI, VI>
where
    TI: TextIndexer,
    VI: VectorIndexer,
{
    pub fn new(lexical: TI, vector: VI, config: FusionConfig) -> Self {
        Self {
            lexical,
            vector,
            config: FusionConfig {
                alpha: config.alpha.clamp(0.0, 1.0),
                rrf_k: if config.rrf_k > 0.0 && config.rrf_k.is_finite() { config.rrf_k } else { DEFAULT_RRF_K },
                ..config
            },
            writer: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &FusionConfig { &self.config }

    pub fn set_alpha(&mut self, alpha: f64) { self.config.alpha = alpha.clamp(0.0, 1.0); }

    pub fn lexical(&self) -> &TI { &self.lexical }

    pub fn vector(&self) -> &VI { &self.vector }

    /// Add chunks to the passage store, then rebuild the lexical index from
    /// the store's full contents so both see the same chunk set.
    ///
    /// If the rebuild fails the lexical index is unpublished, leaving
    /// retrieval vector-only until the next successful `index`.
    pub fn index(&self, chunks: Vec<Chunk>) -> Result<Vec<ChunkId>> {
        let _writer = self.writer.lock();
        let ids = self.vector.add(chunks)?;
        if let Err(e) = self.lexical.rebuild(&self.vector.chunks()) {
            error!(error = %e, "lexical rebuild failed, retrieval is vector-only");
            if let Err(clear_err) = self.lexical.rebuild(&[]) {
                warn!(error = %clear_err, "failed to unpublish lexical index");
            }
            return Err(e);
        }
        Ok(ids)
    }

    pub fn clear(&self) {
        let _writer = self.writer.lock();
        self.vector.clear();
        if let Err(e) = self.lexical.rebuild(&[]) {
            warn!(error = %e, "failed to clear lexical index");
        }
    }

    pub fn count(&self) -> usize { self.vector.count() }

    pub fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Candidate>> {
        let corpus = self.vector.count();
        if k == 0 || corpus == 0 { return Ok(vec![]); }

        if !self.config.enabled || !self.lexical.is_ready() {
            return self.vector_only(query, k);
        }

        let pool = k.saturating_mul(self.config.candidate_multiplier).min(corpus);
        let vector = self.vector.search(query, pool);
        let lexical = self.lexical.search(query, pool);

        match (vector, lexical) {
            (Ok(v), Ok(l)) => {
                let fused = fuse(v, l, self.config.alpha, self.config.rrf_k, k);
                debug!(k, pool, returned = fused.len(), alpha = self.config.alpha, "hybrid retrieval");
                Ok(fused)
            }
            (Ok(mut v), Err(Error::IndexUnavailable)) => {
                debug!("lexical index unpublished mid-query, using vector results only");
                v.truncate(k);
                Ok(v)
            }
            (Ok(mut v), Err(e)) => {
                warn!(error = %e, "lexical search failed, using vector results only");
                v.truncate(k);
                Ok(v)
            }
            (Err(e), Ok(mut l)) => {
                warn!(error = %e, "vector search failed, using lexical results only");
                l.truncate(k);
                Ok(l)
            }
            (Err(ve), Err(le)) => {
                error!(vector = %ve, lexical = %le, "both retrieval paths failed");
                Err(Error::Retrieval(format!("vector: {ve}; lexical: {le}")))
            }
        }
    }

    fn vector_only(&self, query: &str, k: usize) -> Result<Vec<Candidate>> {
        self.vector.search(query, k).map_err(|e| {
            error!(error = %e, "vector search failed");
            Error::Retrieval(e.to_string())
        })
    }
}

impl<TI, VI> SearchEngine for HybridRetriever<TI, VI>
where
    TI: TextIndexer,
    VI: VectorIndexer,
{
    fn index(&self, chunks: Vec<Chunk>) -> Result<Vec<ChunkId>> { Self::index(self, chunks) }
    fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Candidate>> { Self::retrieve(self, query, k) }
    fn count(&self) -> usize { Self::count(self) }
}
