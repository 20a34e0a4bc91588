//! specqa-embed
//!
//! Embedding functions for the passage store. The hashing embedder is
//! deterministic and model-free; the BGE-M3 model is available behind the
//! `bge` feature.

use anyhow::Result;
use std::hash::{Hash, Hasher};
use twox_hash::XxHash64;

pub use specqa_core::traits::Embedder;

#[cfg(feature = "bge")]
mod bge;

#[cfg(feature = "bge")]
pub use bge::{masked_mean_l2, BgeEmbedder};

/// Bag-of-tokens embedder: each normalized token is hashed into one of
/// `dim` buckets and the result is L2-normalized.
///
/// Identical texts produce identical vectors, and texts sharing tokens
/// score a positive cosine similarity, which is all the passage store
/// needs in tests and offline setups.
#[derive(Debug, Clone)]
pub struct HashEmbedder { dim: usize }

impl HashEmbedder {
    pub fn new(dim: usize) -> Self { Self { dim: dim.max(1) } }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for token in text.split_whitespace().map(normalize_token).filter(|t| !t.is_empty()) {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h % self.dim as u64) as usize;
            let val = ((h >> 32) as u32) as f32 / u32::MAX as f32;
            v[idx] += 0.5 + val;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        for x in &mut v { *x /= norm; }
        v
    }
}

impl Embedder for HashEmbedder {
    fn dim(&self) -> usize { self.dim }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

fn normalize_token(token: &str) -> String {
    token.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase()
}

/// Pick the embedder for this process.
///
/// `APP_USE_HASH_EMBEDDINGS=1` forces the hashing embedder; without the
/// `bge` feature it is the only option.
pub fn get_default_embedder(dim: usize) -> Result<Box<dyn Embedder>> {
    let use_hash = std::env::var("APP_USE_HASH_EMBEDDINGS")
        .ok()
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));
    if use_hash || !cfg!(feature = "bge") {
        tracing::info!(dim, "using hashing embedder");
        return Ok(Box::new(HashEmbedder::new(dim)));
    }
    load_model()
}

#[cfg(feature = "bge")]
fn load_model() -> Result<Box<dyn Embedder>> {
    let dir = bge::resolve_model_dir()?;
    Ok(Box::new(BgeEmbedder::load(&dir)?))
}

#[cfg(not(feature = "bge"))]
fn load_model() -> Result<Box<dyn Embedder>> {
    anyhow::bail!("specqa-embed was built without the `bge` feature")
}
