//! Domain types shared by the passage store, the lexical index and fusion.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

pub type ChunkId = String;

/// A scalar metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaValue::Bool(v) => write!(f, "{v}"),
            MetaValue::Int(v) => write!(f, "{v}"),
            MetaValue::Float(v) => write!(f, "{v}"),
            MetaValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<&str> for MetaValue {
    fn from(value: &str) -> Self { MetaValue::Text(value.to_string()) }
}

impl From<String> for MetaValue {
    fn from(value: String) -> Self { MetaValue::Text(value) }
}

impl From<i64> for MetaValue {
    fn from(value: i64) -> Self { MetaValue::Int(value) }
}

impl From<f64> for MetaValue {
    fn from(value: f64) -> Self { MetaValue::Float(value) }
}

impl From<bool> for MetaValue {
    fn from(value: bool) -> Self { MetaValue::Bool(value) }
}

/// Citation metadata attached to every chunk.
///
/// `source` and `page` are always present; anything else the ingestion
/// step knows about (`content_type`, `processor`, ...) goes in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: String,
    pub page: u32,
    #[serde(flatten)]
    pub extra: BTreeMap<String, MetaValue>,
}

impl ChunkMetadata {
    pub fn new(source: impl Into<String>, page: u32) -> Self {
        Self { source: source.into(), page, extra: BTreeMap::new() }
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&MetaValue> { self.extra.get(key) }

    /// `content_type` when present, `"text"` otherwise.
    pub fn content_type(&self) -> String {
        self.extra.get("content_type").map_or_else(|| "text".to_string(), ToString::to_string)
    }
}

/// A unit of retrievable content.
///
/// - `id`: assigned by the passage store when the chunk is added; empty before
/// - `text`: normalized passage content, never empty once stored
/// - `metadata`: citation data (`source`, `page`) plus open extensions
/// - `embedding`: present once the chunk lives in the passage store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub text: String,
    pub metadata: ChunkMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl Chunk {
    /// A chunk fresh from ingestion: no id and no embedding yet.
    pub fn new(text: impl Into<String>, metadata: ChunkMetadata) -> Self {
        Self { id: ChunkId::new(), text: text.into(), metadata, embedding: None }
    }
}

/// Indicates which engine produced a result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceKind {
    Vector,
    Lexical,
    Hybrid,
}

/// A chunk annotated with the retrieval evidence gathered for one query.
///
/// `fused_rank` is 1-based. Sub-searches fill it with their own position;
/// fusion overwrites it with the final position.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub chunk: Arc<Chunk>,
    pub vector_score: Option<f32>,
    pub lexical_score: Option<f32>,
    pub vector_rank: Option<usize>,
    pub lexical_rank: Option<usize>,
    pub fused_score: Option<f64>,
    pub fused_rank: usize,
    pub source: SourceKind,
}

impl Candidate {
    pub fn from_vector(chunk: Arc<Chunk>, score: f32, rank: usize) -> Self {
        Self {
            chunk,
            vector_score: Some(score),
            lexical_score: None,
            vector_rank: Some(rank),
            lexical_rank: None,
            fused_score: None,
            fused_rank: rank,
            source: SourceKind::Vector,
        }
    }

    pub fn from_lexical(chunk: Arc<Chunk>, score: f32, rank: usize) -> Self {
        Self {
            chunk,
            vector_score: None,
            lexical_score: Some(score),
            vector_rank: None,
            lexical_rank: Some(rank),
            fused_score: None,
            fused_rank: rank,
            source: SourceKind::Lexical,
        }
    }

    pub fn id(&self) -> &str { &self.chunk.id }

    pub fn text(&self) -> &str { &self.chunk.text }
}
