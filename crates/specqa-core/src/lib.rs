//! specqa-core
//!
//! Shared domain types, the error taxonomy, the traits sitting between the
//! engines, configuration loading and plain-text ingestion.

pub mod config;
pub mod data_processor;
pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use types::{Candidate, Chunk, ChunkId, ChunkMetadata, MetaValue};
