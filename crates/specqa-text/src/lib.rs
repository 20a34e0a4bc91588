//! specqa-text
//!
//! BM25 keyword index over the passage store's chunks, held in a tantivy
//! RAM index. Text is lowercased and split on whitespace; there is no
//! stemming and no stop-word removal.

pub mod analyzer;
pub mod index;

pub use analyzer::tokenize;
pub use index::LexicalIndex;
