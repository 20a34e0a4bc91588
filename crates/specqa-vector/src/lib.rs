//! specqa-vector
//!
//! In-process passage store: chunks plus their embeddings, searched by
//! exact cosine similarity. Writers build a new snapshot off to the side
//! and publish it with a pointer swap, so searches never observe a
//! half-written store.

pub mod similarity;
pub mod store;

pub use store::PassageStore;
