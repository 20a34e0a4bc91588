use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The embedding function failed; the whole batch is rejected.
    #[error("Embedding failed: {0}")]
    Embedding(String),

    /// The lexical index has not been built for the current corpus.
    #[error("Lexical index unavailable")]
    IndexUnavailable,

    /// Both retrieval paths failed for a query.
    #[error("Retrieval failed: {0}")]
    Retrieval(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
