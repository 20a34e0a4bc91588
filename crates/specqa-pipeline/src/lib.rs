//! specqa-pipeline
//!
//! `answer_query` orchestration: cache lookup, hybrid retrieval, prompt
//! building, generation with retries, confidence scoring and metrics.

pub mod generator;
pub mod pipeline;
pub mod prompt;
pub mod response;
pub mod retry;
pub mod sources;

pub use generator::{ExtractiveGenerator, GenerationRequest, Generator};
pub use pipeline::{IngestReport, QaPipeline, SystemInfo};
pub use prompt::{PromptBuilder, QueryIntent};
pub use response::{QueryResponse, QueryStatus};
pub use retry::{GenerationError, RetryPolicy, RetryingGenerator};
pub use sources::{clean_answer, snippet, SourceRef};
