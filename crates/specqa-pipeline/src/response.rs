use std::time::Duration;

use serde::{Deserialize, Serialize};

use specqa_confidence::ConfidenceScore;

use crate::sources::SourceRef;

pub const NO_CONTEXT_MESSAGE: &str = "No relevant information found in the documents. Try rephrasing your question \
                                      or ask about: specifications, installation, configuration, or features.";

pub const EMPTY_CORPUS_MESSAGE: &str = "No documents have been ingested yet. Ingest documents before asking questions.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStatus {
    Success,
    NoContext,
    Error,
}

/// What `answer_query` hands back. Optional fields are absent when the
/// feature behind them is disabled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResponse {
    pub status: QueryStatus,
    pub answer: String,
    pub sources: Vec<SourceRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<ConfidenceScore>,
    /// Wall-clock seconds spent on this call.
    pub time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_hit: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueryResponse {
    pub fn success(answer: String, sources: Vec<SourceRef>, confidence: Option<ConfidenceScore>) -> Self {
        Self {
            status: QueryStatus::Success,
            answer,
            sources,
            confidence,
            time: 0.0,
            cache_hit: None,
            error: None,
        }
    }

    pub fn no_context(message: &str) -> Self {
        Self {
            status: QueryStatus::NoContext,
            answer: message.to_string(),
            sources: vec![],
            confidence: None,
            time: 0.0,
            cache_hit: None,
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            status: QueryStatus::Error,
            answer: format!("Error processing query: {message}"),
            sources: vec![],
            confidence: None,
            time: 0.0,
            cache_hit: None,
            error: Some(message),
        }
    }

    #[must_use]
    pub fn timed(mut self, elapsed: Duration) -> Self {
        self.time = elapsed.as_secs_f64();
        self
    }

    #[must_use]
    pub fn with_cache_hit(mut self, hit: Option<bool>) -> Self {
        self.cache_hit = hit;
        self
    }

    pub fn is_success(&self) -> bool { self.status == QueryStatus::Success }
}
