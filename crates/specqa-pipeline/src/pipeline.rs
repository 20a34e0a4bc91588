use std::collections::BTreeSet;
use std::path::Path;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use specqa_cache::{CacheStats, QueryCache};
use specqa_confidence::ConfidenceScorer;
use specqa_core::config::Settings;
use specqa_core::data_processor::DataProcessor;
use specqa_core::traits::{Embedder, SearchEngine};
use specqa_core::{Chunk, Result};
use specqa_hybrid::{FusionConfig, InMemoryRetriever};
use specqa_metrics::{MetricsCollector, MetricsSummary, QueryRecord};

use crate::generator::{GenerationRequest, Generator};
use crate::prompt::PromptBuilder;
use crate::response::{QueryResponse, EMPTY_CORPUS_MESSAGE, NO_CONTEXT_MESSAGE};
use crate::sources::{clean_answer, SourceRef};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    /// Distinct `source` values among the new chunks.
    pub documents: usize,
    pub chunks_added: usize,
    pub total_chunks: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemInfo {
    pub document_count: usize,
    pub generator: String,
    pub top_k: usize,
    pub confidence_scoring: bool,
    pub cache: CacheStats,
    pub metrics: MetricsSummary,
}

/// Question answering over an in-process corpus.
///
/// Holds the retrieval engine, the generator and the three optional
/// enhancements (answer cache, confidence scorer, metrics). Each
/// enhancement is built from [`Settings`] and can be swapped out with the
/// `with_*` methods.
pub struct QaPipeline<S: SearchEngine = InMemoryRetriever> {
    engine: S,
    generator: Box<dyn Generator>,
    prompts: PromptBuilder,
    cache: QueryCache<QueryResponse>,
    scorer: ConfidenceScorer,
    metrics: MetricsCollector,
    top_k: usize,
    generation_timeout: Duration,
}

impl QaPipeline<InMemoryRetriever> {
    /// Hybrid retriever over an in-memory store using `embedder`.
    pub fn in_memory(settings: &Settings, embedder: Box<dyn Embedder>, generator: Box<dyn Generator>) -> Self {
        let engine = InMemoryRetriever::in_memory(embedder, FusionConfig::from_settings(settings));
        Self::from_settings(engine, generator, settings)
    }
}

impl<S: SearchEngine> QaPipeline<S> {
    pub fn from_settings(engine: S, generator: Box<dyn Generator>, settings: &Settings) -> Self {
        info!(
            hybrid = settings.hybrid_search_enabled,
            cache = settings.cache_enabled,
            confidence = settings.confidence_scoring_enabled,
            metrics = settings.metrics_enabled,
            generator = generator.name(),
            "pipeline initialized"
        );
        Self {
            engine,
            generator,
            prompts: PromptBuilder::default(),
            cache: QueryCache::from_settings(settings),
            scorer: ConfidenceScorer::new(settings.confidence_scoring_enabled),
            metrics: MetricsCollector::from_settings(settings),
            top_k: settings.top_k.max(1),
            generation_timeout: Duration::from_secs(settings.generation_timeout_secs),
        }
    }

    #[must_use]
    pub fn with_cache(mut self, cache: QueryCache<QueryResponse>) -> Self {
        self.cache = cache;
        self
    }

    #[must_use]
    pub fn with_scorer(mut self, scorer: ConfidenceScorer) -> Self {
        self.scorer = scorer;
        self
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: MetricsCollector) -> Self {
        self.metrics = metrics;
        self
    }

    #[must_use]
    pub fn with_prompts(mut self, prompts: PromptBuilder) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn engine(&self) -> &S { &self.engine }

    pub fn cache(&self) -> &QueryCache<QueryResponse> { &self.cache }

    pub fn metrics(&self) -> &MetricsCollector { &self.metrics }

    pub fn document_count(&self) -> usize { self.engine.count() }

    /// Index `chunks` and drop every cached answer.
    pub fn ingest(&self, chunks: Vec<Chunk>) -> Result<IngestReport> {
        let documents = chunks.iter().map(|c| c.metadata.source.as_str()).collect::<BTreeSet<_>>().len();
        let chunks_added = chunks.len();
        if chunks_added > 0 {
            self.engine.index(chunks)?;
            self.cache.clear();
        }
        let report = IngestReport { documents, chunks_added, total_chunks: self.engine.count() };
        info!(documents, chunks_added, total = report.total_chunks, "ingested chunks");
        Ok(report)
    }

    /// Chunk every `.txt` file under `dir` (the first `limit` when given) and ingest.
    pub fn ingest_directory(&self, dir: &Path, limit: Option<usize>) -> Result<IngestReport> {
        let processor = DataProcessor::new();
        let chunks = match limit {
            Some(limit) => processor.process_directory_limited(dir, limit)?,
            None => processor.process_directory(dir)?,
        };
        self.ingest(chunks)
    }

    /// Answer `question` from the indexed corpus.
    ///
    /// Never fails: retrieval and generation errors come back as
    /// `status = error`, an empty corpus or empty retrieval as `no_context`.
    pub fn answer_query(&self, question: &str, verbose: bool) -> QueryResponse {
        let started = Instant::now();
        let context = self.cache_context();
        let cache_flag = self.cache.is_enabled().then_some(false);

        if let Some(cached) = self.cache.get(question, Some(&context)) {
            step(verbose, "cache", "answer served from cache");
            let response = cached.timed(started.elapsed()).with_cache_hit(Some(true));
            let mut record = QueryRecord::new(question, true, started.elapsed()).cache_hit(true);
            if let Some(score) = &response.confidence {
                record = record.confidence(score.overall);
            }
            self.metrics.record(record);
            return response;
        }

        if self.engine.count() == 0 {
            warn!("query against an empty corpus");
            self.metrics.record(QueryRecord::new(question, false, started.elapsed()));
            return QueryResponse::no_context(EMPTY_CORPUS_MESSAGE).timed(started.elapsed()).with_cache_hit(cache_flag);
        }

        step(verbose, "retrieval", "searching documents");
        let retrieval_started = Instant::now();
        let candidates = match self.engine.retrieve(question, self.top_k) {
            Ok(candidates) => candidates,
            Err(e) => {
                error!(error = %e, "retrieval failed");
                return self.failed(question, "retrieval", &e.to_string(), started, cache_flag);
            }
        };
        let retrieval_time = retrieval_started.elapsed();
        debug!(found = candidates.len(), ms = retrieval_time.as_millis(), "retrieved candidates");

        if candidates.is_empty() {
            step(verbose, "retrieval", "no relevant passages");
            self.metrics.record(
                QueryRecord::new(question, false, started.elapsed()).component("retrieval", retrieval_time),
            );
            return QueryResponse::no_context(NO_CONTEXT_MESSAGE).timed(started.elapsed()).with_cache_hit(cache_flag);
        }

        step(verbose, "generation", "generating answer");
        let prompt = self.prompts.build(question, &candidates);
        let request = GenerationRequest {
            query: question,
            prompt: &prompt,
            candidates: &candidates,
            timeout: self.generation_timeout,
        };
        let generation_started = Instant::now();
        let answer = match self.generator.generate(&request) {
            Ok(raw) => clean_answer(&raw),
            Err(e) => {
                error!(error = %e, "generation failed");
                return self.failed(question, "generation", &format!("{e:#}"), started, cache_flag);
            }
        };
        let generation_time = generation_started.elapsed();

        let retrieval_scores: Vec<f32> = candidates.iter().filter_map(|c| c.vector_score).collect();
        let scoring_started = Instant::now();
        let confidence = self.scorer.is_enabled().then(|| {
            let scores = (!retrieval_scores.is_empty()).then_some(retrieval_scores.as_slice());
            self.scorer.score(question, &answer, &candidates, scores)
        });
        let scoring_time = scoring_started.elapsed();
        if let Some(score) = &confidence {
            step(verbose, "confidence", score.label.as_str());
        }

        let response = QueryResponse::success(answer, SourceRef::from_candidates(&candidates), confidence)
            .timed(started.elapsed())
            .with_cache_hit(cache_flag);
        self.cache.set(question, response.clone(), Some(&context));

        let mut record = QueryRecord::new(question, true, started.elapsed())
            .retrieval_scores(retrieval_scores)
            .component("retrieval", retrieval_time)
            .component("generation", generation_time);
        if let Some(score) = &response.confidence {
            record = record.confidence(score.overall).component("scoring", scoring_time);
        }
        self.metrics.record(record);
        info!(sources = response.sources.len(), secs = response.time, "answered query");
        response
    }

    fn failed(&self, question: &str, kind: &str, message: &str, started: Instant, cache_flag: Option<bool>) -> QueryResponse {
        self.metrics.record_error(kind, message);
        self.metrics.record(QueryRecord::new(question, false, started.elapsed()).error(message));
        QueryResponse::error(message).timed(started.elapsed()).with_cache_hit(cache_flag)
    }

    pub fn system_info(&self) -> SystemInfo {
        SystemInfo {
            document_count: self.engine.count(),
            generator: self.generator.name().to_string(),
            top_k: self.top_k,
            confidence_scoring: self.scorer.is_enabled(),
            cache: self.cache.get_stats(),
            metrics: self.metrics.summary(),
        }
    }

    /// Drop cached answers; returns how many were held.
    pub fn clear_cache(&self) -> usize {
        let n = self.cache.len();
        self.cache.clear();
        n
    }

    /// Cache context used for `answer_query` lookups.
    pub fn cache_context(&self) -> Value { json!({ "top_k": self.top_k }) }
}

fn step(verbose: bool, stage: &str, detail: &str) {
    if verbose {
        info!(stage, "{detail}");
    } else {
        debug!(stage, "{detail}");
    }
}
