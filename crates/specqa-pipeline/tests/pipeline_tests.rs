use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use specqa_core::config::Settings;
use specqa_core::traits::SearchEngine;
use specqa_core::{Candidate, Chunk, ChunkId, ChunkMetadata, Error};
use specqa_embed::HashEmbedder;
use specqa_pipeline::response::{EMPTY_CORPUS_MESSAGE, NO_CONTEXT_MESSAGE};
use specqa_pipeline::{ExtractiveGenerator, GenerationRequest, Generator, QaPipeline, QueryStatus};

fn all_enabled() -> Settings {
    Settings {
        hybrid_search_enabled: true,
        cache_enabled: true,
        confidence_scoring_enabled: true,
        metrics_enabled: true,
        ..Settings::default()
    }
}

fn corpus() -> Vec<Chunk> {
    [
        ("dm8se-manual", 2, "The DM8SE power rating is 125W continuous. Peak handling is 500W."),
        ("am10-manual", 5, "The AM10 loudspeaker mounts with an M10 eyebolt kit."),
        ("mb210-manual", 3, "Frequency response of the MB210 subwoofer is 40 Hz to 200 Hz."),
        ("pm8250-manual", 7, "Connect the amplifier to the network switch before powering on."),
    ]
    .into_iter()
    .map(|(source, page, text)| Chunk::new(text, ChunkMetadata::new(source, page)))
    .collect()
}

fn pipeline(settings: &Settings) -> QaPipeline {
    QaPipeline::in_memory(settings, Box::new(HashEmbedder::new(384)), Box::new(ExtractiveGenerator::default()))
}

struct CountingFailure(Arc<AtomicUsize>);

impl Generator for CountingFailure {
    fn generate(&self, _request: &GenerationRequest<'_>) -> anyhow::Result<String> {
        self.0.fetch_add(1, Ordering::SeqCst);
        anyhow::bail!("model timed out")
    }
}

struct StubEngine {
    count: usize,
    fail: bool,
}

impl SearchEngine for StubEngine {
    fn index(&self, _chunks: Vec<Chunk>) -> specqa_core::Result<Vec<ChunkId>> { Ok(vec![]) }

    fn retrieve(&self, _query: &str, _k: usize) -> specqa_core::Result<Vec<Candidate>> {
        if self.fail { Err(Error::Retrieval("vector: down; lexical: down".into())) } else { Ok(vec![]) }
    }

    fn count(&self) -> usize { self.count }
}

#[test]
fn empty_corpus_is_no_context() {
    let qa = pipeline(&all_enabled());
    let r = qa.answer_query("DM8SE power rating", false);
    assert_eq!(r.status, QueryStatus::NoContext);
    assert_eq!(r.answer, EMPTY_CORPUS_MESSAGE);
    assert!(r.sources.is_empty());
}

#[test]
fn answers_with_sources_and_confidence() {
    let qa = pipeline(&all_enabled());
    let report = qa.ingest(corpus()).expect("ingest");
    assert_eq!((report.documents, report.chunks_added, report.total_chunks), (4, 4, 4));

    let r = qa.answer_query("DM8SE power rating", true);
    assert_eq!(r.status, QueryStatus::Success);
    assert!(r.answer.contains("125W"), "answer was {:?}", r.answer);
    assert_eq!(r.sources[0].index, 1);
    assert_eq!(r.sources[0].source, "dm8se-manual");
    assert_eq!(r.sources[0].page, 2);
    assert!(r.sources[0].lexical_score.is_some());
    assert_eq!(r.cache_hit, Some(false));
    let confidence = r.confidence.expect("confidence");
    assert!(confidence.enabled);
    assert!((0.0..=1.0).contains(&confidence.overall));
}

#[test]
fn repeat_question_hits_the_cache() {
    let qa = pipeline(&all_enabled());
    qa.ingest(corpus()).expect("ingest");
    let first = qa.answer_query("DM8SE power rating", false);
    let second = qa.answer_query("  dm8se POWER rating ", false);
    assert_eq!(second.cache_hit, Some(true));
    assert_eq!(second.answer, first.answer);
    assert_eq!(second.sources, first.sources);

    let stats = qa.cache().get_stats();
    assert_eq!((stats.hits, stats.misses), (1, 1));
    let summary = qa.metrics().summary();
    assert_eq!(summary.cache.expect("cache").hits, 1);
    assert_eq!(summary.overview.expect("overview").successful, 2);
}

#[test]
fn ingest_invalidates_cached_answers() {
    let qa = pipeline(&all_enabled());
    qa.ingest(corpus()).expect("ingest");
    qa.answer_query("DM8SE power rating", false);
    qa.ingest(vec![Chunk::new("The DM8SE weighs 4.2 kg.", ChunkMetadata::new("dm8se-addendum", 1))])
        .expect("second ingest");
    assert!(qa.cache().is_empty());
    assert_eq!(qa.answer_query("DM8SE power rating", false).cache_hit, Some(false));
    assert_eq!(qa.document_count(), 5);
}

#[test]
fn disabled_enhancements_leave_optional_fields_out() {
    let qa = pipeline(&Settings::default());
    qa.ingest(corpus()).expect("ingest");
    let r = qa.answer_query("DM8SE power rating", false);
    assert_eq!(r.status, QueryStatus::Success);
    assert!(r.confidence.is_none());
    assert!(r.cache_hit.is_none());
    assert!(r.sources.iter().all(|s| s.lexical_score.is_none()), "vector-only when fusion is off");
    assert!(!qa.system_info().metrics.enabled);

    let json = serde_json::to_value(&r).expect("serialize");
    assert_eq!(json["status"], "success");
    assert!(json.get("confidence").is_none());
}

#[test]
fn generation_failure_is_an_error_response() {
    let calls = Arc::new(AtomicUsize::new(0));
    let settings = all_enabled();
    let qa = QaPipeline::in_memory(
        &settings,
        Box::new(HashEmbedder::new(384)),
        Box::new(CountingFailure(Arc::clone(&calls))),
    );
    qa.ingest(corpus()).expect("ingest");

    let r = qa.answer_query("DM8SE power rating", false);
    assert_eq!(r.status, QueryStatus::Error);
    assert!(r.error.as_deref().is_some_and(|e| e.contains("model timed out")));
    qa.answer_query("DM8SE power rating", false);
    assert_eq!(calls.load(Ordering::SeqCst), 2, "errors are never cached");

    let summary = qa.metrics().summary();
    assert_eq!(summary.errors["generation"], 2);
    assert_eq!(summary.overview.expect("overview").failed, 2);
}

#[test]
fn retrieval_failure_is_an_error_response() {
    let qa = QaPipeline::from_settings(
        StubEngine { count: 3, fail: true },
        Box::new(ExtractiveGenerator::default()),
        &all_enabled(),
    );
    let r = qa.answer_query("anything", false);
    assert_eq!(r.status, QueryStatus::Error);
    assert!(r.answer.starts_with("Error processing query:"));
    assert_eq!(qa.metrics().summary().errors["retrieval"], 1);
}

#[test]
fn empty_retrieval_is_no_context() {
    let qa = QaPipeline::from_settings(
        StubEngine { count: 3, fail: false },
        Box::new(ExtractiveGenerator::default()),
        &all_enabled(),
    );
    let r = qa.answer_query("unrelated", false);
    assert_eq!(r.status, QueryStatus::NoContext);
    assert_eq!(r.answer, NO_CONTEXT_MESSAGE);
    assert!(qa.cache().is_empty());
}

#[test]
fn ingests_a_directory_of_text_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("dm8se.txt"), "The DM8SE power rating is 125W.\n\nImpedance is 8 ohm.").expect("write");
    fs::write(dir.path().join("mb210.txt"), "The MB210 reaches 40 Hz.\x0cPage two text.").expect("write");
    fs::write(dir.path().join("notes.md"), "ignored").expect("write");

    let qa = pipeline(&all_enabled());
    let report = qa.ingest_directory(dir.path(), None).expect("ingest");
    assert_eq!((report.documents, report.chunks_added), (2, 4));

    let limited = pipeline(&all_enabled());
    let report = limited.ingest_directory(dir.path(), Some(1)).expect("ingest");
    assert_eq!(report.documents, 1);

    let info = qa.system_info();
    assert_eq!(info.document_count, 4);
    assert_eq!(info.generator, "extractive");
    assert!(info.cache.enabled);
}
