use std::sync::Arc;

use specqa_core::traits::TextIndexer;
use specqa_core::{Chunk, ChunkMetadata, Error};
use specqa_text::LexicalIndex;

fn corpus(texts: &[&str]) -> Vec<Arc<Chunk>> {
    texts
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let mut c = Chunk::new(*t, ChunkMetadata::new("manual", 1));
            c.id = format!("doc_{i}");
            Arc::new(c)
        })
        .collect()
}

#[test]
fn unbuilt_index_is_not_ready_and_unavailable() {
    let index = LexicalIndex::new();
    assert!(!index.is_ready());
    assert!(matches!(index.search("power", 5), Err(Error::IndexUnavailable)));
}

#[test]
fn keyword_match_ranks_first() {
    let index = LexicalIndex::new();
    index
        .rebuild(&corpus(&[
            "Mounting bracket torque values",
            "DM8SE: 125W continuous power",
            "Crossover frequency 80 Hz",
        ]))
        .expect("rebuild");
    assert!(index.is_ready());
    assert_eq!(index.len(), 3);

    let hits = index.search("power rating of DM8SE", 5).expect("search");
    assert_eq!(hits.len(), 1, "only chunks with a positive score are returned");
    assert_eq!(hits[0].id(), "doc_1");
    assert_eq!(hits[0].lexical_rank, Some(1));
    assert!(hits[0].lexical_score.expect("score") > 0.0);
    assert!(hits[0].vector_score.is_none());
}

#[test]
fn matching_is_case_insensitive() {
    let index = LexicalIndex::new();
    index.rebuild(&corpus(&["Subwoofer PHASE switch", "amplifier gain"])).expect("rebuild");
    let hits = index.search("phase", 5).expect("search");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id(), "doc_0");
}

#[test]
fn rarer_and_repeated_terms_score_higher() {
    let index = LexicalIndex::new();
    index
        .rebuild(&corpus(&[
            "impedance impedance rating for the woofer",
            "impedance of the tweeter",
            "the cabinet finish",
            "the grille cloth",
        ]))
        .expect("rebuild");
    let hits = index.search("impedance", 10).expect("search");
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].id(), "doc_0");
    assert!(hits[0].lexical_score > hits[1].lexical_score);
    assert_eq!(hits[1].lexical_rank, Some(2));
}

#[test]
fn k_limits_results_and_zero_k_is_empty() {
    let index = LexicalIndex::new();
    index.rebuild(&corpus(&["bass port", "bass driver", "bass level"])).expect("rebuild");
    assert_eq!(index.search("bass", 2).expect("search").len(), 2);
    assert!(index.search("bass", 0).expect("search").is_empty());
    assert!(index.search("   ", 3).expect("search").is_empty());
}

#[test]
fn rebuild_replaces_the_corpus() {
    let index = LexicalIndex::new();
    index.rebuild(&corpus(&["old tweeter text"])).expect("first");
    index.rebuild(&corpus(&["new woofer text"])).expect("second");
    assert!(index.search("tweeter", 5).expect("search").is_empty());
    assert_eq!(index.search("woofer", 5).expect("search").len(), 1);
}

#[test]
fn empty_rebuild_unpublishes_the_index() {
    let index = LexicalIndex::new();
    index.rebuild(&corpus(&["some text"])).expect("first");
    index.rebuild(&[]).expect("empty");
    assert!(!index.is_ready());
    assert!(matches!(index.search("text", 5), Err(Error::IndexUnavailable)));
}
