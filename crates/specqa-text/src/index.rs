use std::fmt::Display;
use std::sync::Arc;

use parking_lot::RwLock;
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, Occur, Query, TermQuery};
use tantivy::schema::{IndexRecordOption, Value};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tracing::{debug, info};

use specqa_core::traits::TextIndexer;
use specqa_core::{Candidate, Chunk, Error, Result};

use crate::analyzer::{build_schema, register_analyzer, tokenize, Fields};

const WRITER_HEAP_BYTES: usize = 50_000_000;

/// One fully committed index plus the chunk list its ordinals point into.
struct Built {
    reader: IndexReader,
    fields: Fields,
    chunks: Vec<Arc<Chunk>>,
}

/// BM25 keyword index, rebuilt wholesale.
///
/// `rebuild` creates a fresh RAM index, commits it, and only then swaps it
/// in, so a concurrent `search` sees either the old corpus or the new one.
#[derive(Default)]
pub struct LexicalIndex {
    current: RwLock<Option<Arc<Built>>>,
}

fn index_err(e: impl Display) -> Error { Error::Index(e.to_string()) }

impl LexicalIndex {
    pub fn new() -> Self { Self::default() }

    /// Number of chunks in the published index.
    pub fn len(&self) -> usize { self.current.read().as_ref().map_or(0, |b| b.chunks.len()) }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    pub fn clear(&self) { *self.current.write() = None; }

    fn build(chunks: &[Arc<Chunk>]) -> Result<Built> {
        let (schema, fields) = build_schema();
        let index = Index::create_in_ram(schema);
        register_analyzer(&index);

        let mut writer: IndexWriter = index.writer_with_num_threads(1, WRITER_HEAP_BYTES).map_err(index_err)?;
        for (ordinal, chunk) in chunks.iter().enumerate() {
            writer
                .add_document(doc!(fields.ordinal => ordinal as u64, fields.text => chunk.text.as_str()))
                .map_err(index_err)?;
        }
        writer.commit().map_err(index_err)?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(index_err)?;
        Ok(Built { reader, fields, chunks: chunks.to_vec() })
    }
}

impl TextIndexer for LexicalIndex {
    fn rebuild(&self, chunks: &[Arc<Chunk>]) -> Result<()> {
        if chunks.is_empty() {
            self.clear();
            debug!("lexical index cleared for empty corpus");
            return Ok(());
        }
        let built = Self::build(chunks)?;
        *self.current.write() = Some(Arc::new(built));
        info!(chunks = chunks.len(), "rebuilt lexical index");
        Ok(())
    }

    fn search(&self, query: &str, k: usize) -> Result<Vec<Candidate>> {
        let Some(built) = self.current.read().clone() else { return Err(Error::IndexUnavailable) };
        let tokens = tokenize(query);
        if k == 0 || tokens.is_empty() { return Ok(vec![]); }

        let clauses: Vec<(Occur, Box<dyn Query>)> = tokens
            .iter()
            .map(|t| {
                let term = Term::from_field_text(built.fields.text, t);
                (Occur::Should, Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs)) as Box<dyn Query>)
            })
            .collect();
        let query = BooleanQuery::new(clauses);

        let searcher = built.reader.searcher();
        let top_docs = searcher.search(&query, &TopDocs::with_limit(k)).map_err(index_err)?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, addr) in top_docs {
            if score <= 0.0 { continue; }
            let stored: TantivyDocument = searcher.doc(addr).map_err(index_err)?;
            let chunk = stored
                .get_first(built.fields.ordinal)
                .and_then(|v| v.as_u64())
                .and_then(|o| built.chunks.get(o as usize))
                .ok_or_else(|| Error::Index("stored ordinal out of range".into()))?;
            hits.push(Candidate::from_lexical(Arc::clone(chunk), score, hits.len() + 1));
        }
        debug!(k, tokens = tokens.len(), returned = hits.len(), "lexical search");
        Ok(hits)
    }

    fn is_ready(&self) -> bool { self.current.read().is_some() }
}
