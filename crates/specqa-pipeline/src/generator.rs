use std::time::Duration;

use anyhow::{bail, Result};

use specqa_core::Candidate;

/// Everything a generator gets for one question.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub query: &'a str,
    pub prompt: &'a str,
    pub candidates: &'a [Candidate],
    /// Upper bound for a single attempt.
    pub timeout: Duration,
}

/// Produces a free-text answer from a prompt and its retrieved context.
pub trait Generator: Send + Sync {
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<String>;

    fn name(&self) -> &str { "generator" }
}

impl<G: Generator + ?Sized> Generator for Box<G> {
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<String> { (**self).generate(request) }

    fn name(&self) -> &str { (**self).name() }
}

/// Answers with the retrieved sentence that shares the most words with the
/// question. Needs no model, so it is what the CLI and tests run with.
#[derive(Debug, Clone)]
pub struct ExtractiveGenerator {
    max_sentences: usize,
}

impl Default for ExtractiveGenerator {
    fn default() -> Self { Self { max_sentences: 2 } }
}

impl ExtractiveGenerator {
    pub fn new(max_sentences: usize) -> Self { Self { max_sentences: max_sentences.max(1) } }
}

fn split_sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    for (i, c) in text.char_indices() {
        if matches!(c, '.' | '!' | '?') {
            let next = text[i + c.len_utf8()..].chars().next();
            if next.map_or(true, char::is_whitespace) {
                let end = i + c.len_utf8();
                out.push(text[start..end].trim());
                start = end;
            }
        }
    }
    out.push(text[start..].trim());
    out.retain(|s| !s.is_empty());
    out
}

fn words(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| w.chars().count() >= 3)
        .collect()
}

impl Generator for ExtractiveGenerator {
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<String> {
        let Some(top) = request.candidates.first() else { bail!("no retrieved context to answer from") };
        let query_words = words(request.query);

        let mut best: Option<(usize, &Candidate, usize)> = None;
        for cand in request.candidates {
            for (pos, sentence) in split_sentences(cand.text()).into_iter().enumerate() {
                let overlap = words(sentence).iter().filter(|w| query_words.contains(w)).count();
                if overlap > best.map_or(0, |b| b.0) {
                    best = Some((overlap, cand, pos));
                }
            }
        }

        let (source, first) = best.map_or((top, 0), |(_, cand, pos)| (cand, pos));
        let answer = split_sentences(source.text())
            .into_iter()
            .skip(first)
            .take(self.max_sentences)
            .collect::<Vec<_>>()
            .join(" ");
        Ok(answer)
    }

    fn name(&self) -> &str { "extractive" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use specqa_core::{Chunk, ChunkMetadata};
    use std::sync::Arc;

    fn cands(texts: &[&str]) -> Vec<Candidate> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| Candidate::from_vector(Arc::new(Chunk::new(*t, ChunkMetadata::new("m", 1))), 0.5, i + 1))
            .collect()
    }

    fn request<'a>(query: &'a str, candidates: &'a [Candidate]) -> GenerationRequest<'a> {
        GenerationRequest { query, prompt: "", candidates, timeout: Duration::from_secs(1) }
    }

    #[test]
    fn sentences_split_on_terminal_punctuation() {
        assert_eq!(split_sentences("Rated 1.5 A. Fuse inside! Ok"), ["Rated 1.5 A.", "Fuse inside!", "Ok"]);
    }

    #[test]
    fn picks_the_best_matching_sentence() {
        let c = cands(&[
            "Mounting uses four screws. Torque to 4 Nm.",
            "The amplifier has two inputs. Power rating is 125W continuous. Keep vents clear.",
        ]);
        let g = ExtractiveGenerator::new(1);
        let answer = g.generate(&request("What is the power rating?", &c)).expect("answer");
        assert_eq!(answer, "Power rating is 125W continuous.");
    }

    #[test]
    fn falls_back_to_the_top_passage() {
        let c = cands(&["DM8SE: 125W continuous power", "Other text"]);
        let answer = ExtractiveGenerator::default().generate(&request("xyz", &c)).expect("answer");
        assert_eq!(answer, "DM8SE: 125W continuous power");
    }

    #[test]
    fn no_context_is_an_error() {
        assert!(ExtractiveGenerator::default().generate(&request("q", &[])).is_err());
    }
}
