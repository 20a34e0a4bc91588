use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use specqa_core::Candidate;

use crate::score::{Breakdown, ConfidenceScore};

static TERM_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\b\w{4,}\b").ok());

static MODEL_NUMBER_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"[A-Z]{2,}\d+|[A-Z]+-\d+").ok());

/// Number followed by a unit: frequency, level, impedance, power, voltage,
/// current, distance, channel count, bitrate.
static UNIT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\d+\s*(hz|khz|mhz|ghz)",
        r"\d+\s*(db|dba|dbc)",
        r"\d+\s*(ohm|Ω|ω)",
        r"\d+\s*(watt|w|kw)",
        r"\d+\s*(volt|v|mv)",
        r"\d+\s*(amp|a|ma)",
        r"\d+\s*(meter|m|cm|mm|feet|ft|inch|in)",
        r"\d+\s*(channel|ch)",
        r"\d+\s*(bit|kbps|mbps)",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

const STOP_WORDS: &[&str] = &[
    "that", "this", "with", "from", "have", "been", "were", "their", "there", "which", "would", "could", "should",
    "about", "when", "what", "where", "your", "does", "only",
];

const ADMISSIONS: &[&str] =
    &["i don't know", "i cannot find", "no information available", "not mentioned in", "insufficient information"];

const HEDGES: &[&str] = &["may be", "might be", "possibly", "perhaps", "could be"];

/// Scores answers; stateless apart from the on/off switch.
#[derive(Debug, Clone)]
pub struct ConfidenceScorer {
    enabled: bool,
}

impl Default for ConfidenceScorer {
    fn default() -> Self { Self::new(true) }
}

impl ConfidenceScorer {
    pub fn new(enabled: bool) -> Self { Self { enabled } }

    pub fn is_enabled(&self) -> bool { self.enabled }

    /// Score `answer` against the candidates it was generated from.
    ///
    /// `retrieval_scores` are similarity scores in `[0, 1]`; when absent the
    /// retrieval factor falls back to the candidate count.
    pub fn score(
        &self,
        query: &str,
        answer: &str,
        candidates: &[Candidate],
        retrieval_scores: Option<&[f32]>,
    ) -> ConfidenceScore {
        if !self.enabled { return ConfidenceScore::neutral(); }

        let breakdown = Breakdown {
            retrieval: retrieval_factor(candidates.len(), retrieval_scores),
            grounding: grounding_factor(answer, candidates),
            specificity: specificity_factor(answer),
            uncertainty: uncertainty_factor(answer),
        };
        let score = ConfidenceScore::from_breakdown(breakdown);
        debug!(
            query = %query.chars().take(50).collect::<String>(),
            overall = score.overall,
            label = %score.label,
            "scored answer"
        );
        score
    }
}

pub fn retrieval_factor(candidate_count: usize, scores: Option<&[f32]>) -> f64 {
    if candidate_count == 0 { return 0.0; }
    match scores.and_then(|s| s.iter().copied().reduce(f32::max)) {
        Some(top) if top > 0.7 => 0.95,
        Some(top) if top > 0.5 => 0.85,
        Some(top) if top > 0.3 => 0.75,
        Some(_) => 0.65,
        None => match candidate_count {
            1 => 0.80,
            2 => 0.85,
            _ => 0.90,
        },
    }
}

/// Distinct answer words of four or more characters, minus stop words.
fn answer_terms(answer_lower: &str) -> BTreeSet<&str> {
    let Some(re) = TERM_RE.as_ref() else { return BTreeSet::new() };
    re.find_iter(answer_lower).map(|m| m.as_str()).filter(|t| !STOP_WORDS.contains(t)).collect()
}

pub fn grounding_factor(answer: &str, candidates: &[Candidate]) -> f64 {
    if candidates.is_empty() || answer.is_empty() { return 0.5; }
    let answer_lower = answer.to_lowercase();
    let terms = answer_terms(&answer_lower);
    if terms.is_empty() { return 0.70; }

    let source_text = candidates.iter().map(|c| c.text().to_lowercase()).collect::<Vec<_>>().join(" ");
    let matched = terms.iter().filter(|t| source_text.contains(**t)).count();
    let ratio = matched as f64 / terms.len() as f64;
    if ratio > 0.7 {
        0.95
    } else if ratio > 0.5 {
        0.85
    } else if ratio > 0.3 {
        0.75
    } else {
        0.60
    }
}

pub fn specificity_factor(answer: &str) -> f64 {
    if answer.trim().chars().count() < 10 { return 0.3; }
    let lower = answer.to_lowercase();
    match UNIT_PATTERNS.iter().filter(|re| re.is_match(&lower)).count() {
        0 if MODEL_NUMBER_RE.as_ref().is_some_and(|re| re.is_match(answer)) => 0.80,
        0 => 0.5,
        1 => 0.85,
        2 => 0.90,
        _ => 0.95,
    }
}

pub fn uncertainty_factor(answer: &str) -> f64 {
    let lower = answer.to_lowercase();
    if ADMISSIONS.iter().any(|p| lower.contains(p)) { return 0.3; }
    match HEDGES.iter().filter(|p| lower.contains(*p)).count() {
        0 => 1.0,
        1 => 0.90,
        _ => 0.80,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retrieval_uses_best_score() {
        assert_eq!(retrieval_factor(3, Some(&[0.2, 0.72, 0.4][..])), 0.95);
        assert_eq!(retrieval_factor(1, Some(&[0.7][..])), 0.85);
        assert_eq!(retrieval_factor(1, Some(&[0.31][..])), 0.75);
        assert_eq!(retrieval_factor(1, Some(&[0.3][..])), 0.65);
    }

    #[test]
    fn retrieval_without_scores_counts_candidates() {
        assert_eq!(retrieval_factor(0, None), 0.0);
        assert_eq!(retrieval_factor(0, Some(&[0.9][..])), 0.0);
        assert_eq!(retrieval_factor(1, None), 0.80);
        assert_eq!(retrieval_factor(2, Some(&[][..])), 0.85);
        assert_eq!(retrieval_factor(7, None), 0.90);
    }

    #[test]
    fn specificity_counts_distinct_unit_kinds() {
        assert_eq!(specificity_factor("short"), 0.3);
        assert_eq!(specificity_factor("The DM8SE delivers 125W continuous."), 0.85);
        assert_eq!(specificity_factor("Rated 125 watts into 8 ohm."), 0.90);
        assert_eq!(specificity_factor("Rated 125W into 8 ohm from 35 Hz upward."), 0.95);
        assert_eq!(specificity_factor("Refer to the DM8SE manual section."), 0.80);
        assert_eq!(specificity_factor("Refer to the manual section."), 0.5);
    }

    #[test]
    fn admissions_outweigh_hedges() {
        assert_eq!(uncertainty_factor("The gain is fixed."), 1.0);
        assert_eq!(uncertainty_factor("It may be 8 ohms."), 0.90);
        assert_eq!(uncertainty_factor("It may be 8 ohms, possibly 4."), 0.80);
        assert_eq!(uncertainty_factor("I don't know, it may be 8 ohms."), 0.3);
        assert_eq!(uncertainty_factor("This is not mentioned in the manual."), 0.3);
    }

    #[test]
    fn stop_words_are_not_terms() {
        let terms = answer_terms("this would have been about power");
        assert_eq!(terms.into_iter().collect::<Vec<_>>(), ["power"]);
    }
}
