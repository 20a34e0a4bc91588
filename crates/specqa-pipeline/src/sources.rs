use serde::{Deserialize, Serialize};

use specqa_core::Candidate;

pub const SNIPPET_CHARS: usize = 150;

/// A citation shown alongside an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    /// 1-based position in the final ranking.
    pub index: usize,
    pub source: String,
    pub page: u32,
    pub content_type: String,
    pub snippet: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_score: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lexical_score: Option<f32>,
}

impl SourceRef {
    pub fn from_candidates(candidates: &[Candidate]) -> Vec<Self> {
        candidates
            .iter()
            .enumerate()
            .map(|(i, c)| Self {
                index: i + 1,
                source: c.chunk.metadata.source.clone(),
                page: c.chunk.metadata.page,
                content_type: c.chunk.metadata.content_type(),
                snippet: snippet(c.text(), SNIPPET_CHARS),
                vector_score: c.vector_score,
                lexical_score: c.lexical_score,
            })
            .collect()
    }
}

/// Shorten `text` to at most `max_chars` characters, preferring to end at a
/// sentence, then at a word, when either falls in the last 30%.
pub fn snippet(text: &str, max_chars: usize) -> String {
    let Some((cut, _)) = text.char_indices().nth(max_chars) else { return text.trim().to_string() };
    let head = &text[..cut];
    let threshold = max_chars as f64 * 0.7;
    let char_pos = |byte: usize| head[..byte].chars().count() as f64;

    if let Some(p) = head.rfind('.').filter(|&p| char_pos(p) > threshold) {
        return head[..=p].trim().to_string();
    }
    if let Some(s) = head.rfind(' ').filter(|&s| char_pos(s) > threshold) {
        return format!("{}...", head[..s].trim());
    }
    format!("{}...", head.trim())
}

/// Normalize generator output: collapse whitespace, drop code fences and a
/// leading `Answer:` label, and capitalize an all-lowercase answer.
pub fn clean_answer(raw: &str) -> String {
    let text = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let text = text.replace("```", "").replace("Answer:", "").replace("ANSWER:", "");
    let text = text.trim();

    let has_upper = text.chars().any(char::is_uppercase);
    let has_lower = text.chars().any(char::is_lowercase);
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if has_lower && !has_upper => first.to_uppercase().chain(chars).collect(),
        _ => text.to_string(),
    }
}
