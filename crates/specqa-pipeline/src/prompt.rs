use tracing::debug;

use specqa_core::Candidate;

const SPEC_KEYWORDS: &[&str] = &[
    "specification", "spec", "what is the", "value", "rating", "db", "hz", "ohm", "maximum", "minimum", "frequency",
    "response", "snr", "spl",
];

const PROCEDURE_KEYWORDS: &[&str] =
    &["how", "configure", "setup", "install", "connect", "steps", "procedure", "guide", "set up", "connection"];

/// What kind of answer a question is after. Matching is by substring on
/// the lowercased question; specification wins over procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryIntent {
    Specification,
    Procedure,
    General,
}

impl QueryIntent {
    pub fn detect(query: &str) -> Self {
        let q = query.to_lowercase();
        if SPEC_KEYWORDS.iter().any(|kw| q.contains(kw)) {
            Self::Specification
        } else if PROCEDURE_KEYWORDS.iter().any(|kw| q.contains(kw)) {
            Self::Procedure
        } else {
            Self::General
        }
    }
}

#[derive(Debug, Clone)]
pub struct PromptBuilder {
    domain: String,
}

impl Default for PromptBuilder {
    fn default() -> Self { Self::new("professional audio equipment") }
}

impl PromptBuilder {
    pub fn new(domain: impl Into<String>) -> Self { Self { domain: domain.into() } }

    /// Numbered `[Source i]` blocks separated by horizontal rules.
    pub fn context(candidates: &[Candidate]) -> String {
        candidates
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let meta = &c.chunk.metadata;
                format!(
                    "[Source {}] {} (Page {}, Type: {})\n{}",
                    i + 1,
                    meta.source,
                    meta.page,
                    meta.content_type(),
                    c.text()
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n---\n\n")
    }

    pub fn build(&self, query: &str, candidates: &[Candidate]) -> String {
        let intent = QueryIntent::detect(query);
        debug!(?intent, passages = candidates.len(), "building prompt");
        let context = Self::context(candidates);
        let domain = &self.domain;

        let (role, lead, instructions) = match intent {
            QueryIntent::Specification => (
                format!("You are a technical specification expert for {domain}."),
                "Use ONLY the provided documentation to answer the question.",
                "1. Answer using ONLY the documentation above\n\
                 2. Be specific and technical\n\
                 3. Include units (dB, Hz, Ohm) when applicable\n\
                 4. If not found, say \"Not mentioned in the provided documents\"\n\
                 5. Be concise",
            ),
            QueryIntent::Procedure => (
                format!("You are a technical support specialist for {domain}."),
                "Use ONLY the provided documentation for step-by-step instructions.",
                "1. Use numbered steps (1, 2, 3, etc.)\n\
                 2. Use ONLY the documentation\n\
                 3. Be clear and practical\n\
                 4. If not documented, say \"Instructions not found in documentation\"\n\
                 5. Keep it brief",
            ),
            QueryIntent::General => (
                format!("You are an expert on {domain}."),
                "Answer using ONLY the provided documentation.",
                "1. Use only the documentation above\n\
                 2. Be accurate and helpful\n\
                 3. Say if information is not available\n\
                 4. Keep response brief",
            ),
        };

        format!(
            "{role}\n\n{lead}\n\nDOCUMENTATION:\n{context}\n\nQUESTION: {query}\n\nINSTRUCTIONS:\n{instructions}\n\nANSWER:"
        )
    }
}
