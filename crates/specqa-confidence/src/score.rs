use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLabel {
    VeryLow,
    Low,
    Medium,
    High,
}

impl ConfidenceLabel {
    /// Thresholds are inclusive: 0.85 is high, 0.70 medium, 0.50 low.
    pub fn from_score(overall: f64) -> Self {
        if overall >= 0.85 {
            Self::High
        } else if overall >= 0.70 {
            Self::Medium
        } else if overall >= 0.50 {
            Self::Low
        } else {
            Self::VeryLow
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::VeryLow => "very_low",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn explanation(self) -> &'static str {
        match self {
            Self::High => "High confidence. Answer is well-grounded in source documents with specific technical details.",
            Self::Medium => "Medium confidence. Answer appears accurate but verify critical specifications.",
            Self::Low => "Low confidence. Answer may be incomplete or lack supporting details.",
            Self::VeryLow => "Very low confidence. Limited information found. Consider rephrasing your question.",
        }
    }

    pub fn recommendation(self) -> &'static str {
        match self {
            Self::High => "This answer is reliable and well-supported by documentation.",
            Self::Medium => "This answer appears accurate but verify critical specifications.",
            Self::Low => "Information may be incomplete. Consider checking source documents.",
            Self::VeryLow => {
                "Limited information found. Try rephrasing your question or check if relevant documents are available."
            }
        }
    }
}

impl fmt::Display for ConfidenceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights {
    pub retrieval: f64,
    pub grounding: f64,
    pub specificity: f64,
    pub uncertainty: f64,
}

pub const WEIGHTS: Weights = Weights { retrieval: 0.40, grounding: 0.35, specificity: 0.15, uncertainty: 0.10 };

/// Per-factor sub-scores, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Breakdown {
    pub retrieval: f64,
    pub grounding: f64,
    pub specificity: f64,
    pub uncertainty: f64,
}

impl Breakdown {
    pub fn weighted_sum(&self, w: &Weights) -> f64 {
        self.retrieval * w.retrieval
            + self.grounding * w.grounding
            + self.specificity * w.specificity
            + self.uncertainty * w.uncertainty
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceScore {
    pub overall: f64,
    pub label: ConfidenceLabel,
    /// `None` when scoring is disabled.
    pub breakdown: Option<Breakdown>,
    pub explanation: String,
    pub enabled: bool,
}

impl ConfidenceScore {
    pub fn from_breakdown(breakdown: Breakdown) -> Self {
        let overall = breakdown.weighted_sum(&WEIGHTS).clamp(0.0, 1.0);
        let label = ConfidenceLabel::from_score(overall);
        Self { overall, label, breakdown: Some(breakdown), explanation: label.explanation().to_string(), enabled: true }
    }

    /// Fixed neutral score reported when scoring is turned off.
    pub fn neutral() -> Self {
        Self {
            overall: 0.75,
            label: ConfidenceLabel::Medium,
            breakdown: None,
            explanation: String::new(),
            enabled: false,
        }
    }

    /// User-facing advice; empty when scoring is disabled.
    pub fn recommendation(&self) -> &'static str {
        if self.enabled { self.label.recommendation() } else { "" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_sum_to_one() {
        let w = WEIGHTS;
        assert!((w.retrieval + w.grounding + w.specificity + w.uncertainty - 1.0).abs() < 1e-12);
    }

    #[test]
    fn labels_switch_exactly_at_thresholds() {
        assert_eq!(ConfidenceLabel::from_score(0.85), ConfidenceLabel::High);
        assert_eq!(ConfidenceLabel::from_score(0.8499999), ConfidenceLabel::Medium);
        assert_eq!(ConfidenceLabel::from_score(0.70), ConfidenceLabel::Medium);
        assert_eq!(ConfidenceLabel::from_score(0.6999999), ConfidenceLabel::Low);
        assert_eq!(ConfidenceLabel::from_score(0.50), ConfidenceLabel::Low);
        assert_eq!(ConfidenceLabel::from_score(0.4999999), ConfidenceLabel::VeryLow);
        assert_eq!(ConfidenceLabel::from_score(0.0), ConfidenceLabel::VeryLow);
        assert_eq!(ConfidenceLabel::from_score(1.0), ConfidenceLabel::High);
    }

    #[test]
    fn neutral_score_has_no_breakdown_or_advice() {
        let s = ConfidenceScore::neutral();
        assert_eq!(s.label, ConfidenceLabel::Medium);
        assert!(s.breakdown.is_none());
        assert_eq!(s.recommendation(), "");
    }
}
