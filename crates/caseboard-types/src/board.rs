//! Canonical board results.

use crate::evidence::Modality;
use serde::{Deserialize, Serialize};

/// Identifier of a specialist board.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoardId(pub String);

impl BoardId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The board associated with a modality.
    pub fn for_modality(modality: Modality) -> Self {
        Self::new(modality.as_str())
    }

    pub fn clinical() -> Self {
        Self::for_modality(Modality::Clinical)
    }

    pub fn imaging() -> Self {
        Self::for_modality(Modality::Imaging)
    }

    pub fn genomics() -> Self {
        Self::for_modality(Modality::Genomics)
    }

    pub fn pharma() -> Self {
        Self::for_modality(Modality::Pharma)
    }

    pub fn environment() -> Self {
        Self::for_modality(Modality::Environment)
    }
}

impl std::fmt::Display for BoardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for BoardId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A normalized signal from a board. `magnitude` is in [0,1].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    #[serde(alias = "label", alias = "id")]
    pub key: String,
    #[serde(default, alias = "confidence")]
    pub magnitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

impl Finding {
    pub fn new(key: impl Into<String>, magnitude: f64) -> Self {
        Self {
            key: key.into(),
            magnitude,
            rationale: None,
        }
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }
}

/// Uniform result emitted by every board adapter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoardResult {
    pub board: BoardId,
    #[serde(default)]
    pub findings: Vec<Finding>,
    /// Contribution to the aggregate score; `None` means the board declines
    /// to contribute for lack of evidence.
    #[serde(default)]
    pub ri_component: Option<f64>,
    #[serde(default)]
    pub notes: String,
    /// Explicit evidence flag; overrides the modality lookup in consensus.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub had_evidence: Option<bool>,
    /// Suggested protocol steps, in board order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<String>,
}

impl BoardResult {
    /// A result that declines to contribute.
    pub fn new(board: BoardId) -> Self {
        Self {
            board,
            findings: Vec::new(),
            ri_component: None,
            notes: String::new(),
            had_evidence: None,
            steps: Vec::new(),
        }
    }

    pub fn with_ri_component(mut self, ri: f64) -> Self {
        self.ri_component = Some(ri);
        self
    }

    pub fn with_finding(mut self, finding: Finding) -> Self {
        self.findings.push(finding);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn with_had_evidence(mut self, had_evidence: bool) -> Self {
        self.had_evidence = Some(had_evidence);
        self
    }

    pub fn with_step(mut self, step: impl Into<String>) -> Self {
        self.steps.push(step.into());
        self
    }

    /// Whether the contribution, if any, lies in [0,1].
    pub fn ri_in_range(&self) -> bool {
        self.ri_component
            .map_or(true, |ri| (0.0..=1.0).contains(&ri))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn finding_accepts_label_and_confidence_aliases() {
        let f: Finding = serde_json::from_value(json!({
            "label": "MCI pattern suspected",
            "confidence": 0.7
        }))
        .unwrap();
        assert_eq!(f.key, "MCI pattern suspected");
        assert!((f.magnitude - 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_ri_component_means_declined() {
        let r: BoardResult = serde_json::from_value(json!({"board": "env"})).unwrap();
        assert_eq!(r.ri_component, None);
        assert!(r.ri_in_range());
    }

    #[test]
    fn out_of_range_ri_is_detected() {
        let r = BoardResult::new(BoardId::imaging()).with_ri_component(1.4);
        assert!(!r.ri_in_range());
    }
}
