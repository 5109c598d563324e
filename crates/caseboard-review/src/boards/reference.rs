//! Rule-based reference boards.
//!
//! Deterministic stand-ins for model-backed specialists, so the pipeline
//! can run end to end with no external service.

use crate::board::{Board, BoardOutput, BoardRegistry, RoleOutput};
use crate::error::BoardError;
use async_trait::async_trait;
use caseboard_types::{BoardId, BoardResult, Finding, Modality, NormalizedCase};
use serde_json::Value;
use std::sync::Arc;

const RATIONALE_CHARS: usize = 160;

fn clip(text: &str) -> String {
    let flat = text.trim().replace('\n', " ");
    if flat.chars().count() <= RATIONALE_CHARS {
        flat
    } else {
        let head: String = flat.chars().take(RATIONALE_CHARS - 3).collect();
        format!("{head}...")
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Clinical board: age and narrative cues for a mild cognitive impairment pattern.
#[derive(Debug, Default)]
pub struct ClinicalBoard;

impl ClinicalBoard {
    pub fn evaluate(case: &NormalizedCase) -> BoardResult {
        let mut confidence: f64 = 0.0;
        let mut notes = Vec::new();

        if let Some(age) = case.age().filter(|age| *age >= 80) {
            confidence += 0.30;
            notes.push(format!("age>=80 contributes 0.30 (age={age})"));
        }

        let narrative = case.clinical_notes.as_deref().unwrap_or_default();
        let lowered = narrative.to_lowercase();
        if lowered.contains("mci") || lowered.contains("mild cognitive") {
            confidence += 0.40;
            notes.push("clinical notes mention MCI/mild cognitive (+0.40)".to_string());
        }

        let result = BoardResult::new(BoardId::clinical()).with_notes(notes.join("; "));
        if confidence > 0.0 {
            let mut finding = Finding::new("mci_pattern_suspected", round2(confidence.min(0.95)));
            if !narrative.is_empty() {
                finding = finding.with_rationale(clip(narrative));
            }
            result
                .with_finding(finding)
                .with_ri_component(round2(confidence.min(0.40)))
                .with_step("Repeat cognitive screening (MoCA) within 6 months")
                .with_step("Record caregiver-reported changes in daily function")
        } else {
            result.with_ri_component(0.0)
        }
    }
}

#[async_trait]
impl Board for ClinicalBoard {
    fn id(&self) -> BoardId {
        BoardId::clinical()
    }

    async fn analyze(&self, case: &NormalizedCase) -> Result<BoardOutput, BoardError> {
        Ok(BoardOutput::Canonical(Self::evaluate(case)))
    }
}

/// Role board summarising one modality's observations.
///
/// Answers in the role-wrapped shape: one finding per observation key,
/// with no magnitude of its own.
#[derive(Debug)]
pub struct ModalityBoard {
    modality: Modality,
    role: String,
}

impl ModalityBoard {
    pub fn new(modality: Modality) -> Self {
        Self {
            modality,
            role: format!("{}_ai", modality.as_str()),
        }
    }

    fn summarize(&self, case: &NormalizedCase) -> RoleOutput {
        let mut findings = Vec::new();
        for obs in case.observations_for(self.modality) {
            for (key, value) in &obs.content {
                let rendered = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                findings.push(Finding::new(key.clone(), 0.0).with_rationale(clip(&rendered)));
            }
        }

        let notes = match findings.len() {
            0 => format!("no {} observations", self.modality),
            n => format!("{n} {} observation field(s) reviewed", self.modality),
        };
        RoleOutput { findings, notes }
    }
}

#[async_trait]
impl Board for ModalityBoard {
    fn id(&self) -> BoardId {
        BoardId::for_modality(self.modality)
    }

    async fn analyze(&self, case: &NormalizedCase) -> Result<BoardOutput, BoardError> {
        Ok(BoardOutput::RoleWrapped {
            role: self.role.clone(),
            raw: self.summarize(case),
        })
    }
}

/// The full set of reference boards.
pub struct ReferenceBoards;

impl ReferenceBoards {
    /// A registry with the clinical board and one role board per other modality.
    pub fn registry() -> BoardRegistry {
        let mut registry = BoardRegistry::new().with(Arc::new(ClinicalBoard));
        for modality in Modality::ALL {
            if modality != Modality::Clinical {
                registry.register(Arc::new(ModalityBoard::new(modality)));
            }
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::normalize_output;
    use crate::normalize::normalize;
    use caseboard_types::Case;
    use serde_json::json;

    fn case(raw: Value) -> NormalizedCase {
        normalize(&Case::new(raw)).unwrap()
    }

    #[test]
    fn clinical_board_scores_age_and_mci_mentions() {
        let result = ClinicalBoard::evaluate(&case(json!({
            "clinical_notes": "Family reports MCI symptoms",
            "demographics": {"age": 84}
        })));
        assert_eq!(result.ri_component, Some(0.4));
        assert_eq!(result.findings[0].key, "mci_pattern_suspected");
        assert_eq!(result.findings[0].magnitude, 0.7);
        assert_eq!(result.steps.len(), 2);
    }

    #[test]
    fn clinical_board_without_signal_contributes_zero() {
        let result = ClinicalBoard::evaluate(&case(json!({
            "clinical_notes": "memory decline and sleep fragmentation"
        })));
        assert_eq!(result.ri_component, Some(0.0));
        assert!(result.findings.is_empty());
        assert!(result.steps.is_empty());
    }

    #[test]
    fn age_alone_is_below_cap() {
        let result = ClinicalBoard::evaluate(&case(json!({"demographics": {"age": "81"}})));
        assert_eq!(result.ri_component, Some(0.3));
    }

    #[tokio::test]
    async fn imaging_board_reports_one_finding_per_key() {
        let board = ModalityBoard::new(Modality::Imaging);
        let output = board
            .analyze(&case(json!({"imaging": {"mri": "hippocampal atrophy", "pet": {"suvr": 1.4}}})))
            .await
            .unwrap();
        let result = normalize_output(&board.id(), output);
        assert_eq!(result.findings.len(), 2);
        assert_eq!(result.ri_component, Some(0.0));
        assert!(result.notes.starts_with("2 imaging"));
    }

    #[test]
    fn registry_holds_all_five_boards() {
        let registry = ReferenceBoards::registry();
        assert_eq!(registry.len(), 5);
        for modality in Modality::ALL {
            assert!(registry.get(&BoardId::for_modality(modality)).is_some());
        }
    }
}
