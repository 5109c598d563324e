//! Protocol synthesis: board results and a score become a protocol card.

use crate::board::contract_violations;
use crate::consensus::board_modality;
use caseboard_types::{
    BoardId, BoardResult, CandidateProtocol, Consensus, EvidenceItem, Modality, NormalizedCase,
    ProtocolCard, Reproducibility, ScoreBasis,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Limitation stamped on every card.
pub const HEURISTIC_LIMITATION: &str =
    "Heuristic synthesis; boards are not model-merged until calibrated board models are in place";

/// Limitation added when consensus used its fallback score.
pub const FALLBACK_LIMITATION: &str = "Consensus fell back: no board contributed a score";

/// Baseline protocol steps used when no board suggests any.
pub const BASELINE_STEPS: [&str; 3] = [
    "Confirm diagnosis and stage",
    "Review lifestyle factors (sleep, activity, diet)",
    "Review current medications",
];

const CLINICAL_FOLLOW_UP_STEPS: [&str; 3] = [
    "Schedule neurocognitive evaluation (MoCA/MMSE baseline)",
    "Review sleep, activity and diet; capture caregiver notes",
    "Medication review; consider cholinesterase inhibitor if appropriate",
];

/// Configuration for protocol synthesis.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Model identifier recorded for reproducibility
    pub model_id: Option<String>,
}

/// Where the card's score comes from.
#[derive(Clone, Copy, Debug)]
pub enum ScoreSource<'a> {
    /// The consensus engine's result.
    Consensus(&'a Consensus),
    /// The clinical board's contribution alone, dampened around 0.5.
    ClinicalDampened,
}

/// Turns board results and a score into a [`ProtocolCard`]. Pure; no I/O.
#[derive(Clone, Debug, Default)]
pub struct ProtocolSynthesizer {
    config: SynthesisConfig,
}

impl ProtocolSynthesizer {
    pub fn new(config: SynthesisConfig) -> Self {
        Self { config }
    }

    pub fn synthesize(
        &self,
        case: &NormalizedCase,
        results: &BTreeMap<BoardId, BoardResult>,
        score: ScoreSource<'_>,
    ) -> ProtocolCard {
        let (resilience_index, basis, fell_back) = match score {
            ScoreSource::Consensus(c) => (c.score.clamp(0.0, 1.0), ScoreBasis::Consensus, c.fallback),
            ScoreSource::ClinicalDampened => {
                (clinical_dampened(results), ScoreBasis::ClinicalDampened, false)
            }
        };

        let mut limitations = vec![HEURISTIC_LIMITATION.to_string()];
        if fell_back {
            limitations.push(FALLBACK_LIMITATION.to_string());
        }
        limitations.extend(contract_violations(results));

        let reproducibility = Reproducibility {
            modalities: contributing_modalities(results),
            content_hash: Some(content_hash(case)),
            model_id: self.config.model_id.clone(),
        };

        let card = ProtocolCard::new(
            case.case_id.clone(),
            resilience_index,
            basis,
            candidate_protocols(results),
            evidence_items(results),
            limitations,
            reproducibility,
        );

        match case.raw.text_field("stage") {
            Some(stage) => card.with_stage(stage),
            None => card,
        }
    }
}

/// `0.5 + clinical ri_component - 0.10`, clamped to [0,1], two decimals.
pub fn clinical_dampened(results: &BTreeMap<BoardId, BoardResult>) -> f64 {
    let ri = results
        .get(&BoardId::clinical())
        .and_then(|r| r.ri_component)
        .filter(|ri| ri.is_finite())
        .unwrap_or(0.0);
    let score = (0.5 + ri - 0.10).clamp(0.0, 1.0);
    (score * 100.0).round() / 100.0
}

fn candidate_protocols(results: &BTreeMap<BoardId, BoardResult>) -> Vec<CandidateProtocol> {
    let mut protocols = Vec::new();

    let mut merged: Vec<String> = Vec::new();
    let mut contributors = 0usize;
    for result in results.values() {
        let mut supplied = false;
        for step in &result.steps {
            if step.trim().is_empty() {
                continue;
            }
            supplied = true;
            if !merged.contains(step) {
                merged.push(step.clone());
            }
        }
        contributors += usize::from(supplied);
    }
    if !merged.is_empty() {
        protocols.push(CandidateProtocol::new(
            "Board-merged plan",
            merged,
            format!("Steps suggested by {contributors} board(s), de-duplicated in board order"),
        ));
    }

    let clinical_signal = results
        .get(&BoardId::clinical())
        .is_some_and(|r| !r.findings.is_empty());
    if clinical_signal {
        protocols.push(
            CandidateProtocol::new(
                "Clinical follow-up",
                CLINICAL_FOLLOW_UP_STEPS.iter().map(|s| s.to_string()).collect(),
                "Triggered by clinical board findings",
            )
            .with_risk_notes("Confirm medication suitability before starting new therapy"),
        );
    }

    if protocols.is_empty() {
        protocols.push(CandidateProtocol::new(
            "Baseline cognitive support",
            BASELINE_STEPS.iter().map(|s| s.to_string()).collect(),
            "No board suggested steps; heuristic baseline",
        ));
    }
    protocols
}

fn evidence_items(results: &BTreeMap<BoardId, BoardResult>) -> Vec<EvidenceItem> {
    results
        .values()
        .flat_map(|r| {
            r.findings.iter().map(move |f| EvidenceItem {
                board: r.board.to_string(),
                key: f.key.clone(),
                magnitude: f.magnitude,
                rationale: f.rationale.clone(),
            })
        })
        .collect()
}

/// Modalities of boards that reported findings; clinical when none did.
fn contributing_modalities(results: &BTreeMap<BoardId, BoardResult>) -> Vec<Modality> {
    let mut modalities = Vec::new();
    for (board, result) in results {
        if result.findings.is_empty() {
            continue;
        }
        if let Some(m) = board_modality(board) {
            if !modalities.contains(&m) {
                modalities.push(m);
            }
        }
    }
    if modalities.is_empty() {
        modalities.push(Modality::Clinical);
    }
    modalities
}

/// `sha256:` digest of the raw case's canonical JSON.
fn content_hash(case: &NormalizedCase) -> String {
    // serde_json maps are key-sorted, so this serialization is canonical.
    let canonical = case.raw.raw().to_string();
    let digest = Sha256::digest(canonical.as_bytes());
    format!("sha256:{}", hex::encode(digest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::ConsensusEngine;
    use crate::normalize::normalize;
    use caseboard_types::{Case, EvidenceMap, Finding};
    use serde_json::json;

    fn case(raw: serde_json::Value) -> NormalizedCase {
        normalize(&Case::new(raw)).unwrap()
    }

    #[test]
    fn empty_results_still_yield_baseline_protocol() {
        let results = BTreeMap::new();
        let consensus = ConsensusEngine::default().evaluate(&results, &EvidenceMap::new());
        let card = ProtocolSynthesizer::default().synthesize(
            &case(json!({})),
            &results,
            ScoreSource::Consensus(&consensus),
        );

        assert_eq!(card.candidate_protocols().len(), 1);
        assert_eq!(card.candidate_protocols()[0].steps.len(), 3);
        assert_eq!(card.limitations()[0], HEURISTIC_LIMITATION);
        assert!(card.limitations().iter().any(|l| l == FALLBACK_LIMITATION));
        assert_eq!(card.reproducibility().modalities, vec![Modality::Clinical]);
        assert_eq!(card.case_id(), None);
    }

    #[test]
    fn steps_are_merged_in_first_seen_order() {
        let mut results = BTreeMap::new();
        results.insert(
            BoardId::clinical(),
            BoardResult::new(BoardId::clinical())
                .with_step("Repeat MoCA in 6 months")
                .with_step("Sleep hygiene review"),
        );
        results.insert(
            BoardId::environment(),
            BoardResult::new(BoardId::environment())
                .with_step("Sleep hygiene review")
                .with_step("Daily walking plan")
                .with_step("  "),
        );

        let card = ProtocolSynthesizer::default().synthesize(
            &case(json!({"case_id": "c-9"})),
            &results,
            ScoreSource::ClinicalDampened,
        );
        let plan = &card.candidate_protocols()[0];
        assert_eq!(plan.title, "Board-merged plan");
        assert_eq!(
            plan.steps,
            vec![
                "Repeat MoCA in 6 months",
                "Sleep hygiene review",
                "Daily walking plan"
            ]
        );
        assert_eq!(card.case_id(), Some("c-9"));
    }

    #[test]
    fn clinical_dampened_score() {
        let mut results = BTreeMap::new();
        results.insert(
            BoardId::clinical(),
            BoardResult::new(BoardId::clinical())
                .with_ri_component(0.4)
                .with_finding(Finding::new("mci_pattern_suspected", 0.7)),
        );
        assert_eq!(clinical_dampened(&results), 0.8);
        assert_eq!(clinical_dampened(&BTreeMap::new()), 0.4);

        let card = ProtocolSynthesizer::default().synthesize(
            &case(json!({})),
            &results,
            ScoreSource::ClinicalDampened,
        );
        assert_eq!(card.score_basis(), ScoreBasis::ClinicalDampened);
        assert_eq!(card.candidate_protocols()[0].title, "Clinical follow-up");
        assert_eq!(card.evidence().len(), 1);
    }

    #[test]
    fn content_hash_ignores_key_order() {
        let a = case(json!({"a": 1, "b": {"c": 2, "d": 3}}));
        let b = case(json!({"b": {"d": 3, "c": 2}, "a": 1}));
        assert_eq!(content_hash(&a), content_hash(&b));
        assert!(content_hash(&a).starts_with("sha256:"));
    }

    #[test]
    fn model_id_and_violations_are_recorded() {
        let mut results = BTreeMap::new();
        results.insert(
            BoardId::imaging(),
            BoardResult::new(BoardId::imaging()).with_ri_component(1.7),
        );
        let synthesizer = ProtocolSynthesizer::new(SynthesisConfig {
            model_id: Some("rules-v1".into()),
        });
        let card = synthesizer.synthesize(&case(json!({})), &results, ScoreSource::ClinicalDampened);
        assert_eq!(card.reproducibility().model_id.as_deref(), Some("rules-v1"));
        assert!(card.limitations().iter().any(|l| l.contains("outside [0,1]")));
    }
}
