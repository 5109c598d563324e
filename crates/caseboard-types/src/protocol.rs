//! Protocol cards: the synthesized recommendation document.

use crate::evidence::Modality;
use crate::job::JobId;
use serde::{Deserialize, Serialize};

/// One candidate protocol.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CandidateProtocol {
    pub title: String,
    pub steps: Vec<String>,
    pub rationale: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_notes: Option<String>,
}

impl CandidateProtocol {
    pub fn new(
        title: impl Into<String>,
        steps: Vec<String>,
        rationale: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            steps,
            rationale: rationale.into(),
            risk_notes: None,
        }
    }

    pub fn with_risk_notes(mut self, notes: impl Into<String>) -> Self {
        self.risk_notes = Some(notes.into());
        self
    }
}

/// A board finding surfaced as evidence on the card.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub board: String,
    pub key: String,
    pub magnitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

/// What is needed to reproduce a card.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Reproducibility {
    /// Modalities of boards that reported findings.
    pub modalities: Vec<Modality>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
}

/// How the card's score was obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBasis {
    /// Taken from the consensus engine.
    Consensus,
    /// Recomputed from the clinical board alone, dampened.
    ClinicalDampened,
}

/// Where the card's case identifier came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseIdSource {
    Case,
    JobIdFallback,
}

/// Recommendation document produced once per completed job.
///
/// Immutable after construction except for the provenance fields set by
/// [`ProtocolCard::attach_provenance`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProtocolCard {
    case_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    case_id_source: Option<CaseIdSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    job_id: Option<JobId>,
    stage: Option<String>,
    resilience_index: f64,
    score_basis: ScoreBasis,
    projected_outcome_delta: Option<f64>,
    candidate_protocols: Vec<CandidateProtocol>,
    evidence: Vec<EvidenceItem>,
    limitations: Vec<String>,
    reproducibility: Reproducibility,
}

impl ProtocolCard {
    pub fn new(
        case_id: Option<String>,
        resilience_index: f64,
        score_basis: ScoreBasis,
        candidate_protocols: Vec<CandidateProtocol>,
        evidence: Vec<EvidenceItem>,
        limitations: Vec<String>,
        reproducibility: Reproducibility,
    ) -> Self {
        let case_id_source = case_id.as_ref().map(|_| CaseIdSource::Case);
        Self {
            case_id,
            case_id_source,
            job_id: None,
            stage: None,
            resilience_index,
            score_basis,
            projected_outcome_delta: None,
            candidate_protocols,
            evidence,
            limitations,
            reproducibility,
        }
    }

    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = Some(stage.into());
        self
    }

    pub fn with_projected_outcome_delta(mut self, delta: f64) -> Self {
        self.projected_outcome_delta = Some(delta);
        self
    }

    /// Record the owning job; the job id stands in for a missing case id.
    pub fn attach_provenance(&mut self, job_id: &JobId) {
        if self.case_id.is_none() {
            self.case_id = Some(job_id.to_string());
            self.case_id_source = Some(CaseIdSource::JobIdFallback);
        }
        self.job_id = Some(job_id.clone());
    }

    pub fn case_id(&self) -> Option<&str> {
        self.case_id.as_deref()
    }

    pub fn case_id_source(&self) -> Option<CaseIdSource> {
        self.case_id_source
    }

    pub fn job_id(&self) -> Option<&JobId> {
        self.job_id.as_ref()
    }

    pub fn stage(&self) -> Option<&str> {
        self.stage.as_deref()
    }

    pub fn resilience_index(&self) -> f64 {
        self.resilience_index
    }

    pub fn score_basis(&self) -> ScoreBasis {
        self.score_basis
    }

    pub fn projected_outcome_delta(&self) -> Option<f64> {
        self.projected_outcome_delta
    }

    pub fn candidate_protocols(&self) -> &[CandidateProtocol] {
        &self.candidate_protocols
    }

    pub fn evidence(&self) -> &[EvidenceItem] {
        &self.evidence
    }

    pub fn limitations(&self) -> &[String] {
        &self.limitations
    }

    pub fn reproducibility(&self) -> &Reproducibility {
        &self.reproducibility
    }
}
