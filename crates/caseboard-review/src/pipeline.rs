//! The review pipeline: selection, invocation, consensus and synthesis in sequence.

use crate::board::{invoke_boards, BoardRegistry};
use crate::consensus::{ConsensusConfig, ConsensusEngine};
use crate::error::ReviewResult;
use crate::normalize::normalize;
use crate::selection::{select_boards, Selection};
use crate::synthesis::{ProtocolSynthesizer, ScoreSource, SynthesisConfig};
use caseboard_types::{BoardId, BoardResult, Case, Consensus, NormalizedCase, ProtocolCard};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Everything one review produced.
#[derive(Clone, Debug)]
pub struct Review {
    pub selection: Selection,
    pub case: Arc<NormalizedCase>,
    pub boards: BTreeMap<BoardId, BoardResult>,
    pub consensus: Consensus,
    pub card: ProtocolCard,
}

/// Runs one case from evidence detection to a protocol card.
///
/// Each step completes before the next begins. Board faults are absorbed
/// by the invocation adapter; only a case that cannot be normalized fails
/// the review.
#[derive(Clone, Debug)]
pub struct ReviewPipeline {
    registry: Arc<BoardRegistry>,
    consensus: ConsensusEngine,
    synthesizer: ProtocolSynthesizer,
}

impl ReviewPipeline {
    pub fn new(
        registry: Arc<BoardRegistry>,
        consensus: ConsensusConfig,
        synthesis: SynthesisConfig,
    ) -> Self {
        Self {
            registry,
            consensus: ConsensusEngine::new(consensus),
            synthesizer: ProtocolSynthesizer::new(synthesis),
        }
    }

    /// A pipeline with the reference boards and default configuration.
    pub fn with_reference_boards() -> Self {
        Self::new(
            Arc::new(crate::boards::ReferenceBoards::registry()),
            ConsensusConfig::default(),
            SynthesisConfig::default(),
        )
    }

    pub fn registry(&self) -> &BoardRegistry {
        &self.registry
    }

    pub async fn review(&self, case: &Case) -> ReviewResult<Review> {
        let selection = select_boards(case.raw());
        debug!(
            boards = ?selection.boards,
            fallback = selection.fallback,
            "Boards selected"
        );

        let normalized = Arc::new(normalize(case)?);

        let boards = invoke_boards(&self.registry, &selection.boards, normalized.clone()).await;
        debug!(
            selected = selection.boards.len(),
            answered = boards.len(),
            "Boards invoked"
        );

        let consensus = self.consensus.evaluate(&boards, &selection.evidence);
        let card = self
            .synthesizer
            .synthesize(&normalized, &boards, ScoreSource::Consensus(&consensus));

        Ok(Review {
            selection,
            case: normalized,
            boards,
            consensus,
            card,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReviewError;
    use caseboard_types::{Modality, ScoreBasis};
    use serde_json::json;

    #[tokio::test]
    async fn clinical_case_reviews_with_clinical_board_only() {
        let pipeline = ReviewPipeline::with_reference_boards();
        let review = pipeline
            .review(&Case::new(json!({
                "clinical_notes": "memory decline and sleep fragmentation"
            })))
            .await
            .unwrap();

        assert_eq!(review.selection.boards, vec![BoardId::clinical()]);
        assert_eq!(review.boards.len(), 1);
        assert!(!review.consensus.fallback);
        assert_eq!(review.card.score_basis(), ScoreBasis::Consensus);
        assert!(!review.card.candidate_protocols().is_empty());
        assert!(!review.card.candidate_protocols()[0].steps.is_empty());
    }

    #[tokio::test]
    async fn multimodal_case_weighs_contributors() {
        let pipeline = ReviewPipeline::with_reference_boards();
        let review = pipeline
            .review(&Case::new(json!({
                "case_id": "c-42",
                "clinical_notes": "Suspected MCI",
                "demographics": {"age": 83},
                "imaging": {"mri": "mild atrophy"},
                "environment": {"sleep_hours": 5}
            })))
            .await
            .unwrap();

        assert_eq!(review.boards.len(), 3);
        assert_eq!(review.consensus.per_board.len(), 3);
        // clinical 0.40 at weight 0.40 / 0.70; the role boards add zero.
        let expected = 0.4 * (0.40 / 0.70);
        assert!((review.consensus.score - expected).abs() < 1e-9);
        assert_eq!(review.card.case_id(), Some("c-42"));
        assert!(review
            .card
            .reproducibility()
            .modalities
            .contains(&Modality::Imaging));
    }

    #[tokio::test]
    async fn non_object_case_fails_review() {
        let pipeline = ReviewPipeline::with_reference_boards();
        let err = pipeline.review(&Case::new(json!("text"))).await.unwrap_err();
        assert!(matches!(err, ReviewError::InvalidCase(_)));
    }
}
