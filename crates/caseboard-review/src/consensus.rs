//! Evidence-aware weighted consensus over board results.

use caseboard_types::{BoardId, BoardResult, Consensus, EvidenceMap, Modality};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Configuration for the consensus engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusConfig {
    /// Static per-board weights
    pub weights: BTreeMap<BoardId, f64>,
    /// Weight of a contributing board missing from `weights` (default: 0.10)
    pub default_weight: f64,
    /// Score reported when no board contributes (default: 0.5)
    pub fallback_score: f64,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        let weights = [
            (BoardId::clinical(), 0.40),
            (BoardId::imaging(), 0.20),
            (BoardId::genomics(), 0.15),
            (BoardId::pharma(), 0.15),
            (BoardId::environment(), 0.10),
        ]
        .into_iter()
        .collect();

        Self {
            weights,
            default_weight: 0.10,
            fallback_score: 0.5,
        }
    }
}

/// Modality a board's evidence is read from, if it has one.
pub fn board_modality(board: &BoardId) -> Option<Modality> {
    match board.as_str() {
        "neurology" => Some(Modality::Clinical),
        "pharmaco" => Some(Modality::Pharma),
        other => Modality::parse(other),
    }
}

enum Verdict {
    Contributes(f64),
    NoEvidence,
    Declined,
    NonFinite,
}

/// Aggregates board results into a single bounded score.
#[derive(Clone, Debug, Default)]
pub struct ConsensusEngine {
    config: ConsensusConfig,
}

impl ConsensusEngine {
    pub fn new(config: ConsensusConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConsensusConfig {
        &self.config
    }

    fn weight_of(&self, board: &BoardId) -> f64 {
        let w = self
            .config
            .weights
            .get(board)
            .copied()
            .unwrap_or(self.config.default_weight);
        if w.is_finite() {
            w.max(0.0)
        } else {
            0.0
        }
    }

    /// Compute the consensus for a set of board results.
    ///
    /// Boards without evidence are excluded, as are boards that decline to
    /// contribute. The remaining boards' static weights are renormalized to
    /// sum to one over exactly that set. With no contributor, the configured
    /// fallback score is reported instead.
    pub fn evaluate(
        &self,
        results: &BTreeMap<BoardId, BoardResult>,
        evidence: &EvidenceMap,
    ) -> Consensus {
        let verdicts: Vec<(&BoardId, Verdict)> = results
            .iter()
            .map(|(board, result)| {
                let had_evidence = result.had_evidence.unwrap_or_else(|| {
                    board_modality(board).map_or(true, |m| evidence.has(m))
                });
                let verdict = match result.ri_component {
                    _ if !had_evidence => Verdict::NoEvidence,
                    None => Verdict::Declined,
                    Some(ri) if !ri.is_finite() => Verdict::NonFinite,
                    Some(ri) => Verdict::Contributes(ri),
                };
                (board, verdict)
            })
            .collect();

        let mut per_board = BTreeMap::new();
        let mut raw_scores = BTreeMap::new();
        let mut weights = BTreeMap::new();
        for (board, verdict) in &verdicts {
            let raw = match verdict {
                Verdict::Contributes(ri) => {
                    per_board.insert((*board).clone(), *ri);
                    weights.insert((*board).clone(), self.weight_of(board));
                    *ri
                }
                _ => 0.0,
            };
            raw_scores.insert((*board).clone(), raw);
        }

        let normalized_weights = normalize_weights(&weights);

        let mut rationale = Vec::with_capacity(verdicts.len() + 1);
        for (board, verdict) in &verdicts {
            let line = match verdict {
                Verdict::Contributes(ri) => format!(
                    "{board}: contributed {ri:.2} at weight {:.3}",
                    normalized_weights.get(*board).copied().unwrap_or_default()
                ),
                Verdict::NoEvidence => format!("{board}: excluded, no evidence for its modality"),
                Verdict::Declined => format!("{board}: excluded, declined to contribute"),
                Verdict::NonFinite => format!("{board}: excluded, non-finite ri_component"),
            };
            rationale.push(line);
        }

        if per_board.is_empty() {
            rationale.push(format!(
                "No board contributed; using fallback score {:.2}",
                self.config.fallback_score
            ));
            debug!(boards = results.len(), "Consensus fell back");
            return Consensus {
                score: self.config.fallback_score.clamp(0.0, 1.0),
                per_board,
                raw_scores,
                weights: self.config.weights.clone(),
                normalized_weights,
                rationale,
                fallback: true,
            };
        }

        let score: f64 = per_board
            .iter()
            .map(|(board, ri)| normalized_weights.get(board).copied().unwrap_or_default() * ri)
            .sum();
        let score = score.clamp(0.0, 1.0);

        debug!(
            contributors = per_board.len(),
            score = score,
            "Consensus computed"
        );

        let mut table = self.config.weights.clone();
        table.extend(weights);

        Consensus {
            score,
            per_board,
            raw_scores,
            weights: table,
            normalized_weights,
            rationale,
            fallback: false,
        }
    }
}

/// Renormalize weights to sum to one; uniform when they sum to zero.
fn normalize_weights(weights: &BTreeMap<BoardId, f64>) -> BTreeMap<BoardId, f64> {
    if weights.is_empty() {
        return BTreeMap::new();
    }
    let total: f64 = weights.values().sum();
    if total > 0.0 && total.is_finite() {
        weights
            .iter()
            .map(|(b, w)| (b.clone(), w / total))
            .collect()
    } else {
        let uniform = 1.0 / weights.len() as f64;
        weights.keys().map(|b| (b.clone(), uniform)).collect()
    }
}
