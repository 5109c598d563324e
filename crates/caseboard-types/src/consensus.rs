//! Aggregate consensus over board results.

use crate::board::BoardId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Evidence-weighted aggregate score and its audit trail.
///
/// `score` is a convex combination of the contributing boards'
/// `ri_component` values under `normalized_weights`, or the configured
/// fallback score when no board contributed (`fallback == true`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Consensus {
    /// Aggregate score in [0,1].
    pub score: f64,
    /// `ri_component` of each contributing board.
    pub per_board: BTreeMap<BoardId, f64>,
    /// Raw score of every evaluated board; non-contributing boards read 0.
    pub raw_scores: BTreeMap<BoardId, f64>,
    /// Static weight table the engine was configured with.
    pub weights: BTreeMap<BoardId, f64>,
    /// Weights renormalized over exactly the contributing boards.
    pub normalized_weights: BTreeMap<BoardId, f64>,
    /// One line per evaluated board, plus a closing line on fallback.
    pub rationale: Vec<String>,
    pub fallback: bool,
}

impl Consensus {
    pub fn contributed(&self, board: &BoardId) -> bool {
        self.per_board.contains_key(board)
    }
}
