//! Board selection from detected evidence.

use crate::evidence::detect_evidence;
use caseboard_types::{BoardId, EvidenceMap, Modality};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Boards to invoke for a case, and the evidence that chose them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub boards: Vec<BoardId>,
    pub evidence: EvidenceMap,
    /// Whether the fallback board set was used.
    pub fallback: bool,
}

/// Modality whose evidence the fallback board set stands in for.
pub const FALLBACK_MODALITY: Modality = Modality::Clinical;

/// Board set used when no modality has evidence.
pub fn fallback_boards() -> Vec<BoardId> {
    vec![BoardId::for_modality(FALLBACK_MODALITY)]
}

/// Select boards for a raw case.
///
/// With no evidence at all, selects [`fallback_boards`] and marks
/// [`FALLBACK_MODALITY`] as present, so downstream consensus sees explicit
/// fallback evidence rather than none.
pub fn select_boards(raw: &Value) -> Selection {
    let mut evidence = detect_evidence(raw);

    let mut boards: Vec<BoardId> = Vec::new();
    for modality in evidence.present() {
        let board = BoardId::for_modality(modality);
        if !boards.contains(&board) {
            boards.push(board);
        }
    }

    let fallback = boards.is_empty();
    if fallback {
        boards = fallback_boards();
        evidence.set(FALLBACK_MODALITY, true);
    }

    Selection {
        boards,
        evidence,
        fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clinical_notes_select_clinical_board_only() {
        let selection = select_boards(&json!({
            "clinical_notes": "memory decline and sleep fragmentation"
        }));
        assert_eq!(selection.boards, vec![BoardId::clinical()]);
        assert!(!selection.fallback);
    }

    #[test]
    fn empty_case_falls_back_with_marked_evidence() {
        let selection = select_boards(&json!({}));
        assert_eq!(selection.boards, fallback_boards());
        assert!(selection.fallback);
        assert!(selection.evidence.has(Modality::Clinical));
        assert_eq!(selection.evidence.present().count(), 1);
    }

    #[test]
    fn one_board_per_modality() {
        let selection = select_boards(&json!({
            "imaging": {"mri": "t1", "pet": "amyloid"},
            "meds": ["donepezil"],
        }));
        assert_eq!(
            selection.boards,
            vec![BoardId::imaging(), BoardId::pharma()]
        );
    }
}
