//! Board contract, registry and invocation adapter.
//!
//! Boards are external collaborators. Each one may answer in one of a few
//! output shapes; [`normalize_output`] turns every accepted shape into a
//! canonical [`BoardResult`] once, at the adapter boundary, so nothing
//! downstream ever inspects raw board output.

use crate::error::BoardError;
use async_trait::async_trait;
use caseboard_types::{BoardId, BoardResult, Finding, NormalizedCase};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};

/// A specialist analyzer.
#[async_trait]
pub trait Board: Send + Sync {
    /// Identifier the board is registered and reported under.
    fn id(&self) -> BoardId;

    /// Analyze a normalized case.
    async fn analyze(&self, case: &NormalizedCase) -> Result<BoardOutput, BoardError>;
}

/// Findings and notes of a role-wrapped board answer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleOutput {
    #[serde(default)]
    pub findings: Vec<Finding>,
    #[serde(default)]
    pub notes: String,
}

/// Raw output of a board, one variant per accepted shape.
#[derive(Clone, Debug, PartialEq)]
pub enum BoardOutput {
    /// Already a canonical result.
    Canonical(BoardResult),
    /// `{role, raw: {findings, notes}}`; carries no contribution of its own.
    RoleWrapped { role: String, raw: RoleOutput },
    /// Anything else; interpreted by [`normalize_output`].
    Opaque(Value),
}

/// Coerce a board's output into the canonical shape.
///
/// The result is always reported under `board`, whatever name the output
/// itself carries. Role-wrapped outputs get a zero baseline contribution.
/// Opaque values are read as a role wrapper if they have that shape, then
/// as a canonical result; anything else becomes an empty result with a
/// zero baseline.
pub fn normalize_output(board: &BoardId, output: BoardOutput) -> BoardResult {
    match output {
        BoardOutput::Canonical(mut result) => {
            result.board = board.clone();
            result
        }
        BoardOutput::RoleWrapped { role, raw } => {
            debug!(board = %board, role = %role, "Unwrapping role output");
            BoardResult {
                board: board.clone(),
                findings: raw.findings,
                ri_component: Some(0.0),
                notes: raw.notes,
                had_evidence: None,
                steps: Vec::new(),
            }
        }
        BoardOutput::Opaque(value) => normalize_opaque(board, value),
    }
}

fn normalize_opaque(board: &BoardId, value: Value) -> BoardResult {
    if let Some(obj) = value.as_object() {
        if let (Some(role), Some(raw)) = (obj.get("role").and_then(Value::as_str), obj.get("raw")) {
            let raw = serde_json::from_value::<RoleOutput>(raw.clone()).unwrap_or_default();
            return normalize_output(
                board,
                BoardOutput::RoleWrapped {
                    role: role.to_string(),
                    raw,
                },
            );
        }

        let mut obj = obj.clone();
        obj.insert("board".into(), Value::String(board.to_string()));
        if let Ok(result) = serde_json::from_value::<BoardResult>(Value::Object(obj)) {
            return result;
        }
    }

    warn!(board = %board, "Unrecognized board output shape, using empty result");
    BoardResult::new(board.clone()).with_ri_component(0.0)
}

/// Registered boards, looked up by id.
#[derive(Clone, Default)]
pub struct BoardRegistry {
    boards: HashMap<BoardId, Arc<dyn Board>>,
}

impl BoardRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a board under its own id, replacing any previous one.
    pub fn register(&mut self, board: Arc<dyn Board>) {
        self.boards.insert(board.id(), board);
    }

    pub fn with(mut self, board: Arc<dyn Board>) -> Self {
        self.register(board);
        self
    }

    /// The board registered under `id`, if any.
    pub fn get(&self, id: &BoardId) -> Option<Arc<dyn Board>> {
        self.boards.get(id).cloned()
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<BoardId> {
        let mut ids: Vec<_> = self.boards.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.boards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boards.is_empty()
    }
}

impl std::fmt::Debug for BoardRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoardRegistry")
            .field("boards", &self.ids())
            .finish()
    }
}

/// Invoke the selected boards concurrently, one task per board.
///
/// Never fails: boards that are unregistered, return an error or panic are
/// absent from the returned map.
pub async fn invoke_boards(
    registry: &BoardRegistry,
    selected: &[BoardId],
    case: Arc<NormalizedCase>,
) -> BTreeMap<BoardId, BoardResult> {
    let mut pending = Vec::with_capacity(selected.len());

    for id in selected {
        let Some(board) = registry.get(id) else {
            debug!(board = %id, "Selected board is not registered, skipping");
            continue;
        };
        let case = case.clone();
        debug!(board = %id, "Invoking board");
        pending.push((
            id.clone(),
            tokio::spawn(async move { board.analyze(&case).await }),
        ));
    }

    let (ids, handles): (Vec<_>, Vec<_>) = pending.into_iter().unzip();
    let joined = futures::future::join_all(handles).await;

    let mut results = BTreeMap::new();
    for (id, outcome) in ids.into_iter().zip(joined) {
        match outcome {
            Ok(Ok(output)) => {
                results.insert(id.clone(), normalize_output(&id, output));
            }
            Ok(Err(e)) => {
                warn!(board = %id, error = %e, "Board failed, omitting result");
            }
            Err(e) => {
                warn!(board = %id, error = %e, "Board task aborted, omitting result");
            }
        }
    }
    results
}

/// Human-readable contract violations among adapted results.
pub fn contract_violations(results: &BTreeMap<BoardId, BoardResult>) -> Vec<String> {
    results
        .values()
        .filter(|r| !r.ri_in_range())
        .map(|r| {
            let ri = r.ri_component.unwrap_or_default();
            warn!(board = %r.board, ri_component = ri, "Board contribution outside [0,1]");
            format!("Board {} reported ri_component {ri} outside [0,1]", r.board)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use caseboard_types::Case;
    use serde_json::json;

    struct FixedBoard {
        id: BoardId,
        output: BoardOutput,
    }

    #[async_trait]
    impl Board for FixedBoard {
        fn id(&self) -> BoardId {
            self.id.clone()
        }

        async fn analyze(&self, _case: &NormalizedCase) -> Result<BoardOutput, BoardError> {
            Ok(self.output.clone())
        }
    }

    struct FailingBoard(BoardId);

    #[async_trait]
    impl Board for FailingBoard {
        fn id(&self) -> BoardId {
            self.0.clone()
        }

        async fn analyze(&self, _case: &NormalizedCase) -> Result<BoardOutput, BoardError> {
            Err(BoardError::failed(self.0.as_str(), "scanner offline"))
        }
    }

    struct PanickingBoard(BoardId);

    #[async_trait]
    impl Board for PanickingBoard {
        fn id(&self) -> BoardId {
            self.0.clone()
        }

        async fn analyze(&self, _case: &NormalizedCase) -> Result<BoardOutput, BoardError> {
            panic!("board bug");
        }
    }

    fn case() -> Arc<NormalizedCase> {
        Arc::new(crate::normalize::normalize(&Case::empty()).unwrap())
    }

    #[test]
    fn role_wrapper_gets_zero_baseline() {
        let result = normalize_output(
            &BoardId::imaging(),
            BoardOutput::RoleWrapped {
                role: "imaging_ai".into(),
                raw: RoleOutput {
                    findings: vec![Finding::new("hippocampal_atrophy", 0.6)],
                    notes: "mild".into(),
                },
            },
        );
        assert_eq!(result.ri_component, Some(0.0));
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.notes, "mild");
    }

    #[test]
    fn opaque_role_wrapper_is_unwrapped() {
        let result = normalize_output(
            &BoardId::pharma(),
            BoardOutput::Opaque(json!({
                "role": "pharmaco_ai",
                "raw": {"findings": [{"label": "polypharmacy", "confidence": 0.3}], "notes": "n"}
            })),
        );
        assert_eq!(result.board, BoardId::pharma());
        assert_eq!(result.ri_component, Some(0.0));
        assert_eq!(result.findings[0].key, "polypharmacy");
    }

    #[test]
    fn opaque_canonical_value_passes_through() {
        let result = normalize_output(
            &BoardId::genomics(),
            BoardOutput::Opaque(json!({"ri_component": 0.3, "notes": "apoe4 carrier"})),
        );
        assert_eq!(result.ri_component, Some(0.3));
        assert_eq!(result.board, BoardId::genomics());
    }

    #[test]
    fn unrecognized_opaque_value_becomes_empty_result() {
        let result = normalize_output(&BoardId::environment(), BoardOutput::Opaque(json!(42)));
        assert!(result.findings.is_empty());
        assert_eq!(result.ri_component, Some(0.0));
    }

    #[test]
    fn registry_lookup_of_unknown_board_is_absent() {
        let registry = BoardRegistry::new();
        assert!(registry.get(&BoardId::clinical()).is_none());
    }

    #[tokio::test]
    async fn failing_and_panicking_boards_are_omitted() {
        let registry = BoardRegistry::new()
            .with(Arc::new(FailingBoard(BoardId::imaging())))
            .with(Arc::new(PanickingBoard(BoardId::genomics())))
            .with(Arc::new(FixedBoard {
                id: BoardId::clinical(),
                output: BoardOutput::Canonical(
                    BoardResult::new(BoardId::clinical()).with_ri_component(0.4),
                ),
            }));

        let selected = vec![
            BoardId::clinical(),
            BoardId::imaging(),
            BoardId::genomics(),
            BoardId::pharma(),
        ];
        let results = invoke_boards(&registry, &selected, case()).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[&BoardId::clinical()].ri_component, Some(0.4));
    }

    #[test]
    fn out_of_range_contribution_is_reported() {
        let mut results = BTreeMap::new();
        results.insert(
            BoardId::imaging(),
            BoardResult::new(BoardId::imaging()).with_ri_component(1.5),
        );
        results.insert(
            BoardId::clinical(),
            BoardResult::new(BoardId::clinical()).with_ri_component(0.2),
        );
        let violations = contract_violations(&results);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("imaging"));
    }
}
