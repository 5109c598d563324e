//! Caseboard data model.
//!
//! Shared types for the board review pipeline and the validator pass:
//!
//! - [`Case`] / [`NormalizedCase`]: raw submission and the structure boards consume
//! - [`EvidenceMap`]: which modalities a case carries
//! - [`BoardResult`]: canonical specialist board output
//! - [`Consensus`]: evidence-weighted aggregate score and its rationale trail
//! - [`ProtocolCard`]: synthesized recommendation document
//! - [`Job`]: one case tracked through the pipeline
//! - [`ValidatorOutcome`] / [`ValidationReport`]: transparent validator results
//!
//! These types carry no behaviour beyond small invariant-preserving helpers;
//! the pipeline lives in `caseboard-review`, `caseboard-validators` and
//! `caseboard-jobs`.

#![deny(unsafe_code)]

pub mod board;
pub mod case;
pub mod consensus;
pub mod evidence;
pub mod job;
pub mod protocol;
pub mod validation;

pub use board::{BoardId, BoardResult, Finding};
pub use case::{Case, NormalizedCase, Observation, SourceRef};
pub use consensus::Consensus;
pub use evidence::{EvidenceMap, Modality};
pub use job::{Job, JobId, JobState};
pub use protocol::{
    CandidateProtocol, CaseIdSource, EvidenceItem, ProtocolCard, Reproducibility, ScoreBasis,
};
pub use validation::{
    Decision, FindingSeverity, OutcomeSeverity, Reason, ValidationReport, ValidatorOutcome,
    ValidatorSource,
};
