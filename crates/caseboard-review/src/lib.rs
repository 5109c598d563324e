//! Caseboard review pipeline.
//!
//! Routes a case to specialist boards chosen by the evidence it carries and
//! merges their opinions into one protocol card:
//!
//! 1. [`evidence`] detects which modalities the case carries
//! 2. [`selection`] maps evidence to boards, with a clinical fallback
//! 3. [`board`] invokes the boards concurrently and adapts their output
//! 4. [`consensus`] aggregates contributions with renormalized weights
//! 5. [`synthesis`] builds the [`ProtocolCard`](caseboard_types::ProtocolCard)
//!
//! [`ReviewPipeline`] runs the steps in order for one case.

#![deny(unsafe_code)]

pub mod board;
pub mod boards;
pub mod consensus;
pub mod error;
pub mod evidence;
pub mod normalize;
pub mod pipeline;
pub mod selection;
pub mod synthesis;

pub use board::{
    contract_violations, invoke_boards, normalize_output, Board, BoardOutput, BoardRegistry,
    RoleOutput,
};
pub use boards::{ClinicalBoard, ModalityBoard, ReferenceBoards};
pub use consensus::{ConsensusConfig, ConsensusEngine};
pub use error::{BoardError, ReviewError, ReviewResult};
pub use evidence::detect_evidence;
pub use normalize::normalize;
pub use pipeline::{Review, ReviewPipeline};
pub use selection::{select_boards, Selection};
pub use synthesis::{ProtocolSynthesizer, ScoreSource, SynthesisConfig};
