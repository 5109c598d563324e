//! Built-in boards

pub mod reference;

pub use reference::{ClinicalBoard, ModalityBoard, ReferenceBoards};
