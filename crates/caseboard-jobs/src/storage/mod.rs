//! Job storage
//!
//! Keyed by job id; create-if-absent and merging partial updates.

mod memory;
mod traits;

pub use memory::InMemoryJobStorage;
pub use traits::{JobStorage, JobUpdate};
