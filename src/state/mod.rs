//! State module for tracking scan progress
//!
//! # Components
//!
//! - `RecordState`: Tracks a single record through the pipeline (fetching, normalizing, uploading, etc.)
//! - `Outcome`: The terminal, reportable result for a record

mod outcome;
mod record_state;

pub use outcome::{Note, Outcome, OutcomeKind, Severity};
pub use record_state::RecordState;
