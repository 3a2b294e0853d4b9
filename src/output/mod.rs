//! Output module for operator-facing reports
//!
//! This module handles:
//! - Rendering per-record outcome lines (through `tracing` or to a plain writer)
//! - Summarizing a scan's outcomes
//! - Displaying store statistics

mod reporter;
pub mod stats;
mod summary;

pub use reporter::{LineReporter, LogReporter, Reporter};
pub use stats::{format_statistics, load_statistics, print_statistics};
pub use summary::ScanSummary;
