//! Featured-Backfill: first-image featured image backfill
//!
//! This crate scans published content records that have no featured image,
//! downloads the first image referenced in each body, normalizes it to a
//! single target format and attaches it as the record's featured image.

pub mod backfill;
pub mod config;
pub mod output;
pub mod state;
pub mod storage;
pub mod trigger;

use thiserror::Error;

/// Main error type for Featured-Backfill operations
///
/// Per-record failures never surface here; they become [`state::Outcome`]s.
#[derive(Debug, Error)]
pub enum BackfillError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Precondition failed: {0}")]
    Precondition(#[from] backfill::NormalizeError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Run refused: {0}")]
    Token(#[from] trigger::TokenError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unsupported target format: {0}")]
    UnsupportedFormat(String),
}

/// Result type alias for Featured-Backfill operations
pub type Result<T> = std::result::Result<T, BackfillError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use backfill::{run_scan, Pipeline};
pub use config::Config;
pub use state::{Outcome, OutcomeKind, RecordState};
pub use storage::{ContentStore, SqliteStorage};
