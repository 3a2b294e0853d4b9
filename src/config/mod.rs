//! Configuration module for featured-backfill
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! The resulting [`Config`] is built once in `main` and passed down explicitly.
//!
//! # Example
//!
//! ```no_run
//! use featured_backfill::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("backfill.toml")).unwrap();
//! println!("Pausing {}ms between records", config.scan.pacing_ms);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    Config, FetcherConfig, NormalizerConfig, ScanConfig, StorageConfig, TriggerConfig,
    DEFAULT_USER_AGENT,
};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::target_format;
