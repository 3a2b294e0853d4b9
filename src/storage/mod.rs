//! Storage module for the content store
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Listing candidate records and attaching featured images
//! - Copying uploaded media into the media directory
//! - Tracking one-time run confirmation tokens

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{ContentStore, StorageError, StorageResult, TokenLedger};

use crate::config::StorageConfig;
use crate::BackfillError;
use chrono::{DateTime, Utc};
use std::path::Path;

/// Status value of records the scan considers
pub const STATUS_PUBLISHED: &str = "publish";

/// Opens the storage described by the configuration
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(BackfillError)` - Failed to open the database
pub fn open_storage(config: &StorageConfig) -> Result<SqliteStorage, BackfillError> {
    SqliteStorage::new(
        Path::new(&config.database_path),
        Path::new(&config.media_dir),
    )
}

/// A content record as the pipeline sees it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: i64,
    pub title: String,
    /// Raw markup
    pub body: String,
    pub has_featured_image: bool,
}

/// A record to be inserted into the store
#[derive(Debug, Clone)]
pub struct NewRecord<'a> {
    pub record_type: &'a str,
    pub status: &'a str,
    pub title: &'a str,
    pub body: &'a str,
}

impl<'a> NewRecord<'a> {
    /// A published record of the given type
    pub fn published(record_type: &'a str, title: &'a str, body: &'a str) -> Self {
        Self {
            record_type,
            status: STATUS_PUBLISHED,
            title,
            body,
        }
    }
}

/// Represents an uploaded media asset
#[derive(Debug, Clone)]
pub struct MediaAsset {
    pub id: i64,
    pub owner_record_id: i64,
    pub filename: String,
    pub mime_type: String,
    pub stored_path: String,
    pub byte_size: u64,
    pub sha256: String,
    pub uploaded_at: String,
}

/// Represents an issued confirmation token
#[derive(Debug, Clone)]
pub struct TokenRecord {
    pub token: String,
    pub config_hash: String,
    pub issued_at: DateTime<Utc>,
    pub consumed_at: Option<DateTime<Utc>>,
}

/// Counts shown by `--stats`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStatistics {
    /// Published records of the scanned type
    pub published_records: u64,

    /// Of those, how many have a featured image
    pub with_featured_image: u64,

    /// All media assets in the store
    pub media_assets: u64,
}

impl StoreStatistics {
    pub fn missing_featured_image(&self) -> u64 {
        self.published_records
            .saturating_sub(self.with_featured_image)
    }
}
