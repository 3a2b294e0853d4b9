//! Storage traits and error types
//!
//! This module defines the trait interfaces the pipeline and the run trigger
//! use to talk to the content store, and the associated error types.

use crate::storage::{Record, TokenRecord};
use chrono::{DateTime, Utc};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Record not found: {0}")]
    RecordNotFound(i64),

    #[error("Media asset not found: {0}")]
    AssetNotFound(i64),

    #[error("{0}")]
    Rejected(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// The content store the pipeline lists records from and attaches images to
///
/// The pipeline never touches the database directly; everything it needs
/// from the host goes through these four operations.
pub trait ContentStore {
    /// Lists published records of the given type, in a stable order
    fn list_records(&self, record_type: &str) -> StorageResult<Vec<Record>>;

    /// Returns true if the record currently has a featured image
    fn has_featured_image(&self, record_id: i64) -> StorageResult<bool>;

    /// Persists the file as a media asset owned by the record
    ///
    /// # Arguments
    ///
    /// * `file` - Path of the file to store; the store copies it and never
    ///   takes ownership of the path
    /// * `filename` - Name the asset should be stored under
    /// * `owner_record_id` - Record the asset belongs to
    ///
    /// # Returns
    ///
    /// The ID of the new media asset
    fn upload_and_attach(
        &mut self,
        file: &Path,
        filename: &str,
        owner_record_id: i64,
    ) -> StorageResult<i64>;

    /// Makes the asset the record's featured image
    fn set_featured_image(&mut self, record_id: i64, asset_id: i64) -> StorageResult<()>;
}

/// Persistence for one-time run confirmation tokens
pub trait TokenLedger {
    /// Stores a freshly issued token
    fn insert_token(
        &mut self,
        token: &str,
        config_hash: &str,
        issued_at: DateTime<Utc>,
    ) -> StorageResult<()>;

    /// Looks a token up
    fn get_token(&self, token: &str) -> StorageResult<Option<TokenRecord>>;

    /// Marks a token consumed
    ///
    /// Returns false if the token was unknown or already consumed. The check
    /// and the update happen in one statement.
    fn consume_token(&mut self, token: &str, consumed_at: DateTime<Utc>) -> StorageResult<bool>;
}
