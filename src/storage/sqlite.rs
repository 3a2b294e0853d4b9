//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the ContentStore and
//! TokenLedger traits. Uploaded files are copied into a media directory next
//! to the database; the database only keeps their metadata.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ContentStore, StorageError, StorageResult, TokenLedger};
use crate::storage::{
    MediaAsset, NewRecord, Record, StoreStatistics, TokenRecord, STATUS_PUBLISHED,
};
use crate::BackfillError;
use chrono::{DateTime, Utc};
use image::ImageFormat;
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
    media_dir: PathBuf,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `media_dir` - Directory uploaded media is copied into (created on first upload)
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(BackfillError)` - Failed to open database
    pub fn new(path: &Path, media_dir: &Path) -> Result<Self, BackfillError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn,
            media_dir: media_dir.to_path_buf(),
        })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory(media_dir: &Path) -> Result<Self, BackfillError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn,
            media_dir: media_dir.to_path_buf(),
        })
    }

    /// Directory uploaded media is copied into
    pub fn media_dir(&self) -> &Path {
        &self.media_dir
    }

    /// Inserts a content record and returns its ID
    pub fn insert_record(&mut self, record: &NewRecord<'_>) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO records (record_type, status, title, body, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.record_type,
                record.status,
                record.title,
                record.body,
                now
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Gets the featured image asset ID of a record, if any
    pub fn featured_image_of(&self, record_id: i64) -> StorageResult<Option<i64>> {
        let featured: Option<Option<i64>> = self
            .conn
            .query_row(
                "SELECT featured_asset_id FROM records WHERE id = ?1",
                params![record_id],
                |row| row.get(0),
            )
            .optional()?;

        featured.ok_or(StorageError::RecordNotFound(record_id))
    }

    /// Gets a media asset by ID
    pub fn get_asset(&self, asset_id: i64) -> StorageResult<MediaAsset> {
        self.conn
            .query_row(
                "SELECT id, owner_record_id, filename, mime_type, stored_path, byte_size, sha256, uploaded_at
                 FROM media_assets WHERE id = ?1",
                params![asset_id],
                |row| {
                    Ok(MediaAsset {
                        id: row.get(0)?,
                        owner_record_id: row.get(1)?,
                        filename: row.get(2)?,
                        mime_type: row.get(3)?,
                        stored_path: row.get(4)?,
                        byte_size: row.get::<_, i64>(5)? as u64,
                        sha256: row.get(6)?,
                        uploaded_at: row.get(7)?,
                    })
                },
            )
            .optional()?
            .ok_or(StorageError::AssetNotFound(asset_id))
    }

    /// Gathers the counts shown by `--stats`
    pub fn statistics(&self, record_type: &str) -> StorageResult<StoreStatistics> {
        let (published, featured): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(*), COUNT(featured_asset_id) FROM records
             WHERE record_type = ?1 AND status = ?2",
            params![record_type, STATUS_PUBLISHED],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let assets: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM media_assets", [], |row| row.get(0))?;

        Ok(StoreStatistics {
            published_records: published as u64,
            with_featured_image: featured as u64,
            media_assets: assets as u64,
        })
    }

    fn record_exists(&self, record_id: i64) -> StorageResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM records WHERE id = ?1",
                params![record_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }
}

impl ContentStore for SqliteStorage {
    fn list_records(&self, record_type: &str) -> StorageResult<Vec<Record>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, body, featured_asset_id IS NOT NULL FROM records
             WHERE record_type = ?1 AND status = ?2
             ORDER BY id",
        )?;

        let records = stmt
            .query_map(params![record_type, STATUS_PUBLISHED], |row| {
                Ok(Record {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    body: row.get(2)?,
                    has_featured_image: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn has_featured_image(&self, record_id: i64) -> StorageResult<bool> {
        Ok(self.featured_image_of(record_id)?.is_some())
    }

    fn upload_and_attach(
        &mut self,
        file: &Path,
        filename: &str,
        owner_record_id: i64,
    ) -> StorageResult<i64> {
        if !self.record_exists(owner_record_id)? {
            return Err(StorageError::RecordNotFound(owner_record_id));
        }

        let filename = sanitize_filename(filename);

        let data = std::fs::read(file)?;
        if data.is_empty() {
            return Err(StorageError::Rejected("File is empty.".to_string()));
        }

        // Content first; the extension only labels bytes nothing recognizes
        let mime_type = image::guess_format(&data)
            .or_else(|_| ImageFormat::from_path(&filename))
            .map(|format| format.to_mime_type())
            .map_err(|_| {
                StorageError::Rejected(format!(
                    "Sorry, the file type of '{}' is not permitted.",
                    filename
                ))
            })?;

        std::fs::create_dir_all(&self.media_dir)?;
        let destination = unique_destination(&self.media_dir, &filename);
        std::fs::write(&destination, &data)?;

        let sha256 = hex::encode(Sha256::digest(&data));
        let now = Utc::now().to_rfc3339();
        let stored_path = destination.to_string_lossy().to_string();

        let inserted = self.conn.execute(
            "INSERT INTO media_assets
             (owner_record_id, filename, mime_type, stored_path, byte_size, sha256, uploaded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                owner_record_id,
                filename,
                mime_type,
                stored_path,
                data.len() as i64,
                sha256,
                now
            ],
        );

        if let Err(e) = inserted {
            let _ = std::fs::remove_file(&destination);
            return Err(e.into());
        }

        let asset_id = self.conn.last_insert_rowid();
        tracing::debug!(
            "Stored asset {} for record {} at {}",
            asset_id,
            owner_record_id,
            stored_path
        );

        Ok(asset_id)
    }

    fn set_featured_image(&mut self, record_id: i64, asset_id: i64) -> StorageResult<()> {
        // Fails with AssetNotFound before touching the record
        self.get_asset(asset_id)?;

        let updated = self.conn.execute(
            "UPDATE records SET featured_asset_id = ?1 WHERE id = ?2",
            params![asset_id, record_id],
        )?;

        if updated == 0 {
            return Err(StorageError::RecordNotFound(record_id));
        }

        Ok(())
    }
}

impl TokenLedger for SqliteStorage {
    fn insert_token(
        &mut self,
        token: &str,
        config_hash: &str,
        issued_at: DateTime<Utc>,
    ) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO run_tokens (token, config_hash, issued_at) VALUES (?1, ?2, ?3)",
            params![token, config_hash, issued_at.to_rfc3339()],
        )?;
        Ok(())
    }

    fn get_token(&self, token: &str) -> StorageResult<Option<TokenRecord>> {
        let row: Option<(String, String, String, Option<String>)> = self
            .conn
            .query_row(
                "SELECT token, config_hash, issued_at, consumed_at FROM run_tokens WHERE token = ?1",
                params![token],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;

        let Some((token, config_hash, issued_at, consumed_at)) = row else {
            return Ok(None);
        };

        Ok(Some(TokenRecord {
            token,
            config_hash,
            issued_at: parse_timestamp(&issued_at)?,
            consumed_at: consumed_at.as_deref().map(parse_timestamp).transpose()?,
        }))
    }

    fn consume_token(&mut self, token: &str, consumed_at: DateTime<Utc>) -> StorageResult<bool> {
        let updated = self.conn.execute(
            "UPDATE run_tokens SET consumed_at = ?1 WHERE token = ?2 AND consumed_at IS NULL",
            params![consumed_at.to_rfc3339(), token],
        )?;
        Ok(updated == 1)
    }
}

fn parse_timestamp(value: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::Database(format!("Invalid timestamp '{}': {}", value, e)))
}

/// Reduces a filename to characters that are safe on every filesystem
fn sanitize_filename(filename: &str) -> String {
    let cleaned: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '-'
            }
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "image".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Picks `name.ext`, then `name-1.ext`, `name-2.ext`, ... until unused
fn unique_destination(dir: &Path, filename: &str) -> PathBuf {
    let candidate = dir.join(filename);
    if !candidate.exists() {
        return candidate;
    }

    let (stem, extension) = match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (filename, None),
    };

    (1u32..)
        .map(|n| match extension {
            Some(ext) => dir.join(format!("{}-{}.{}", stem, n, ext)),
            None => dir.join(format!("{}-{}", stem, n)),
        })
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}
