//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the content database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Content records that may receive a featured image
CREATE TABLE IF NOT EXISTS records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    record_type TEXT NOT NULL,
    status TEXT NOT NULL,
    title TEXT NOT NULL,
    body TEXT NOT NULL,
    featured_asset_id INTEGER REFERENCES media_assets(id),
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_records_type_status ON records(record_type, status);

-- Uploaded media, owned by a record
CREATE TABLE IF NOT EXISTS media_assets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    owner_record_id INTEGER NOT NULL REFERENCES records(id),
    filename TEXT NOT NULL,
    mime_type TEXT NOT NULL,
    stored_path TEXT NOT NULL UNIQUE,
    byte_size INTEGER NOT NULL,
    sha256 TEXT NOT NULL,
    uploaded_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_media_assets_owner ON media_assets(owner_record_id);

-- One-time run confirmation tokens
CREATE TABLE IF NOT EXISTS run_tokens (
    token TEXT PRIMARY KEY,
    config_hash TEXT NOT NULL,
    issued_at TEXT NOT NULL,
    consumed_at TEXT
);
"#;

/// Initializes the database schema
///
/// Every statement is idempotent, so this is safe to call on an existing database.
pub fn initialize_schema(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}
