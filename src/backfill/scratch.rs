//! Scratch files for fetched images
//!
//! A [`ScratchAsset`] owns its file on disk: dropping it deletes the file, so
//! every exit path of the pipeline (success, fallback, failure) cleans up.

use crate::backfill::fetcher::FetchedAsset;
use std::io::Write;
use std::path::Path;
use tempfile::TempPath;

const SCRATCH_PREFIX: &str = "featured-";

/// Fetched bytes persisted to a temporary path
#[derive(Debug)]
pub struct ScratchAsset {
    path: TempPath,
    /// Name the asset will be uploaded under
    pub filename: String,
}

impl ScratchAsset {
    /// Takes ownership of an existing file; it is deleted when the asset drops
    pub fn adopt(path: TempPath, filename: impl Into<String>) -> Self {
        Self {
            path,
            filename: filename.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Deletes the file now, logging instead of failing if it is already gone
    pub fn discard(self) {
        let scratch_path = self.path.to_path_buf();
        if let Err(e) = self.path.close() {
            tracing::warn!(
                "Failed to remove scratch file {}: {}",
                scratch_path.display(),
                e
            );
        }
    }
}

/// Writes fetched bytes to a new scratch file in `dir`
///
/// The file name ends with the asset's own filename so its extension survives
/// for format sniffing.
pub fn save_scratch(dir: &Path, asset: &FetchedAsset) -> std::io::Result<ScratchAsset> {
    std::fs::create_dir_all(dir)?;

    let suffix = format!("-{}", scratch_suffix(&asset.filename));
    let mut file = tempfile::Builder::new()
        .prefix(SCRATCH_PREFIX)
        .suffix(&suffix)
        .tempfile_in(dir)?;

    file.write_all(&asset.bytes)?;
    file.flush()?;

    Ok(ScratchAsset::adopt(
        file.into_temp_path(),
        asset.filename.clone(),
    ))
}

/// Filesystem-safe version of a filename for use inside a scratch path
fn scratch_suffix(filename: &str) -> String {
    filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
