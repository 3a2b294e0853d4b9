//! Backfill pipeline
//!
//! This module contains the per-record pipeline:
//! - `locator`: finds the first image URL in a record body
//! - `fetcher`: downloads it
//! - `scratch`: persists the bytes to a self-deleting temporary file
//! - `normalizer`: re-encodes the file to the target format when needed
//! - `driver`: runs every record through the steps above and reports outcomes

mod driver;
mod fetcher;
mod locator;
mod normalizer;
mod scratch;

pub use driver::{plan_scan, run_scan, Candidate, Pipeline};
pub use fetcher::{
    build_http_client, fetch_image, filename_from_url, FetchResult, FetchedAsset,
    FALLBACK_FILENAME,
};
pub use locator::ImageLocator;
pub use normalizer::{sniff_mime, NormalizeError, Normalized, Normalizer, UNKNOWN_MIME};
pub use scratch::{save_scratch, ScratchAsset};
