//! Store statistics display
//!
//! This module provides functionality for extracting and displaying
//! featured-image coverage from the content store.

use crate::storage::{SqliteStorage, StoreStatistics};
use crate::BackfillError;

/// Loads statistics for the given record type from storage
pub fn load_statistics(
    storage: &SqliteStorage,
    record_type: &str,
) -> Result<StoreStatistics, BackfillError> {
    Ok(storage.statistics(record_type)?)
}

/// Formats statistics for display
pub fn format_statistics(record_type: &str, stats: &StoreStatistics) -> String {
    let coverage = if stats.published_records > 0 {
        (stats.with_featured_image as f64 / stats.published_records as f64) * 100.0
    } else {
        0.0
    };

    format!(
        "=== Featured Image Statistics ===\n\n\
         Published '{}' records: {}\n\
         \x20 With featured image: {}\n\
         \x20 Missing featured image: {}\n\
         Media assets: {}\n\n\
         Coverage: {:.1}%",
        record_type,
        stats.published_records,
        stats.with_featured_image,
        stats.missing_featured_image(),
        stats.media_assets,
        coverage
    )
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(record_type: &str, stats: &StoreStatistics) {
    println!("{}", format_statistics(record_type, stats));
}
