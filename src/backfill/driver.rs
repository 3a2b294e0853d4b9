//! Pipeline driver - per-record orchestration
//!
//! This module contains the scan loop that takes every listed record through
//! the locate, fetch, save, normalize and associate steps. Each record ends
//! in exactly one [`Outcome`]; a failure on one record never stops the scan.

use crate::backfill::fetcher::{build_http_client, fetch_image, FetchResult};
use crate::backfill::locator::ImageLocator;
use crate::backfill::normalizer::Normalizer;
use crate::backfill::scratch::save_scratch;
use crate::config::Config;
use crate::output::{Reporter, ScanSummary};
use crate::state::{Outcome, RecordState};
use crate::storage::{ContentStore, Record};
use crate::BackfillError;
use reqwest::Client;
use std::path::PathBuf;
use std::time::Duration;

/// Runs one scan over every published record of the configured type
///
/// # Arguments
///
/// * `config` - The validated configuration
/// * `store` - Content store records are listed from and images attached to
/// * `reporter` - Receives one line per record plus start and end markers
///
/// # Returns
///
/// * `Ok(outcomes)` - One outcome per listed record, in listing order
/// * `Err(BackfillError)` - The image codec is unusable, the HTTP client
///   could not be built, or the records could not be listed
pub async fn run_scan(
    config: &Config,
    store: &mut dyn ContentStore,
    reporter: &mut dyn Reporter,
) -> Result<Vec<Outcome>, BackfillError> {
    let pipeline = Pipeline::new(config)?;
    pipeline.run(store, reporter).await
}

/// What a dry run found for one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub record_id: i64,
    pub title: String,
    pub has_featured_image: bool,
    /// First image URL in the body, if any
    pub image_url: Option<String>,
}

/// Lists what a scan would do without fetching or writing anything
pub fn plan_scan(
    config: &Config,
    store: &dyn ContentStore,
) -> Result<Vec<Candidate>, BackfillError> {
    let locator = ImageLocator::new();
    let records = store.list_records(&config.scan.record_type)?;

    Ok(records
        .into_iter()
        .map(|record| Candidate {
            image_url: locator.locate(&record.body).map(String::from),
            record_id: record.id,
            title: record.title,
            has_featured_image: record.has_featured_image,
        })
        .collect())
}

/// Tracks one record's state while it moves through the pipeline
struct Progress {
    record_id: i64,
    state: RecordState,
}

impl Progress {
    fn new(record_id: i64) -> Self {
        Self {
            record_id,
            state: RecordState::NotStarted,
        }
    }

    fn advance(&mut self, next: RecordState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        tracing::trace!("Record #{}: {} -> {}", self.record_id, self.state, next);
        self.state = next;
    }

    fn finish(mut self, outcome: Outcome) -> Outcome {
        self.advance(outcome.kind.state());
        outcome
    }
}

/// The configured pipeline, ready to process records
pub struct Pipeline {
    locator: ImageLocator,
    normalizer: Normalizer,
    client: Client,
    record_type: String,
    scratch_dir: PathBuf,
    pacing: Duration,
}

impl Pipeline {
    /// Builds the pipeline and checks its preconditions
    ///
    /// Fails before any record is touched if the target format cannot be
    /// both decoded and encoded, or if the HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self, BackfillError> {
        let normalizer = Normalizer::new(&config.normalizer)?;
        normalizer.check_codec()?;

        let client = build_http_client(&config.fetcher)?;

        Ok(Self {
            locator: ImageLocator::new(),
            normalizer,
            client,
            record_type: config.scan.record_type.clone(),
            scratch_dir: config.storage.temp_dir(),
            pacing: config.scan.pacing(),
        })
    }

    /// Runs the scan loop
    pub async fn run(
        &self,
        store: &mut dyn ContentStore,
        reporter: &mut dyn Reporter,
    ) -> Result<Vec<Outcome>, BackfillError> {
        let records = store.list_records(&self.record_type)?;

        if records.is_empty() {
            reporter.no_records();
            return Ok(Vec::new());
        }

        reporter.scan_started(records.len());

        let mut outcomes = Vec::with_capacity(records.len());
        for record in &records {
            let outcome = self.process_record(store, record).await;
            reporter.record_finished(&outcome);
            outcomes.push(outcome);

            reporter.pausing(self.pacing);
            tokio::time::sleep(self.pacing).await;
        }

        reporter.scan_finished(&ScanSummary::from_outcomes(&outcomes));
        Ok(outcomes)
    }

    /// Takes one record from `NotStarted` to a terminal state
    pub async fn process_record(&self, store: &mut dyn ContentStore, record: &Record) -> Outcome {
        tracing::debug!("Processing record #{}", record.id);
        let mut progress = Progress::new(record.id);

        let has_featured_image = match store.has_featured_image(record.id) {
            Ok(has) => has,
            Err(e) => {
                tracing::warn!(
                    "Could not check featured image of record #{}: {}",
                    record.id,
                    e
                );
                record.has_featured_image
            }
        };
        if has_featured_image {
            return progress.finish(Outcome::already_set(record));
        }

        let Some(url) = self.locator.locate(&record.body) else {
            return progress.finish(Outcome::no_image_found(record));
        };

        progress.advance(RecordState::Fetching);
        tracing::debug!("Fetching {} for record #{}", url, record.id);
        let fetched = match fetch_image(&self.client, url).await {
            FetchResult::Success(asset) => asset,
            failure => return progress.finish(Outcome::fetch_failed(record, failure)),
        };

        progress.advance(RecordState::Fetched);
        let scratch = match save_scratch(&self.scratch_dir, &fetched) {
            Ok(scratch) => scratch,
            Err(e) => return progress.finish(Outcome::save_failed(record, e)),
        };
        drop(fetched);

        progress.advance(RecordState::Normalizing);
        let normalized = self.normalizer.normalize(scratch);

        progress.advance(RecordState::Uploading);
        let asset = normalized.asset;
        let notes = normalized.notes;

        // On failure the scratch file goes when `asset` drops
        let asset_id = match store.upload_and_attach(asset.path(), &asset.filename, record.id) {
            Ok(asset_id) => asset_id,
            Err(e) => {
                return progress.finish(Outcome::upload_failed(record, e).with_notes(notes));
            }
        };
        asset.discard();

        if let Err(e) = store.set_featured_image(record.id, asset_id) {
            return progress.finish(Outcome::upload_failed(record, e).with_notes(notes));
        }

        progress.finish(Outcome::succeeded(record).with_notes(notes))
    }
}
