//! Per-record outcomes produced by the pipeline
//!
//! An [`Outcome`] is created exactly once per record when the record reaches a
//! terminal [`RecordState`], and is never mutated afterwards.

use crate::state::RecordState;
use crate::storage::Record;
use std::fmt;

/// How a reporter line should be presented to the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Info,
    Warning,
    Error,
    Success,
}

impl Severity {
    /// Tag used by plain-text renderings
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARN",
            Self::Error => "ERROR",
            Self::Success => "OK",
        }
    }
}

/// Terminal classification of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeKind {
    SkippedAlreadySet,
    SkippedNoImageFound,
    FailedFetch,
    FailedLocalSave,
    FailedUpload,
    Succeeded,
}

impl OutcomeKind {
    pub fn severity(&self) -> Severity {
        match self {
            Self::SkippedAlreadySet | Self::SkippedNoImageFound => Severity::Info,
            Self::FailedFetch | Self::FailedLocalSave | Self::FailedUpload => Severity::Error,
            Self::Succeeded => Severity::Success,
        }
    }

    /// The terminal record state this outcome corresponds to
    pub fn state(&self) -> RecordState {
        match self {
            Self::SkippedAlreadySet => RecordState::HasThumbnail,
            Self::SkippedNoImageFound => RecordState::NoImageFound,
            Self::FailedFetch => RecordState::FetchFailed,
            Self::FailedLocalSave => RecordState::SaveFailed,
            Self::FailedUpload => RecordState::UploadFailed,
            Self::Succeeded => RecordState::Succeeded,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SkippedAlreadySet => "skipped_already_set",
            Self::SkippedNoImageFound => "skipped_no_image_found",
            Self::FailedFetch => "failed_fetch",
            Self::FailedLocalSave => "failed_local_save",
            Self::FailedUpload => "failed_upload",
            Self::Succeeded => "succeeded",
        }
    }

    pub fn all_kinds() -> [Self; 6] {
        [
            Self::SkippedAlreadySet,
            Self::SkippedNoImageFound,
            Self::FailedFetch,
            Self::FailedLocalSave,
            Self::FailedUpload,
            Self::Succeeded,
        ]
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Non-terminal annotation attached to an outcome (conversion info, fallback warning)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub severity: Severity,
    pub message: String,
}

impl Note {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }
}

/// Terminal result for one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub record_id: i64,
    pub title: String,
    pub kind: OutcomeKind,
    /// Human-readable detail for the operator
    pub message: String,
    pub notes: Vec<Note>,
}

impl Outcome {
    fn new(record: &Record, kind: OutcomeKind, message: impl Into<String>) -> Self {
        Self {
            record_id: record.id,
            title: record.title.clone(),
            kind,
            message: message.into(),
            notes: Vec::new(),
        }
    }

    pub fn already_set(record: &Record) -> Self {
        Self::new(
            record,
            OutcomeKind::SkippedAlreadySet,
            "Already has a featured image.",
        )
    }

    pub fn no_image_found(record: &Record) -> Self {
        Self::new(
            record,
            OutcomeKind::SkippedNoImageFound,
            "No image found in content.",
        )
    }

    pub fn fetch_failed(record: &Record, reason: impl fmt::Display) -> Self {
        Self::new(
            record,
            OutcomeKind::FailedFetch,
            format!("Could not download image. {}", reason),
        )
    }

    pub fn save_failed(record: &Record, reason: impl fmt::Display) -> Self {
        Self::new(
            record,
            OutcomeKind::FailedLocalSave,
            format!("Could not save temporary file. Reason: {}", reason),
        )
    }

    pub fn upload_failed(record: &Record, reason: impl fmt::Display) -> Self {
        Self::new(record, OutcomeKind::FailedUpload, reason.to_string())
    }

    pub fn succeeded(record: &Record) -> Self {
        Self::new(record, OutcomeKind::Succeeded, "Featured image set.")
    }

    pub fn with_notes(mut self, notes: Vec<Note>) -> Self {
        self.notes = notes;
        self
    }

    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            OutcomeKind::SkippedAlreadySet | OutcomeKind::SkippedNoImageFound => write!(
                f,
                "Skipping record #{} (\"{}\"): {}",
                self.record_id, self.title, self.message
            ),
            OutcomeKind::FailedFetch | OutcomeKind::FailedLocalSave | OutcomeKind::FailedUpload => {
                write!(f, "Error for record #{}: {}", self.record_id, self.message)
            }
            OutcomeKind::Succeeded => write!(
                f,
                "Success for record #{} (\"{}\"): {}",
                self.record_id, self.title, self.message
            ),
        }
    }
}
