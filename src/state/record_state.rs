/// Record state definitions for tracking a record through the pipeline
///
/// This module defines every state a record passes through during a scan,
/// and which transitions between them are legal.
use std::fmt;

/// Represents the current state of a record in the backfill pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordState {
    // ===== Active States =====
    /// Record has been listed but not yet examined
    NotStarted,

    /// The located image is being downloaded
    Fetching,

    /// Image bytes are in memory and about to be saved to a scratch file
    Fetched,

    /// The scratch file is being sniffed and possibly re-encoded
    Normalizing,

    /// The final file is being handed to the store
    Uploading,

    // ===== Terminal Skip States =====
    /// Record already has a featured image
    HasThumbnail,

    /// Record body contains no image tag
    NoImageFound,

    // ===== Terminal Error States =====
    /// Download failed (transport error or non-200 status)
    FetchFailed,

    /// Fetched bytes could not be written to a scratch file
    SaveFailed,

    /// Store rejected the upload or the featured image association
    UploadFailed,

    // ===== Terminal Success States =====
    /// Featured image was set
    Succeeded,
}

impl RecordState {
    /// Returns true if this is a terminal state (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    /// Returns true if this is an active state (record may still be processed)
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Self::NotStarted | Self::Fetching | Self::Fetched | Self::Normalizing | Self::Uploading
        )
    }

    /// Returns true if this represents a successful completion
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// Returns true if this represents a skip state
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::HasThumbnail | Self::NoImageFound)
    }

    /// Returns true if this represents an error state
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::FetchFailed | Self::SaveFailed | Self::UploadFailed
        )
    }

    /// Returns true if the pipeline may move from `self` to `next`
    pub fn can_transition_to(&self, next: RecordState) -> bool {
        use RecordState::*;

        matches!(
            (self, next),
            (NotStarted, HasThumbnail | NoImageFound | Fetching)
                | (Fetching, FetchFailed | Fetched)
                | (Fetched, SaveFailed | Normalizing)
                | (Normalizing, Uploading)
                | (Uploading, UploadFailed | Succeeded)
        )
    }

    /// Short machine-friendly name, used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Fetching => "fetching",
            Self::Fetched => "fetched",
            Self::Normalizing => "normalizing",
            Self::Uploading => "uploading",
            Self::HasThumbnail => "has_thumbnail",
            Self::NoImageFound => "no_image_found",
            Self::FetchFailed => "fetch_failed",
            Self::SaveFailed => "save_failed",
            Self::UploadFailed => "upload_failed",
            Self::Succeeded => "succeeded",
        }
    }

    /// Returns all possible record states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::NotStarted,
            Self::Fetching,
            Self::Fetched,
            Self::Normalizing,
            Self::Uploading,
            Self::HasThumbnail,
            Self::NoImageFound,
            Self::FetchFailed,
            Self::SaveFailed,
            Self::UploadFailed,
            Self::Succeeded,
        ]
    }
}

impl fmt::Display for RecordState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
