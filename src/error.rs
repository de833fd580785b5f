// Failure taxonomy for the playback engine
// Everything here is caught at the controller boundary and turned into a `false`

use std::time::Duration;
use thiserror::Error;

/// Why a free-text query did not turn into a track
#[derive(Debug, Error)]
pub enum SearchError {
    /// Provider ran fine but found nothing
    #[error("no results for query")]
    NoResults,

    /// Provider could not be launched or exited non-zero
    #[error("search provider failed: {0}")]
    Provider(String),

    #[error("search timed out after {0:?}")]
    Timeout(Duration),

    /// Provider answered but the record was missing fields or malformed
    #[error("unexpected provider output: {0}")]
    Parse(String),
}

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to spawn renderer: {0}")]
    Spawn(#[from] std::io::Error),

    /// Graceful shutdown ran out of time and the process was killed
    #[error("renderer ignored termination for {0:?}, killed")]
    TerminateTimeout(Duration),
}

#[derive(Debug, Error)]
pub enum RecommendationError {
    #[error("no recommendation available")]
    NoRecommendation,
}

/// Queue pointer is already at (or past) the tail
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("queue exhausted")]
pub struct QueueExhausted;
