use thiserror::Error;

/// Error type returned by the core store operations.
///
/// Row-level ingestion problems never show up here: they are aggregated
/// into an [`IngestReport`](crate::ingest::IngestReport) and reported,
/// not thrown. Storage failures propagate untouched so the caller
/// decides whether to retry; the core retries nothing on its own.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Intake was recorded against a name the catalog does not know.
    /// Recoverable: nothing was written, the caller re-prompts.
    #[error("no food named '{0}' in the catalog")]
    FoodNotFound(String),

    /// The persistence layer could not be reached or written.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}
