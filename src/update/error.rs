// ABOUTME: Errors that abort an update pass.
// ABOUTME: Everything else is recovered into the metric's failed counter.

use thiserror::Error;

use super::sorter::SortError;
use crate::runtime::ClientError;

/// Fatal pass errors. No metric is returned when one of these surfaces.
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("failed to list containers: {0}")]
    List(#[source] ClientError),

    #[error(transparent)]
    Sort(#[from] SortError),
}
